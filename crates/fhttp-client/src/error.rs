//! Error types for the client.
//!
//! Only conditions the caller cannot recover from by re-issuing the command
//! are errors. A reply that never arrives or carries the wrong marker is a
//! [`Failure`], reported through the operation's `false`/empty return value
//! and [`ClientStats`](crate::ClientStats).

use std::fmt;

use fhttp_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the transport, configuration, or command encoding.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error on the underlying link.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// A command could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Convert a transport error, recovering a wrapped [`ProtocolError`].
    pub(crate) fn from_transport(err: std::io::Error) -> Self {
        let protocol = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ProtocolError>())
            .cloned();
        match protocol {
            Some(protocol) => ClientError::Protocol(protocol),
            None => ClientError::Io(err),
        }
    }

    /// Whether a reply line was dropped for exceeding the length limit.
    pub fn is_lost_line(&self) -> bool {
        matches!(self, ClientError::Protocol(ProtocolError::BufferOverflow { .. }))
    }

    /// Whether reopening the transport may clear this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            ClientError::Serial(e) => matches!(e.kind(), serialport::ErrorKind::Io(_)),
            ClientError::Config(_) | ClientError::Protocol(_) => false,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Why a command did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// No line arrived within the retry-bounded read window.
    Timeout,
    /// A line arrived but did not carry the expected marker.
    ProtocolMismatch,
    /// The arguments were rejected before anything was written.
    InvalidArguments,
}

impl Failure {
    /// Label value used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Failure::Timeout => "timeout",
            Failure::ProtocolMismatch => "protocol_mismatch",
            Failure::InvalidArguments => "invalid_arguments",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_retryable_link_errors() {
        let reset = ClientError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(reset.is_retryable());

        let eof = ClientError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        assert!(eof.is_retryable());

        let denied = ClientError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(!denied.is_retryable());
    }

    #[test]
    fn test_config_and_protocol_not_retryable() {
        let config = ClientError::from(serde_yaml::from_str::<u32>("nope").unwrap_err());
        assert!(!config.is_retryable());

        let overflow = ClientError::Protocol(ProtocolError::BufferOverflow { max: 8, actual: 9 });
        assert!(!overflow.is_retryable());
    }

    #[test]
    fn test_from_transport_recovers_overflow() {
        let overflow = ProtocolError::BufferOverflow { max: 8, actual: 9 };
        let err = ClientError::from_transport(io::Error::new(io::ErrorKind::InvalidData, overflow));
        assert!(err.is_lost_line());

        let err = ClientError::from_transport(io::Error::new(io::ErrorKind::InvalidData, "garbage"));
        assert!(matches!(err, ClientError::Io(_)));
        assert!(!err.is_lost_line());
    }
}
