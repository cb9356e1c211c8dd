//! Error types for the FlipperHTTP protocol.

use thiserror::Error;

/// Errors that can occur when building commands or framing lines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A command argument was rejected before anything was written.
    #[error("invalid command {tag}: {reason}")]
    InvalidCommand {
        /// The command tag, e.g. `[WIFI/SAVE]`.
        tag: &'static str,
        /// Why the argument was rejected.
        reason: String,
    },

    /// Buffer overflow (an incoming line grew past the configured limit).
    #[error("buffer overflow: max {max} bytes, got {actual}")]
    BufferOverflow { max: usize, actual: usize },
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
