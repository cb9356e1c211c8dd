//! Byte-stream links to the board.
//!
//! The client only needs two primitives from a link: write a command, and
//! read one line with a timeout. [`StreamTransport`] provides both over a
//! serial port or a TCP bridge (ser2net, an ESP-link, or a simulator);
//! [`ScriptedTransport`] replays canned replies for tests.

mod scripted;
mod stream;

pub use scripted::ScriptedTransport;
pub use stream::{Backend, SerialTransport, StreamTransport, TcpTransport};

use std::io;
use std::time::Duration;

/// A duplex, line-oriented link to the board.
pub trait Transport {
    /// Write raw bytes to the link.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read one line, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when no complete line arrived in time. The line
    /// terminator is not included. A line dropped for exceeding the length
    /// limit is reported in its place as an [`io::ErrorKind::InvalidData`]
    /// error wrapping [`ProtocolError::BufferOverflow`].
    ///
    /// [`ProtocolError::BufferOverflow`]: fhttp_protocol::ProtocolError::BufferOverflow
    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;

    /// Short name of the link kind, used in log lines and metric labels.
    fn kind(&self) -> &'static str;

    /// Release the link.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        (**self).read_line(timeout)
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
