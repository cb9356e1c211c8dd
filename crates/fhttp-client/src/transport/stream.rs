//! Line transport over any readable/writable byte stream.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use fhttp_protocol::LineCodec;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace, warn};

use super::Transport;
use crate::error::Result;

/// Size of the scratch buffer for a single read from the backend.
const READ_CHUNK: usize = 256;

/// Smallest timeout handed to a backend; some refuse a zero duration.
const MIN_BACKEND_TIMEOUT: Duration = Duration::from_millis(1);

/// A byte stream whose read timeout can be changed between reads.
pub trait Backend: Read + Write {
    /// Set the timeout for the next blocking read.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Link kind for logs and metrics.
    fn kind(&self) -> &'static str;

    /// Tear down the link.
    fn shutdown(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Backend for Box<dyn SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        SerialPort::set_timeout(self.as_mut(), timeout).map_err(io::Error::from)
    }

    fn kind(&self) -> &'static str {
        "serial"
    }
}

impl Backend for TcpStream {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// A [`Transport`] that frames lines out of a [`Backend`] byte stream.
///
/// Bytes that arrive after a line terminator stay buffered for the next
/// [`read_line`](Transport::read_line) call.
pub struct StreamTransport<B> {
    backend: B,
    codec: LineCodec,
}

/// Transport over a serial port.
pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

/// Transport over a TCP bridge to the board's UART.
pub type TcpTransport = StreamTransport<TcpStream>;

impl<B: Backend> StreamTransport<B> {
    /// Wrap an already-open backend.
    pub fn new(backend: B, max_line_length: usize) -> Self {
        StreamTransport {
            backend,
            codec: LineCodec::with_max_line_length(max_line_length),
        }
    }

    /// Get a reference to the backend.
    pub fn get_ref(&self) -> &B {
        &self.backend
    }

    /// Number of received bytes not yet returned as a line.
    pub fn buffered_len(&self) -> usize {
        self.codec.buffered_len()
    }
}

impl SerialTransport {
    /// Open a serial port at `baud_rate`, 8N1, no flow control.
    ///
    /// Anything the board sent before the port was opened is discarded.
    pub fn open_serial(path: &str, baud_rate: u32, max_line_length: usize) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;
        port.clear(ClearBuffer::Input)?;

        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self::new(port, max_line_length))
    }
}

impl TcpTransport {
    /// Connect to a TCP bridge exposing the board's UART.
    pub fn connect_tcp<A: ToSocketAddrs>(address: A, max_line_length: usize) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;

        debug!("Connected to UART bridge at {:?}", stream.peer_addr().ok());
        Ok(Self::new(stream, max_line_length))
    }
}

impl<B: Backend> Transport for StreamTransport<B> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("{}: writing {} bytes", self.backend.kind(), data.len());
        self.backend.write_all(data)?;
        self.backend.flush()
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.codec.decode_line() {
                return Ok(Some(line));
            }
            if let Some(overflow) = self.codec.take_overflow() {
                return Err(io::Error::new(io::ErrorKind::InvalidData, overflow));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.backend
                .set_timeout((deadline - now).max(MIN_BACKEND_TIMEOUT))?;

            match self.backend.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "link closed by peer",
                    ));
                }
                Ok(n) => {
                    if let Err(e) = self.codec.push(&chunk[..n]) {
                        warn!("{}: {}", self.backend.kind(), e);
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn kind(&self) -> &'static str {
        self.backend.kind()
    }

    fn close(&mut self) -> io::Result<()> {
        self.codec.clear();
        self.backend.shutdown()
    }
}
