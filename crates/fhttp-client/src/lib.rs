//! Synchronous client for FlipperHTTP boards.
//!
//! A FlipperHTTP board (ESP32, Pico W, ...) gives a host Wi-Fi and HTTP over a
//! serial link. This crate drives that link: it opens a [`Transport`], sends
//! one [`Command`](fhttp_protocol::Command) at a time, and turns the board's
//! marker lines into plain results.
//!
//! - [`LineReader`] retries timed-out reads a bounded number of times.
//! - [`Resynchronizer`] drains trailing reply lines after each command.
//! - [`FlipperHttp`] exposes one method per board command.
//!
//! # Example
//!
//! ```rust
//! use fhttp_client::{FlipperHttp, ScriptedTransport};
//!
//! let transport = ScriptedTransport::with_script([
//!     Some("[GET/SUCCESS]"),
//!     Some("{\"fact\":\"Cats sleep a lot.\"}"),
//!     Some("[GET/END]"),
//! ]);
//! let mut board = FlipperHttp::with_defaults(transport);
//!
//! let body = board.get_request("https://catfact.ninja/fact").unwrap();
//! assert_eq!(body, "{\"fact\":\"Cats sleep a lot.\"}");
//! ```

mod client;
mod config;
mod error;
mod reader;
mod resync;
pub mod transport;

pub use client::{ClientStats, FlipperHttp};
pub use config::{
    ClientConfig, Timeouts, TransportConfig, DEFAULT_BAUD_RATE, DEFAULT_DRAIN_LIMIT,
    DEFAULT_READ_ATTEMPTS,
};
pub use error::{ClientError, Failure, Result};
pub use reader::LineReader;
pub use resync::{Resynchronizer, DRAIN_STOP_MARKERS};
pub use transport::{ScriptedTransport, SerialTransport, StreamTransport, TcpTransport, Transport};
