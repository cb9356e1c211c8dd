//! FlipperHTTP UART Protocol
//!
//! This crate provides types and utilities for talking to a FlipperHTTP
//! peripheral board (ESP32, Pico W, ...) over its serial link. The board
//! exposes a line-based text protocol where every command is a bracket tag,
//! optionally followed by an argument, and every reply is one or more
//! newline-terminated lines.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → board): `[TAG]` plus an optional argument, terminated
//!   with `\n`. A command never spans more than one write.
//! - **Replies** (board → host): lines that either carry a marker such as
//!   `[SUCCESS]`, `[ERROR]` or `[PONG]`, or carry opaque payload text.
//! - **Streams**: HTTP verbs answer with `[GET/SUCCESS]`, zero or more payload
//!   lines, then `[GET/END]` (and likewise for POST, PUT, DELETE).
//!
//! Markers are recognised by substring containment rather than by prefix,
//! because firmware builds differ in what they print around the tag.
//!
//! # Example
//!
//! ```rust
//! use fhttp_protocol::{classify, Command, LineKind, Marker};
//!
//! let cmd = Command::Get { url: "https://catfact.ninja/fact".to_string() };
//! assert_eq!(cmd.encode(), b"[GET]https://catfact.ninja/fact\n");
//!
//! assert_eq!(classify(Some("[GET/SUCCESS] Status: 200")), LineKind::Marker(Marker::GetSuccess));
//! assert_eq!(classify(None), LineKind::NoData);
//! ```

mod codec;
mod commands;
mod error;
mod markers;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use markers::*;
