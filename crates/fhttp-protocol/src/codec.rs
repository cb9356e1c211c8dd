//! Line-based codec for board communication.
//!
//! Commands are terminated with `\n`. Replies are newline-delimited; the
//! board's `println` adds a `\r` before the `\n`, and it frequently prints an
//! empty line after a payload, so both are stripped here rather than surfacing
//! as lines.

use std::collections::VecDeque;

use bytes::BytesMut;

use crate::error::{ProtocolError, ProtocolResult};

/// Default maximum length of a single reply line.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Command terminator.
pub const LINE_TERMINATOR: u8 = b'\n';

/// A line that was dropped for exceeding the limit.
#[derive(Debug, Clone, Copy)]
struct LostLine {
    /// Buffer offset the line would have started at.
    offset: usize,
    /// Bytes seen when the limit was hit.
    seen: usize,
}

/// A codec for reading and writing protocol lines.
///
/// Received bytes are accumulated until a complete line is available. There
/// is no echo on this link, so every byte belongs to a reply.
///
/// A line longer than the limit is never returned in pieces. Its bytes are
/// dropped through the next terminator, and [`take_overflow`] reports it in
/// its place in the line sequence.
///
/// [`take_overflow`]: LineCodec::take_overflow
#[derive(Debug)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Longest line accepted before it is discarded.
    max_line_length: usize,
    /// Dropping the rest of an overlong line until its terminator.
    discarding: bool,
    /// Overlong lines not yet reported, in arrival order.
    lost: VecDeque<LostLine>,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new line codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a new line codec that rejects lines longer than `max_line_length`.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(256),
            max_line_length,
            discarding: false,
            lost: VecDeque::new(),
        }
    }

    /// Add received data to the buffer.
    ///
    /// If the buffer holds more than `max_line_length` bytes without a line
    /// terminator, the partial line is dropped along with everything up to its
    /// terminator, and an overflow is reported. Complete lines already in the
    /// buffer are kept.
    pub fn push(&mut self, data: &[u8]) -> ProtocolResult<()> {
        let mut data = data;

        if self.discarding {
            match data.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(end) => {
                    self.discarding = false;
                    data = &data[end + 1..];
                }
                None => return Ok(()),
            }
        }

        self.buffer.extend_from_slice(data);

        let tail_start = self
            .buffer
            .iter()
            .rposition(|&b| b == LINE_TERMINATOR)
            .map(|i| i + 1)
            .unwrap_or(0);
        let tail_len = self.buffer.len() - tail_start;

        if tail_len > self.max_line_length {
            log::debug!(
                "dropping {} bytes of unterminated input (limit {})",
                tail_len,
                self.max_line_length
            );
            self.buffer.truncate(tail_start);
            self.discarding = true;
            self.lost.push_back(LostLine {
                offset: tail_start,
                seen: tail_len,
            });
            return Err(ProtocolError::BufferOverflow {
                max: self.max_line_length,
                actual: tail_len,
            });
        }

        Ok(())
    }

    /// Report an overlong line if it is next in sequence.
    ///
    /// Lines received before it must be decoded first; until then this
    /// returns `None` and [`decode_line`](LineCodec::decode_line) keeps
    /// returning them.
    pub fn take_overflow(&mut self) -> Option<ProtocolError> {
        if self.lost.front().map(|l| l.offset) != Some(0) {
            return None;
        }
        let lost = self.lost.pop_front()?;
        Some(ProtocolError::BufferOverflow {
            max: self.max_line_length,
            actual: lost.seen,
        })
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// Returns `None` if more data is needed or an overlong line is next.
    /// Empty lines are skipped; only `\r` is stripped from the rest.
    pub fn decode_line(&mut self) -> Option<String> {
        loop {
            if self.lost.front().map(|l| l.offset) == Some(0) {
                return None;
            }
            let end = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;

            let mut line_data = self.buffer.split_to(end + 1);
            for lost in self.lost.iter_mut() {
                lost.offset -= end + 1;
            }
            if end > self.max_line_length {
                log::debug!("dropping {} byte line (limit {})", end, self.max_line_length);
                self.lost.push_front(LostLine { offset: 0, seen: end });
                return None;
            }
            line_data.truncate(end);
            while line_data.last() == Some(&b'\r') {
                line_data.truncate(line_data.len() - 1);
            }

            if line_data.is_empty() {
                log::trace!("skipping blank line");
                continue;
            }

            return Some(String::from_utf8_lossy(&line_data).into_owned());
        }
    }

    /// Encode a command for transmission.
    ///
    /// Appends the `\n` terminator.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(cmd.len() + 1);
        buf.extend_from_slice(cmd.as_bytes());
        buf.push(LINE_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer and forget any overlong line in progress.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
        self.lost.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let encoded = LineCodec::encode_command("[PING]");
        assert_eq!(encoded, b"[PING]\n");
    }

    #[test]
    fn test_decode_line() {
        let mut codec = LineCodec::new();
        codec.push(b"[GET/SUCCESS]\r\nhello\r\n").unwrap();

        assert_eq!(codec.decode_line(), Some("[GET/SUCCESS]".to_string()));
        assert_eq!(codec.decode_line(), Some("hello".to_string()));
        assert!(codec.decode_line().is_none());
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_partial_line() {
        let mut codec = LineCodec::new();
        codec.push(b"[PO").unwrap();

        assert!(codec.decode_line().is_none());
        assert_eq!(codec.buffer_as_str(), "[PO");

        codec.push(b"NG]\n").unwrap();
        assert_eq!(codec.decode_line(), Some("[PONG]".to_string()));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut codec = LineCodec::new();
        codec.push(b"payload\r\n\r\n\n[GET/END]\r\n").unwrap();

        assert_eq!(codec.decode_line(), Some("payload".to_string()));
        assert_eq!(codec.decode_line(), Some("[GET/END]".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_overflow_reports_complete_lines_first() {
        let mut codec = LineCodec::with_max_line_length(8);
        let err = codec.push(b"[PONG]\nthis line never ends").unwrap_err();

        assert_eq!(err, ProtocolError::BufferOverflow { max: 8, actual: 20 });
        assert_eq!(codec.take_overflow(), None);
        assert_eq!(codec.decode_line(), Some("[PONG]".to_string()));
        assert_eq!(
            codec.take_overflow(),
            Some(ProtocolError::BufferOverflow { max: 8, actual: 20 })
        );
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_overflow_tail_never_returned() {
        let mut codec = LineCodec::with_max_line_length(8);
        assert!(codec.push(b"{\"data\":\"xxxxxxxx").is_err());
        codec.push(b"xxxx\",\"end\"").unwrap();
        codec.push(b":\"TAIL\"}\r\n[GET/END]\r\n").unwrap();

        assert!(codec.decode_line().is_none());
        assert!(codec.take_overflow().is_some());
        assert_eq!(codec.decode_line(), Some("[GET/END]".to_string()));
        assert!(codec.decode_line().is_none());
        assert!(codec.take_overflow().is_none());
    }

    #[test]
    fn test_overflow_after_buffered_lines_keeps_order() {
        let mut codec = LineCodec::with_max_line_length(4);
        codec.push(b"ab\ncd\n").unwrap();
        assert!(codec.push(b"overlong").is_err());
        codec.push(b"\nef\n").unwrap();

        assert_eq!(codec.decode_line(), Some("ab".to_string()));
        assert_eq!(codec.decode_line(), Some("cd".to_string()));
        assert_eq!(codec.decode_line(), None);
        assert!(codec.take_overflow().is_some());
        assert_eq!(codec.decode_line(), Some("ef".to_string()));
    }

    #[test]
    fn test_overlong_complete_line_in_one_push() {
        let mut codec = LineCodec::with_max_line_length(8);
        let mut data = b"ok\n".to_vec();
        data.extend_from_slice(&[b'x'; 20]);
        data.extend_from_slice(b"\nnext\n");
        codec.push(&data).unwrap();

        assert_eq!(codec.decode_line(), Some("ok".to_string()));
        assert_eq!(codec.decode_line(), None);
        assert_eq!(
            codec.take_overflow(),
            Some(ProtocolError::BufferOverflow { max: 8, actual: 20 })
        );
        assert_eq!(codec.decode_line(), Some("next".to_string()));
    }

    #[test]
    fn test_payload_whitespace_preserved() {
        let mut codec = LineCodec::new();
        codec.push(b"  indented\t \r\n").unwrap();
        assert_eq!(codec.decode_line(), Some("  indented\t ".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut codec = LineCodec::new();
        codec.push(b"stale bytes").unwrap();
        codec.clear();
        assert_eq!(codec.buffered_len(), 0);

        let mut codec = LineCodec::with_max_line_length(4);
        assert!(codec.push(b"overlong").is_err());
        codec.clear();
        codec.push(b"ok\n").unwrap();
        assert!(codec.take_overflow().is_none());
        assert_eq!(codec.decode_line(), Some("ok".to_string()));
    }
}
