//! Bounded draining of stale reply lines.

use std::time::Duration;

use fhttp_protocol::Marker;
use tracing::trace;

use crate::config::DEFAULT_DRAIN_LIMIT;
use crate::error::Result;
use crate::reader::LineReader;
use crate::transport::Transport;

/// Markers that end a drain in either mode.
pub const DRAIN_STOP_MARKERS: [Marker; 7] = [
    Marker::Error,
    Marker::Info,
    Marker::Pong,
    Marker::Disconnected,
    Marker::Connected,
    Marker::GetStarted,
    Marker::GetEnd,
];

/// Realigns the read position after a command by discarding trailing lines.
///
/// The board often prints more than the caller consumed (a trailing
/// `[GET/END]`, a second status line, a late reply to an earlier command).
/// Draining stops at the first line carrying a terminal marker, at the first
/// empty read, or after `limit` lines, whichever comes first. The limit keeps
/// a chatty or stuck board from holding the client forever.
#[derive(Debug, Clone)]
pub struct Resynchronizer {
    limit: usize,
    timeout: Duration,
}

impl Default for Resynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_DRAIN_LIMIT, Duration::from_millis(100))
    }
}

impl Resynchronizer {
    /// Create a resynchronizer that consumes at most `limit` lines, waiting
    /// `timeout` per read.
    pub fn new(limit: usize, timeout: Duration) -> Self {
        Resynchronizer { limit, timeout }
    }

    /// Whether `line` ends a drain. In strict mode `[SUCCESS]` also ends it.
    pub fn is_stop_line(line: &str, strict: bool) -> bool {
        (strict && Marker::Success.is_found_in(line))
            || DRAIN_STOP_MARKERS.iter().any(|m| m.is_found_in(line))
    }

    /// Drain pending lines. Returns the number of lines consumed.
    pub fn drain<T: Transport>(&self, reader: &mut LineReader<T>, strict: bool) -> Result<usize> {
        let mut drained = 0;

        while drained < self.limit {
            let line = match reader.read(self.timeout) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) if e.is_lost_line() => {
                    drained += 1;
                    trace!("drained an overlong line");
                    continue;
                }
                Err(e) => return Err(e),
            };
            drained += 1;
            trace!("drained: {:?}", line);

            if Self::is_stop_line(&line, strict) {
                break;
            }
        }

        Ok(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    fn reader(script: &[Option<&str>]) -> LineReader<ScriptedTransport> {
        LineReader::new(ScriptedTransport::with_script(script.iter().copied()), 1)
    }

    #[test]
    fn test_stops_on_empty_read() {
        let mut r = reader(&[None, Some("late")]);
        assert_eq!(Resynchronizer::default().drain(&mut r, false).unwrap(), 0);
        assert_eq!(r.get_ref().remaining(), 1);
    }

    #[test]
    fn test_stops_on_terminal_marker() {
        let mut r = reader(&[Some("payload"), Some("[GET/END]"), Some("next")]);
        assert_eq!(Resynchronizer::default().drain(&mut r, false).unwrap(), 2);
        assert_eq!(r.get_ref().remaining(), 1);
    }

    #[test]
    fn test_success_only_stops_in_strict_mode() {
        let mut lenient = reader(&[Some("[SUCCESS]"), Some("[INFO] done"), Some("next")]);
        assert_eq!(Resynchronizer::default().drain(&mut lenient, false).unwrap(), 2);

        let mut strict = reader(&[Some("[SUCCESS]"), Some("[INFO] done"), Some("next")]);
        assert_eq!(Resynchronizer::default().drain(&mut strict, true).unwrap(), 1);
    }

    #[test]
    fn test_never_exceeds_limit() {
        let mut r = LineReader::new(ScriptedTransport::repeat("chatter"), 5);
        let drained = Resynchronizer::default().drain(&mut r, true).unwrap();

        assert_eq!(drained, 5);
        assert_eq!(r.get_ref().reads(), 5);
    }

    #[test]
    fn test_zero_limit_reads_nothing() {
        let mut r = reader(&[Some("stale")]);
        let drained = Resynchronizer::new(0, Duration::from_millis(1)).drain(&mut r, false).unwrap();
        assert_eq!(drained, 0);
        assert_eq!(r.get_ref().reads(), 0);
    }

    #[test]
    fn test_overlong_line_counts_as_drained() {
        let mut transport = ScriptedTransport::new();
        transport.push_overlong(5000).push_line("[GET/END]").push_line("next");
        let mut r = LineReader::new(transport, 1);

        assert_eq!(Resynchronizer::default().drain(&mut r, false).unwrap(), 2);
        assert_eq!(r.get_ref().remaining(), 1);
    }

    #[test]
    fn test_stop_lines() {
        assert!(Resynchronizer::is_stop_line("[ERROR] Failed to parse JSON.", false));
        assert!(Resynchronizer::is_stop_line("[GET/STARTED]", false));
        assert!(!Resynchronizer::is_stop_line("[GET/SUCCESS]", true));
        assert!(!Resynchronizer::is_stop_line("[POST/END]", false));
    }
}
