//! Retrying line reader.

use std::time::Duration;

use fhttp_metrics::{metric_defs, MetricLabels};
use tracing::{debug, trace};

use crate::config::DEFAULT_READ_ATTEMPTS;
use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// Wraps a [`Transport`] and retries timed-out reads a fixed number of times.
///
/// A single timed read on the board's UART can miss a line that is still
/// being transmitted; retrying absorbs that jitter so callers see either a
/// line or a definite "no data".
pub struct LineReader<T> {
    transport: T,
    attempts: u32,
    labels: MetricLabels,
    timeouts: u64,
}

impl<T: Transport> LineReader<T> {
    /// Create a reader that makes up to `attempts` reads per call (at least one).
    pub fn new(transport: T, attempts: u32) -> Self {
        let labels = MetricLabels::new("unnamed", transport.kind());
        LineReader {
            transport,
            attempts: attempts.max(1),
            labels,
            timeouts: 0,
        }
    }

    /// Create a reader with the default attempt count.
    pub fn with_default_attempts(transport: T) -> Self {
        Self::new(transport, DEFAULT_READ_ATTEMPTS)
    }

    /// Set the labels attached to this reader's metrics.
    pub fn set_labels(&mut self, labels: MetricLabels) {
        self.labels = labels;
    }

    /// Read one line, retrying while the transport reports no data.
    ///
    /// Each attempt waits up to `timeout`. Returns `Ok(None)` only after
    /// every attempt came back empty. A line dropped for length is returned
    /// immediately as [`ClientError::Protocol`].
    pub fn read(&mut self, timeout: Duration) -> Result<Option<String>> {
        for attempt in 1..=self.attempts {
            let line = self
                .transport
                .read_line(timeout)
                .map_err(ClientError::from_transport)?;
            if let Some(line) = line {
                trace!("read (attempt {}): {:?}", attempt, line);
                return Ok(Some(line));
            }
        }

        debug!(
            "no line after {} attempts of {:?}",
            self.attempts, timeout
        );
        self.timeouts += 1;
        metrics::counter!(metric_defs::READ_TIMEOUTS.name, &self.labels.to_labels()).increment(1);
        Ok(None)
    }

    /// Write raw bytes through to the transport.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write(data)?;
        Ok(())
    }

    /// Attempts made per [`read`](LineReader::read).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of reads that returned no data.
    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Get a reference to the transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    const T: Duration = Duration::from_millis(10);

    #[test]
    fn test_returns_first_line() {
        let transport = ScriptedTransport::with_script([Some("[PONG]")]);
        let mut reader = LineReader::with_default_attempts(transport);

        assert_eq!(reader.read(T).unwrap(), Some("[PONG]".to_string()));
        assert_eq!(reader.get_ref().reads(), 1);
    }

    #[test]
    fn test_retries_through_gaps() {
        let transport = ScriptedTransport::with_script([None, None, None, None, Some("late")]);
        let mut reader = LineReader::new(transport, 5);

        assert_eq!(reader.read(T).unwrap(), Some("late".to_string()));
        assert_eq!(reader.get_ref().reads(), 5);
        assert_eq!(reader.timeouts(), 0);
    }

    #[test]
    fn test_gives_up_after_attempts() {
        let transport = ScriptedTransport::with_script([None, None, None, None, None, Some("too late")]);
        let mut reader = LineReader::new(transport, 5);

        assert_eq!(reader.read(T).unwrap(), None);
        assert_eq!(reader.get_ref().reads(), 5);
        assert_eq!(reader.get_ref().remaining(), 1);
        assert_eq!(reader.timeouts(), 1);
    }

    #[test]
    fn test_zero_attempts_still_reads_once() {
        let mut reader = LineReader::new(ScriptedTransport::repeat("x"), 0);
        assert_eq!(reader.attempts(), 1);
        assert_eq!(reader.read(T).unwrap(), Some("x".to_string()));
    }
}
