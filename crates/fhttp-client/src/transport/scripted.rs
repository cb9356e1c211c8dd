//! In-memory transport that replays a fixed script of reads.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use fhttp_protocol::ProtocolError;

use super::Transport;

/// One scripted read result.
#[derive(Debug, Clone)]
enum Step {
    Line(String),
    Timeout,
    Overlong(usize),
}

/// A [`Transport`] that answers each read from a script and records writes.
///
/// Each scripted entry is one read result: `Some(line)` or `None` for a read
/// that timed out. Once the script runs out, every read returns the fallback
/// (a timeout unless [`repeat`](ScriptedTransport::repeat) was set). The
/// timeout passed to every read is recorded.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    fallback: Option<String>,
    writes: Vec<String>,
    timeouts: Vec<Duration>,
    closed: bool,
}

impl ScriptedTransport {
    /// Create a transport whose every read times out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport from a script of read results.
    pub fn with_script<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        ScriptedTransport {
            script: script
                .into_iter()
                .map(|r| r.map_or(Step::Timeout, |line| Step::Line(line.into())))
                .collect(),
            ..Self::default()
        }
    }

    /// Create a transport that returns `line` for every read.
    pub fn repeat(line: impl Into<String>) -> Self {
        ScriptedTransport {
            fallback: Some(line.into()),
            ..Self::default()
        }
    }

    /// Append a line to the script.
    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.script.push_back(Step::Line(line.into()));
        self
    }

    /// Append a timed-out read to the script.
    pub fn push_timeout(&mut self) -> &mut Self {
        self.script.push_back(Step::Timeout);
        self
    }

    /// Append a line of `len` bytes that the link dropped for its length.
    pub fn push_overlong(&mut self, len: usize) -> &mut Self {
        self.script.push_back(Step::Overlong(len));
        self
    }

    /// Everything written so far, one entry per write.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.timeouts.len()
    }

    /// The timeout passed to each read, in order.
    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }

    /// Number of scripted reads not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Whether [`close`](Transport::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        self.writes.push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        self.timeouts.push(timeout);
        match self.script.pop_front() {
            Some(Step::Line(line)) => Ok(Some(line)),
            Some(Step::Timeout) => Ok(None),
            Some(Step::Overlong(len)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                ProtocolError::BufferOverflow { max: len.saturating_sub(1), actual: len },
            )),
            None => Ok(self.fallback.clone()),
        }
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
