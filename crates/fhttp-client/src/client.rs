//! Command client for a FlipperHTTP board.
//!
//! [`FlipperHttp`] owns the link and runs one command at a time: write the
//! command line, read the reply, decide the outcome, then resynchronize so
//! the next command starts from a clean read position.
//!
//! Failures the board can cause (no reply, wrong marker) are reported as
//! `false` or empty text and recorded in [`ClientStats`]. Only link I/O
//! failures are returned as [`ClientError`](crate::ClientError).

use std::time::{Duration, Instant};

use fhttp_metrics::{metric_defs, MetricLabels};
use fhttp_protocol::{classify, includes, Command, HttpVerb, Marker, ResponseShape};
use tracing::{debug, warn};

use crate::config::{ClientConfig, Timeouts};
use crate::error::{Failure, Result};
use crate::reader::LineReader;
use crate::resync::Resynchronizer;
use crate::transport::Transport;

/// Text the board prints instead of `[DISCONNECTED]` on some firmware builds.
const WIFI_STOP_TEXT: &str = "WiFi stop";

/// One read from the board, as seen by the exchange helpers.
enum Reply {
    Line(String),
    /// Nothing arrived before the read gave up.
    Absent,
    /// A line arrived but was too long to keep.
    Lost,
}

// ============================================================================
// Statistics
// ============================================================================

/// Running totals for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Commands written to the board.
    pub commands_sent: u64,
    /// Commands whose reply matched.
    pub commands_succeeded: u64,
    /// Commands that failed for any reason, including rejected arguments.
    pub commands_failed: u64,
    /// Commands that got no reply.
    pub timeouts: u64,
    /// Commands that got a reply without the expected marker.
    pub mismatches: u64,
    /// Commands rejected before anything was written.
    pub rejected: u64,
    /// Lines discarded while resynchronizing.
    pub lines_drained: u64,
    /// Reason of the most recent failure, cleared by the next success.
    pub last_failure: Option<Failure>,
}

impl ClientStats {
    fn record(&mut self, outcome: std::result::Result<(), Failure>) {
        match outcome {
            Ok(()) => {
                self.commands_succeeded += 1;
                self.last_failure = None;
            }
            Err(failure) => {
                self.commands_failed += 1;
                match failure {
                    Failure::Timeout => self.timeouts += 1,
                    Failure::ProtocolMismatch => self.mismatches += 1,
                    Failure::InvalidArguments => self.rejected += 1,
                }
                self.last_failure = Some(failure);
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Synchronous client for the FlipperHTTP command protocol.
///
/// Text-returning operations return an empty string both on failure and
/// when the board genuinely sent nothing useful. Check
/// [`last_failure`](FlipperHttp::last_failure) when the difference matters.
pub struct FlipperHttp<T: Transport> {
    reader: LineReader<T>,
    resync: Resynchronizer,
    timeouts: Timeouts,
    labels: MetricLabels,
    stats: ClientStats,
}

impl<T: Transport> FlipperHttp<T> {
    /// Create a client over an open transport.
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        let labels = MetricLabels::new(config.device_name.clone(), transport.kind());
        let mut reader = LineReader::new(transport, config.read_attempts);
        reader.set_labels(labels.clone());

        FlipperHttp {
            reader,
            resync: Resynchronizer::new(config.drain_limit, config.timeouts.drain()),
            timeouts: config.timeouts.clone(),
            labels,
            stats: ClientStats::default(),
        }
    }

    /// Create a client with the default configuration.
    pub fn with_defaults(transport: T) -> Self {
        Self::new(transport, &ClientConfig::default())
    }

    /// Running totals.
    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Reason the most recent command failed, if it did.
    pub fn last_failure(&self) -> Option<Failure> {
        self.stats.last_failure
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        self.reader.get_ref()
    }

    /// Get a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.reader.get_mut()
    }

    /// Close the link and return the transport.
    pub fn close(self) -> Result<T> {
        let mut transport = self.reader.into_inner();
        transport.close()?;
        debug!("closed {} link", transport.kind());
        Ok(transport)
    }

    /// Return the transport without closing it.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }

    // ------------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------------

    /// Check that the board answers `[PONG]`.
    pub fn ping(&mut self) -> Result<bool> {
        let timeout = self.timeouts.fast();
        self.acknowledge(Command::Ping, timeout, false, |line| Marker::Pong.is_found_in(line))
    }

    /// The board's command list, as printed.
    pub fn list_commands(&mut self) -> Result<String> {
        self.passthrough(Command::List)
    }

    /// Let the LED blink while the board works.
    pub fn led_on(&mut self) -> Result<()> {
        self.send_only(Command::LedOn)
    }

    /// Keep the LED dark while the board works.
    pub fn led_off(&mut self) -> Result<()> {
        self.send_only(Command::LedOff)
    }

    /// Restart the board. Nothing is read back.
    pub fn reboot(&mut self) -> Result<()> {
        self.send_only(Command::Reboot)
    }

    /// Send an arbitrary command line and return the first reply line.
    pub fn send_raw(&mut self, command: &str) -> Result<String> {
        self.execute(Command::Raw {
            command: command.to_string(),
        })
    }

    /// Run any command, reading back whatever its response shape calls for.
    ///
    /// Write-only commands return empty text. Line commands return the reply
    /// line and stream commands the first body line.
    pub fn execute(&mut self, command: Command) -> Result<String> {
        match command.response_shape() {
            ResponseShape::None => {
                self.send_only(command)?;
                Ok(String::new())
            }
            ResponseShape::Line => self.passthrough(command),
            ResponseShape::Stream(verb) => self.stream(command, verb),
        }
    }

    // ------------------------------------------------------------------------
    // Wi-Fi
    // ------------------------------------------------------------------------

    /// Connect to the saved network.
    ///
    /// `[SUCCESS]`, `[CONNECTED]` and `[INFO]` all count as connected; the
    /// last is printed when the board was already on the network.
    pub fn connect_wifi(&mut self) -> Result<bool> {
        let timeout = self.timeouts.slow();
        self.acknowledge(Command::WifiConnect, timeout, true, |line| {
            Marker::Success.is_found_in(line)
                || Marker::Connected.is_found_in(line)
                || Marker::Info.is_found_in(line)
        })
    }

    /// Disconnect from the current network.
    pub fn disconnect_wifi(&mut self) -> Result<bool> {
        let timeout = self.timeouts.slow();
        self.acknowledge(Command::WifiDisconnect, timeout, true, |line| {
            Marker::Disconnected.is_found_in(line) || includes(line, WIFI_STOP_TEXT)
        })
    }

    /// Store network credentials on the board.
    ///
    /// Returns `false` without writing anything if either argument is empty.
    pub fn save_wifi(&mut self, ssid: &str, password: &str) -> Result<bool> {
        let timeout = self.timeouts.slow();
        let command = Command::WifiSave {
            ssid: ssid.to_string(),
            password: password.to_string(),
        };
        self.acknowledge(command, timeout, false, |line| Marker::Success.is_found_in(line))
    }

    /// Nearby networks, as printed.
    pub fn scan_wifi(&mut self) -> Result<String> {
        self.passthrough(Command::WifiScan)
    }

    /// Saved network settings, as printed.
    pub fn list_saved_wifi(&mut self) -> Result<String> {
        self.passthrough(Command::WifiList)
    }

    /// The board's local address.
    pub fn ip_address(&mut self) -> Result<String> {
        self.passthrough(Command::IpAddress)
    }

    /// The address the connected network assigned.
    pub fn ip_wifi(&mut self) -> Result<String> {
        self.passthrough(Command::WifiIp)
    }

    // ------------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------------

    /// Have the board extract `key` from `json`.
    pub fn parse_json(&mut self, key: &str, json: &str) -> Result<String> {
        self.passthrough(Command::Parse {
            key: key.to_string(),
            json: json.to_string(),
        })
    }

    /// Have the board extract `key` from element `index` of the array `json`.
    pub fn parse_json_array(&mut self, key: &str, index: u32, json: &str) -> Result<String> {
        self.passthrough(Command::ParseArray {
            key: key.to_string(),
            index,
            json: json.to_string(),
        })
    }

    // ------------------------------------------------------------------------
    // HTTP
    // ------------------------------------------------------------------------

    /// GET `url` with the board's default headers.
    pub fn get_request(&mut self, url: &str) -> Result<String> {
        self.execute(Command::Get { url: url.to_string() })
    }

    /// GET `url` with `headers` (a JSON object literal).
    pub fn get_request_with_headers(&mut self, url: &str, headers: &str) -> Result<String> {
        self.execute(Command::GetHttp {
            url: url.to_string(),
            headers: headers.to_string(),
        })
    }

    /// GET `url`, with the body sent back as raw bytes.
    pub fn get_request_bytes(&mut self, url: &str, headers: &str) -> Result<String> {
        self.execute(Command::GetBytes {
            url: url.to_string(),
            headers: headers.to_string(),
        })
    }

    /// POST `payload` to `url`.
    pub fn post_request_with_headers(&mut self, url: &str, headers: &str, payload: &str) -> Result<String> {
        self.execute(Command::PostHttp {
            url: url.to_string(),
            headers: headers.to_string(),
            payload: payload.to_string(),
        })
    }

    /// POST `payload` to `url`, with the body sent back as raw bytes.
    pub fn post_request_bytes(&mut self, url: &str, headers: &str, payload: &str) -> Result<String> {
        self.execute(Command::PostBytes {
            url: url.to_string(),
            headers: headers.to_string(),
            payload: payload.to_string(),
        })
    }

    /// PUT `payload` to `url`.
    pub fn put_request_with_headers(&mut self, url: &str, headers: &str, payload: &str) -> Result<String> {
        self.execute(Command::PutHttp {
            url: url.to_string(),
            headers: headers.to_string(),
            payload: payload.to_string(),
        })
    }

    /// DELETE `url`.
    pub fn delete_request_with_headers(&mut self, url: &str, headers: &str, payload: &str) -> Result<String> {
        self.execute(Command::DeleteHttp {
            url: url.to_string(),
            headers: headers.to_string(),
            payload: payload.to_string(),
        })
    }

    // ------------------------------------------------------------------------
    // Exchange helpers
    // ------------------------------------------------------------------------

    /// Validate and write `command`. Returns the send time, or `None` if the
    /// arguments were rejected and nothing was written.
    fn send(&mut self, command: &Command) -> Result<Option<Instant>> {
        if let Err(e) = command.validate() {
            warn!("{}: not sent: {}", self.labels.device, e);
            self.record(command, None, Err(Failure::InvalidArguments));
            return Ok(None);
        }

        debug!("{} <- {}", self.labels.device, command.to_log_string());
        self.reader.write(&command.encode())?;
        self.stats.commands_sent += 1;
        metrics::counter!(
            metric_defs::COMMANDS_SENT.name,
            &self.labels.with(&[("command", command.tag().to_string())])
        )
        .increment(1);

        Ok(Some(Instant::now()))
    }

    fn send_only(&mut self, command: Command) -> Result<()> {
        if let Some(started) = self.send(&command)? {
            self.record(&command, Some(started), Ok(()));
        }
        Ok(())
    }

    /// Single status line checked by `accept`.
    fn acknowledge<F>(&mut self, command: Command, timeout: Duration, strict: bool, accept: F) -> Result<bool>
    where
        F: Fn(&str) -> bool,
    {
        let Some(started) = self.send(&command)? else {
            return Ok(false);
        };

        let outcome = match self.read_reply(timeout)? {
            Reply::Absent => {
                warn!("{}: no reply to {}", self.labels.device, command.tag());
                self.drain(false)?;
                Err(Failure::Timeout)
            }
            Reply::Lost => {
                self.drain(strict)?;
                Err(Failure::ProtocolMismatch)
            }
            Reply::Line(line) => {
                debug!("{} -> {:?} ({:?})", self.labels.device, line, classify(Some(line.as_str())));
                let accepted = accept(&line);
                if !accepted {
                    warn!("{}: unexpected reply to {}: {}", self.labels.device, command.tag(), line);
                }
                self.drain(strict)?;
                if accepted {
                    Ok(())
                } else {
                    Err(Failure::ProtocolMismatch)
                }
            }
        };

        let ok = outcome.is_ok();
        self.record(&command, Some(started), outcome);
        Ok(ok)
    }

    /// Single line returned as-is.
    fn passthrough(&mut self, command: Command) -> Result<String> {
        let Some(started) = self.send(&command)? else {
            return Ok(String::new());
        };

        let timeout = self.timeouts.slow();
        let (text, outcome) = match self.read_reply(timeout)? {
            Reply::Line(line) => {
                debug!("{} -> {:?}", self.labels.device, line);
                (line, Ok(()))
            }
            Reply::Absent => {
                warn!("{}: no reply to {}", self.labels.device, command.tag());
                (String::new(), Err(Failure::Timeout))
            }
            Reply::Lost => (String::new(), Err(Failure::ProtocolMismatch)),
        };
        self.drain(false)?;

        self.record(&command, Some(started), outcome);
        Ok(text)
    }

    /// Status line, then the first body line of an HTTP stream.
    fn stream(&mut self, command: Command, verb: HttpVerb) -> Result<String> {
        let Some(started) = self.send(&command)? else {
            return Ok(String::new());
        };

        let timeout = self.timeouts.stream();
        let (body, outcome) = match self.read_reply(timeout)? {
            Reply::Absent => {
                warn!("{}: no status for {}", self.labels.device, command.tag());
                (String::new(), Err(Failure::Timeout))
            }
            Reply::Lost => (String::new(), Err(Failure::ProtocolMismatch)),
            Reply::Line(status) if verb.success_marker().is_found_in(&status) => {
                debug!("{} -> {}", self.labels.device, status);
                self.read_body(verb, timeout)?
            }
            Reply::Line(status) => {
                warn!("{}: {} failed: {}", self.labels.device, command.tag(), status);
                (String::new(), Err(Failure::ProtocolMismatch))
            }
        };
        self.drain(false)?;

        self.record(&command, Some(started), outcome);
        Ok(body)
    }

    /// Read the body of a stream after its success marker.
    ///
    /// Returns the first payload line, or empty text if the end marker comes
    /// first, the board goes quiet or the line was too long to keep.
    fn read_body(&mut self, verb: HttpVerb, timeout: Duration) -> Result<(String, std::result::Result<(), Failure>)> {
        let end = verb.end_marker();
        match self.read_reply(timeout)? {
            Reply::Absent => {
                warn!("{}: {} body never arrived", self.labels.device, verb);
                Ok((String::new(), Err(Failure::Timeout)))
            }
            Reply::Lost => Ok((String::new(), Err(Failure::ProtocolMismatch))),
            Reply::Line(line) if end.is_exactly(&line) => {
                debug!("{} -> {} (empty body)", self.labels.device, end);
                Ok((String::new(), Ok(())))
            }
            Reply::Line(line) => {
                debug!("{} -> {:?}", self.labels.device, line);
                Ok((line, Ok(())))
            }
        }
    }

    /// Read one line. An overlong line is reported as lost, never truncated.
    fn read_reply(&mut self, timeout: Duration) -> Result<Reply> {
        match self.reader.read(timeout) {
            Ok(Some(line)) => Ok(Reply::Line(line)),
            Ok(None) => Ok(Reply::Absent),
            Err(e) if e.is_lost_line() => {
                warn!("{}: {}", self.labels.device, e);
                Ok(Reply::Lost)
            }
            Err(e) => Err(e),
        }
    }

    fn drain(&mut self, strict: bool) -> Result<()> {
        let drained = self.resync.drain(&mut self.reader, strict)?;
        if drained > 0 {
            self.stats.lines_drained += drained as u64;
            metrics::counter!(metric_defs::LINES_DRAINED.name, &self.labels.to_labels())
                .increment(drained as u64);
        }
        Ok(())
    }

    fn record(&mut self, command: &Command, started: Option<Instant>, outcome: std::result::Result<(), Failure>) {
        let tag = command.tag().to_string();

        if let Some(started) = started {
            metrics::histogram!(
                metric_defs::COMMAND_LATENCY.name,
                &self.labels.with(&[("command", tag.clone())])
            )
            .record(started.elapsed().as_secs_f64() * 1000.0);
        }

        match outcome {
            Ok(()) => {
                metrics::counter!(
                    metric_defs::COMMANDS_SUCCEEDED.name,
                    &self.labels.with(&[("command", tag)])
                )
                .increment(1);
            }
            Err(failure) => {
                metrics::counter!(
                    metric_defs::COMMANDS_FAILED.name,
                    &self.labels.with(&[("command", tag), ("reason", failure.as_str().to_string())])
                )
                .increment(1);
            }
        }

        self.stats.record(outcome);
    }
}
