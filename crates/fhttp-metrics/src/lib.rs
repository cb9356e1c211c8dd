//! Metrics infrastructure for the FlipperHTTP client.
//!
//! This crate describes every metric the client records. It re-exports the
//! `metrics` crate for convenience and declares each metric as a structured
//! [`Metric`] constant so names are never typed twice.
//!
//! No recorder is installed here; without one, every `metrics` macro is a
//! no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use fhttp_metrics::{MetricLabels, metric_defs, describe_metrics};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! let labels = MetricLabels::new("flipper", "serial");
//! metrics::counter!(
//!     metric_defs::COMMANDS_SENT.name,
//!     &labels.with(&[("command", "[PING]".to_string())])
//! )
//! .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// # Example
///
/// ```rust
/// use fhttp_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const LINES_READ: Metric = Metric::counter("fhttp.transport.lines_read")
///     .with_description("Lines read from the board")
///     .with_unit(Unit::Count)
///     .with_labels(&["device"]);
///
/// assert_eq!(LINES_READ.name, "fhttp.transport.lines_read");
/// assert_eq!(LINES_READ.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "fhttp.client.commands_sent").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the client.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Standard labels present on every client metric.
    pub const STANDARD_LABELS: &[&str] = &["device", "transport"];

    // ========================================================================
    // Command Metrics
    // ========================================================================

    /// Commands written to the board.
    ///
    /// Labels: device, transport, command
    pub const COMMANDS_SENT: Metric = Metric::counter("fhttp.client.commands_sent")
        .with_description("Commands written to the board")
        .with_unit(Unit::Count)
        .with_labels(&["device", "transport", "command"]);

    /// Commands whose reply matched the expected marker.
    ///
    /// Labels: device, transport, command
    pub const COMMANDS_SUCCEEDED: Metric = Metric::counter("fhttp.client.commands_succeeded")
        .with_description("Commands whose reply matched the expected marker")
        .with_unit(Unit::Count)
        .with_labels(&["device", "transport", "command"]);

    /// Commands that timed out, got an unexpected reply, or were rejected.
    ///
    /// Labels: device, transport, command, reason
    ///
    /// `reason` is one of `timeout`, `protocol_mismatch`, `invalid_arguments`.
    pub const COMMANDS_FAILED: Metric = Metric::counter("fhttp.client.commands_failed")
        .with_description("Commands that timed out, got an unexpected reply, or were rejected")
        .with_unit(Unit::Count)
        .with_labels(&["device", "transport", "command", "reason"]);

    /// Wall-clock time from write to return, including resynchronization.
    ///
    /// Labels: device, transport, command
    pub const COMMAND_LATENCY: Metric = Metric::histogram("fhttp.client.command_latency_ms")
        .with_description("Wall-clock time from write to return, including resynchronization")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["device", "transport", "command"]);

    // ========================================================================
    // Read Path Metrics
    // ========================================================================

    /// Reads that produced no line after every retry.
    ///
    /// Labels: device, transport
    pub const READ_TIMEOUTS: Metric = Metric::counter("fhttp.reader.timeouts")
        .with_description("Reads that produced no line after every retry")
        .with_unit(Unit::Count)
        .with_labels(&["device", "transport"]);

    /// Lines discarded while resynchronizing.
    ///
    /// Labels: device, transport
    pub const LINES_DRAINED: Metric = Metric::counter("fhttp.resync.lines_drained")
        .with_description("Lines discarded while resynchronizing")
        .with_unit(Unit::Count)
        .with_labels(&["device", "transport"]);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &COMMANDS_SENT,
        &COMMANDS_SUCCEEDED,
        &COMMANDS_FAILED,
        &COMMAND_LATENCY,
        &READ_TIMEOUTS,
        &LINES_DRAINED,
    ];
}

/// Metric labels identifying which board and link a metric came from.
///
/// # Example
///
/// ```rust
/// use fhttp_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("flipper", "serial");
/// let label_vec = labels.to_labels();
/// assert_eq!(label_vec.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Configured device name
    pub device: String,
    /// Transport kind (serial, tcp, scripted)
    pub transport: String,
}

impl MetricLabels {
    /// Creates a new `MetricLabels` instance.
    pub fn new(device: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            transport: transport.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device", self.device.clone()),
            ("transport", self.transport.clone()),
        ]
    }

    /// Returns labels with additional key-value pairs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fhttp_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("flipper", "serial");
    /// let extended = labels.with(&[("command", "[PING]".to_string())]);
    ///
    /// assert!(extended.iter().any(|(k, v)| *k == "command" && v == "[PING]"));
    /// ```
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used by the client.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
