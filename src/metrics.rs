//! Metrics collection for Paddle Relay
//!
//! This module provides lightweight metrics collection with:
//! - Atomic counters for received webhooks, rejected signatures, and handler errors
//! - A breakdown of processed webhooks by event type and outcome
//! - Prometheus-compatible text export for `GET /metrics`
//!
//! Every count is also forwarded to the `metrics` facade, so an installed
//! recorder sees the same `paddle_webhooks_total{event_type,outcome}` series.
//!
//! # Usage
//!
//! ```rust,ignore
//! use paddle_relay::metrics::{global_metrics, Outcome};
//!
//! global_metrics().record_webhook("subscription.created", Outcome::Processed);
//! let output = global_metrics().to_prometheus_format();
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::RwLock;

/// How a webhook delivery ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Handler ran and every write succeeded
    Processed,
    /// Event type not handled, acknowledged without writes
    Ignored,
    /// Handler reported an error
    Failed,
    /// Signature check failed
    Rejected,
    /// Body was not a valid event envelope
    Malformed,
}

impl Outcome {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Processed => "processed",
            Outcome::Ignored => "ignored",
            Outcome::Failed => "failed",
            Outcome::Rejected => "rejected",
            Outcome::Malformed => "malformed",
        }
    }
}

/// Relay-wide counters
#[derive(Debug)]
pub struct Metrics {
    webhooks_total: AtomicU64,
    signature_failures_total: AtomicU64,
    handler_errors_total: AtomicU64,
    by_event_outcome: RwLock<BTreeMap<(String, Outcome), u64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new, zeroed instance
    pub fn new() -> Self {
        Self {
            webhooks_total: AtomicU64::new(0),
            signature_failures_total: AtomicU64::new(0),
            handler_errors_total: AtomicU64::new(0),
            by_event_outcome: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record the end of one webhook delivery
    pub fn record_webhook(&self, event_type: &str, outcome: Outcome) {
        self.webhooks_total.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Rejected => {
                self.signature_failures_total.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed => {
                self.handler_errors_total.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        *self
            .by_event_outcome
            .write()
            .entry((event_type.to_string(), outcome))
            .or_insert(0) += 1;

        ::metrics::counter!(
            "paddle_webhooks_total",
            "event_type" => event_type.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    /// Total deliveries seen
    pub fn webhooks_total(&self) -> u64 {
        self.webhooks_total.load(Ordering::Relaxed)
    }

    /// Deliveries rejected for their signature
    pub fn signature_failures(&self) -> u64 {
        self.signature_failures_total.load(Ordering::Relaxed)
    }

    /// Deliveries whose handler reported an error
    pub fn handler_errors(&self) -> u64 {
        self.handler_errors_total.load(Ordering::Relaxed)
    }

    /// Count for one event type and outcome
    pub fn count(&self, event_type: &str, outcome: Outcome) -> u64 {
        self.by_event_outcome
            .read()
            .get(&(event_type.to_string(), outcome))
            .copied()
            .unwrap_or(0)
    }

    /// Seconds since this instance was created
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "paddle_relay_uptime_seconds {}\n",
            self.uptime_seconds()
        ));
        output.push_str(&format!(
            "paddle_relay_signature_failures_total {}\n",
            self.signature_failures()
        ));
        output.push_str(&format!(
            "paddle_relay_handler_errors_total {}\n",
            self.handler_errors()
        ));

        for ((event_type, outcome), count) in self.by_event_outcome.read().iter() {
            output.push_str(&format!(
                "paddle_webhooks_total{{event_type=\"{}\",outcome=\"{}\"}} {}\n",
                event_type,
                outcome.as_str(),
                count
            ));
        }

        output
    }
}

/// Global metrics instance for the relay
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get or initialize the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Initialize global metrics (call once at startup)
pub fn init() {
    let _ = global_metrics();
}
