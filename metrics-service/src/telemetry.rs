//! Prometheus counters for the service's own behaviour.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;
use valpulse_common::{PulseError, PulseResult};

#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    fetch_total: IntCounterVec,
    fetch_seconds: Histogram,
    envelope_total: IntCounterVec,
}

impl Telemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let fetch_total = IntCounterVec::new(
            Opts::new(
                "valpulse_upstream_fetch_total",
                "Upstream fetches by outcome (ok or failure kind)",
            ),
            &["outcome"],
        )?;
        let fetch_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "valpulse_upstream_fetch_seconds",
                "Wall time of upstream fetches, retries included",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]),
        )?;
        let envelope_total = IntCounterVec::new(
            Opts::new("valpulse_envelope_total", "Envelopes served by success flag"),
            &["success"],
        )?;

        registry.register(Box::new(fetch_total.clone()))?;
        registry.register(Box::new(fetch_seconds.clone()))?;
        registry.register(Box::new(envelope_total.clone()))?;

        Ok(Self {
            registry,
            fetch_total,
            fetch_seconds,
            envelope_total,
        })
    }

    pub fn record_fetch(&self, outcome: &str, elapsed: Duration) {
        self.fetch_total.with_label_values(&[outcome]).inc();
        self.fetch_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_envelope(&self, success: bool) {
        let label = if success { "true" } else { "false" };
        self.envelope_total.with_label_values(&[label]).inc();
    }

    /// Text exposition format
    pub fn encode(&self) -> PulseResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| PulseError::Internal(format!("Encoding error: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| PulseError::Internal(format!("UTF-8 error: {}", e)))
    }
}
