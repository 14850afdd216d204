//! Prometheus metrics for the health agent
//!
//! Exposes reconciliation activity:
//! - Poll counts by outcome and poll durations
//! - Publish attempts by outcome
//! - The current node verdict

use crate::controller::Verdict;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Agent metrics registry
///
/// Thread-safe container for all Prometheus metrics.
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct AgentMetrics {
    registry: Registry,
    /// Poll cycles by result (healthy, unhealthy, query_error, skipped)
    pub polls_total: IntCounterVec,
    /// Poll cycle duration in seconds
    pub poll_duration_seconds: Histogram,
    /// Publish attempts by result (success, transient, permanent)
    pub publishes_total: IntCounterVec,
    /// 1 when the last verdict was Healthy, 0 when Unhealthy
    pub node_healthy: IntGauge,
}

impl AgentMetrics {
    /// Create a new metrics registry with all agent metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let polls_total = IntCounterVec::new(
            Opts::new("asg_health_polls_total", "Total number of poll cycles"),
            &["result"],
        )?;
        registry.register(Box::new(polls_total.clone()))?;

        let poll_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "asg_health_poll_duration_seconds",
                "Duration of a poll cycle in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;

        let publishes_total = IntCounterVec::new(
            Opts::new(
                "asg_health_publishes_total",
                "Total number of instance health publish attempts",
            ),
            &["result"],
        )?;
        registry.register(Box::new(publishes_total.clone()))?;

        let node_healthy = IntGauge::new(
            "asg_health_node_healthy",
            "Whether the last computed node verdict was Healthy",
        )?;
        registry.register(Box::new(node_healthy.clone()))?;

        Ok(Self {
            registry,
            polls_total,
            poll_duration_seconds,
            publishes_total,
            node_healthy,
        })
    }

    /// Record a completed poll cycle
    pub fn record_poll(&self, result: &str, duration_secs: f64) {
        self.polls_total.with_label_values(&[result]).inc();
        self.poll_duration_seconds.observe(duration_secs);
    }

    /// Record a publish attempt
    pub fn record_publish(&self, result: &str) {
        self.publishes_total.with_label_values(&[result]).inc();
    }

    /// Update the verdict gauge
    pub fn set_verdict(&self, verdict: Verdict) {
        self.node_healthy.set(i64::from(verdict.is_healthy()));
    }

    /// Encode all metrics to Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
        })
    }
}

/// Shared metrics handle for use across the agent
pub type SharedMetrics = Arc<AgentMetrics>;

/// Create a shared metrics instance
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(AgentMetrics::new()?))
}
