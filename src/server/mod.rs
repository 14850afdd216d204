//! Process-level plumbing around the reconciliation loop
//!
//! - `health`: `/healthz`, `/readyz` and `/metrics` endpoints
//! - `metrics`: Prometheus registry for poll and publish activity
//! - `shutdown`: cooperative shutdown signal

mod health;
pub mod metrics;
mod shutdown;

pub use health::{run_health_server, ReadinessState};
pub use metrics::{create_metrics, AgentMetrics, SharedMetrics};
pub use shutdown::{shutdown_channel, wait_for_termination, ShutdownHandle, ShutdownSignal};

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;
