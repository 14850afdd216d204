//! Consul agent health source
//!
//! Reads the local agent's health checks and, for failing checks, the tags of
//! the owning service. The source never retries and never caches; retry policy
//! belongs to the control loop.

mod client;
mod types;

pub use client::ConsulAgent;
pub use types::{AgentCheck, AgentService, CheckStatus, HealthCheck};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Consul agent request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Consul agent returned {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed Consul agent response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Consul agent address cannot carry a path: {0}")]
    InvalidAddress(String),
}

/// Read-only view of the registry's health state
///
/// Implemented by [`ConsulAgent`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait HealthSource: Send + Sync {
    /// Fetch the current checks with owning-service tags resolved for
    /// critical checks
    ///
    /// # Returns
    /// * `Ok(checks)` - Complete snapshot for this poll
    /// * `Err(QueryError)` - Listing failed; no partial snapshot is returned
    async fn fetch_checks(&self) -> Result<Vec<HealthCheck>, QueryError>;
}
