//! Fleet-management side of the agent
//!
//! - `metadata`: one-time instance identity bootstrap (EC2 IMDS)
//! - `autoscaling`: health publishing through the Auto Scaling API

pub mod autoscaling;
pub mod metadata;

pub use autoscaling::{classify_error_code, AutoScalingPublisher};
pub use metadata::{resolve_identity, IdentityError, InstanceIdentity};

use crate::controller::Verdict;
use async_trait::async_trait;
use thiserror::Error;

/// How a fleet API fault should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Contention, throttling, network trouble: the next transition retries
    Transient,
    /// Rejected request: surfaced to the operator, never retried inline
    Permanent,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Transient => "transient",
            FaultKind::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("transient fleet API fault: {0}")]
    Transient(String),

    #[error("fleet API rejected health update: {0}")]
    Permanent(String),
}

impl PublishError {
    pub fn kind(&self) -> FaultKind {
        match self {
            PublishError::Transient(_) => FaultKind::Transient,
            PublishError::Permanent(_) => FaultKind::Permanent,
        }
    }

    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        match kind {
            FaultKind::Transient => PublishError::Transient(message.into()),
            FaultKind::Permanent => PublishError::Permanent(message.into()),
        }
    }
}

/// Sink for node verdicts
///
/// The only side-effecting external call the agent makes.
#[async_trait]
pub trait HealthPublisher: Send + Sync {
    /// Report `verdict` for the instance described by `identity`
    ///
    /// # Returns
    /// * `Ok(())` - Fleet API acknowledged the new status
    /// * `Err(PublishError)` - Classified fault; callers log it and move on
    async fn publish(
        &self,
        verdict: Verdict,
        identity: &InstanceIdentity,
    ) -> Result<(), PublishError>;
}
