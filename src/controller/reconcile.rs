//! Polling control loop
//!
//! Each cycle reads the health source, reduces the snapshot to a [`Verdict`],
//! and calls the publisher only when the verdict differs from the last one
//! dispatched.

use super::state::{NodeState, StateTracker};
use super::verdict::{evaluate, TagFilter, Verdict};
use crate::consul::HealthSource;
use crate::fleet::{FaultKind, HealthPublisher, InstanceIdentity};
use crate::server::{SharedMetrics, ShutdownSignal};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What to do when the health source cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum QueryFailurePolicy {
    /// Treat the node as Unhealthy
    #[default]
    MarkUnhealthy,
    /// End the cycle without a verdict; nothing is published
    Skip,
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Source failed under [`QueryFailurePolicy::Skip`]
    Skipped,
    /// Verdict matches the last published one
    Unchanged(Verdict),
    /// Verdict changed (or first poll) and the fleet API accepted it
    Published {
        verdict: Verdict,
        previous: Option<Verdict>,
    },
    /// Verdict changed but the fleet API call failed
    PublishFailed { verdict: Verdict, kind: FaultKind },
}

/// The control loop
///
/// Owns the [`StateTracker`] and runs
/// source → aggregate → edge detection → publish, strictly in sequence.
pub struct Reconciler {
    source: Box<dyn HealthSource>,
    publisher: Box<dyn HealthPublisher>,
    identity: InstanceIdentity,
    filter: TagFilter,
    policy: QueryFailurePolicy,
    tracker: StateTracker,
    metrics: Option<SharedMetrics>,
}

impl Reconciler {
    pub fn new(
        source: Box<dyn HealthSource>,
        publisher: Box<dyn HealthPublisher>,
        identity: InstanceIdentity,
        filter: TagFilter,
        policy: QueryFailurePolicy,
    ) -> Self {
        Reconciler {
            source,
            publisher,
            identity,
            filter,
            policy,
            tracker: StateTracker::new(),
            metrics: None,
        }
    }

    /// Record poll and publish activity in `metrics`
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &NodeState {
        self.tracker.state()
    }

    /// Query the source and reduce the snapshot to a verdict
    ///
    /// Returns the verdict (if any) and the poll result label.
    async fn observe(&self) -> (Option<Verdict>, &'static str) {
        match self.source.fetch_checks().await {
            Ok(checks) => {
                let verdict = evaluate(&checks, &self.filter);
                let label = if verdict.is_healthy() {
                    "healthy"
                } else {
                    "unhealthy"
                };
                (Some(verdict), label)
            }
            Err(e) => match self.policy {
                QueryFailurePolicy::MarkUnhealthy => {
                    error!(error = %e, "Cannot retrieve health checks, treating node as unhealthy");
                    (Some(Verdict::Unhealthy), "query_error")
                }
                QueryFailurePolicy::Skip => {
                    warn!(error = %e, "Cannot retrieve health checks, skipping cycle");
                    (None, "skipped")
                }
            },
        }
    }

    /// Run a single poll cycle
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let started = Instant::now();
        let (verdict, poll_result) = self.observe().await;

        let outcome = match verdict {
            None => CycleOutcome::Skipped,
            Some(verdict) => {
                if let Some(metrics) = &self.metrics {
                    metrics.set_verdict(verdict);
                }
                self.publish_if_changed(verdict).await
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_poll(poll_result, started.elapsed().as_secs_f64());
        }

        outcome
    }

    async fn publish_if_changed(&mut self, verdict: Verdict) -> CycleOutcome {
        let transition = self.tracker.reconcile(verdict);
        if !transition.should_publish {
            debug!(verdict = %verdict, "Node verdict unchanged");
            return CycleOutcome::Unchanged(verdict);
        }

        info!(
            previous = ?transition.previous,
            verdict = %verdict,
            "Node verdict changed, notifying Auto Scaling"
        );

        let result = self.publisher.publish(verdict, &self.identity).await;

        // Bookkeeping advances on failure too: the next transition retries
        self.tracker.record_dispatched(verdict);

        match result {
            Ok(()) => {
                self.record_publish("success");
                CycleOutcome::Published {
                    verdict,
                    previous: transition.previous,
                }
            }
            Err(e) => {
                let kind = e.kind();
                match kind {
                    FaultKind::Transient => {
                        warn!(error = %e, verdict = %verdict, "Transient fault setting instance health")
                    }
                    FaultKind::Permanent => {
                        error!(error = %e, verdict = %verdict, "Failed to set instance health")
                    }
                }
                self.record_publish(kind.as_str());
                CycleOutcome::PublishFailed { verdict, kind }
            }
        }
    }

    fn record_publish(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_publish(result);
        }
    }

    /// Poll every `interval` until `shutdown` fires
    ///
    /// The loop starts idle, so the first check happens one interval after
    /// startup. Shutdown is only observed between cycles.
    pub async fn run(&mut self, interval: Duration, mut shutdown: ShutdownSignal) {
        info!(
            interval_secs = interval.as_secs_f64(),
            tag = self.filter.tag().unwrap_or(""),
            instance_id = %self.identity.instance_id,
            "Waiting grace period before first check"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Reconciliation loop shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    self.poll_once().await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
