//! Aggregation of per-check health into a single node verdict

use crate::consul::HealthCheck;
use std::fmt;
use tracing::{error, info, warn};

/// Aggregate health of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

impl Verdict {
    /// Health status string used by the Auto Scaling API
    pub fn as_health_status(self) -> &'static str {
        match self {
            Verdict::Healthy => "Healthy",
            Verdict::Unhealthy => "Unhealthy",
        }
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, Verdict::Healthy)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_health_status())
    }
}

/// Restricts which failing services may mark the node unhealthy
///
/// An empty filter matches every service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter(Option<String>);

impl TagFilter {
    /// Build a filter from a raw tag; an empty string means "match all"
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.is_empty() {
            TagFilter(None)
        } else {
            TagFilter(Some(tag))
        }
    }

    /// Filter that matches every service
    pub fn match_all() -> Self {
        TagFilter(None)
    }

    pub fn tag(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Does a service with these tags fall under the filter?
    ///
    /// An empty tag set only matches the empty filter. That covers services
    /// whose tag lookup failed: they count against the node when no filter is
    /// configured, and are ignored when a filter is configured.
    pub fn matches(&self, tags: &[String]) -> bool {
        match &self.0 {
            None => true,
            Some(wanted) => tags.iter().any(|t| t == wanted),
        }
    }
}

/// Collapse a poll's checks into one verdict
///
/// Only critical checks count. A critical check fails the node when its
/// service's tags match `filter`; otherwise it is logged and ignored. Warning
/// checks never fail the node.
///
/// Every check is visited (no short-circuit) so that each failing service
/// shows up in the logs for the cycle.
///
/// # Purity
/// The function has no side effects besides logging and always returns the
/// same verdict for the same input.
pub fn evaluate(checks: &[HealthCheck], filter: &TagFilter) -> Verdict {
    let mut verdict = Verdict::Healthy;

    for check in checks.iter().filter(|c| c.status.is_critical()) {
        if filter.matches(&check.service_tags) {
            error!(
                service = %check.service_name,
                check_id = %check.id,
                tag = filter.tag().unwrap_or(""),
                "Failing service detected with specified tag, will mark as unhealthy"
            );
            verdict = Verdict::Unhealthy;
        } else {
            warn!(
                service = %check.service_name,
                check_id = %check.id,
                "Failing service detected"
            );
        }
    }

    if verdict.is_healthy() {
        info!(checks = checks.len(), "All Consul checks healthy");
    }

    verdict
}

#[cfg(test)]
#[path = "verdict_test.rs"]
mod tests;
