use serde::{Deserialize, Serialize};

/// Status of a single Consul health check
///
/// Consul reports `passing`, `warning` and `critical`. Anything else the agent
/// might send is kept as `Unknown` so one unexpected value does not make the
/// whole listing unreadable.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    /// Only critical checks may fail the node
    pub fn is_critical(self) -> bool {
        matches!(self, CheckStatus::Critical)
    }
}

/// Health check as returned by `GET /v1/agent/checks`
///
/// Only the fields the agent needs are decoded; the rest of the payload
/// (Output, Notes, Definition, ...) is ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentCheck {
    #[serde(rename = "CheckID")]
    pub check_id: String,

    /// Empty for node-level checks such as `serfHealth`
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,

    #[serde(default)]
    pub service_name: String,

    pub status: CheckStatus,
}

/// Service registration as returned by `GET /v1/agent/service/{id}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(default)]
    pub service: String,

    /// Consul sends `null` for services registered without tags
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A health check joined with the tags of the service that owns it
///
/// This is the snapshot shape handed to the aggregator. `service_tags` is only
/// resolved for critical checks; for every other check it stays empty.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthCheck {
    pub id: String,
    pub service_id: String,
    pub service_name: String,
    pub status: CheckStatus,
    pub service_tags: Vec<String>,
}

impl HealthCheck {
    /// Build a check with no resolved tags
    pub fn from_agent(check: AgentCheck) -> Self {
        HealthCheck {
            id: check.check_id,
            service_id: check.service_id,
            service_name: check.service_name,
            status: check.status,
            service_tags: Vec::new(),
        }
    }

    /// Attach the owning service's tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.service_tags = tags;
        self
    }

    /// Whether the check is attached to a service (vs. a node-level check)
    pub fn has_service(&self) -> bool {
        !self.service_id.is_empty()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
