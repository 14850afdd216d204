use super::{AgentCheck, AgentService, HealthCheck, HealthSource, QueryError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the Consul ACL token
const TOKEN_HEADER: &str = "X-Consul-Token";

/// HTTP client for the local Consul agent
#[derive(Debug, Clone)]
pub struct ConsulAgent {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ConsulAgent {
    /// Create a client for the agent at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Agent address, see [`crate::config::parse_consul_address`]
    /// * `token` - Optional ACL token
    /// * `timeout` - Upper bound for each request
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Result<Self, QueryError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(ConsulAgent {
            http,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `segments` to the base URL, percent-encoding each one
    ///
    /// A service ID such as `web?v=2` stays a single path segment instead of
    /// turning into a query string.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, QueryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QueryError::InvalidAddress(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.http.get(url);
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, QueryError> {
        let url = self.endpoint(segments)?;
        let endpoint = url.path().to_string();
        let response = self.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status { endpoint, status });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List every check registered with the local agent
    pub async fn agent_checks(&self) -> Result<Vec<AgentCheck>, QueryError> {
        // BTreeMap keeps the listing ordered by check id
        let checks: BTreeMap<String, AgentCheck> =
            self.get_json(&["v1", "agent", "checks"]).await?;
        Ok(checks.into_values().collect())
    }

    /// Look up a service registered with the local agent
    pub async fn agent_service(&self, service_id: &str) -> Result<AgentService, QueryError> {
        self.get_json(&["v1", "agent", "service", service_id]).await
    }

    /// Tags of `service_id`, or an empty set if the lookup fails
    async fn service_tags(&self, service_id: &str) -> Vec<String> {
        match self.agent_service(service_id).await {
            Ok(service) => service.tags,
            Err(e) => {
                warn!(
                    service_id = %service_id,
                    error = %e,
                    "Failed to look up service tags, treating tag set as empty"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl HealthSource for ConsulAgent {
    async fn fetch_checks(&self) -> Result<Vec<HealthCheck>, QueryError> {
        let agent_checks = self.agent_checks().await?;
        debug!(count = agent_checks.len(), "Fetched agent checks");

        let mut checks = Vec::with_capacity(agent_checks.len());
        for agent_check in agent_checks {
            let check = HealthCheck::from_agent(agent_check);

            // Tags only matter for checks that can fail the node
            if check.status.is_critical() && check.has_service() {
                let tags = self.service_tags(&check.service_id).await;
                checks.push(check.with_tags(tags));
            } else {
                checks.push(check);
            }
        }

        Ok(checks)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
