//! Command-line and environment configuration

use crate::controller::{QueryFailurePolicy, TagFilter};
use clap::{Parser, ValueEnum};
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid Consul agent address {address:?}: {reason}")]
    InvalidConsulAddress { address: String, reason: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// asg-consul-health marks this instance unhealthy in its Auto Scaling group
/// when Consul health checks fail
#[derive(Debug, Clone, Parser)]
#[command(name = "asg-consul-health", version, about)]
pub struct Config {
    /// Seconds to wait between checks of the Consul agent (also the startup grace period)
    #[arg(
        long,
        env = "ASG_HEALTH_RECHECK_DELAY",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub recheck_delay: u64,

    /// Only mark the instance unhealthy when a service with this tag fails (empty = any service)
    #[arg(long, env = "ASG_HEALTH_SERVICE_TAG", default_value = "")]
    pub service_tag: String,

    /// What to do when the Consul agent cannot be queried
    #[arg(
        long,
        env = "ASG_HEALTH_ON_QUERY_ERROR",
        value_enum,
        default_value_t = QueryFailurePolicy::MarkUnhealthy
    )]
    pub on_query_error: QueryFailurePolicy,

    /// Consul agent address
    #[arg(long, env = "CONSUL_HTTP_ADDR", default_value = "http://127.0.0.1:8500")]
    pub consul_addr: String,

    /// Consul ACL token
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub consul_token: Option<String>,

    /// Timeout in seconds for each Consul, metadata and Auto Scaling request
    #[arg(
        long,
        env = "ASG_HEALTH_REQUEST_TIMEOUT",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// Serve /healthz, /readyz and /metrics on this port
    #[arg(long, env = "ASG_HEALTH_PORT")]
    pub health_port: Option<u16>,

    /// Instance ID to report for (skips the metadata service)
    #[arg(long, env = "ASG_HEALTH_INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// Region of the Auto Scaling group (defaults to the instance's region)
    #[arg(long, env = "ASG_HEALTH_REGION")]
    pub region: Option<String>,

    /// Log output format
    #[arg(long, env = "ASG_HEALTH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn tag_filter(&self) -> TagFilter {
        TagFilter::new(self.service_tag.clone())
    }

    pub fn consul_url(&self) -> Result<Url, ConfigError> {
        parse_consul_address(&self.consul_addr)
    }
}

/// Parse a Consul agent address as accepted by `CONSUL_HTTP_ADDR`
///
/// A bare `host:port` gets the `http` scheme. Only `http` and `https`
/// are accepted.
pub fn parse_consul_address(address: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidConsulAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("address is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("address has no host"));
    }

    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
