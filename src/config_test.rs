#![allow(clippy::unwrap_used)] // Tests can use unwrap for brevity

use super::*;

#[test]
fn test_defaults() {
    let config = Config::try_parse_from(["asg-consul-health"]).unwrap();

    assert_eq!(config.recheck_delay, 30);
    assert_eq!(config.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.tag_filter(), TagFilter::match_all());
    assert_eq!(config.on_query_error, QueryFailurePolicy::MarkUnhealthy);
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
    assert!(config.health_port.is_none());
}

#[test]
fn test_flags_override_defaults() {
    let config = Config::try_parse_from([
        "asg-consul-health",
        "--recheck-delay",
        "10",
        "--service-tag",
        "prod",
        "--on-query-error",
        "skip",
        "--consul-addr",
        "10.0.0.5:8500",
        "--health-port",
        "9102",
        "--instance-id",
        "i-abc",
        "--region",
        "us-east-1",
        "--log-format",
        "text",
    ])
    .unwrap();

    assert_eq!(config.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.tag_filter(), TagFilter::new("prod"));
    assert_eq!(config.on_query_error, QueryFailurePolicy::Skip);
    assert_eq!(config.consul_addr, "10.0.0.5:8500");
    assert_eq!(config.health_port, Some(9102));
    assert_eq!(config.instance_id.as_deref(), Some("i-abc"));
    assert_eq!(config.region.as_deref(), Some("us-east-1"));
    assert_eq!(config.log_format, LogFormat::Text);
}

#[test]
fn test_zero_recheck_delay_is_rejected() {
    let result = Config::try_parse_from(["asg-consul-health", "--recheck-delay", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_policy_is_rejected() {
    let result = Config::try_parse_from(["asg-consul-health", "--on-query-error", "retry"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_definition_is_valid() {
    use clap::CommandFactory;
    Config::command().debug_assert();
}

#[test]
fn test_consul_address_without_scheme_defaults_to_http() {
    let url = parse_consul_address("127.0.0.1:8500").unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:8500/");

    let url = parse_consul_address("https://consul.local:8501/").unwrap();
    assert_eq!(url.scheme(), "https");
    assert_eq!(url.host_str(), Some("consul.local"));
    assert_eq!(url.port(), Some(8501));
}

#[test]
fn test_invalid_consul_address_is_config_error() {
    for address in ["  ", "ftp://consul.local", "http://"] {
        match parse_consul_address(address) {
            Err(ConfigError::InvalidConsulAddress { address: got, .. }) => {
                assert_eq!(got, address)
            }
            Ok(url) => panic!("expected {:?} to be rejected, got {}", address, url),
        }
    }
}

#[test]
fn test_consul_url_uses_configured_address() {
    let config =
        Config::try_parse_from(["asg-consul-health", "--consul-addr", "10.0.0.5:8500"]).unwrap();
    let url = config.consul_url().unwrap();
    assert_eq!(url.host_str(), Some("10.0.0.5"));
    assert_eq!(url.port(), Some(8500));
}
