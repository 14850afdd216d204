//! Tests for health endpoints

use super::*;
use crate::controller::Verdict;
use std::time::Duration;

/// Wait for server to be ready with retry logic
///
/// Retries connection up to max_retries times with exponential backoff.
/// More reliable than fixed sleep for test environments.
async fn wait_for_server(port: u16, max_retries: u32) -> reqwest::Client {
    let client = reqwest::Client::new();
    let mut delay = Duration::from_millis(10);

    for attempt in 1..=max_retries {
        match client
            .get(format!("http://127.0.0.1:{}/healthz", port))
            .timeout(Duration::from_millis(100))
            .send()
            .await
        {
            Ok(_) => return client,
            Err(_) if attempt < max_retries => {
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_millis(200));
            }
            Err(e) => panic!("Server not ready after {} attempts: {}", max_retries, e),
        }
    }
    client
}

async fn get_status(client: &reqwest::Client, port: u16, path: &str) -> reqwest::Response {
    client
        .get(format!("http://127.0.0.1:{}{}", port, path))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to health server")
}

/// Test that health server starts and /healthz returns 200
#[tokio::test]
async fn test_healthz_returns_200() {
    let readiness = ReadinessState::new();
    let metrics = create_metrics().expect("create metrics");
    let port = 18180;

    let server_handle =
        tokio::spawn(async move { run_health_server(port, readiness, metrics).await });

    let client = wait_for_server(port, 10).await;
    let response = get_status(&client, port, "/healthz").await;

    assert_eq!(response.status(), 200, "Liveness endpoint should return 200");

    server_handle.abort();
}

/// Test that /readyz follows the readiness flag
#[tokio::test]
async fn test_readyz_tracks_readiness() {
    let readiness = ReadinessState::new();
    let metrics = create_metrics().expect("create metrics");
    let port = 18181;

    let server_readiness = readiness.clone();
    let server_handle =
        tokio::spawn(async move { run_health_server(port, server_readiness, metrics).await });

    let client = wait_for_server(port, 10).await;

    let response = get_status(&client, port, "/readyz").await;
    assert_eq!(
        response.status(),
        503,
        "Readiness endpoint should return 503 before identity is resolved"
    );

    readiness.set_ready();

    let response = get_status(&client, port, "/readyz").await;
    assert_eq!(
        response.status(),
        200,
        "Readiness endpoint should return 200 when ready"
    );

    server_handle.abort();
}

/// Test ReadinessState basic functionality
#[test]
fn test_readiness_state_transitions() {
    let state = ReadinessState::new();

    assert!(!state.is_ready());

    state.set_ready();
    assert!(state.is_ready());

    // Clone should share state
    let cloned = state.clone();
    assert!(cloned.is_ready());
}

/// Test that /metrics returns Prometheus format
#[tokio::test]
async fn test_metrics_returns_prometheus_format() {
    let readiness = ReadinessState::new();
    let metrics = create_metrics().expect("create metrics");
    let port = 18182;

    metrics.record_poll("unhealthy", 0.5);
    metrics.set_verdict(Verdict::Unhealthy);

    let server_metrics = metrics.clone();
    let server_handle =
        tokio::spawn(async move { run_health_server(port, readiness, server_metrics).await });

    let client = wait_for_server(port, 10).await;
    let response = get_status(&client, port, "/metrics").await;

    assert_eq!(response.status(), 200, "Metrics should return 200");

    let content_type = response
        .headers()
        .get("content-type")
        .expect("should have content-type")
        .to_str()
        .expect("content-type should be string")
        .to_string();
    assert!(
        content_type.contains("text/plain"),
        "Should be text/plain for Prometheus"
    );

    let body = response.text().await.expect("should have body");
    assert!(body.contains("asg_health_polls_total{result=\"unhealthy\"} 1"));
    assert!(body.contains("asg_health_node_healthy 0"));

    server_handle.abort();
}
