use asg_consul_health::config::{Config, LogFormat};
use asg_consul_health::consul::ConsulAgent;
use asg_consul_health::controller::Reconciler;
use asg_consul_health::fleet::{resolve_identity, AutoScalingPublisher};
use asg_consul_health::server::{
    create_metrics, run_health_server, shutdown_channel, wait_for_termination, ReadinessState,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    info!("Starting asg-consul-health");

    let readiness = ReadinessState::new();
    let metrics = create_metrics()?;

    // Start health server in background
    if let Some(port) = config.health_port {
        let health_readiness = readiness.clone();
        let health_metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(port, health_readiness, health_metrics).await {
                warn!(error = %e, "Health server failed");
            }
        });
        info!(port, "Health server task spawned");
    }

    // Identity is resolved once; without it nothing can be published
    let identity = match resolve_identity(
        config.instance_id.clone(),
        config.region.clone(),
        config.request_timeout(),
    )
    .await
    {
        Ok(identity) => identity,
        Err(e) => {
            error!(error = %e, "Failed to resolve instance identity");
            return Err(e.into());
        }
    };

    let consul_url = config.consul_url()?;
    let source = ConsulAgent::new(
        consul_url,
        config.consul_token.clone(),
        config.request_timeout(),
    )?;
    info!(address = %source.base_url(), "Consul agent client configured");

    let publisher = AutoScalingPublisher::new(&identity.region, config.request_timeout()).await;

    let (shutdown_handle, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown_handle.trigger();
    });

    let mut reconciler = Reconciler::new(
        Box::new(source),
        Box::new(publisher),
        identity,
        config.tag_filter(),
        config.on_query_error,
    )
    .with_metrics(metrics);

    readiness.set_ready();
    reconciler.run(config.poll_interval(), shutdown).await;

    info!("asg-consul-health stopped");
    Ok(())
}
