use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};

use fleet::{
    cli::config_path_from_args,
    collaborators::{
        ConfigDiscovery, StaticIdentityProvider, TemplateThoughtGenerator, TracingContentSink,
    },
    config::FleetConfig,
    logging::init_tracing,
    observability::metrics::start_prometheus_exporter,
    orchestrator::Orchestrator,
};

const SOCIAL_TOKEN_ENV: &str = "FLEET_SOCIAL_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = FleetConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let logging_guard = init_tracing(&config.logging)?;

    if config.metrics.enabled {
        let metrics = start_prometheus_exporter(config.metrics.listen_addr)
            .context("failed to start prometheus exporter")?;
        tracing::info!(
            target: "observability",
            listen_addr = %metrics.listen_addr,
            "metrics_exporter_started"
        );
    }

    let mut identity = StaticIdentityProvider::new();
    if let Ok(token) = std::env::var(SOCIAL_TOKEN_ENV) {
        identity = identity.with_credentials("social", token);
    }

    let orchestrator = Orchestrator::from_config(
        &config,
        Arc::new(TemplateThoughtGenerator::new()),
        Arc::new(TracingContentSink),
        Arc::new(identity),
    )?;

    let discovery = ConfigDiscovery::new(config.discovery.agents.clone());
    orchestrator
        .bootstrap(&discovery)
        .await
        .context("failed to bootstrap agents from discovery")?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(
        target: "orchestrator",
        signal = signal_name,
        run_id = %logging_guard.run_id(),
        live_agents = orchestrator.live_agent_ids().len(),
        "shutdown_requested"
    );
    orchestrator.shutdown().await;

    eprintln!("fleet stopped: received {signal_name}");
    Ok(())
}
