//! AlertRelay - Alertmanager webhook forwarder
//!
//! Receives grouped alert notifications from Prometheus Alertmanager and
//! forwards them, rendered through per-receiver templates, to configured
//! HTTP destinations with retry on transient failure.

use alertrelay::cli::Cli;
use alertrelay::config::Config;
use alertrelay::registry::Registry;
use alertrelay::server;
use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Logging is not up yet; bring up a plain subscriber for this one report.
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {}", err);
        // Exit if configuration fails, as it's a critical step.
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("AlertRelay starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen);
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    info!("Receivers: {}", config.receivers.len());
    for receiver in &config.receivers {
        info!("  {} (handler: {})", receiver.name, receiver.handler);
    }
    info!("-------------------------------------------------------");

    let prometheus = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install Prometheus recorder")?;
        metrics::describe_counter!(
            "http_requests_total",
            metrics::Unit::Count,
            "Total number of HTTP requests made, labeled by method, destination host and status code."
        );
        Some(handle)
    } else {
        None
    };

    // Fail fast: an alerting relay that starts with broken routing is worse
    // than one that refuses to start.
    let registry = Arc::new(
        Registry::build(&config.receivers).context("failed to build receiver registry")?,
    );

    let app = server::router(registry, prometheus);
    let listener = TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutdown complete.");
    Ok(())
}
