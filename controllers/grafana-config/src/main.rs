//! Grafana Config Operator
//!
//! Watches labeled ConfigMaps and mirrors what they declare into Grafana:
//! - Datasource documents (`apiVersion: 1`): created, updated or deleted by name
//! - Dashboard JSON: stored with overwrite, in a folder derived from the file name
//!
//! Deleting a ConfigMap removes the datasources and dashboards it declared.

mod autoconfig;
mod config;
mod controller;
mod document;
mod error;
mod metrics;
mod reconciler;
mod telemetry;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::{Args, LogFormat};
use crate::error::ControllerError;
use clap::Parser;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match args.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting Grafana Config Operator");

    let config = args.into_config();
    info!("Configuration:");
    info!("  Grafana endpoint: {}", config.grafana.endpoint.as_deref().unwrap_or("<unset>"));
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Dashboard label: {}", config.labels.dashboard.as_deref().unwrap_or("<not watched>"));
    info!("  Datasource label: {}", config.labels.datasource.as_deref().unwrap_or("<not watched>"));
    match config.metrics_address {
        Some(address) => info!("  Metrics address: {}", address),
        None => info!("  Metrics: disabled"),
    }
    info!("  Autoconfigure: {}", config.autoconfigure);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
