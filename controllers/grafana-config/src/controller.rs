//! Main controller implementation.
//!
//! This module contains the `Controller` struct that builds the clients,
//! starts the ConfigMap watcher and the metrics server, and waits for a
//! shutdown signal.

use crate::autoconfig::autoconfigure;
use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics};
use crate::reconciler::Reconciler;
use crate::telemetry::{LogReporter, Reporter, Severity, Tags};
use crate::watcher::Watcher;
use grafana_client::{GrafanaAuth, GrafanaClient, GrafanaClientTrait};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Main controller for Grafana ConfigMap reconciliation.
pub struct Controller {
    config: OperatorConfig,
    reporter: Arc<dyn Reporter>,
    config_map_watcher: JoinHandle<Result<(), ControllerError>>,
    metrics_server: Option<JoinHandle<Result<(), ControllerError>>>,
}

async fn kube_client(config: &OperatorConfig) -> Result<Client, ControllerError> {
    match &config.kubeconfig {
        Some(path) => {
            info!("Using kubeconfig {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)?;
            let client_config =
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
            Ok(Client::try_from(client_config)?)
        }
        None => Ok(Client::try_default().await?),
    }
}

/// Tags describing the running configuration
fn config_tags(operation: &str, config: &OperatorConfig) -> Tags {
    let mut tags = Tags::new(operation);
    tags.namespace = config.namespace.clone();
    tags.endpoint = config.grafana.endpoint.clone();
    tags
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing Grafana config operator");

        let kube_client = kube_client(&config).await?;

        let metrics = match config.metrics_address {
            Some(_) => Some(Arc::new(
                Metrics::new().map_err(|e| ControllerError::Metrics(e.to_string()))?,
            )),
            None => None,
        };
        let reporter: Arc<dyn Reporter> = Arc::new(LogReporter::new(metrics.clone()));

        let config = if config.autoconfigure {
            match autoconfigure(kube_client.clone()).await {
                Ok(grafana) => config.with_grafana(grafana),
                Err(e) => {
                    error!("Failed to autoconfigure Grafana parameters: {}", e);
                    reporter.capture_error(&e, &Tags::new("Autoconfigure"));
                    config
                }
            }
        } else {
            config
        };

        config.validate()?;
        let (Some(endpoint), Some(auth)) = (&config.grafana.endpoint, &config.grafana.auth) else {
            return Err(ControllerError::InvalidConfig(
                "Grafana endpoint and auth are required".to_string(),
            ));
        };

        let grafana_client = GrafanaClient::new(endpoint.as_str(), GrafanaAuth::parse(auth))?;

        // Grafana may still be starting next to us; reconciliation reports its own failures
        info!("Checking Grafana connectivity at {}...", endpoint);
        match grafana_client.health().await {
            Ok(health) => info!(
                "Grafana is reachable (version {}, database {})",
                health.version.as_deref().unwrap_or("unknown"),
                health.database.as_deref().unwrap_or("unknown")
            ),
            Err(e) => warn!("Grafana health check failed (will continue): {}", e),
        }

        let reconciler = Arc::new(Reconciler::new(
            Box::new(grafana_client),
            reporter.clone(),
            config.labels.clone(),
        ));

        let config_map_api: Api<ConfigMap> = match &config.namespace {
            Some(namespace) => Api::namespaced(kube_client, namespace),
            None => Api::all(kube_client),
        };
        info!(
            "Watching namespace: {}",
            config.namespace.as_deref().unwrap_or("<any>")
        );

        let watcher = Watcher::new(
            reconciler,
            config_map_api,
            config.labels.clone(),
            metrics.clone(),
        );
        let config_map_watcher = tokio::spawn(async move { watcher.watch_config_maps().await });

        let metrics_server = match (config.metrics_address, metrics) {
            (Some(address), Some(metrics)) => {
                Some(tokio::spawn(async move { metrics::serve(address, metrics).await }))
            }
            _ => None,
        };

        reporter.capture_message(
            Severity::Info,
            "Started Grafana config operator",
            &config_tags("Start", &config),
        );

        Ok(Self {
            config,
            reporter,
            config_map_watcher,
            metrics_server,
        })
    }

    /// Runs until a shutdown signal arrives or a background task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Grafana config operator running");

        let metrics_handle = self.metrics_server.as_mut();
        let metrics_server = async move {
            match metrics_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            result = &mut self.config_map_watcher => {
                result
                    .map_err(|e| {
                        ControllerError::Watch(format!("ConfigMap watcher panicked: {}", e))
                    })
                    .and_then(|inner| inner)
            }
            result = metrics_server => {
                result
                    .map_err(|e| {
                        ControllerError::Metrics(format!("Metrics server panicked: {}", e))
                    })
                    .and_then(|inner| inner)
            }
            signal = shutdown_signal() => {
                signal.map(|name| {
                    info!("Received {}, shutting down Grafana config operator...", name);
                })
            }
        };

        self.config_map_watcher.abort();
        if let Some(handle) = &self.metrics_server {
            handle.abort();
        }
        if let Err(e) = &result {
            error!("Grafana config operator stopped: {}", e);
        }
        self.reporter.capture_message(
            Severity::Info,
            "Stopped Grafana config operator",
            &config_tags("Stop", &self.config),
        );
        result
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str, ControllerError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map(|()| "SIGINT").map_err(ControllerError::from)
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str, ControllerError> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
