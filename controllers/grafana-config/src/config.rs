//! Command line and environment configuration.
//!
//! Flags are parsed once with clap and frozen into an [`OperatorConfig`]. The
//! reconciler only ever sees the [`LabelConfig`] part of it.

use crate::error::ControllerError;
use clap::{ArgAction, Parser, ValueEnum};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Mirror Grafana datasources and dashboards from labeled ConfigMaps
#[derive(Debug, Clone, Parser)]
#[command(name = "grafana-config-operator", version, about)]
pub struct Args {
    /// Path to a kube config. Only required if out-of-cluster.
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace to watch for labeled ConfigMaps in (all namespaces if unset)
    #[arg(short = 'n', long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// API endpoint of Grafana
    #[arg(short = 'e', long = "grafana.endpoint", env = "GRAFANA_ENDPOINT")]
    pub grafana_endpoint: Option<String>,

    /// Grafana authentication, either basic <user:password> or <token>
    #[arg(short = 't', long = "grafana.auth", env = "GRAFANA_AUTH", hide_env_values = true)]
    pub grafana_auth: Option<String>,

    /// Watch for datasources
    #[arg(
        short = 'x',
        long = "datasources.watch",
        env = "DATASOURCE_WATCH",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub datasource_watch: bool,

    /// ConfigMap label marking datasource configuration
    #[arg(
        short = 'd',
        long = "datasources.label",
        env = "DATASOURCE_LABEL",
        default_value = "grafana_datasource"
    )]
    pub datasource_label: String,

    /// Watch for dashboards
    #[arg(
        short = 'w',
        long = "dashboards.watch",
        env = "DASHBOARD_WATCH",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub dashboard_watch: bool,

    /// ConfigMap label marking dashboards
    #[arg(
        short = 'l',
        long = "dashboards.label",
        env = "DASHBOARD_LABEL",
        default_value = "grafana_dashboard"
    )]
    pub dashboard_label: String,

    /// Serve Prometheus metrics
    #[arg(
        short = 'p',
        long,
        env = "PROMETHEUS_ENABLED",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub prometheus: bool,

    /// Listen address of the metrics endpoint
    #[arg(long = "metrics.address", env = "METRICS_ADDRESS", default_value = "0.0.0.0:9350")]
    pub metrics_address: SocketAddr,

    /// Discover Grafana credentials from the pod this operator runs in
    #[arg(short = 'a', long, env = "AUTOCONFIGURE")]
    pub autoconfigure: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Labels gating which ConfigMaps and which branch a file may use
///
/// `None` means the kind is not watched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelConfig {
    pub dashboard: Option<String>,
    pub datasource: Option<String>,
}

impl LabelConfig {
    /// Neither kind is watched
    pub fn is_empty(&self) -> bool {
        self.dashboard.is_none() && self.datasource.is_none()
    }

    /// Configured labels, dashboards first
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.dashboard
            .as_deref()
            .into_iter()
            .chain(self.datasource.as_deref())
    }
}

/// Where and how to reach Grafana
#[derive(Clone, Default, PartialEq, Eq)]
pub struct GrafanaSettings {
    pub endpoint: Option<String>,
    pub auth: Option<String>,
}

impl fmt::Debug for GrafanaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrafanaSettings")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Frozen operator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub kubeconfig: Option<PathBuf>,
    /// `None` watches all namespaces
    pub namespace: Option<String>,
    pub grafana: GrafanaSettings,
    pub labels: LabelConfig,
    /// `None` when Prometheus metrics are disabled
    pub metrics_address: Option<SocketAddr>,
    pub autoconfigure: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Args {
    pub fn into_config(self) -> OperatorConfig {
        let dashboard = non_empty(Some(self.dashboard_label)).filter(|_| self.dashboard_watch);
        let datasource = non_empty(Some(self.datasource_label)).filter(|_| self.datasource_watch);

        OperatorConfig {
            kubeconfig: self.kubeconfig,
            namespace: non_empty(self.namespace),
            grafana: GrafanaSettings {
                endpoint: non_empty(self.grafana_endpoint),
                auth: non_empty(self.grafana_auth),
            },
            labels: LabelConfig {
                dashboard,
                datasource,
            },
            metrics_address: self.prometheus.then_some(self.metrics_address),
            autoconfigure: self.autoconfigure,
        }
    }
}

impl OperatorConfig {
    /// Grafana endpoint and auth are both known
    pub fn is_api_configured(&self) -> bool {
        self.grafana.endpoint.is_some() && self.grafana.auth.is_some()
    }

    /// Copy of this configuration talking to a different Grafana
    #[must_use]
    pub fn with_grafana(&self, grafana: GrafanaSettings) -> Self {
        Self {
            grafana,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.labels.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "neither dashboards nor datasources are watched".to_string(),
            ));
        }
        if !self.is_api_configured() {
            return Err(ControllerError::InvalidConfig(
                "Grafana endpoint and auth are required (--grafana.endpoint, --grafana.auth or --autoconfigure)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
