//! Controller-specific error types.
//!
//! `ControllerError` covers process-level failures (start-up, background
//! tasks). `ReconcileError` is the per-file taxonomy of the reconciler: each
//! one is reported and then dropped, it never leaves the reconciler.

use grafana_client::GrafanaError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can end the Grafana config operator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubeconfig could not be loaded
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Grafana client could not be built
    #[error("Grafana error: {0}")]
    Grafana(#[from] GrafanaError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Grafana credentials could not be discovered from the pod
    #[error("Autoconfiguration failed: {0}")]
    Autoconfigure(String),

    /// Metrics endpoint failed
    #[error("Metrics server failed: {0}")]
    Metrics(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// I/O error (signal handlers)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which reconciliation branch a file was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Datasource,
    Dashboard,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Datasource => f.write_str("Datasource"),
            Self::Dashboard => f.write_str("Dashboard"),
        }
    }
}

/// Failure of one (ConfigMap, file) unit of work.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Content is neither a datasource config nor a dashboard
    #[error("Failed to parse grafana configuration object: {0}")]
    Parse(String),

    /// Resource found but its label is not configured or not present
    #[error("{kind} found, but {}", label_problem(.label.as_deref()))]
    LabelMismatch {
        kind: ResourceKind,
        label: Option<String>,
    },

    /// Datasource config with an apiVersion other than 1
    #[error("Unsupported API Version {0}")]
    UnsupportedVersion(i64),

    /// A Grafana call failed
    #[error("{operation} failed: {source}")]
    UpstreamApi {
        operation: &'static str,
        #[source]
        source: GrafanaError,
    },

    /// The target folder could not be listed or created
    #[error("Failed to resolve folder '{title}': {source}")]
    FolderResolution {
        title: String,
        #[source]
        source: GrafanaError,
    },

    /// Dashboard delete requested for a board without uid
    #[error("Cannot delete dashboard '{title}' without UID")]
    MissingIdentity { title: String },
}

fn label_problem(label: Option<&str>) -> String {
    match label {
        None => "its label is not configured".to_string(),
        Some(label) => format!("not with configured label ({label})"),
    }
}

impl ReconcileError {
    pub(crate) fn upstream(operation: &'static str, source: GrafanaError) -> Self {
        Self::UpstreamApi { operation, source }
    }

    /// Operation name used when reporting this error
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Parse(_) => "ClassifyContent",
            Self::LabelMismatch { .. } => "CheckLabel",
            Self::UnsupportedVersion(_) => "CheckApiVersion",
            Self::UpstreamApi { operation, .. } => operation,
            Self::FolderResolution { .. } => "ResolveFolder",
            Self::MissingIdentity { .. } => "DeleteDashboard",
        }
    }
}
