//! Reconciliation of labeled ConfigMaps against Grafana.
//!
//! Every file of a ConfigMap is one unit of work. Files are handled in order,
//! one at a time, and a failing file never stops the ones after it:
//! - `datasource`: datasource provisioning documents
//! - `dashboard`: dashboards, placed by `folder`

pub mod dashboard;
pub mod datasource;
pub mod folder;

#[cfg(test)]
mod datasource_test;

use crate::config::LabelConfig;
use crate::document::{self, DATASOURCE_API_VERSION, GrafanaConfigObject};
use crate::error::{ReconcileError, ResourceKind};
use crate::telemetry::{Reporter, Severity, Tags};
use grafana_client::GrafanaClientTrait;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to the ConfigMap being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `config_map` carries `label`, with any value
pub fn has_label(config_map: &ConfigMap, label: &str) -> bool {
    config_map
        .metadata
        .labels
        .as_ref()
        .is_some_and(|labels| labels.contains_key(label))
}

/// Mirrors ConfigMap content into Grafana.
pub struct Reconciler {
    pub(crate) grafana_client: Box<dyn GrafanaClientTrait + Send + Sync>,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) labels: LabelConfig,
}

impl Reconciler {
    pub fn new(
        grafana_client: Box<dyn GrafanaClientTrait + Send + Sync>,
        reporter: Arc<dyn Reporter>,
        labels: LabelConfig,
    ) -> Self {
        Self {
            grafana_client,
            reporter,
            labels,
        }
    }

    /// Reconcile every file of `config_map`.
    ///
    /// Failures are reported, never returned.
    pub async fn reconcile(&self, config_map: &ConfigMap, change: ChangeKind) {
        let namespace = config_map.metadata.namespace.as_deref().unwrap_or("default");
        let name = config_map.metadata.name.as_deref().unwrap_or("<unknown>");
        info!("Reconciling ConfigMap {}/{} ({})", namespace, name, change);

        let empty = BTreeMap::new();
        let files = config_map.data.as_ref().unwrap_or(&empty);
        if files.is_empty() {
            debug!("ConfigMap {}/{} has no data", namespace, name);
        }

        for (file, content) in files {
            let tags = Tags::new("ProcessConfigMap")
                .with_config_map(namespace, name)
                .with_file(file)
                .with_endpoint(self.grafana_client.endpoint());

            if let Err(e) = self
                .reconcile_file(config_map, file, content, change, &tags)
                .await
            {
                self.report(&e, &tags);
            }
        }
    }

    async fn reconcile_file(
        &self,
        config_map: &ConfigMap,
        file: &str,
        content: &str,
        change: ChangeKind,
        tags: &Tags,
    ) -> Result<(), ReconcileError> {
        let object = document::classify(content)?;

        match object {
            GrafanaConfigObject::Datasources(config) => {
                self.check_label(
                    config_map,
                    ResourceKind::Datasource,
                    self.labels.datasource.as_deref(),
                )?;
                if config.api_version != DATASOURCE_API_VERSION {
                    return Err(ReconcileError::UnsupportedVersion(config.api_version));
                }
                self.reconcile_datasources(&config, change == ChangeKind::Deleted, tags)
                    .await;
                Ok(())
            }
            GrafanaConfigObject::Dashboard(board) => {
                self.check_label(
                    config_map,
                    ResourceKind::Dashboard,
                    self.labels.dashboard.as_deref(),
                )?;
                let tags = tags.clone().with_resource(&board.title);
                let result = match change {
                    ChangeKind::Deleted => self.delete_dashboard(&board, &tags).await,
                    ChangeKind::Updated => self.upsert_dashboard(file, &board, &tags).await,
                };
                if let Err(e) = result {
                    self.report(&e, &tags);
                }
                Ok(())
            }
        }
    }

    fn check_label(
        &self,
        config_map: &ConfigMap,
        kind: ResourceKind,
        label: Option<&str>,
    ) -> Result<(), ReconcileError> {
        match label {
            Some(label) if has_label(config_map, label) => Ok(()),
            _ => Err(ReconcileError::LabelMismatch {
                kind,
                label: label.map(str::to_string),
            }),
        }
    }

    /// Forward a per-file failure to the reporter
    ///
    /// A dashboard that cannot be deleted for lack of a uid is only a warning.
    pub(crate) fn report(&self, error: &ReconcileError, tags: &Tags) {
        let tags = tags.for_operation(error.operation());
        match error {
            ReconcileError::MissingIdentity { .. } => {
                self.reporter
                    .capture_message(Severity::Warning, &error.to_string(), &tags);
            }
            _ => self.reporter.capture_error(error, &tags),
        }
    }

    pub(crate) fn report_info(&self, message: &str, tags: &Tags) {
        self.reporter.capture_message(Severity::Info, message, tags);
    }
}
