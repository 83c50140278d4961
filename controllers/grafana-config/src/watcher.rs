//! Kubernetes ConfigMap watcher.
//!
//! This module watches ConfigMaps carrying a configured label and hands each
//! change to the reconciler, one event at a time.

use crate::config::LabelConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{ChangeKind, Reconciler, has_label};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube_runtime::{WatchStreamExt, watcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server-side label selector for the configured labels
///
/// A selector can only express one existence requirement without OR, so
/// with both labels configured every ConfigMap is listed and `is_watched`
/// filters.
pub fn label_selector(labels: &LabelConfig) -> Option<&str> {
    match (labels.dashboard.as_deref(), labels.datasource.as_deref()) {
        (Some(label), None) | (None, Some(label)) => Some(label),
        _ => None,
    }
}

/// Whether `config_map` carries at least one configured label
pub fn is_watched(config_map: &ConfigMap, labels: &LabelConfig) -> bool {
    labels.labels().any(|label| has_label(config_map, label))
}

/// Watches ConfigMaps for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    config_map_api: Api<ConfigMap>,
    labels: LabelConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        config_map_api: Api<ConfigMap>,
        labels: LabelConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            reconciler,
            config_map_api,
            labels,
            metrics,
        }
    }

    /// Starts watching ConfigMaps. Only returns if the stream ends.
    pub async fn watch_config_maps(&self) -> Result<(), ControllerError> {
        let mut config = watcher::Config::default();
        if let Some(selector) = label_selector(&self.labels) {
            config = config.labels(selector);
        }
        info!(
            "Starting ConfigMap watcher for {}",
            self.labels.labels().collect::<Vec<_>>().join(" and ")
        );

        let mut stream = watcher(self.config_map_api.clone(), config)
            .default_backoff()
            .boxed();

        while let Some(result) = stream.next().await {
            match result {
                Ok(watcher::Event::Apply(config_map) | watcher::Event::InitApply(config_map)) => {
                    self.dispatch(&config_map, ChangeKind::Updated).await;
                }
                Ok(watcher::Event::Delete(config_map)) => {
                    self.dispatch(&config_map, ChangeKind::Deleted).await;
                }
                Ok(watcher::Event::Init) => {
                    debug!("ConfigMap watcher initialized");
                }
                Ok(watcher::Event::InitDone) => {
                    info!("ConfigMap watcher initialization complete");
                }
                Err(e) => {
                    warn!("ConfigMap watcher stream error (retrying): {}", e);
                }
            }
        }

        Err(ControllerError::Watch("ConfigMap watch stream ended".to_string()))
    }

    async fn dispatch(&self, config_map: &ConfigMap, change: ChangeKind) {
        let namespace = config_map.metadata.namespace.as_deref().unwrap_or("default");
        let name = config_map.metadata.name.as_deref().unwrap_or("<unknown>");

        if !is_watched(config_map, &self.labels) {
            debug!("Skipping non grafana labeled ConfigMap: {}/{}", namespace, name);
            return;
        }

        debug!("Received {} for ConfigMap: {}/{}", change, namespace, name);
        if let Some(metrics) = &self.metrics {
            metrics.record_event(change);
        }
        self.reconciler.reconcile(config_map, change).await;
    }
}
