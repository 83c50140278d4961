//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test ConfigMaps, a reporter
//! that records everything, and a reconciler wired to a mock Grafana.

use crate::config::LabelConfig;
use crate::reconciler::Reconciler;
use crate::telemetry::{Reporter, Severity, Tags, error_chain};
use grafana_client::MockGrafanaClient;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const DASHBOARD_LABEL: &str = "grafana_dashboard";
pub const DATASOURCE_LABEL: &str = "grafana_datasource";

/// Both labels configured, as with default flags
pub fn default_labels() -> LabelConfig {
    LabelConfig {
        dashboard: Some(DASHBOARD_LABEL.to_string()),
        datasource: Some(DATASOURCE_LABEL.to_string()),
    }
}

/// Helper to create a test ConfigMap carrying `labels` (value "1") and `files`
pub fn create_test_config_map(
    name: &str,
    namespace: &str,
    labels: &[&str],
    files: &[(&str, &str)],
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|label| ((*label).to_string(), "1".to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        data: Some(
            files
                .iter()
                .map(|(file, content)| ((*file).to_string(), (*content).to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

/// Dashboard JSON with a title and optional uid
pub fn dashboard_json(title: &str, uid: Option<&str>) -> String {
    let mut board = serde_json::json!({
        "title": title,
        "panels": [{"type": "graph", "title": "cpu"}],
        "schemaVersion": 27,
    });
    if let Some(uid) = uid {
        board["uid"] = serde_json::Value::from(uid);
    }
    board.to_string()
}

/// Datasource document declaring `ensure` and deleting `delete`
pub fn datasource_yaml(api_version: i64, ensure: &[&str], delete: &[&str]) -> String {
    let mut yaml = format!("apiVersion: {api_version}\n");
    if !delete.is_empty() {
        yaml.push_str("deleteDatasources:\n");
        for name in delete {
            yaml.push_str(&format!("  - name: {name}\n    orgId: 1\n"));
        }
    }
    yaml.push_str("datasources:\n");
    if ensure.is_empty() {
        yaml.push_str("  []\n");
    }
    for name in ensure {
        yaml.push_str(&format!(
            "  - name: {name}\n    type: prometheus\n    access: proxy\n    url: http://{name}:9090\n"
        ));
    }
    yaml
}

/// A captured report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
    pub tags: Tags,
}

/// Reporter that keeps every report for later assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Report> {
        self.reports()
            .into_iter()
            .filter(|report| report.severity == severity)
            .collect()
    }

    pub fn errors(&self) -> Vec<Report> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<Report> {
        self.with_severity(Severity::Warning)
    }

    fn push(&self, severity: Severity, message: String, tags: &Tags) {
        self.reports.lock().unwrap().push(Report {
            severity,
            message,
            tags: tags.clone(),
        });
    }
}

impl Reporter for RecordingReporter {
    fn capture_error(&self, error: &(dyn std::error::Error + 'static), tags: &Tags) {
        self.push(Severity::Error, error_chain(error), tags);
    }

    fn capture_message(&self, severity: Severity, message: &str, tags: &Tags) {
        self.push(severity, message.to_string(), tags);
    }
}

/// Reconciler backed by a clone of `client`, plus the reporter it writes to
pub fn create_test_reconciler(
    client: &MockGrafanaClient,
    labels: LabelConfig,
) -> (Reconciler, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let reconciler = Reconciler::new(Box::new(client.clone()), reporter.clone(), labels);
    (reconciler, reporter)
}
