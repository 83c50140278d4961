//! Classification of ConfigMap file content.
//!
//! A file either holds a datasource provisioning document (YAML with an
//! `apiVersion:` key) or a dashboard (JSON, or the same structure in YAML).

use crate::error::ReconcileError;
use grafana_client::{Board, Datasource, DatasourceRef};
use serde::{Deserialize, Serialize};

/// Marker that routes content to the datasource decoder
const DATASOURCE_MARKER: &str = "apiVersion:";

/// Only supported datasource document version
pub const DATASOURCE_API_VERSION: i64 = 1;

/// Datasource provisioning document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConfig {
    #[serde(default)]
    pub api_version: i64,
    #[serde(default)]
    pub delete_datasources: Vec<DatasourceRef>,
    #[serde(default)]
    pub datasources: Vec<Datasource>,
}

/// Decoded content of one ConfigMap file
#[derive(Debug, Clone, PartialEq)]
pub enum GrafanaConfigObject {
    Datasources(DatasourceConfig),
    Dashboard(Board),
}

/// Decode `content` into a datasource document or a dashboard
pub fn classify(content: &str) -> Result<GrafanaConfigObject, ReconcileError> {
    if content.contains(DATASOURCE_MARKER) {
        return serde_yaml::from_str::<DatasourceConfig>(content)
            .map(GrafanaConfigObject::Datasources)
            .map_err(|e| ReconcileError::Parse(format!("invalid datasource document: {e}")));
    }

    let board = parse_board(content)?;
    if board.is_empty() {
        return Err(ReconcileError::Parse(
            "content is neither a dashboard nor a datasource document".to_string(),
        ));
    }
    Ok(GrafanaConfigObject::Dashboard(board))
}

fn parse_board(content: &str) -> Result<Board, ReconcileError> {
    match serde_json::from_str::<Board>(content) {
        Ok(board) => Ok(board),
        Err(json_err) => serde_yaml::from_str::<Board>(content).map_err(|yaml_err| {
            ReconcileError::Parse(format!(
                "invalid dashboard (json: {json_err}; yaml: {yaml_err})"
            ))
        }),
    }
}
