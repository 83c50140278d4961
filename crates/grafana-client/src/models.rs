//! Grafana API models
//!
//! These models follow the JSON shapes of the Grafana HTTP API
//! (`/api/folders`, `/api/datasources`, `/api/dashboards`). Datasource fields
//! also match the provisioning file schema, so the same types decode
//! `datasources:` entries from YAML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Folder id Grafana uses for the built-in "General" folder
pub const GENERAL_FOLDER_ID: u64 = 0;

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Folder model matching the `/api/folders` responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_acl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_save: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Folder {
    /// A folder carrying only a title, as sent to `POST /api/folders`
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            title: title.into(),
            url: None,
            has_acl: None,
            can_save: None,
            can_edit: None,
            can_admin: None,
            created_by: None,
            updated_by: None,
            created: None,
            updated: None,
            version: None,
        }
    }
}

/// Request body for creating a folder
#[derive(Debug, Clone, Serialize)]
pub struct CreateFolderRequest<'a> {
    pub title: &'a str,
}

/// Datasource model matching Grafana's datasource API and provisioning schema
///
/// `id` is only meaningful once resolved against a live Grafana instance;
/// provisioning files never carry it. Fields this model does not name
/// (e.g. `password`, `basicAuthPassword`) are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<u64>,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_credentials: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_json_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Reference to a datasource in a `deleteDatasources` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<u64>,
}

/// Response of `POST /api/datasources` and `PUT /api/datasources/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub datasource: Option<Datasource>,
}

/// Grafana dashboard ("board")
///
/// Only `title` and `uid` are inspected; everything else (panels, templating,
/// schemaVersion, ...) is carried through untouched in `rest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl Board {
    /// The dashboard UID, if set to a non-empty value
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref().filter(|uid| !uid.is_empty())
    }

    /// A board with no title, no uid and no other content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.uid().is_none() && self.rest.is_empty()
    }
}

/// Dashboard metadata returned next to the board by `GET /api/dashboards/uid/{uid}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub folder_id: Option<u64>,
    #[serde(default)]
    pub folder_uid: Option<String>,
    #[serde(default)]
    pub folder_title: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub can_save: Option<bool>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Dashboard plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardWithMeta {
    pub dashboard: Board,
    #[serde(default)]
    pub meta: DashboardMeta,
}

/// Request body for `POST /api/dashboards/db`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDashboardRequest<'a> {
    pub dashboard: &'a Board,
    pub overwrite: bool,
    pub folder_id: u64,
}

/// Response of `POST /api/dashboards/db`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetDashboardResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Generic `{ "message": ... }` status body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /api/health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}
