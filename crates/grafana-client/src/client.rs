//! Grafana API client
//!
//! Implements the Grafana HTTP API client for folder, datasource and
//! dashboard provisioning.
//! Based on the Grafana API structure: /api/folders, /api/datasources and /api/dashboards

use crate::error::GrafanaError;
use crate::grafana_trait::GrafanaClientTrait;
use crate::models::*;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Credentials presented to Grafana
#[derive(Clone, PartialEq, Eq)]
pub enum GrafanaAuth {
    /// HTTP basic authentication
    Basic {
        /// Grafana user
        user: String,
        /// Grafana password
        password: String,
    },
    /// API key or service account token, sent as a bearer token
    Token(String),
}

impl GrafanaAuth {
    /// Interpret an auth string: `user:password` is basic auth, anything else a token
    pub fn parse(auth: &str) -> Self {
        match auth.split_once(':') {
            Some((user, password)) => Self::Basic {
                user: user.to_string(),
                password: password.to_string(),
            },
            None => Self::Token(auth.to_string()),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
            Self::Token(token) => request.bearer_auth(token),
        }
    }
}

impl fmt::Debug for GrafanaAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Grafana API client
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    client: Client,
    endpoint: String,
    auth: GrafanaAuth,
}

impl GrafanaClient {
    /// Create a new Grafana client
    ///
    /// # Arguments
    /// * `endpoint` - Grafana base URL (e.g., "http://grafana:3000")
    /// * `auth` - Credentials used for every request
    pub fn new(endpoint: impl Into<String>, auth: GrafanaAuth) -> Result<Self, GrafanaError> {
        let endpoint = endpoint.into();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(GrafanaError::InvalidRequest(format!(
                "Grafana endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GrafanaError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.endpoint, path);
        self.auth
            .apply(self.client.request(method, url))
            .header("Accept", "application/json")
    }

    /// Send a request and decode a successful JSON response
    ///
    /// `what` names the resource for error messages ("datasource prometheus").
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, GrafanaError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, what, &body));
        }

        serde_json::from_str(&body).map_err(|e| GrafanaError::Api {
            status: status.as_u16(),
            message: format!(
                "error decoding {} response: {} - Response (first 500 chars): {}",
                what,
                e,
                body.chars().take(500).collect::<String>()
            ),
        })
    }
}

/// Map a non-success status to a typed error
///
/// Grafana error bodies look like `{"message": "Data source not found"}`;
/// the message is surfaced when present, the raw body otherwise.
fn error_for_status(status: StatusCode, what: &str, body: &str) -> GrafanaError {
    let message = serde_json::from_str::<StatusMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => GrafanaError::NotFound(format!("{what}: {message}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GrafanaError::Authentication(format!("{what}: {status} - {message}"))
        }
        _ => GrafanaError::Api {
            status: status.as_u16(),
            message: format!("{what}: {message}"),
        },
    }
}

#[async_trait::async_trait]
impl GrafanaClientTrait for GrafanaClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<Health, GrafanaError> {
        debug!("Checking Grafana health at {}", self.endpoint);
        self.send(self.request(Method::GET, "/api/health"), "health")
            .await
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, GrafanaError> {
        debug!("Listing Grafana folders");
        self.send(self.request(Method::GET, "/api/folders"), "folders")
            .await
    }

    async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError> {
        debug!("Creating Grafana folder {}", title);
        let request = self
            .request(Method::POST, "/api/folders")
            .json(&CreateFolderRequest { title });
        self.send(request, &format!("folder {title}")).await
    }

    async fn get_datasource_by_name(&self, name: &str) -> Result<Datasource, GrafanaError> {
        debug!("Fetching datasource {} from Grafana", name);
        let path = format!("/api/datasources/name/{}", urlencoding::encode(name));
        self.send(self.request(Method::GET, &path), &format!("datasource {name}"))
            .await
    }

    async fn create_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError> {
        debug!("Creating datasource {} in Grafana", datasource.name);
        let request = self.request(Method::POST, "/api/datasources").json(datasource);
        let response: DatasourceResponse = self
            .send(request, &format!("datasource {}", datasource.name))
            .await?;
        Ok(resolve_datasource(datasource, response))
    }

    async fn update_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError> {
        if datasource.id == 0 {
            return Err(GrafanaError::InvalidRequest(format!(
                "datasource {} has no resolved id",
                datasource.name
            )));
        }
        debug!("Updating datasource {} (ID: {}) in Grafana", datasource.name, datasource.id);
        let path = format!("/api/datasources/{}", datasource.id);
        let request = self.request(Method::PUT, &path).json(datasource);
        let response: DatasourceResponse = self
            .send(request, &format!("datasource {}", datasource.name))
            .await?;
        Ok(resolve_datasource(datasource, response))
    }

    async fn delete_datasource(&self, id: u64) -> Result<StatusMessage, GrafanaError> {
        debug!("Deleting datasource {} from Grafana", id);
        let path = format!("/api/datasources/{id}");
        self.send(self.request(Method::DELETE, &path), &format!("datasource {id}"))
            .await
    }

    async fn get_dashboard(&self, uid: &str) -> Result<DashboardWithMeta, GrafanaError> {
        debug!("Fetching dashboard {} from Grafana", uid);
        let path = format!("/api/dashboards/uid/{}", urlencoding::encode(uid));
        self.send(self.request(Method::GET, &path), &format!("dashboard {uid}"))
            .await
    }

    async fn set_dashboard(
        &self,
        board: &Board,
        overwrite: bool,
        folder_id: u64,
    ) -> Result<SetDashboardResponse, GrafanaError> {
        debug!(
            "Setting dashboard '{}' (folder {}, overwrite {})",
            board.title, folder_id, overwrite
        );
        // A numeric id from another instance would make Grafana look up the
        // wrong dashboard; identity is resolved by uid or title instead.
        let board = Board {
            id: None,
            ..board.clone()
        };
        let request = self
            .request(Method::POST, "/api/dashboards/db")
            .json(&SetDashboardRequest {
                dashboard: &board,
                overwrite,
                folder_id,
            });
        self.send(request, &format!("dashboard {}", board.title))
            .await
    }

    async fn delete_dashboard(&self, uid: &str) -> Result<StatusMessage, GrafanaError> {
        debug!("Deleting dashboard {} from Grafana", uid);
        let path = format!("/api/dashboards/uid/{}", urlencoding::encode(uid));
        self.send(self.request(Method::DELETE, &path), &format!("dashboard {uid}"))
            .await
    }
}

/// Prefer the datasource echoed by Grafana; older versions only return its id
fn resolve_datasource(sent: &Datasource, response: DatasourceResponse) -> Datasource {
    match response.datasource {
        Some(datasource) => datasource,
        None => Datasource {
            id: response.id.unwrap_or(sent.id),
            ..sent.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_parse_basic() {
        let auth = GrafanaAuth::parse("admin:s3cr:et");
        assert_eq!(
            auth,
            GrafanaAuth::Basic {
                user: "admin".to_string(),
                password: "s3cr:et".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_parse_token() {
        assert_eq!(
            GrafanaAuth::parse("glsa_abcdef"),
            GrafanaAuth::Token("glsa_abcdef".to_string())
        );
    }

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let rendered = format!("{:?}", GrafanaAuth::parse("admin:hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));

        let rendered = format!("{:?}", GrafanaAuth::parse("glsa_token"));
        assert!(!rendered.contains("glsa_token"));
    }

    #[test]
    fn test_new_rejects_non_http_endpoint() {
        let result = GrafanaClient::new("grafana:3000", GrafanaAuth::parse("token"));
        assert!(matches!(result, Err(GrafanaError::InvalidRequest(_))));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = GrafanaClient::new("http://grafana:3000/", GrafanaAuth::parse("token")).unwrap();
        assert_eq!(client.endpoint(), "http://grafana:3000");
    }

    #[test]
    fn test_error_for_status_not_found_is_typed() {
        let err = error_for_status(
            StatusCode::NOT_FOUND,
            "datasource prometheus",
            r#"{"message":"Data source not found"}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: datasource prometheus: Data source not found");
    }

    #[test]
    fn test_error_for_status_maps_auth_and_api_errors() {
        let err = error_for_status(StatusCode::FORBIDDEN, "folders", "");
        assert!(matches!(err, GrafanaError::Authentication(_)));

        let err = error_for_status(StatusCode::PRECONDITION_FAILED, "dashboard Dash", "version-mismatch");
        match err {
            GrafanaError::Api { status, message } => {
                assert_eq!(status, 412);
                assert_eq!(message, "dashboard Dash: version-mismatch");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_datasource_falls_back_to_sent_fields() {
        let sent = Datasource {
            name: "prometheus".to_string(),
            kind: "prometheus".to_string(),
            ..Default::default()
        };
        let response = DatasourceResponse {
            id: Some(12),
            name: Some("prometheus".to_string()),
            message: Some("Datasource added".to_string()),
            datasource: None,
        };
        let resolved = resolve_datasource(&sent, response);
        assert_eq!(resolved.id, 12);
        assert_eq!(resolved.kind, "prometheus");
    }
}
