//! Grafana client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Grafana API
#[derive(Debug, Error)]
pub enum GrafanaError {
    /// HTTP transport error (connection refused, timeout, TLS failure, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Grafana answered with a non-success status
    #[error("Grafana API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by Grafana
        status: u16,
        /// Grafana's `message` field, or the raw body when absent
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid credentials, missing permissions)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing datasource id, malformed endpoint)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GrafanaError {
    /// Whether Grafana reported the requested resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
