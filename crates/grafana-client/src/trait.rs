//! GrafanaClient trait for mocking
//!
//! This trait abstracts the GrafanaClient to enable mocking in unit tests.
//! The concrete GrafanaClient implements this trait, and tests can use mock implementations.

use crate::error::GrafanaError;
use crate::models::*;

/// Trait for Grafana API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait GrafanaClientTrait: Send + Sync {
    /// Get the Grafana endpoint this client talks to
    fn endpoint(&self) -> &str;

    /// Check connectivity and credentials
    async fn health(&self) -> Result<Health, GrafanaError>;

    // Folder Operations
    async fn list_folders(&self) -> Result<Vec<Folder>, GrafanaError>;
    async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError>;

    /// Find a folder by exact title
    ///
    /// Grafana has no title lookup endpoint, so this scans the folder list.
    /// Returns `Ok(None)` when no folder carries the title.
    async fn get_folder_by_title(&self, title: &str) -> Result<Option<Folder>, GrafanaError> {
        let folders = self.list_folders().await?;
        Ok(folders.into_iter().find(|folder| folder.title == title))
    }

    // Datasource Operations
    async fn get_datasource_by_name(&self, name: &str) -> Result<Datasource, GrafanaError>;
    async fn create_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError>;
    async fn update_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError>;
    async fn delete_datasource(&self, id: u64) -> Result<StatusMessage, GrafanaError>;

    // Dashboard Operations
    async fn get_dashboard(&self, uid: &str) -> Result<DashboardWithMeta, GrafanaError>;
    async fn set_dashboard(
        &self,
        board: &Board,
        overwrite: bool,
        folder_id: u64,
    ) -> Result<SetDashboardResponse, GrafanaError>;
    async fn delete_dashboard(&self, uid: &str) -> Result<StatusMessage, GrafanaError>;
}
