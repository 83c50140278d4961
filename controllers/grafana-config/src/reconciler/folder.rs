//! Dashboard folder placement.
//!
//! The folder of a dashboard is encoded in its file name:
//! `teamA.mydashboard.json` lands in folder `teamA`, `mydashboard.json` in
//! the General folder.

use super::Reconciler;
use crate::error::ReconcileError;
use crate::telemetry::Tags;
use grafana_client::GENERAL_FOLDER_ID;
use tracing::{debug, info};

/// Folder title encoded in `file_name`, `None` for the General folder
pub fn folder_title(file_name: &str) -> Option<&str> {
    let mut segments: Vec<&str> = file_name.split('.').collect();
    if segments
        .last()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("js"))
    {
        segments.pop();
    }
    // The dashboard name itself
    segments.pop();
    segments.first().copied().filter(|title| !title.is_empty())
}

impl Reconciler {
    /// Resolve the folder id for the dashboard stored in `file_name`,
    /// creating the folder when Grafana does not have it yet
    pub async fn resolve_folder(
        &self,
        file_name: &str,
        tags: &Tags,
    ) -> Result<u64, ReconcileError> {
        let Some(title) = folder_title(file_name) else {
            return Ok(GENERAL_FOLDER_ID);
        };

        let existing = self
            .grafana_client
            .get_folder_by_title(title)
            .await
            .map_err(|source| ReconcileError::FolderResolution {
                title: title.to_string(),
                source,
            })?;

        if let Some(folder) = existing {
            debug!("Using existing folder '{}' (ID: {})", title, folder.id);
            return Ok(folder.id);
        }

        let folder = self
            .grafana_client
            .create_folder(title)
            .await
            .map_err(|source| ReconcileError::FolderResolution {
                title: title.to_string(),
                source,
            })?;
        info!("Created folder '{}' (ID: {})", title, folder.id);
        self.report_info(
            &format!("Created folder {title}"),
            &tags.for_operation("CreateFolder").with_resource(title),
        );
        Ok(folder.id)
    }
}
