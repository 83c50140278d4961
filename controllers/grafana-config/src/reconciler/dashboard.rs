//! Dashboard reconciliation

use super::Reconciler;
use crate::error::ReconcileError;
use crate::telemetry::Tags;
use grafana_client::Board;
use tracing::info;

impl Reconciler {
    /// Create or overwrite the dashboard declared in `file`
    pub async fn upsert_dashboard(
        &self,
        file: &str,
        board: &Board,
        tags: &Tags,
    ) -> Result<(), ReconcileError> {
        info!("Reconciling dashboard '{}' from {}", board.title, file);

        let folder_id = self.resolve_folder(file, tags).await?;

        let response = self
            .grafana_client
            .set_dashboard(board, true, folder_id)
            .await
            .map_err(|e| ReconcileError::upstream("SetDashboard", e))?;

        let uid = response.uid.as_deref().or(board.uid()).unwrap_or_default();
        info!(
            "Created or updated dashboard '{}' (UID: {}, folder {})",
            board.title, uid, folder_id
        );
        self.report_info(
            &format!("Created or updated dashboard {}", board.title),
            &tags.for_operation("SetDashboard").with_uid(uid),
        );
        Ok(())
    }

    /// Delete the dashboard declared in a removed ConfigMap
    ///
    /// Only dashboards with a uid can be found again; others are left alone.
    pub async fn delete_dashboard(&self, board: &Board, tags: &Tags) -> Result<(), ReconcileError> {
        let Some(uid) = board.uid() else {
            return Err(ReconcileError::MissingIdentity {
                title: board.title.clone(),
            });
        };

        self.grafana_client
            .get_dashboard(uid)
            .await
            .map_err(|e| ReconcileError::upstream("GetDashboard", e))?;

        self.grafana_client
            .delete_dashboard(uid)
            .await
            .map_err(|e| ReconcileError::upstream("DeleteDashboard", e))?;

        info!("Deleted dashboard '{}' (UID: {})", board.title, uid);
        self.report_info(
            &format!("Deleted dashboard {}", board.title),
            &tags.for_operation("DeleteDashboard").with_uid(uid),
        );
        Ok(())
    }
}
