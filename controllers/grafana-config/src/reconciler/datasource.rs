//! Datasource reconciliation
//!
//! `deleteDatasources` entries are handled first, then the `datasources`
//! ensure list. Each entry succeeds or fails on its own.

use super::Reconciler;
use crate::document::DatasourceConfig;
use crate::error::ReconcileError;
use crate::telemetry::Tags;
use grafana_client::{Datasource, DatasourceRef};
use tracing::{debug, info};

impl Reconciler {
    /// Apply a datasource document
    ///
    /// With `delete_mode` the ConfigMap is gone: existing datasources of the
    /// ensure list are deleted instead of updated.
    pub async fn reconcile_datasources(
        &self,
        config: &DatasourceConfig,
        delete_mode: bool,
        tags: &Tags,
    ) {
        info!(
            "Reconciling {} datasource(s) and {} deletion(s) ({})",
            config.datasources.len(),
            config.delete_datasources.len(),
            if delete_mode { "delete" } else { "update" }
        );

        for reference in &config.delete_datasources {
            let tags = tags.clone().with_resource(&reference.name);
            if let Err(e) = self.delete_listed_datasource(reference, &tags).await {
                self.report(&e, &tags);
            }
        }

        for datasource in &config.datasources {
            let tags = tags.clone().with_resource(&datasource.name);
            if let Err(e) = self.ensure_datasource(datasource, delete_mode, &tags).await {
                self.report(&e, &tags);
            }
        }
    }

    async fn find_datasource(&self, name: &str) -> Result<Option<Datasource>, ReconcileError> {
        match self.grafana_client.get_datasource_by_name(name).await {
            Ok(datasource) => Ok(Some(datasource)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ReconcileError::upstream("GetDatasourceByName", e)),
        }
    }

    async fn delete_listed_datasource(
        &self,
        reference: &DatasourceRef,
        tags: &Tags,
    ) -> Result<(), ReconcileError> {
        match self.find_datasource(&reference.name).await? {
            Some(existing) => self.remove_datasource(&existing, tags).await,
            None => {
                debug!("Datasource {} does not exist, nothing to delete", reference.name);
                Ok(())
            }
        }
    }

    async fn ensure_datasource(
        &self,
        datasource: &Datasource,
        delete_mode: bool,
        tags: &Tags,
    ) -> Result<(), ReconcileError> {
        let existing = self.find_datasource(&datasource.name).await?;

        match existing {
            None if delete_mode => {
                debug!("Datasource {} does not exist, nothing to delete", datasource.name);
                Ok(())
            }
            None => {
                let created = self
                    .grafana_client
                    .create_datasource(datasource)
                    .await
                    .map_err(|e| ReconcileError::upstream("CreateDatasource", e))?;
                info!("Created datasource {} (ID: {})", created.name, created.id);
                self.report_info(
                    &format!("Created datasource {}", datasource.name),
                    &tags.for_operation("CreateDatasource"),
                );
                Ok(())
            }
            Some(existing) if delete_mode => self.remove_datasource(&existing, tags).await,
            Some(existing) => {
                debug!(
                    "Datasource {} already exists with ID {}, updating",
                    datasource.name, existing.id
                );
                let desired = Datasource {
                    id: existing.id,
                    ..datasource.clone()
                };
                self.grafana_client
                    .update_datasource(&desired)
                    .await
                    .map_err(|e| ReconcileError::upstream("UpdateDatasource", e))?;
                info!("Updated datasource {} (ID: {})", desired.name, desired.id);
                self.report_info(
                    &format!("Updated datasource {}", datasource.name),
                    &tags.for_operation("UpdateDatasource"),
                );
                Ok(())
            }
        }
    }

    async fn remove_datasource(
        &self,
        existing: &Datasource,
        tags: &Tags,
    ) -> Result<(), ReconcileError> {
        self.grafana_client
            .delete_datasource(existing.id)
            .await
            .map_err(|e| ReconcileError::upstream("DeleteDatasource", e))?;
        info!("Deleted datasource {} (ID: {})", existing.name, existing.id);
        self.report_info(
            &format!("Deleted datasource {}", existing.name),
            &tags.for_operation("DeleteDatasource"),
        );
        Ok(())
    }
}
