//! Mock GrafanaClient for unit testing
//!
//! This module provides a mock implementation of GrafanaClientTrait that can be used
//! in unit tests without requiring a running Grafana instance.
//!
//! Besides in-memory folders, datasources and dashboards, the mock records
//! every call it receives and can be told to fail specific operations.

use crate::error::GrafanaError;
use crate::grafana_trait::GrafanaClientTrait;
use crate::models::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations the mock can record and fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Health,
    ListFolders,
    CreateFolder,
    GetDatasourceByName,
    CreateDatasource,
    UpdateDatasource,
    DeleteDatasource,
    GetDashboard,
    SetDashboard,
    DeleteDashboard,
}

/// A recorded call with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Health,
    ListFolders,
    CreateFolder { title: String },
    GetDatasourceByName { name: String },
    CreateDatasource { datasource: Datasource },
    UpdateDatasource { datasource: Datasource },
    DeleteDatasource { id: u64 },
    GetDashboard { uid: String },
    SetDashboard { board: Board, overwrite: bool, folder_id: u64 },
    DeleteDashboard { uid: String },
}

impl MockCall {
    /// The operation this call belongs to
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Health => Operation::Health,
            Self::ListFolders => Operation::ListFolders,
            Self::CreateFolder { .. } => Operation::CreateFolder,
            Self::GetDatasourceByName { .. } => Operation::GetDatasourceByName,
            Self::CreateDatasource { .. } => Operation::CreateDatasource,
            Self::UpdateDatasource { .. } => Operation::UpdateDatasource,
            Self::DeleteDatasource { .. } => Operation::DeleteDatasource,
            Self::GetDashboard { .. } => Operation::GetDashboard,
            Self::SetDashboard { .. } => Operation::SetDashboard,
            Self::DeleteDashboard { .. } => Operation::DeleteDashboard,
        }
    }
}

/// Dashboard as stored by the mock
#[derive(Debug, Clone)]
struct StoredDashboard {
    board: Board,
    folder_id: u64,
    version: i64,
}

/// Mock GrafanaClient for testing
///
/// Clones share state, so a test can keep a handle while the reconciler owns another.
#[derive(Debug, Clone)]
pub struct MockGrafanaClient {
    endpoint: String,
    folders: Arc<Mutex<Vec<Folder>>>,
    datasources: Arc<Mutex<BTreeMap<u64, Datasource>>>,
    dashboards: Arc<Mutex<BTreeMap<String, StoredDashboard>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    failing: Arc<Mutex<HashSet<Operation>>>,
    // Counter for generating IDs
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGrafanaClient {
    /// Create a new mock client
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            folders: Arc::new(Mutex::new(Vec::new())),
            datasources: Arc::new(Mutex::new(BTreeMap::new())),
            dashboards: Arc::new(Mutex::new(BTreeMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a folder to the mock store (for test setup), returning it with its id
    pub fn add_folder(&self, title: &str) -> Folder {
        let id = self.next_id();
        let folder = Folder {
            id,
            uid: format!("folder-{id}"),
            ..Folder::titled(title)
        };
        lock(&self.folders).push(folder.clone());
        folder
    }

    /// Add a datasource to the mock store (for test setup), returning its id
    pub fn add_datasource(&self, mut datasource: Datasource) -> u64 {
        let id = self.next_id();
        datasource.id = id;
        lock(&self.datasources).insert(id, datasource);
        id
    }

    /// Add a dashboard to the mock store (for test setup)
    pub fn add_dashboard(&self, board: Board, folder_id: u64) {
        let uid = board.uid().map(str::to_string).unwrap_or_else(|| self.generate_uid());
        lock(&self.dashboards).insert(
            uid,
            StoredDashboard {
                board,
                folder_id,
                version: 1,
            },
        );
    }

    /// Make every subsequent call of `operation` fail with a 500
    pub fn fail_on(&self, operation: Operation) {
        lock(&self.failing).insert(operation);
    }

    /// Let `operation` succeed again
    pub fn clear_failure(&self, operation: Operation) {
        lock(&self.failing).remove(&operation);
    }

    /// All calls received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls received for `operation`, failed ones included
    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Forget recorded calls (stored resources are kept)
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Snapshot of stored folders
    #[must_use]
    pub fn folders(&self) -> Vec<Folder> {
        lock(&self.folders).clone()
    }

    /// Stored datasource with `name`, if any
    #[must_use]
    pub fn datasource(&self, name: &str) -> Option<Datasource> {
        lock(&self.datasources)
            .values()
            .find(|ds| ds.name == name)
            .cloned()
    }

    /// Number of stored datasources
    #[must_use]
    pub fn datasource_count(&self) -> usize {
        lock(&self.datasources).len()
    }

    /// Stored dashboard with `uid` and the folder it lives in
    #[must_use]
    pub fn dashboard(&self, uid: &str) -> Option<(Board, u64)> {
        lock(&self.dashboards)
            .get(uid)
            .map(|stored| (stored.board.clone(), stored.folder_id))
    }

    /// Number of stored dashboards
    #[must_use]
    pub fn dashboard_count(&self) -> usize {
        lock(&self.dashboards).len()
    }

    /// Generate next ID
    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }

    fn generate_uid(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()[..9].to_string()
    }

    /// Record the call and fail it if its operation was marked failing
    fn record(&self, call: MockCall) -> Result<(), GrafanaError> {
        let operation = call.operation();
        lock(&self.calls).push(call);
        if lock(&self.failing).contains(&operation) {
            return Err(GrafanaError::Api {
                status: 500,
                message: format!("injected failure for {operation:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GrafanaClientTrait for MockGrafanaClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<Health, GrafanaError> {
        self.record(MockCall::Health)?;
        Ok(Health {
            database: Some("ok".to_string()),
            version: Some("mock".to_string()),
            commit: None,
        })
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, GrafanaError> {
        self.record(MockCall::ListFolders)?;
        Ok(self.folders())
    }

    async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError> {
        self.record(MockCall::CreateFolder {
            title: title.to_string(),
        })?;
        if lock(&self.folders).iter().any(|f| f.title == title) {
            return Err(GrafanaError::Api {
                status: 409,
                message: "a folder with the same name already exists".to_string(),
            });
        }
        Ok(self.add_folder(title))
    }

    async fn get_datasource_by_name(&self, name: &str) -> Result<Datasource, GrafanaError> {
        self.record(MockCall::GetDatasourceByName {
            name: name.to_string(),
        })?;
        self.datasource(name)
            .ok_or_else(|| {
                GrafanaError::NotFound(format!("datasource {name}: Data source not found"))
            })
    }

    async fn create_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError> {
        self.record(MockCall::CreateDatasource {
            datasource: datasource.clone(),
        })?;
        if self.datasource(&datasource.name).is_some() {
            return Err(GrafanaError::Api {
                status: 409,
                message: "data source with the same name already exists".to_string(),
            });
        }
        let id = self.add_datasource(datasource.clone());
        Ok(Datasource {
            id,
            ..datasource.clone()
        })
    }

    async fn update_datasource(&self, datasource: &Datasource) -> Result<Datasource, GrafanaError> {
        self.record(MockCall::UpdateDatasource {
            datasource: datasource.clone(),
        })?;
        let mut datasources = lock(&self.datasources);
        match datasources.get_mut(&datasource.id) {
            Some(stored) => {
                *stored = datasource.clone();
                Ok(datasource.clone())
            }
            None => Err(GrafanaError::NotFound(format!(
                "datasource {}: Data source not found",
                datasource.id
            ))),
        }
    }

    async fn delete_datasource(&self, id: u64) -> Result<StatusMessage, GrafanaError> {
        self.record(MockCall::DeleteDatasource { id })?;
        match lock(&self.datasources).remove(&id) {
            Some(_) => Ok(StatusMessage {
                id: Some(id),
                title: None,
                message: Some("Data source deleted".to_string()),
            }),
            None => Err(GrafanaError::NotFound(format!("datasource {id}: Data source not found"))),
        }
    }

    async fn get_dashboard(&self, uid: &str) -> Result<DashboardWithMeta, GrafanaError> {
        self.record(MockCall::GetDashboard {
            uid: uid.to_string(),
        })?;
        let dashboards = lock(&self.dashboards);
        let stored = dashboards
            .get(uid)
            .ok_or_else(|| {
                GrafanaError::NotFound(format!("dashboard {uid}: Dashboard not found"))
            })?;
        Ok(DashboardWithMeta {
            dashboard: stored.board.clone(),
            meta: DashboardMeta {
                folder_id: Some(stored.folder_id),
                version: Some(stored.version),
                ..Default::default()
            },
        })
    }

    async fn set_dashboard(
        &self,
        board: &Board,
        overwrite: bool,
        folder_id: u64,
    ) -> Result<SetDashboardResponse, GrafanaError> {
        self.record(MockCall::SetDashboard {
            board: board.clone(),
            overwrite,
            folder_id,
        })?;

        let mut dashboards = lock(&self.dashboards);
        // Same identity rules as Grafana: uid first, then title within the folder
        let existing = match board.uid() {
            Some(uid) => dashboards.contains_key(uid).then(|| uid.to_string()),
            None => dashboards
                .iter()
                .find(|(_, stored)| {
                    stored.board.title == board.title && stored.folder_id == folder_id
                })
                .map(|(uid, _)| uid.clone()),
        };

        if existing.is_some() && !overwrite {
            return Err(GrafanaError::Api {
                status: 412,
                message: "A dashboard with the same name in the folder already exists".to_string(),
            });
        }

        let uid = existing
            .clone()
            .or_else(|| board.uid().map(str::to_string))
            .unwrap_or_else(|| self.generate_uid());
        let version = existing
            .and_then(|uid| dashboards.get(&uid).map(|stored| stored.version + 1))
            .unwrap_or(1);
        let stored_board = Board {
            uid: Some(uid.clone()),
            ..board.clone()
        };
        dashboards.insert(
            uid.clone(),
            StoredDashboard {
                board: stored_board,
                folder_id,
                version,
            },
        );

        Ok(SetDashboardResponse {
            id: None,
            uid: Some(uid),
            url: None,
            status: Some("success".to_string()),
            version: Some(version),
            slug: None,
        })
    }

    async fn delete_dashboard(&self, uid: &str) -> Result<StatusMessage, GrafanaError> {
        self.record(MockCall::DeleteDashboard {
            uid: uid.to_string(),
        })?;
        match lock(&self.dashboards).remove(uid) {
            Some(stored) => Ok(StatusMessage {
                id: None,
                title: Some(stored.board.title.clone()),
                message: Some(format!("Dashboard {} deleted", stored.board.title)),
            }),
            None => Err(GrafanaError::NotFound(format!("dashboard {uid}: Dashboard not found"))),
        }
    }
}
