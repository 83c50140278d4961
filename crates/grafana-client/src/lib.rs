//! Grafana HTTP API Client
//!
//! A Rust client library for the subset of the Grafana HTTP API used to
//! provision folders, datasources and dashboards.
//!
//! # Example
//!
//! ```no_run
//! use grafana_client::{GrafanaAuth, GrafanaClient, GrafanaClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GrafanaClient::new(
//!     "http://grafana:3000",
//!     GrafanaAuth::parse("admin:admin"),
//! )?;
//!
//! // Folders are matched by exact title
//! let folder = match client.get_folder_by_title("teamA").await? {
//!     Some(folder) => folder,
//!     None => client.create_folder("teamA").await?,
//! };
//!
//! // Datasource lookups report a typed not-found condition
//! match client.get_datasource_by_name("prometheus").await {
//!     Ok(ds) => println!("prometheus has id {}", ds.id),
//!     Err(e) if e.is_not_found() => println!("prometheus is not provisioned"),
//!     Err(e) => return Err(e.into()),
//! }
//! # let _ = folder;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Folders**: list, lookup by title, create
//! - **Datasources**: lookup by name, create, update, delete
//! - **Dashboards**: get by UID, create-or-overwrite, delete by UID
//! - **Mocking**: `MockGrafanaClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod grafana_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{GrafanaAuth, GrafanaClient};
pub use error::GrafanaError;
pub use models::*;
pub use grafana_trait::GrafanaClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockCall, MockGrafanaClient, Operation};
