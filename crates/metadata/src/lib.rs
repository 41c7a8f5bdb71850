//! Metadata store and dependent-entity removal for keepsafe.
//!
//! This crate owns the relational data model:
//! - Backup locations, the artifacts stored in them and their restore history
//! - Scheduled backup tasks writing into a location
//! - Roles, user memberships and the default role
//!
//! The removal engines in [`removal`] and [`reassign`] run inside a
//! caller-owned transaction and are generic over the repository traits, so
//! the same code drives SQLite, PostgreSQL and test doubles.

pub mod error;
pub mod models;
pub mod ops;
pub mod postgres;
pub mod reassign;
pub mod removal;
pub mod repos;
pub mod store;

pub use error::{DependentKind, ErrorKind, MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use reassign::{delete_role, delete_role_by_ids, replace_role};
pub use removal::{LocationDependents, find_location_dependents, remove_location};
pub use store::{MetadataStore, SqliteStore};

use keepsafe_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
