//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for keepsafe tooling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Metadata store backend.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (single writer; intended for tests and small installs).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over the individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Server-side statement timeout in milliseconds. Lock waits count
        /// against it, so a stuck `FOR UPDATE` surfaces as an error.
        statement_timeout_ms: Option<u64>,
    },
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_max_connections() -> u32 {
    10
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate configuration invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Sqlite { path } if path.as_os_str().is_empty() => {
                Err("sqlite config requires a non-empty 'path'".to_string())
            }
            Self::Postgres {
                url: None,
                host,
                database,
                ..
            } if host.is_none() || database.is_none() => Err(
                "postgres config requires either 'url' or 'host' + 'database'".to_string(),
            ),
            Self::Postgres {
                max_connections: 0,
                ..
            } => Err("postgres 'max_connections' must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}
