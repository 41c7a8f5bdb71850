//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use keepsafe_core::{
    BackupStatus, FilesystemLocationConfig, LocationConfig, LocationType, RestoreStatus,
    S3LocationConfig,
};
use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Backup locations
// =============================================================================

/// Backup location record.
///
/// The configuration is spread over three nullable JSON columns; exactly one
/// of them is set and it matches `location_type`.
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location_type: String,
    pub filesystem_config: Option<String>,
    pub s3_config: Option<String>,
    pub client_config: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl LocationRow {
    pub fn new(
        id: String,
        name: String,
        description: String,
        config: &LocationConfig,
        now: OffsetDateTime,
    ) -> MetadataResult<Self> {
        let mut row = Self {
            id,
            name,
            description,
            location_type: String::new(),
            filesystem_config: None,
            s3_config: None,
            client_config: None,
            created_at: now,
            updated_at: now,
        };
        row.set_config(config)?;
        Ok(row)
    }

    /// Replace the stored configuration, clearing the other variants.
    pub fn set_config(&mut self, config: &LocationConfig) -> MetadataResult<()> {
        self.location_type = config.location_type().as_str().to_string();
        self.filesystem_config = None;
        self.s3_config = None;
        self.client_config = None;
        match config {
            LocationConfig::Filesystem(c) => self.filesystem_config = Some(serde_json::to_string(c)?),
            LocationConfig::S3(c) => self.s3_config = Some(serde_json::to_string(c)?),
            LocationConfig::Client(c) => self.client_config = Some(serde_json::to_string(c)?),
        }
        Ok(())
    }

    /// Decode the configuration, enforcing the one-variant invariant.
    pub fn config(&self) -> MetadataResult<LocationConfig> {
        let set = [&self.filesystem_config, &self.s3_config, &self.client_config]
            .iter()
            .filter(|c| c.is_some())
            .count();
        if set != 1 {
            return Err(MetadataError::Internal(format!(
                "location {} has {set} configurations, expected exactly one",
                self.id
            )));
        }

        let location_type = LocationType::parse(&self.location_type)?;
        let config = match (location_type, &self.filesystem_config, &self.s3_config, &self.client_config) {
            (LocationType::Filesystem, Some(json), _, _) => {
                LocationConfig::Filesystem(serde_json::from_str::<FilesystemLocationConfig>(json)?)
            }
            (LocationType::S3, _, Some(json), _) => {
                LocationConfig::S3(serde_json::from_str::<S3LocationConfig>(json)?)
            }
            (LocationType::Client, _, _, Some(json)) => {
                LocationConfig::Client(serde_json::from_str::<FilesystemLocationConfig>(json)?)
            }
            _ => {
                return Err(MetadataError::Internal(format!(
                    "location {} type {} does not match its configuration",
                    self.id, self.location_type
                )));
            }
        };
        Ok(config)
    }
}

// =============================================================================
// Artifacts, restores and schedules
// =============================================================================

/// Backup artifact record. Owned by one location and one service.
#[derive(Debug, Clone, FromRow)]
pub struct ArtifactRow {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub db_version: String,
    pub location_id: String,
    pub service_id: String,
    pub data_model: String,
    pub mode: String,
    pub status: String,
    pub artifact_type: String,
    pub schedule_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ArtifactRow {
    pub fn status(&self) -> MetadataResult<BackupStatus> {
        Ok(self.status.parse()?)
    }
}

/// Restore operation record, referencing one artifact.
#[derive(Debug, Clone, FromRow)]
pub struct RestoreHistoryRow {
    pub id: String,
    pub artifact_id: String,
    pub service_id: String,
    pub status: String,
    pub started_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

impl RestoreHistoryRow {
    pub fn status(&self) -> MetadataResult<RestoreStatus> {
        Ok(self.status.parse()?)
    }
}

/// Recurring backup job writing into a location.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledTaskRow {
    pub id: String,
    pub name: String,
    pub cron_expression: String,
    pub task_type: String,
    pub location_id: String,
    pub disabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Optional predicates for [`crate::repos::ArtifactRepo::find_artifacts`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    pub location_id: Option<String>,
    pub service_id: Option<String>,
    pub schedule_id: Option<String>,
    pub status: Option<BackupStatus>,
}

impl ArtifactFilter {
    pub fn by_location(location_id: &str) -> Self {
        Self {
            location_id: Some(location_id.to_string()),
            ..Self::default()
        }
    }
}

/// Optional predicates for restore history lookups.
#[derive(Debug, Clone, Default)]
pub struct RestoreHistoryFilter {
    pub artifact_id: Option<String>,
    pub service_id: Option<String>,
    pub status: Option<RestoreStatus>,
}

impl RestoreHistoryFilter {
    pub fn by_artifact(artifact_id: &str) -> Self {
        Self {
            artifact_id: Some(artifact_id.to_string()),
            ..Self::default()
        }
    }
}

/// Optional predicates for scheduled task lookups.
#[derive(Debug, Clone, Default)]
pub struct ScheduledTaskFilter {
    pub location_id: Option<String>,
    pub disabled: Option<bool>,
}

impl ScheduledTaskFilter {
    pub fn by_location(location_id: &str) -> Self {
        Self {
            location_id: Some(location_id.to_string()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Access control
// =============================================================================

/// Access-control role. `filter` is a label selector limiting visibility.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct RoleRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub filter: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One user-to-role membership edge.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct UserRoleRow {
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Removal reports
// =============================================================================

/// Counts of rows removed by a location removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationRemoval {
    pub restore_history_items: u64,
    pub artifacts: u64,
    pub scheduled_tasks: u64,
    /// Dependents that were gone by the time their delete ran.
    pub already_removed: u64,
}

impl LocationRemoval {
    pub fn dependents_removed(&self) -> u64 {
        self.restore_history_items + self.artifacts + self.scheduled_tasks
    }
}

/// Membership changes performed by a role removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRemoval {
    /// Edges deleted outright.
    pub memberships_removed: u64,
    /// Last-role edges rewritten to the replacement role.
    pub memberships_reassigned: u64,
    pub users_affected: u64,
}
