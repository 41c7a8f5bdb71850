//! Validating constructors and updates.
//!
//! These check their inputs before touching the store and then go through
//! the repository traits, so the same code runs on every backend and inside
//! whatever transaction the caller holds.

pub mod backups;
pub mod locations;
pub mod roles;

pub use backups::{
    CreateArtifactParams, CreateRestoreHistoryItemParams, CreateScheduledTaskParams,
    create_artifact, create_restore_history_item, create_scheduled_task, finish_restore,
    update_artifact_status,
};
pub use locations::{ChangeLocationParams, CreateLocationParams, change_location, create_location};
pub use roles::{CreateRoleParams, assign_roles, create_role, set_default_role};

use crate::error::{MetadataError, MetadataResult};

fn require(field: &str, value: &str) -> MetadataResult<()> {
    if value.trim().is_empty() {
        return Err(MetadataError::InvalidArgument(format!(
            "{field} shouldn't be empty"
        )));
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
