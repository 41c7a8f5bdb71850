//! Artifact, restore history and scheduled task constructors.

use super::{new_id, require};
use crate::error::{MetadataError, MetadataResult};
use crate::models::{ArtifactRow, RestoreHistoryRow, ScheduledTaskRow};
use crate::repos::{ArtifactRepo, LocationRepo, RestoreHistoryRepo, ScheduledTaskRepo};
use keepsafe_core::{BackupMode, BackupStatus, DataModel, RestoreStatus};
use time::OffsetDateTime;

const ON_DEMAND_ARTIFACT: &str = "on_demand";
const SCHEDULED_ARTIFACT: &str = "scheduled";

/// Parameters for [`create_artifact`].
#[derive(Debug, Clone)]
pub struct CreateArtifactParams {
    pub name: String,
    pub vendor: String,
    pub db_version: String,
    pub location_id: String,
    pub service_id: String,
    pub data_model: DataModel,
    pub mode: BackupMode,
    pub status: BackupStatus,
    pub schedule_id: Option<String>,
}

/// Parameters for [`create_restore_history_item`].
#[derive(Debug, Clone)]
pub struct CreateRestoreHistoryItemParams {
    pub artifact_id: String,
    pub service_id: String,
    pub status: RestoreStatus,
}

/// Parameters for [`create_scheduled_task`].
#[derive(Debug, Clone)]
pub struct CreateScheduledTaskParams {
    pub name: String,
    pub cron_expression: String,
    pub task_type: String,
    pub location_id: String,
    pub disabled: bool,
}

async fn require_location<T>(tx: &mut T, location_id: &str) -> MetadataResult<()>
where
    T: LocationRepo + ?Sized,
{
    match tx.find_location(location_id).await? {
        Some(_) => Ok(()),
        None => Err(MetadataError::NotFound(format!(
            "backup location with ID {location_id:?}"
        ))),
    }
}

/// Record a backup artifact in an existing location.
pub async fn create_artifact<T>(
    tx: &mut T,
    params: CreateArtifactParams,
) -> MetadataResult<ArtifactRow>
where
    T: LocationRepo + ArtifactRepo + ?Sized,
{
    require("name", &params.name)?;
    require("vendor", &params.vendor)?;
    require("location_id", &params.location_id)?;
    require("service_id", &params.service_id)?;

    require_location(tx, &params.location_id).await?;
    if tx.find_artifact_by_name(&params.name).await?.is_some() {
        return Err(MetadataError::AlreadyExists(format!(
            "artifact with name {:?}",
            params.name
        )));
    }

    let schedule_id = params.schedule_id.filter(|id| !id.is_empty());
    let artifact_type = if schedule_id.is_some() {
        SCHEDULED_ARTIFACT
    } else {
        ON_DEMAND_ARTIFACT
    };
    let now = OffsetDateTime::now_utc();
    let row = ArtifactRow {
        id: new_id(),
        name: params.name,
        vendor: params.vendor,
        db_version: params.db_version,
        location_id: params.location_id,
        service_id: params.service_id,
        data_model: params.data_model.to_string(),
        mode: params.mode.to_string(),
        status: params.status.to_string(),
        artifact_type: artifact_type.to_string(),
        schedule_id,
        created_at: now,
        updated_at: now,
    };
    tx.insert_artifact(&row).await?;
    Ok(row)
}

/// Move an artifact to `status`, rejecting transitions its lifecycle forbids.
pub async fn update_artifact_status<T>(
    tx: &mut T,
    artifact_id: &str,
    status: BackupStatus,
) -> MetadataResult<ArtifactRow>
where
    T: ArtifactRepo + ?Sized,
{
    let mut row = tx
        .find_artifact(artifact_id)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("artifact with ID {artifact_id:?}")))?;
    row.status()?.validate_transition(status)?;

    let now = OffsetDateTime::now_utc();
    tx.update_artifact_status(artifact_id, status, now).await?;
    row.status = status.to_string();
    row.updated_at = now;
    Ok(row)
}

/// Record a restore of an existing artifact.
pub async fn create_restore_history_item<T>(
    tx: &mut T,
    params: CreateRestoreHistoryItemParams,
) -> MetadataResult<RestoreHistoryRow>
where
    T: ArtifactRepo + RestoreHistoryRepo + ?Sized,
{
    require("artifact_id", &params.artifact_id)?;
    require("service_id", &params.service_id)?;
    if tx.find_artifact(&params.artifact_id).await?.is_none() {
        return Err(MetadataError::NotFound(format!(
            "artifact with ID {:?}",
            params.artifact_id
        )));
    }

    let now = OffsetDateTime::now_utc();
    let row = RestoreHistoryRow {
        id: new_id(),
        artifact_id: params.artifact_id,
        service_id: params.service_id,
        status: params.status.to_string(),
        started_at: now,
        finished_at: params.status.is_terminal().then_some(now),
    };
    tx.insert_restore_history_item(&row).await?;
    Ok(row)
}

/// Close a restore with a terminal status.
pub async fn finish_restore<T>(
    tx: &mut T,
    restore_id: &str,
    status: RestoreStatus,
) -> MetadataResult<RestoreHistoryRow>
where
    T: RestoreHistoryRepo + ?Sized,
{
    if !status.is_terminal() {
        return Err(MetadataError::InvalidArgument(format!(
            "restore can only finish with a terminal status, got {status}"
        )));
    }
    let mut row = tx
        .find_restore_history_item(restore_id)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("restore history item with ID {restore_id:?}")))?;
    row.status()?.validate_transition(status)?;

    let finished_at = OffsetDateTime::now_utc();
    tx.update_restore_status(restore_id, status, Some(finished_at))
        .await?;
    row.status = status.to_string();
    row.finished_at = Some(finished_at);
    Ok(row)
}

/// Register a recurring backup job writing into an existing location.
pub async fn create_scheduled_task<T>(
    tx: &mut T,
    params: CreateScheduledTaskParams,
) -> MetadataResult<ScheduledTaskRow>
where
    T: LocationRepo + ScheduledTaskRepo + ?Sized,
{
    require("name", &params.name)?;
    require("cron_expression", &params.cron_expression)?;
    require("task_type", &params.task_type)?;
    require_location(tx, &params.location_id).await?;

    let now = OffsetDateTime::now_utc();
    let row = ScheduledTaskRow {
        id: new_id(),
        name: params.name,
        cron_expression: params.cron_expression,
        task_type: params.task_type,
        location_id: params.location_id,
        disabled: params.disabled,
        created_at: now,
        updated_at: now,
    };
    tx.insert_scheduled_task(&row).await?;
    Ok(row)
}
