//! Seed data shared by the integration tests.
//!
//! Everything goes through the validating constructors in
//! `keepsafe_metadata::ops`, so fixtures satisfy the same rules as real data.

use keepsafe_core::{
    BackupMode, BackupStatus, DataModel, FilesystemLocationConfig, LocationConfig, RestoreStatus,
};
use keepsafe_metadata::models::{
    ArtifactRow, LocationRow, RestoreHistoryRow, RoleRow, ScheduledTaskRow,
};
use keepsafe_metadata::ops::{
    self, CreateArtifactParams, CreateLocationParams, CreateRestoreHistoryItemParams,
    CreateRoleParams, CreateScheduledTaskParams,
};
use keepsafe_metadata::repos::{
    ArtifactRepo, LocationGraph, LocationRepo, RestoreHistoryRepo, RoleRepo, ScheduledTaskRepo,
};

pub const SERVICE_ID: &str = "svc-mongo-1";

pub fn filesystem_config(path: &str) -> LocationConfig {
    LocationConfig::Filesystem(FilesystemLocationConfig {
        path: path.to_string(),
    })
}

pub async fn seed_location<T>(tx: &mut T, name: &str) -> LocationRow
where
    T: LocationRepo + ?Sized,
{
    ops::create_location(
        tx,
        CreateLocationParams {
            name: name.to_string(),
            description: format!("{name} test location"),
            config: filesystem_config(&format!("/var/backups/{name}")),
        },
    )
    .await
    .expect("Failed to create location")
}

pub async fn seed_artifact<T>(tx: &mut T, location_id: &str, name: &str) -> ArtifactRow
where
    T: LocationRepo + ArtifactRepo + ?Sized,
{
    ops::create_artifact(
        tx,
        CreateArtifactParams {
            name: name.to_string(),
            vendor: "mongodb".to_string(),
            db_version: "7.0.12".to_string(),
            location_id: location_id.to_string(),
            service_id: SERVICE_ID.to_string(),
            data_model: DataModel::Logical,
            mode: BackupMode::Snapshot,
            status: BackupStatus::Success,
            schedule_id: None,
        },
    )
    .await
    .expect("Failed to create artifact")
}

pub async fn seed_restore<T>(tx: &mut T, artifact_id: &str) -> RestoreHistoryRow
where
    T: ArtifactRepo + RestoreHistoryRepo + ?Sized,
{
    ops::create_restore_history_item(
        tx,
        CreateRestoreHistoryItemParams {
            artifact_id: artifact_id.to_string(),
            service_id: SERVICE_ID.to_string(),
            status: RestoreStatus::Success,
        },
    )
    .await
    .expect("Failed to create restore history item")
}

pub async fn seed_task<T>(tx: &mut T, location_id: &str, name: &str) -> ScheduledTaskRow
where
    T: LocationRepo + ScheduledTaskRepo + ?Sized,
{
    ops::create_scheduled_task(
        tx,
        CreateScheduledTaskParams {
            name: name.to_string(),
            cron_expression: "0 3 * * *".to_string(),
            task_type: "mongodb_backup".to_string(),
            location_id: location_id.to_string(),
            disabled: false,
        },
    )
    .await
    .expect("Failed to create scheduled task")
}

pub async fn seed_role<T>(tx: &mut T, title: &str) -> RoleRow
where
    T: RoleRepo + ?Sized,
{
    ops::create_role(
        tx,
        CreateRoleParams {
            title: title.to_string(),
            description: format!("{title} test role"),
            filter: String::new(),
        },
    )
    .await
    .expect("Failed to create role")
}

/// A location with its full dependent tree.
#[derive(Debug)]
pub struct LocationGraphFixture {
    pub location: LocationRow,
    pub artifacts: Vec<ArtifactRow>,
    pub restores: Vec<RestoreHistoryRow>,
    pub tasks: Vec<ScheduledTaskRow>,
}

pub async fn seed_location_graph<T>(
    tx: &mut T,
    name: &str,
    artifacts: usize,
    restores_per_artifact: usize,
    tasks: usize,
) -> LocationGraphFixture
where
    T: LocationGraph + ?Sized,
{
    let location = seed_location(tx, name).await;

    let mut fixture = LocationGraphFixture {
        location,
        artifacts: Vec::new(),
        restores: Vec::new(),
        tasks: Vec::new(),
    };
    for i in 0..artifacts {
        let artifact =
            seed_artifact(tx, &fixture.location.id, &format!("{name}-artifact-{i}")).await;
        for _ in 0..restores_per_artifact {
            fixture.restores.push(seed_restore(tx, &artifact.id).await);
        }
        fixture.artifacts.push(artifact);
    }
    for i in 0..tasks {
        fixture
            .tasks
            .push(seed_task(tx, &fixture.location.id, &format!("{name}-task-{i}")).await);
    }
    fixture
}
