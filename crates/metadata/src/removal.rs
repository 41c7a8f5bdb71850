//! Backup location removal.
//!
//! A location is referenced by artifacts (which are in turn referenced by
//! restore history items) and by scheduled tasks. Removal discovers the whole
//! dependent set up front, then either refuses ([`RemoveMode::Restrict`]) or
//! deletes children before parents ([`RemoveMode::Cascade`]).
//!
//! The caller owns the transaction. A failure part-way through a cascade
//! leaves earlier deletes in that transaction; rolling back is the caller's
//! job.

use crate::error::{DependentKind, MetadataError, MetadataResult};
use crate::models::{
    ArtifactFilter, ArtifactRow, LocationRemoval, LocationRow, RestoreHistoryFilter,
    RestoreHistoryRow, ScheduledTaskFilter, ScheduledTaskRow,
};
use crate::repos::{LocationGraph, LocationRepo};
use keepsafe_core::RemoveMode;

/// Every entity that references a location, directly or through an
/// artifact.
#[derive(Debug, Clone, Default)]
pub struct LocationDependents {
    pub artifacts: Vec<ArtifactRow>,
    pub restore_history_items: Vec<RestoreHistoryRow>,
    pub scheduled_tasks: Vec<ScheduledTaskRow>,
}

impl LocationDependents {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
            && self.restore_history_items.is_empty()
            && self.scheduled_tasks.is_empty()
    }

    /// First non-empty dependent class, in the order a caller should report
    /// them.
    pub fn blocker(&self) -> Option<(DependentKind, usize)> {
        [
            (DependentKind::Artifacts, self.artifacts.len()),
            (
                DependentKind::RestoreHistoryItems,
                self.restore_history_items.len(),
            ),
            (DependentKind::ScheduledTasks, self.scheduled_tasks.len()),
        ]
        .into_iter()
        .find(|(_, count)| *count > 0)
    }
}

/// Load a location or fail with `NotFound`.
pub async fn find_location_or_err<T>(tx: &mut T, location_id: &str) -> MetadataResult<LocationRow>
where
    T: LocationRepo + ?Sized,
{
    if location_id.is_empty() {
        return Err(MetadataError::InvalidArgument(
            "empty location ID".to_string(),
        ));
    }
    tx.find_location(location_id)
        .await
        .map_err(|e| e.context("find location", location_id))?
        .ok_or_else(|| MetadataError::NotFound(format!("backup location with ID {location_id:?}")))
}

/// Collect all dependents of a location.
pub async fn find_location_dependents<T>(
    tx: &mut T,
    location_id: &str,
) -> MetadataResult<LocationDependents>
where
    T: LocationGraph + ?Sized,
{
    let artifacts = tx
        .find_artifacts(&ArtifactFilter::by_location(location_id))
        .await
        .map_err(|e| e.context("find artifacts for location", location_id))?;

    let mut restore_history_items = Vec::new();
    for artifact in &artifacts {
        let items = tx
            .find_restore_history(&RestoreHistoryFilter::by_artifact(&artifact.id))
            .await
            .map_err(|e| e.context("find restore history for artifact", &artifact.id))?;
        restore_history_items.extend(items);
    }

    let scheduled_tasks = tx
        .find_scheduled_tasks(&ScheduledTaskFilter::by_location(location_id))
        .await
        .map_err(|e| e.context("find scheduled tasks for location", location_id))?;

    tracing::debug!(
        location_id,
        artifacts = artifacts.len(),
        restore_history_items = restore_history_items.len(),
        scheduled_tasks = scheduled_tasks.len(),
        "Discovered location dependents"
    );

    Ok(LocationDependents {
        artifacts,
        restore_history_items,
        scheduled_tasks,
    })
}

/// Remove a backup location according to `mode`.
///
/// With [`RemoveMode::Restrict`] nothing is written unless the location has
/// no dependents. With [`RemoveMode::Cascade`] restore history items,
/// artifacts and scheduled tasks are deleted, in that order, before the
/// location itself.
pub async fn remove_location<T>(
    tx: &mut T,
    location_id: &str,
    mode: RemoveMode,
) -> MetadataResult<LocationRemoval>
where
    T: LocationGraph + ?Sized,
{
    find_location_or_err(tx, location_id).await?;
    let dependents = find_location_dependents(tx, location_id).await?;

    if mode == RemoveMode::Restrict
        && let Some((blocker, count)) = dependents.blocker()
    {
        return Err(MetadataError::FailedPrecondition {
            location_id: location_id.to_string(),
            blocker,
            count,
        });
    }

    let mut report = LocationRemoval::default();

    for item in &dependents.restore_history_items {
        let removed = tx
            .delete_restore_history_item(&item.id)
            .await
            .map_err(|e| e.context("delete restore history item", &item.id))?;
        tally(
            &mut report.restore_history_items,
            &mut report.already_removed,
            removed,
            "restore history item",
            &item.id,
        );
    }

    for artifact in &dependents.artifacts {
        let removed = tx
            .delete_artifact(&artifact.id)
            .await
            .map_err(|e| e.context("delete artifact", &artifact.id))?;
        tally(
            &mut report.artifacts,
            &mut report.already_removed,
            removed,
            "artifact",
            &artifact.id,
        );
    }

    for task in &dependents.scheduled_tasks {
        let removed = tx
            .delete_scheduled_task(&task.id)
            .await
            .map_err(|e| e.context("delete scheduled task", &task.id))?;
        tally(
            &mut report.scheduled_tasks,
            &mut report.already_removed,
            removed,
            "scheduled task",
            &task.id,
        );
    }

    let removed = tx
        .delete_location(location_id)
        .await
        .map_err(|e| e.context("delete backup location", location_id))?;
    if removed == 0 {
        return Err(MetadataError::NotFound(format!(
            "backup location with ID {location_id:?}"
        )));
    }

    tracing::info!(
        location_id,
        mode = %mode,
        restore_history_items = report.restore_history_items,
        artifacts = report.artifacts,
        scheduled_tasks = report.scheduled_tasks,
        already_removed = report.already_removed,
        "Removed backup location"
    );

    Ok(report)
}

fn tally(count: &mut u64, already_removed: &mut u64, removed: u64, what: &str, id: &str) {
    if removed == 0 {
        tracing::warn!(id, "{what} disappeared before it could be removed");
        *already_removed += 1;
    } else {
        *count += removed;
    }
}
