//! Role removal with membership reassignment.
//!
//! Deleting a role must not strand users without any role when the operator
//! names a replacement. For each member the engine locks that user's
//! membership rows, then either drops the edge (the user keeps other roles)
//! or rewrites it to the replacement (it was their last role).
//!
//! The per-user lock is what keeps two concurrent role deletions from both
//! deciding "this user has another role" and leaving them with none.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{RoleRemoval, RoleRow};
use crate::repos::{RoleGraph, RoleRepo};

/// Lock a role row or fail with `NotFound`.
async fn lock_role_or_err<T>(tx: &mut T, role_id: i64) -> MetadataResult<RoleRow>
where
    T: RoleRepo + ?Sized,
{
    tx.lock_role(role_id)
        .await
        .map_err(|e| e.context("lock role", role_id))?
        .ok_or_else(|| MetadataError::NotFound(format!("role with ID {role_id}")))
}

/// Delete a role, moving its members onto `replacement` where needed.
///
/// `replacement = None` removes every membership edge of the role, which may
/// leave users without roles.
pub async fn delete_role<T>(
    tx: &mut T,
    role_id: i64,
    replacement: Option<i64>,
) -> MetadataResult<RoleRemoval>
where
    T: RoleGraph + ?Sized,
{
    lock_role_or_err(tx, role_id).await?;

    let default_role_id = tx
        .default_role_id()
        .await
        .map_err(|e| e.context("read default role", role_id))?;
    if default_role_id == Some(role_id) {
        return Err(MetadataError::IsDefaultRole { role_id });
    }

    let report = replace_role(tx, role_id, replacement).await?;

    let removed = tx
        .delete_role(role_id)
        .await
        .map_err(|e| e.context("delete role", role_id))?;
    if removed == 0 {
        return Err(MetadataError::NotFound(format!("role with ID {role_id}")));
    }

    tracing::info!(
        role_id,
        replacement = ?replacement,
        memberships_removed = report.memberships_removed,
        memberships_reassigned = report.memberships_reassigned,
        users_affected = report.users_affected,
        "Deleted role"
    );

    Ok(report)
}

/// [`delete_role`] for callers that encode "no replacement" as `0`.
pub async fn delete_role_by_ids<T>(
    tx: &mut T,
    role_id: i64,
    replacement_role_id: i64,
) -> MetadataResult<RoleRemoval>
where
    T: RoleGraph + ?Sized,
{
    let replacement = (replacement_role_id != 0).then_some(replacement_role_id);
    delete_role(tx, role_id, replacement).await
}

/// Detach every member from `role_id`.
///
/// Users who hold other roles just lose this one. Users for whom it is the
/// only role are moved to `replacement`, or left role-less when there is
/// none.
pub async fn replace_role<T>(
    tx: &mut T,
    role_id: i64,
    replacement: Option<i64>,
) -> MetadataResult<RoleRemoval>
where
    T: RoleRepo + ?Sized,
{
    let Some(new_role_id) = replacement else {
        let removed = tx
            .delete_role_memberships(role_id)
            .await
            .map_err(|e| e.context("delete role memberships", role_id))?;
        return Ok(RoleRemoval {
            memberships_removed: removed,
            memberships_reassigned: 0,
            users_affected: removed,
        });
    };

    if new_role_id == role_id {
        return Err(MetadataError::InvalidArgument(format!(
            "role {role_id} cannot replace itself"
        )));
    }
    lock_role_or_err(tx, new_role_id).await?;

    let users = tx
        .users_with_role(role_id)
        .await
        .map_err(|e| e.context("find users with role", role_id))?;

    let mut report = RoleRemoval::default();
    for user_id in users {
        let edges = tx
            .lock_user_roles(user_id)
            .await
            .map_err(|e| e.context("lock user roles", user_id))?;

        if !edges.iter().any(|edge| edge.role_id == role_id) {
            // Another transaction detached the user while we waited for the lock.
            tracing::debug!(user_id, role_id, "User no longer holds role");
            continue;
        }
        report.users_affected += 1;

        if edges.len() > 1 {
            report.memberships_removed += tx
                .delete_user_role(user_id, role_id)
                .await
                .map_err(|e| e.context("delete user role", user_id))?;
            continue;
        }

        let rewritten = tx
            .reassign_user_role(user_id, role_id, new_role_id)
            .await
            .map_err(|e| e.context("reassign user role", user_id))?;
        if rewritten > 0 {
            report.memberships_reassigned += rewritten;
        } else {
            // The guard saw an existing (user, new_role_id) edge.
            report.memberships_removed += tx
                .delete_user_role(user_id, role_id)
                .await
                .map_err(|e| e.context("delete user role", user_id))?;
        }
    }

    Ok(report)
}
