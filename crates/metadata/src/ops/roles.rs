//! Role constructors and membership management.

use super::require;
use crate::error::{MetadataError, MetadataResult};
use crate::models::RoleRow;
use crate::repos::{RoleRepo, SettingsRepo};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Parameters for [`create_role`].
#[derive(Debug, Clone, Default)]
pub struct CreateRoleParams {
    pub title: String,
    pub description: String,
    /// Label selector limiting what the role can see. Empty means everything.
    pub filter: String,
}

pub async fn create_role<T>(tx: &mut T, params: CreateRoleParams) -> MetadataResult<RoleRow>
where
    T: RoleRepo + ?Sized,
{
    require("title", &params.title)?;
    if tx.find_role_by_title(&params.title).await?.is_some() {
        return Err(MetadataError::AlreadyExists(format!(
            "role with title {:?}",
            params.title
        )));
    }
    tx.insert_role(
        &params.title,
        &params.description,
        &params.filter,
        OffsetDateTime::now_utc(),
    )
    .await
}

/// Replace the full role set of a user.
///
/// Every role must exist; duplicates collapse to one edge.
pub async fn assign_roles<T>(tx: &mut T, user_id: i64, role_ids: &[i64]) -> MetadataResult<()>
where
    T: RoleRepo + ?Sized,
{
    let role_ids: BTreeSet<i64> = role_ids.iter().copied().collect();
    for role_id in &role_ids {
        if tx.find_role(*role_id).await?.is_none() {
            return Err(MetadataError::NotFound(format!("role with ID {role_id}")));
        }
    }

    tx.lock_user_roles(user_id).await?;
    tx.delete_user_roles(user_id).await?;
    let now = OffsetDateTime::now_utc();
    for role_id in role_ids {
        tx.insert_user_role(user_id, role_id, now).await?;
    }
    Ok(())
}

/// Make `role_id` the role assigned to new users.
///
/// The role row stays locked until the transaction ends, so a concurrent
/// role deletion cannot remove it in between.
pub async fn set_default_role<T>(tx: &mut T, role_id: i64) -> MetadataResult<()>
where
    T: RoleRepo + SettingsRepo + ?Sized,
{
    if tx.lock_role(role_id).await?.is_none() {
        return Err(MetadataError::NotFound(format!("role with ID {role_id}")));
    }
    tx.set_default_role_id(role_id).await
}
