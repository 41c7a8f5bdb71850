//! Role and membership repository.

use crate::error::MetadataResult;
use crate::models::{RoleRow, UserRoleRow};
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for roles and user-role membership edges.
#[async_trait]
pub trait RoleRepo: Send {
    /// Insert a role and return it with its assigned ID.
    async fn insert_role(
        &mut self,
        title: &str,
        description: &str,
        filter: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<RoleRow>;

    async fn find_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>>;

    async fn find_role_by_title(&mut self, title: &str) -> MetadataResult<Option<RoleRow>>;

    /// Fetch a role and hold an exclusive row lock on it until the
    /// surrounding transaction ends.
    async fn lock_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>>;

    async fn list_roles(&mut self) -> MetadataResult<Vec<RoleRow>>;

    /// Returns the number of rows removed.
    async fn delete_role(&mut self, role_id: i64) -> MetadataResult<u64>;

    /// IDs of users holding `role_id`, ascending.
    async fn users_with_role(&mut self, role_id: i64) -> MetadataResult<Vec<i64>>;

    async fn user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>>;

    /// Fetch all of a user's membership edges and hold exclusive row locks
    /// on them until the surrounding transaction ends.
    async fn lock_user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>>;

    async fn insert_user_role(
        &mut self,
        user_id: i64,
        role_id: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Returns the number of rows removed.
    async fn delete_user_role(&mut self, user_id: i64, role_id: i64) -> MetadataResult<u64>;

    /// Remove every edge of one user.
    async fn delete_user_roles(&mut self, user_id: i64) -> MetadataResult<u64>;

    /// Remove every edge pointing at `role_id`.
    async fn delete_role_memberships(&mut self, role_id: i64) -> MetadataResult<u64>;

    /// Point the `(user_id, from_role)` edge at `to_role`, unless the user
    /// already holds `to_role`. Returns the number of rows updated.
    async fn reassign_user_role(
        &mut self,
        user_id: i64,
        from_role: i64,
        to_role: i64,
    ) -> MetadataResult<u64>;
}
