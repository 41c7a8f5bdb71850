//! Global settings access.

use crate::error::MetadataResult;
use async_trait::async_trait;

/// Read access to the role assigned to new users.
///
/// Read at call time so a removal always sees the current value.
#[async_trait]
pub trait DefaultRoleSource: Send {
    async fn default_role_id(&mut self) -> MetadataResult<Option<i64>>;
}

/// Write access to the settings singleton.
#[async_trait]
pub trait SettingsRepo: DefaultRoleSource {
    async fn set_default_role_id(&mut self, role_id: i64) -> MetadataResult<()>;
}
