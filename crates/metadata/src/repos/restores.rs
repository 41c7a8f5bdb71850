//! Restore history repository.

use crate::error::MetadataResult;
use crate::models::{RestoreHistoryFilter, RestoreHistoryRow};
use async_trait::async_trait;
use keepsafe_core::RestoreStatus;
use time::OffsetDateTime;

/// Repository for restore history items.
#[async_trait]
pub trait RestoreHistoryRepo: Send {
    async fn insert_restore_history_item(&mut self, item: &RestoreHistoryRow) -> MetadataResult<()>;

    async fn find_restore_history_item(
        &mut self,
        id: &str,
    ) -> MetadataResult<Option<RestoreHistoryRow>>;

    /// Items matching every predicate set in `filter`, oldest first.
    async fn find_restore_history(
        &mut self,
        filter: &RestoreHistoryFilter,
    ) -> MetadataResult<Vec<RestoreHistoryRow>>;

    async fn update_restore_status(
        &mut self,
        id: &str,
        status: RestoreStatus,
        finished_at: Option<OffsetDateTime>,
    ) -> MetadataResult<u64>;

    /// Returns the number of rows removed.
    async fn delete_restore_history_item(&mut self, id: &str) -> MetadataResult<u64>;
}
