//! Scheduled task repository.

use crate::error::MetadataResult;
use crate::models::{ScheduledTaskFilter, ScheduledTaskRow};
use async_trait::async_trait;

/// Repository for scheduled backup tasks.
#[async_trait]
pub trait ScheduledTaskRepo: Send {
    async fn insert_scheduled_task(&mut self, task: &ScheduledTaskRow) -> MetadataResult<()>;

    async fn find_scheduled_task(&mut self, id: &str) -> MetadataResult<Option<ScheduledTaskRow>>;

    async fn find_scheduled_tasks(
        &mut self,
        filter: &ScheduledTaskFilter,
    ) -> MetadataResult<Vec<ScheduledTaskRow>>;

    /// Returns the number of rows removed.
    async fn delete_scheduled_task(&mut self, id: &str) -> MetadataResult<u64>;
}
