//! Backup location repository.

use crate::error::MetadataResult;
use crate::models::LocationRow;
use async_trait::async_trait;

/// Repository for backup locations.
#[async_trait]
pub trait LocationRepo: Send {
    async fn insert_location(&mut self, location: &LocationRow) -> MetadataResult<()>;

    async fn find_location(&mut self, id: &str) -> MetadataResult<Option<LocationRow>>;

    async fn find_location_by_name(&mut self, name: &str) -> MetadataResult<Option<LocationRow>>;

    /// List all locations ordered by name.
    async fn list_locations(&mut self) -> MetadataResult<Vec<LocationRow>>;

    /// Overwrite name, description and configuration.
    async fn update_location(&mut self, location: &LocationRow) -> MetadataResult<()>;

    /// Delete a location row. Returns the number of rows removed.
    ///
    /// Fails with a foreign-key error while dependents exist; go through
    /// [`crate::removal::remove_location`] instead.
    async fn delete_location(&mut self, id: &str) -> MetadataResult<u64>;
}
