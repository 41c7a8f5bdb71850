//! Backup artifact repository.

use crate::error::MetadataResult;
use crate::models::{ArtifactFilter, ArtifactRow};
use async_trait::async_trait;
use keepsafe_core::BackupStatus;
use time::OffsetDateTime;

/// Repository for backup artifacts.
#[async_trait]
pub trait ArtifactRepo: Send {
    async fn insert_artifact(&mut self, artifact: &ArtifactRow) -> MetadataResult<()>;

    async fn find_artifact(&mut self, id: &str) -> MetadataResult<Option<ArtifactRow>>;

    async fn find_artifact_by_name(&mut self, name: &str) -> MetadataResult<Option<ArtifactRow>>;

    /// Artifacts matching every predicate set in `filter`, oldest first.
    async fn find_artifacts(&mut self, filter: &ArtifactFilter) -> MetadataResult<Vec<ArtifactRow>>;

    /// Set the status of an artifact. Returns the number of rows updated.
    async fn update_artifact_status(
        &mut self,
        id: &str,
        status: BackupStatus,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<u64>;

    /// Returns the number of rows removed.
    async fn delete_artifact(&mut self, id: &str) -> MetadataResult<u64>;
}
