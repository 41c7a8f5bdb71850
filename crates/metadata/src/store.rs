//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{LocationRemoval, RoleRemoval};
use crate::{reassign, removal};
use async_trait::async_trait;
use keepsafe_core::RemoveMode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Pool-level handle on a metadata database.
///
/// The repository traits in [`crate::repos`] are implemented for a single
/// connection so that callers can compose several operations in one
/// transaction. The removal methods here are the common case: one removal,
/// one transaction, committed on success and rolled back on any error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// See [`removal::remove_location`].
    async fn remove_location(
        &self,
        location_id: &str,
        mode: RemoveMode,
    ) -> MetadataResult<LocationRemoval>;

    /// See [`reassign::delete_role`].
    async fn delete_role(
        &self,
        role_id: i64,
        replacement: Option<i64>,
    ) -> MetadataResult<RoleRemoval>;
}

/// SQLite-based metadata store.
///
/// SQLite has no row locks; the pool holds a single connection, so every
/// transaction runs alone.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "Opened SQLite metadata store");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn remove_location(
        &self,
        location_id: &str,
        mode: RemoveMode,
    ) -> MetadataResult<LocationRemoval> {
        let mut tx = self.pool.begin().await?;
        let report = removal::remove_location(&mut *tx, location_id, mode).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn delete_role(
        &self,
        role_id: i64,
        replacement: Option<i64>,
    ) -> MetadataResult<RoleRemoval> {
        let mut tx = self.pool.begin().await?;
        let report = reassign::delete_role(&mut *tx, role_id, replacement).await?;
        tx.commit().await?;
        Ok(report)
    }
}

/// Map a unique-constraint failure to `AlreadyExists`, anything else to a
/// plain database error.
pub(crate) fn map_conflict(e: sqlx::Error, what: impl FnOnce() -> String) -> MetadataError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return MetadataError::AlreadyExists(what());
    }
    MetadataError::Database(e)
}

// Repository traits for a single SQLite connection.
mod sqlite_impl {
    use super::map_conflict;
    use crate::error::MetadataResult;
    use crate::models::*;
    use crate::repos::{
        ArtifactRepo, DefaultRoleSource, LocationRepo, RestoreHistoryRepo, RoleRepo,
        ScheduledTaskRepo, SettingsRepo,
    };
    use async_trait::async_trait;
    use keepsafe_core::{BackupStatus, RestoreStatus};
    use sqlx::SqliteConnection;
    use time::OffsetDateTime;

    #[async_trait]
    impl LocationRepo for SqliteConnection {
        async fn insert_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO backup_locations (
                    id, name, description, location_type,
                    filesystem_config, s3_config, client_config,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&location.id)
            .bind(&location.name)
            .bind(&location.description)
            .bind(&location.location_type)
            .bind(&location.filesystem_config)
            .bind(&location.s3_config)
            .bind(&location.client_config)
            .bind(location.created_at)
            .bind(location.updated_at)
            .execute(&mut *self)
            .await
            .map_err(|e| map_conflict(e, || format!("location with name {:?}", location.name)))?;
            Ok(())
        }

        async fn find_location(&mut self, id: &str) -> MetadataResult<Option<LocationRow>> {
            let row = sqlx::query_as::<_, LocationRow>(
                "SELECT * FROM backup_locations WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *self)
            .await?;
            Ok(row)
        }

        async fn find_location_by_name(
            &mut self,
            name: &str,
        ) -> MetadataResult<Option<LocationRow>> {
            let row = sqlx::query_as::<_, LocationRow>(
                "SELECT * FROM backup_locations WHERE name = ?",
            )
            .bind(name)
            .fetch_optional(&mut *self)
            .await?;
            Ok(row)
        }

        async fn list_locations(&mut self) -> MetadataResult<Vec<LocationRow>> {
            let rows =
                sqlx::query_as::<_, LocationRow>("SELECT * FROM backup_locations ORDER BY name")
                    .fetch_all(&mut *self)
                    .await?;
            Ok(rows)
        }

        async fn update_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
            let result = sqlx::query(
                r#"
                UPDATE backup_locations
                SET name = ?, description = ?, location_type = ?,
                    filesystem_config = ?, s3_config = ?, client_config = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&location.name)
            .bind(&location.description)
            .bind(&location.location_type)
            .bind(&location.filesystem_config)
            .bind(&location.s3_config)
            .bind(&location.client_config)
            .bind(location.updated_at)
            .bind(&location.id)
            .execute(&mut *self)
            .await
            .map_err(|e| map_conflict(e, || format!("location with name {:?}", location.name)))?;

            if result.rows_affected() == 0 {
                return Err(crate::MetadataError::NotFound(format!(
                    "backup location with ID {:?}",
                    location.id
                )));
            }
            Ok(())
        }

        async fn delete_location(&mut self, id: &str) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM backup_locations WHERE id = ?")
                .bind(id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl ArtifactRepo for SqliteConnection {
        async fn insert_artifact(&mut self, artifact: &ArtifactRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO artifacts (
                    id, name, vendor, db_version, location_id, service_id,
                    data_model, mode, status, artifact_type, schedule_id,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&artifact.id)
            .bind(&artifact.name)
            .bind(&artifact.vendor)
            .bind(&artifact.db_version)
            .bind(&artifact.location_id)
            .bind(&artifact.service_id)
            .bind(&artifact.data_model)
            .bind(&artifact.mode)
            .bind(&artifact.status)
            .bind(&artifact.artifact_type)
            .bind(&artifact.schedule_id)
            .bind(artifact.created_at)
            .bind(artifact.updated_at)
            .execute(&mut *self)
            .await
            .map_err(|e| map_conflict(e, || format!("artifact with name {:?}", artifact.name)))?;
            Ok(())
        }

        async fn find_artifact(&mut self, id: &str) -> MetadataResult<Option<ArtifactRow>> {
            let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self)
                .await?;
            Ok(row)
        }

        async fn find_artifact_by_name(
            &mut self,
            name: &str,
        ) -> MetadataResult<Option<ArtifactRow>> {
            let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE name = ?")
                .bind(name)
                .fetch_optional(&mut *self)
                .await?;
            Ok(row)
        }

        async fn find_artifacts(
            &mut self,
            filter: &ArtifactFilter,
        ) -> MetadataResult<Vec<ArtifactRow>> {
            let status = filter.status.map(|s| s.as_str());
            let rows = sqlx::query_as::<_, ArtifactRow>(
                r#"
                SELECT * FROM artifacts
                WHERE (? IS NULL OR location_id = ?)
                  AND (? IS NULL OR service_id = ?)
                  AND (? IS NULL OR schedule_id = ?)
                  AND (? IS NULL OR status = ?)
                ORDER BY created_at, id
                "#,
            )
            .bind(&filter.location_id)
            .bind(&filter.location_id)
            .bind(&filter.service_id)
            .bind(&filter.service_id)
            .bind(&filter.schedule_id)
            .bind(&filter.schedule_id)
            .bind(status)
            .bind(status)
            .fetch_all(&mut *self)
            .await?;
            Ok(rows)
        }

        async fn update_artifact_status(
            &mut self,
            id: &str,
            status: BackupStatus,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<u64> {
            let result =
                sqlx::query("UPDATE artifacts SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(updated_at)
                    .bind(id)
                    .execute(&mut *self)
                    .await?;
            Ok(result.rows_affected())
        }

        async fn delete_artifact(&mut self, id: &str) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM artifacts WHERE id = ?")
                .bind(id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl RestoreHistoryRepo for SqliteConnection {
        async fn insert_restore_history_item(
            &mut self,
            item: &RestoreHistoryRow,
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO restore_history (
                    id, artifact_id, service_id, status, started_at, finished_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.artifact_id)
            .bind(&item.service_id)
            .bind(&item.status)
            .bind(item.started_at)
            .bind(item.finished_at)
            .execute(&mut *self)
            .await?;
            Ok(())
        }

        async fn find_restore_history_item(
            &mut self,
            id: &str,
        ) -> MetadataResult<Option<RestoreHistoryRow>> {
            let row = sqlx::query_as::<_, RestoreHistoryRow>(
                "SELECT * FROM restore_history WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *self)
            .await?;
            Ok(row)
        }

        async fn find_restore_history(
            &mut self,
            filter: &RestoreHistoryFilter,
        ) -> MetadataResult<Vec<RestoreHistoryRow>> {
            let status = filter.status.map(|s| s.as_str());
            let rows = sqlx::query_as::<_, RestoreHistoryRow>(
                r#"
                SELECT * FROM restore_history
                WHERE (? IS NULL OR artifact_id = ?)
                  AND (? IS NULL OR service_id = ?)
                  AND (? IS NULL OR status = ?)
                ORDER BY started_at, id
                "#,
            )
            .bind(&filter.artifact_id)
            .bind(&filter.artifact_id)
            .bind(&filter.service_id)
            .bind(&filter.service_id)
            .bind(status)
            .bind(status)
            .fetch_all(&mut *self)
            .await?;
            Ok(rows)
        }

        async fn update_restore_status(
            &mut self,
            id: &str,
            status: RestoreStatus,
            finished_at: Option<OffsetDateTime>,
        ) -> MetadataResult<u64> {
            let result =
                sqlx::query("UPDATE restore_history SET status = ?, finished_at = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(finished_at)
                    .bind(id)
                    .execute(&mut *self)
                    .await?;
            Ok(result.rows_affected())
        }

        async fn delete_restore_history_item(&mut self, id: &str) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM restore_history WHERE id = ?")
                .bind(id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl ScheduledTaskRepo for SqliteConnection {
        async fn insert_scheduled_task(&mut self, task: &ScheduledTaskRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO scheduled_tasks (
                    id, name, cron_expression, task_type, location_id, disabled,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&task.name)
            .bind(&task.cron_expression)
            .bind(&task.task_type)
            .bind(&task.location_id)
            .bind(task.disabled)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&mut *self)
            .await
            .map_err(|e| map_conflict(e, || format!("scheduled task with name {:?}", task.name)))?;
            Ok(())
        }

        async fn find_scheduled_task(
            &mut self,
            id: &str,
        ) -> MetadataResult<Option<ScheduledTaskRow>> {
            let row = sqlx::query_as::<_, ScheduledTaskRow>(
                "SELECT * FROM scheduled_tasks WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *self)
            .await?;
            Ok(row)
        }

        async fn find_scheduled_tasks(
            &mut self,
            filter: &ScheduledTaskFilter,
        ) -> MetadataResult<Vec<ScheduledTaskRow>> {
            let rows = sqlx::query_as::<_, ScheduledTaskRow>(
                r#"
                SELECT * FROM scheduled_tasks
                WHERE (? IS NULL OR location_id = ?)
                  AND (? IS NULL OR disabled = ?)
                ORDER BY created_at, id
                "#,
            )
            .bind(&filter.location_id)
            .bind(&filter.location_id)
            .bind(filter.disabled)
            .bind(filter.disabled)
            .fetch_all(&mut *self)
            .await?;
            Ok(rows)
        }

        async fn delete_scheduled_task(&mut self, id: &str) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
                .bind(id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl RoleRepo for SqliteConnection {
        async fn insert_role(
            &mut self,
            title: &str,
            description: &str,
            filter: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<RoleRow> {
            let row = sqlx::query_as::<_, RoleRow>(
                r#"
                INSERT INTO roles (title, description, filter, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(title)
            .bind(description)
            .bind(filter)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *self)
            .await
            .map_err(|e| map_conflict(e, || format!("role with title {title:?}")))?;
            Ok(row)
        }

        async fn find_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
            let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = ?")
                .bind(role_id)
                .fetch_optional(&mut *self)
                .await?;
            Ok(row)
        }

        async fn find_role_by_title(&mut self, title: &str) -> MetadataResult<Option<RoleRow>> {
            let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE title = ?")
                .bind(title)
                .fetch_optional(&mut *self)
                .await?;
            Ok(row)
        }

        async fn lock_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
            // The single pooled connection already serializes transactions.
            self.find_role(role_id).await
        }

        async fn list_roles(&mut self) -> MetadataResult<Vec<RoleRow>> {
            let rows = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles ORDER BY id")
                .fetch_all(&mut *self)
                .await?;
            Ok(rows)
        }

        async fn delete_role(&mut self, role_id: i64) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM roles WHERE id = ?")
                .bind(role_id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }

        async fn users_with_role(&mut self, role_id: i64) -> MetadataResult<Vec<i64>> {
            let ids: Vec<i64> = sqlx::query_scalar(
                "SELECT user_id FROM user_roles WHERE role_id = ? ORDER BY user_id",
            )
            .bind(role_id)
            .fetch_all(&mut *self)
            .await?;
            Ok(ids)
        }

        async fn user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
            let rows = sqlx::query_as::<_, UserRoleRow>(
                "SELECT * FROM user_roles WHERE user_id = ? ORDER BY role_id",
            )
            .bind(user_id)
            .fetch_all(&mut *self)
            .await?;
            Ok(rows)
        }

        async fn lock_user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
            self.user_roles(user_id).await
        }

        async fn insert_user_role(
            &mut self,
            user_id: i64,
            role_id: i64,
            now: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role_id)
            .bind(now)
            .execute(&mut *self)
            .await?;
            Ok(())
        }

        async fn delete_user_role(&mut self, user_id: i64, role_id: i64) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }

        async fn delete_user_roles(&mut self, user_id: i64) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }

        async fn delete_role_memberships(&mut self, role_id: i64) -> MetadataResult<u64> {
            let result = sqlx::query("DELETE FROM user_roles WHERE role_id = ?")
                .bind(role_id)
                .execute(&mut *self)
                .await?;
            Ok(result.rows_affected())
        }

        async fn reassign_user_role(
            &mut self,
            user_id: i64,
            from_role: i64,
            to_role: i64,
        ) -> MetadataResult<u64> {
            let result = sqlx::query(
                r#"
                UPDATE user_roles SET role_id = ?
                WHERE user_id = ? AND role_id = ?
                  AND NOT EXISTS (
                      SELECT 1 FROM user_roles WHERE user_id = ? AND role_id = ?
                  )
                "#,
            )
            .bind(to_role)
            .bind(user_id)
            .bind(from_role)
            .bind(user_id)
            .bind(to_role)
            .execute(&mut *self)
            .await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl DefaultRoleSource for SqliteConnection {
        async fn default_role_id(&mut self) -> MetadataResult<Option<i64>> {
            let value: Option<Option<i64>> =
                sqlx::query_scalar("SELECT default_role_id FROM settings WHERE id = 1")
                    .fetch_optional(&mut *self)
                    .await?;
            Ok(value.flatten())
        }
    }

    #[async_trait]
    impl SettingsRepo for SqliteConnection {
        async fn set_default_role_id(&mut self, role_id: i64) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO settings (id, default_role_id) VALUES (1, ?)
                ON CONFLICT(id) DO UPDATE SET default_role_id = excluded.default_role_id
                "#,
            )
            .bind(role_id)
            .execute(&mut *self)
            .await?;
            Ok(())
        }
    }
}

impl std::convert::From<std::io::Error> for crate::MetadataError {
    fn from(e: std::io::Error) -> Self {
        crate::MetadataError::Internal(format!("I/O error: {e}"))
    }
}

/// Database schema.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS backup_locations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    location_type TEXT NOT NULL,
    filesystem_config TEXT,
    s3_config TEXT,
    client_config TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    vendor TEXT NOT NULL,
    db_version TEXT NOT NULL DEFAULT '',
    location_id TEXT NOT NULL REFERENCES backup_locations(id),
    service_id TEXT NOT NULL,
    data_model TEXT NOT NULL,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    artifact_type TEXT NOT NULL,
    -- No foreign key: artifacts outlive the schedule that produced them.
    schedule_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_artifacts_location ON artifacts(location_id);

CREATE TABLE IF NOT EXISTS restore_history (
    id TEXT PRIMARY KEY,
    artifact_id TEXT NOT NULL REFERENCES artifacts(id),
    service_id TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_restore_history_artifact ON restore_history(artifact_id);

CREATE TABLE IF NOT EXISTS scheduled_tasks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    cron_expression TEXT NOT NULL,
    task_type TEXT NOT NULL,
    location_id TEXT NOT NULL REFERENCES backup_locations(id),
    disabled INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_location ON scheduled_tasks(location_id);

CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    filter TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL,
    role_id INTEGER NOT NULL REFERENCES roles(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, role_id)
);
CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles(role_id);

CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    default_role_id INTEGER REFERENCES roles(id)
);

INSERT OR IGNORE INTO roles (id, title, description, filter, created_at, updated_at)
VALUES (1, 'Full access', 'Default role granting access to every service', '',
        strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));

INSERT OR IGNORE INTO settings (id, default_role_id) VALUES (1, 1);
"#;
