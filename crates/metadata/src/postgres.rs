//! PostgreSQL-based metadata store implementation.
//!
//! Unlike SQLite, several transactions run at once here, so the lock methods
//! of [`RoleRepo`] take real row locks with `SELECT ... FOR UPDATE`.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{
    ArtifactRepo, DefaultRoleSource, LocationRepo, RestoreHistoryRepo, RoleRepo,
    ScheduledTaskRepo, SettingsRepo,
};
use crate::store::{MetadataStore, map_conflict};
use crate::{reassign, removal};
use async_trait::async_trait;
use keepsafe_core::config::PgSslMode;
use keepsafe_core::{BackupStatus, RemoveMode, RestoreStatus};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{PgConnection, Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters,
    /// so the password can come from its own environment variable.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Shorthand for [`PostgresStore::from_url`].
    pub async fn new(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        Self::from_url(url, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        // Lock waits count against statement_timeout, so a removal stuck
        // behind another transaction's row locks fails instead of hanging.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement,
        // so we split the schema and execute each statement separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
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

#[async_trait]
impl LocationRepo for PgConnection {
    async fn insert_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO backup_locations (
                id, name, description, location_type,
                filesystem_config, s3_config, client_config,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
        let row = sqlx::query_as::<_, LocationRow>("SELECT * FROM backup_locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn find_location_by_name(&mut self, name: &str) -> MetadataResult<Option<LocationRow>> {
        let row =
            sqlx::query_as::<_, LocationRow>("SELECT * FROM backup_locations WHERE name = $1")
                .bind(name)
                .fetch_optional(&mut *self)
                .await?;
        Ok(row)
    }

    async fn list_locations(&mut self) -> MetadataResult<Vec<LocationRow>> {
        let rows = sqlx::query_as::<_, LocationRow>("SELECT * FROM backup_locations ORDER BY name")
            .fetch_all(&mut *self)
            .await?;
        Ok(rows)
    }

    async fn update_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE backup_locations
            SET name = $1, description = $2, location_type = $3,
                filesystem_config = $4, s3_config = $5, client_config = $6,
                updated_at = $7
            WHERE id = $8
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
            return Err(MetadataError::NotFound(format!(
                "backup location with ID {:?}",
                location.id
            )));
        }
        Ok(())
    }

    async fn delete_location(&mut self, id: &str) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM backup_locations WHERE id = $1")
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ArtifactRepo for PgConnection {
    async fn insert_artifact(&mut self, artifact: &ArtifactRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO artifacts (
                id, name, vendor, db_version, location_id, service_id,
                data_model, mode, status, artifact_type, schedule_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
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
        let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn find_artifact_by_name(&mut self, name: &str) -> MetadataResult<Option<ArtifactRow>> {
        let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn find_artifacts(&mut self, filter: &ArtifactFilter) -> MetadataResult<Vec<ArtifactRow>> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            r#"
            SELECT * FROM artifacts
            WHERE ($1::text IS NULL OR location_id = $1)
              AND ($2::text IS NULL OR service_id = $2)
              AND ($3::text IS NULL OR schedule_id = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY created_at, id
            "#,
        )
        .bind(&filter.location_id)
        .bind(&filter.service_id)
        .bind(&filter.schedule_id)
        .bind(filter.status.map(|s| s.as_str()))
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
        let result = sqlx::query("UPDATE artifacts SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_artifact(&mut self, id: &str) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM artifacts WHERE id = $1")
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RestoreHistoryRepo for PgConnection {
    async fn insert_restore_history_item(&mut self, item: &RestoreHistoryRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO restore_history (
                id, artifact_id, service_id, status, started_at, finished_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
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
        let row =
            sqlx::query_as::<_, RestoreHistoryRow>("SELECT * FROM restore_history WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self)
                .await?;
        Ok(row)
    }

    async fn find_restore_history(
        &mut self,
        filter: &RestoreHistoryFilter,
    ) -> MetadataResult<Vec<RestoreHistoryRow>> {
        let rows = sqlx::query_as::<_, RestoreHistoryRow>(
            r#"
            SELECT * FROM restore_history
            WHERE ($1::text IS NULL OR artifact_id = $1)
              AND ($2::text IS NULL OR service_id = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY started_at, id
            "#,
        )
        .bind(&filter.artifact_id)
        .bind(&filter.service_id)
        .bind(filter.status.map(|s| s.as_str()))
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
            sqlx::query("UPDATE restore_history SET status = $1, finished_at = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(finished_at)
                .bind(id)
                .execute(&mut *self)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_restore_history_item(&mut self, id: &str) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM restore_history WHERE id = $1")
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ScheduledTaskRepo for PgConnection {
    async fn insert_scheduled_task(&mut self, task: &ScheduledTaskRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (
                id, name, cron_expression, task_type, location_id, disabled,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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

    async fn find_scheduled_task(&mut self, id: &str) -> MetadataResult<Option<ScheduledTaskRow>> {
        let row =
            sqlx::query_as::<_, ScheduledTaskRow>("SELECT * FROM scheduled_tasks WHERE id = $1")
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
            WHERE ($1::text IS NULL OR location_id = $1)
              AND ($2::boolean IS NULL OR disabled = $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(&filter.location_id)
        .bind(filter.disabled)
        .fetch_all(&mut *self)
        .await?;
        Ok(rows)
    }

    async fn delete_scheduled_task(&mut self, id: &str) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RoleRepo for PgConnection {
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
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(filter)
        .bind(now)
        .fetch_one(&mut *self)
        .await
        .map_err(|e| map_conflict(e, || format!("role with title {title:?}")))?;
        Ok(row)
    }

    async fn find_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn find_role_by_title(&mut self, title: &str) -> MetadataResult<Option<RoleRow>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE title = $1")
            .bind(title)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn lock_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row)
    }

    async fn list_roles(&mut self) -> MetadataResult<Vec<RoleRow>> {
        let rows = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles ORDER BY id")
            .fetch_all(&mut *self)
            .await?;
        Ok(rows)
    }

    async fn delete_role(&mut self, role_id: i64) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }

    async fn users_with_role(&mut self, role_id: i64) -> MetadataResult<Vec<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM user_roles WHERE role_id = $1 ORDER BY user_id")
                .bind(role_id)
                .fetch_all(&mut *self)
                .await?;
        Ok(ids)
    }

    async fn user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            "SELECT * FROM user_roles WHERE user_id = $1 ORDER BY role_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self)
        .await?;
        Ok(rows)
    }

    async fn lock_user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
        // Rows deleted by the transaction we waited on are dropped from the
        // result once the lock is granted.
        let rows = sqlx::query_as::<_, UserRoleRow>(
            "SELECT * FROM user_roles WHERE user_id = $1 ORDER BY role_id FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut *self)
        .await?;
        Ok(rows)
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
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, role_id) DO NOTHING
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
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_user_roles(&mut self, user_id: i64) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_role_memberships(&mut self, role_id: i64) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
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
            UPDATE user_roles SET role_id = $3
            WHERE user_id = $1 AND role_id = $2
              AND NOT EXISTS (
                  SELECT 1 FROM user_roles WHERE user_id = $1 AND role_id = $3
              )
            "#,
        )
        .bind(user_id)
        .bind(from_role)
        .bind(to_role)
        .execute(&mut *self)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DefaultRoleSource for PgConnection {
    async fn default_role_id(&mut self) -> MetadataResult<Option<i64>> {
        // None: no settings row. Some(None): row exists, no default set.
        let value: Option<Option<i64>> =
            sqlx::query_scalar("SELECT default_role_id FROM settings WHERE id = 1")
                .fetch_optional(&mut *self)
                .await?;
        Ok(value.flatten())
    }
}

#[async_trait]
impl SettingsRepo for PgConnection {
    async fn set_default_role_id(&mut self, role_id: i64) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, default_role_id)
            VALUES (1, $1)
            ON CONFLICT(id) DO UPDATE
            SET default_role_id = EXCLUDED.default_role_id
            "#,
        )
        .bind(role_id)
        .execute(&mut *self)
        .await?;
        Ok(())
    }
}
