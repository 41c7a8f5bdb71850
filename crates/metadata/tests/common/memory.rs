//! In-memory metadata backend for tests that need to observe or disturb the
//! removal engines: it records every repository call, can fail a chosen
//! call, and takes real (tokio) locks for the role-locking methods so two
//! removals can be interleaved deterministically.
//!
//! Writes go straight to shared state. [`MemoryTx::rollback`] restores the
//! snapshot taken at [`MemoryDb::begin`], which is only meaningful while a
//! single transaction is writing.

use async_trait::async_trait;
use keepsafe_core::{BackupStatus, RestoreStatus};
use keepsafe_metadata::models::*;
use keepsafe_metadata::repos::{
    ArtifactRepo, DefaultRoleSource, LocationRepo, RestoreHistoryRepo, RoleRepo,
    ScheduledTaskRepo, SettingsRepo,
};
use keepsafe_metadata::{MetadataError, MetadataResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub locations: BTreeMap<String, LocationRow>,
    pub artifacts: BTreeMap<String, ArtifactRow>,
    pub restores: BTreeMap<String, RestoreHistoryRow>,
    pub tasks: BTreeMap<String, ScheduledTaskRow>,
    pub roles: BTreeMap<i64, RoleRow>,
    pub user_roles: BTreeMap<(i64, i64), UserRoleRow>,
    pub default_role_id: Option<i64>,
    next_role_id: i64,
}

impl MemoryState {
    pub fn roles_of(&self, user_id: i64) -> Vec<i64> {
        self.user_roles
            .keys()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, role)| *role)
            .collect()
    }
}

#[derive(Default)]
struct Locks {
    roles: HashMap<i64, Arc<AsyncMutex<()>>>,
    users: HashMap<i64, Arc<AsyncMutex<()>>>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<MemoryState>,
    ops: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    vanish_on: Mutex<Option<String>>,
    locks: Mutex<Locks>,
}

/// Handle on the shared in-memory database.
#[derive(Clone, Default)]
pub struct MemoryDb {
    shared: Arc<Shared>,
}

#[allow(dead_code)]
impl MemoryDb {
    /// An empty database with the default "Full access" role (ID 1).
    pub fn new() -> Self {
        let db = Self::default();
        db.with_state(|state| {
            let now = OffsetDateTime::now_utc();
            state.roles.insert(
                1,
                RoleRow {
                    id: 1,
                    title: "Full access".to_string(),
                    description: String::new(),
                    filter: String::new(),
                    created_at: now,
                    updated_at: now,
                },
            );
            state.next_role_id = 2;
            state.default_role_id = Some(1);
        });
        db
    }

    pub fn begin(&self) -> MemoryTx {
        MemoryTx {
            db: self.clone(),
            snapshot: self.snapshot(),
            held: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.with_state(|state| state.clone())
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.shared.state.lock().expect("state lock poisoned");
        f(&mut state)
    }

    /// Repository calls made so far, as `"<method> <target>"`.
    pub fn ops(&self) -> Vec<String> {
        self.shared.ops.lock().expect("ops lock poisoned").clone()
    }

    pub fn clear_ops(&self) {
        self.shared.ops.lock().expect("ops lock poisoned").clear();
    }

    /// Make the next call whose op string starts with `prefix` fail.
    pub fn fail_on(&self, prefix: &str) {
        *self.shared.fail_on.lock().expect("fail lock poisoned") = Some(prefix.to_string());
    }

    /// Make the row targeted by the next call whose op string starts with
    /// `prefix` disappear just before the call, as if another transaction
    /// had deleted it.
    pub fn vanish_on(&self, prefix: &str) {
        *self.shared.vanish_on.lock().expect("vanish lock poisoned") = Some(prefix.to_string());
    }

    fn take_vanished(&self, method: &str, target: &str) -> bool {
        let op = format!("{method} {target}");
        let mut vanish_on = self.shared.vanish_on.lock().expect("vanish lock poisoned");
        if vanish_on.as_deref().is_some_and(|prefix| op.starts_with(prefix)) {
            *vanish_on = None;
            return true;
        }
        false
    }

    fn record(&self, method: &str, target: impl std::fmt::Display) -> MetadataResult<()> {
        let op = format!("{method} {target}");
        let mut fail_on = self.shared.fail_on.lock().expect("fail lock poisoned");
        if let Some(prefix) = fail_on.as_deref()
            && op.starts_with(prefix)
        {
            *fail_on = None;
            return Err(MetadataError::Database(sqlx::Error::Protocol(format!(
                "injected failure on {op}"
            ))));
        }
        self.shared.ops.lock().expect("ops lock poisoned").push(op);
        Ok(())
    }

    fn role_lock(&self, role_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.shared.locks.lock().expect("locks poisoned");
        locks.roles.entry(role_id).or_default().clone()
    }

    fn user_lock(&self, user_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.shared.locks.lock().expect("locks poisoned");
        locks.users.entry(user_id).or_default().clone()
    }
}

/// One transaction against a [`MemoryDb`]. Row locks are released on
/// commit, rollback or drop.
pub struct MemoryTx {
    db: MemoryDb,
    snapshot: MemoryState,
    held: Vec<OwnedMutexGuard<()>>,
}

#[allow(dead_code)]
impl MemoryTx {
    pub fn commit(self) {}

    pub fn rollback(self) {
        let snapshot = self.snapshot.clone();
        self.db.with_state(|state| *state = snapshot);
    }

    /// Number of row locks currently held.
    pub fn locks_held(&self) -> usize {
        self.held.len()
    }
}

fn matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().is_none_or(|f| f == value)
}

#[async_trait]
impl LocationRepo for MemoryTx {
    async fn insert_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
        self.db.record("insert_location", &location.id)?;
        self.db.with_state(|state| {
            state
                .locations
                .insert(location.id.clone(), location.clone());
        });
        Ok(())
    }

    async fn find_location(&mut self, id: &str) -> MetadataResult<Option<LocationRow>> {
        self.db.record("find_location", id)?;
        Ok(self.db.with_state(|state| state.locations.get(id).cloned()))
    }

    async fn find_location_by_name(&mut self, name: &str) -> MetadataResult<Option<LocationRow>> {
        self.db.record("find_location_by_name", name)?;
        Ok(self.db.with_state(|state| {
            state.locations.values().find(|l| l.name == name).cloned()
        }))
    }

    async fn list_locations(&mut self) -> MetadataResult<Vec<LocationRow>> {
        self.db.record("list_locations", "*")?;
        Ok(self
            .db
            .with_state(|state| state.locations.values().cloned().collect()))
    }

    async fn update_location(&mut self, location: &LocationRow) -> MetadataResult<()> {
        self.db.record("update_location", &location.id)?;
        self.db.with_state(|state| {
            state
                .locations
                .insert(location.id.clone(), location.clone());
        });
        Ok(())
    }

    async fn delete_location(&mut self, id: &str) -> MetadataResult<u64> {
        self.db.record("delete_location", id)?;
        self.db.with_state(|state| {
            let referenced = state.artifacts.values().any(|a| a.location_id == id)
                || state.tasks.values().any(|t| t.location_id == id);
            if referenced {
                return Err(MetadataError::Constraint(format!(
                    "location {id} is still referenced"
                )));
            }
            Ok(u64::from(state.locations.remove(id).is_some()))
        })
    }
}

#[async_trait]
impl ArtifactRepo for MemoryTx {
    async fn insert_artifact(&mut self, artifact: &ArtifactRow) -> MetadataResult<()> {
        self.db.record("insert_artifact", &artifact.id)?;
        self.db.with_state(|state| {
            state
                .artifacts
                .insert(artifact.id.clone(), artifact.clone());
        });
        Ok(())
    }

    async fn find_artifact(&mut self, id: &str) -> MetadataResult<Option<ArtifactRow>> {
        self.db.record("find_artifact", id)?;
        Ok(self.db.with_state(|state| state.artifacts.get(id).cloned()))
    }

    async fn find_artifact_by_name(&mut self, name: &str) -> MetadataResult<Option<ArtifactRow>> {
        self.db.record("find_artifact_by_name", name)?;
        Ok(self.db.with_state(|state| {
            state.artifacts.values().find(|a| a.name == name).cloned()
        }))
    }

    async fn find_artifacts(&mut self, filter: &ArtifactFilter) -> MetadataResult<Vec<ArtifactRow>> {
        self.db.record(
            "find_artifacts",
            filter.location_id.as_deref().unwrap_or("*"),
        )?;
        Ok(self.db.with_state(|state| {
            state
                .artifacts
                .values()
                .filter(|a| matches(&filter.location_id, &a.location_id))
                .filter(|a| matches(&filter.service_id, &a.service_id))
                .filter(|a| {
                    filter.schedule_id.is_none() || filter.schedule_id == a.schedule_id
                })
                .filter(|a| filter.status.is_none_or(|s| s.as_str() == a.status))
                .cloned()
                .collect()
        }))
    }

    async fn update_artifact_status(
        &mut self,
        id: &str,
        status: BackupStatus,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<u64> {
        self.db.record("update_artifact_status", id)?;
        Ok(self.db.with_state(|state| match state.artifacts.get_mut(id) {
            Some(artifact) => {
                artifact.status = status.to_string();
                artifact.updated_at = updated_at;
                1
            }
            None => 0,
        }))
    }

    async fn delete_artifact(&mut self, id: &str) -> MetadataResult<u64> {
        self.db.record("delete_artifact", id)?;
        let vanished = self.db.take_vanished("delete_artifact", id);
        self.db.with_state(|state| {
            if vanished {
                state.artifacts.remove(id);
                return Ok(0);
            }
            if state.restores.values().any(|r| r.artifact_id == id) {
                return Err(MetadataError::Constraint(format!(
                    "artifact {id} is still referenced"
                )));
            }
            Ok(u64::from(state.artifacts.remove(id).is_some()))
        })
    }
}

#[async_trait]
impl RestoreHistoryRepo for MemoryTx {
    async fn insert_restore_history_item(&mut self, item: &RestoreHistoryRow) -> MetadataResult<()> {
        self.db.record("insert_restore_history_item", &item.id)?;
        self.db.with_state(|state| {
            state.restores.insert(item.id.clone(), item.clone());
        });
        Ok(())
    }

    async fn find_restore_history_item(
        &mut self,
        id: &str,
    ) -> MetadataResult<Option<RestoreHistoryRow>> {
        self.db.record("find_restore_history_item", id)?;
        Ok(self.db.with_state(|state| state.restores.get(id).cloned()))
    }

    async fn find_restore_history(
        &mut self,
        filter: &RestoreHistoryFilter,
    ) -> MetadataResult<Vec<RestoreHistoryRow>> {
        self.db.record(
            "find_restore_history",
            filter.artifact_id.as_deref().unwrap_or("*"),
        )?;
        Ok(self.db.with_state(|state| {
            state
                .restores
                .values()
                .filter(|r| matches(&filter.artifact_id, &r.artifact_id))
                .filter(|r| matches(&filter.service_id, &r.service_id))
                .filter(|r| filter.status.is_none_or(|s| s.as_str() == r.status))
                .cloned()
                .collect()
        }))
    }

    async fn update_restore_status(
        &mut self,
        id: &str,
        status: RestoreStatus,
        finished_at: Option<OffsetDateTime>,
    ) -> MetadataResult<u64> {
        self.db.record("update_restore_status", id)?;
        Ok(self.db.with_state(|state| match state.restores.get_mut(id) {
            Some(item) => {
                item.status = status.to_string();
                item.finished_at = finished_at;
                1
            }
            None => 0,
        }))
    }

    async fn delete_restore_history_item(&mut self, id: &str) -> MetadataResult<u64> {
        self.db.record("delete_restore_history_item", id)?;
        let vanished = self.db.take_vanished("delete_restore_history_item", id);
        Ok(self.db.with_state(|state| {
            let removed = state.restores.remove(id).is_some();
            u64::from(removed && !vanished)
        }))
    }
}

#[async_trait]
impl ScheduledTaskRepo for MemoryTx {
    async fn insert_scheduled_task(&mut self, task: &ScheduledTaskRow) -> MetadataResult<()> {
        self.db.record("insert_scheduled_task", &task.id)?;
        self.db.with_state(|state| {
            state.tasks.insert(task.id.clone(), task.clone());
        });
        Ok(())
    }

    async fn find_scheduled_task(&mut self, id: &str) -> MetadataResult<Option<ScheduledTaskRow>> {
        self.db.record("find_scheduled_task", id)?;
        Ok(self.db.with_state(|state| state.tasks.get(id).cloned()))
    }

    async fn find_scheduled_tasks(
        &mut self,
        filter: &ScheduledTaskFilter,
    ) -> MetadataResult<Vec<ScheduledTaskRow>> {
        self.db.record(
            "find_scheduled_tasks",
            filter.location_id.as_deref().unwrap_or("*"),
        )?;
        Ok(self.db.with_state(|state| {
            state
                .tasks
                .values()
                .filter(|t| matches(&filter.location_id, &t.location_id))
                .filter(|t| filter.disabled.is_none_or(|d| d == t.disabled))
                .cloned()
                .collect()
        }))
    }

    async fn delete_scheduled_task(&mut self, id: &str) -> MetadataResult<u64> {
        self.db.record("delete_scheduled_task", id)?;
        let vanished = self.db.take_vanished("delete_scheduled_task", id);
        Ok(self.db.with_state(|state| {
            let removed = state.tasks.remove(id).is_some();
            u64::from(removed && !vanished)
        }))
    }
}

#[async_trait]
impl RoleRepo for MemoryTx {
    async fn insert_role(
        &mut self,
        title: &str,
        description: &str,
        filter: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<RoleRow> {
        self.db.record("insert_role", title)?;
        Ok(self.db.with_state(|state| {
            let id = state.next_role_id.max(1);
            state.next_role_id = id + 1;
            let row = RoleRow {
                id,
                title: title.to_string(),
                description: description.to_string(),
                filter: filter.to_string(),
                created_at: now,
                updated_at: now,
            };
            state.roles.insert(id, row.clone());
            row
        }))
    }

    async fn find_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
        self.db.record("find_role", role_id)?;
        Ok(self.db.with_state(|state| state.roles.get(&role_id).cloned()))
    }

    async fn find_role_by_title(&mut self, title: &str) -> MetadataResult<Option<RoleRow>> {
        self.db.record("find_role_by_title", title)?;
        Ok(self
            .db
            .with_state(|state| state.roles.values().find(|r| r.title == title).cloned()))
    }

    async fn lock_role(&mut self, role_id: i64) -> MetadataResult<Option<RoleRow>> {
        self.db.record("lock_role", role_id)?;
        let guard = self.db.role_lock(role_id).lock_owned().await;
        self.held.push(guard);
        Ok(self.db.with_state(|state| state.roles.get(&role_id).cloned()))
    }

    async fn list_roles(&mut self) -> MetadataResult<Vec<RoleRow>> {
        self.db.record("list_roles", "*")?;
        Ok(self
            .db
            .with_state(|state| state.roles.values().cloned().collect()))
    }

    async fn delete_role(&mut self, role_id: i64) -> MetadataResult<u64> {
        self.db.record("delete_role", role_id)?;
        self.db.with_state(|state| {
            if state.user_roles.keys().any(|(_, role)| *role == role_id) {
                return Err(MetadataError::Constraint(format!(
                    "role {role_id} still has members"
                )));
            }
            Ok(u64::from(state.roles.remove(&role_id).is_some()))
        })
    }

    async fn users_with_role(&mut self, role_id: i64) -> MetadataResult<Vec<i64>> {
        self.db.record("users_with_role", role_id)?;
        Ok(self.db.with_state(|state| {
            state
                .user_roles
                .keys()
                .filter(|(_, role)| *role == role_id)
                .map(|(user, _)| *user)
                .collect()
        }))
    }

    async fn user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
        self.db.record("user_roles", user_id)?;
        Ok(self.db.with_state(|state| {
            state
                .user_roles
                .values()
                .filter(|edge| edge.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn lock_user_roles(&mut self, user_id: i64) -> MetadataResult<Vec<UserRoleRow>> {
        let guard = self.db.user_lock(user_id).lock_owned().await;
        self.held.push(guard);
        // Let a competing transaction run up to this same lock.
        tokio::task::yield_now().await;
        self.db.record("lock_user_roles", user_id)?;
        Ok(self.db.with_state(|state| {
            state
                .user_roles
                .values()
                .filter(|edge| edge.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn insert_user_role(
        &mut self,
        user_id: i64,
        role_id: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<()> {
        self.db.record("insert_user_role", format!("{user_id}:{role_id}"))?;
        self.db.with_state(|state| {
            if !state.roles.contains_key(&role_id) {
                return Err(MetadataError::Constraint(format!("no role {role_id}")));
            }
            state
                .user_roles
                .entry((user_id, role_id))
                .or_insert(UserRoleRow {
                    user_id,
                    role_id,
                    created_at: now,
                });
            Ok(())
        })
    }

    async fn delete_user_role(&mut self, user_id: i64, role_id: i64) -> MetadataResult<u64> {
        self.db.record("delete_user_role", format!("{user_id}:{role_id}"))?;
        Ok(self.db.with_state(|state| {
            u64::from(state.user_roles.remove(&(user_id, role_id)).is_some())
        }))
    }

    async fn delete_user_roles(&mut self, user_id: i64) -> MetadataResult<u64> {
        self.db.record("delete_user_roles", user_id)?;
        Ok(self.db.with_state(|state| {
            let before = state.user_roles.len();
            state.user_roles.retain(|(user, _), _| *user != user_id);
            (before - state.user_roles.len()) as u64
        }))
    }

    async fn delete_role_memberships(&mut self, role_id: i64) -> MetadataResult<u64> {
        self.db.record("delete_role_memberships", role_id)?;
        Ok(self.db.with_state(|state| {
            let before = state.user_roles.len();
            state.user_roles.retain(|(_, role), _| *role != role_id);
            (before - state.user_roles.len()) as u64
        }))
    }

    async fn reassign_user_role(
        &mut self,
        user_id: i64,
        from_role: i64,
        to_role: i64,
    ) -> MetadataResult<u64> {
        self.db.record(
            "reassign_user_role",
            format!("{user_id}:{from_role}->{to_role}"),
        )?;
        Ok(self.db.with_state(|state| {
            if state.user_roles.contains_key(&(user_id, to_role)) {
                return 0;
            }
            match state.user_roles.remove(&(user_id, from_role)) {
                Some(edge) => {
                    state.user_roles.insert(
                        (user_id, to_role),
                        UserRoleRow {
                            role_id: to_role,
                            ..edge
                        },
                    );
                    1
                }
                None => 0,
            }
        }))
    }
}

#[async_trait]
impl DefaultRoleSource for MemoryTx {
    async fn default_role_id(&mut self) -> MetadataResult<Option<i64>> {
        self.db.record("default_role_id", "*")?;
        Ok(self.db.with_state(|state| state.default_role_id))
    }
}

#[async_trait]
impl SettingsRepo for MemoryTx {
    async fn set_default_role_id(&mut self, role_id: i64) -> MetadataResult<()> {
        self.db.record("set_default_role_id", role_id)?;
        self.db.with_state(|state| state.default_role_id = Some(role_id));
        Ok(())
    }
}
