//! In-memory [`TaskStore`] for tests and local runs without MySQL.

use crate::models::{ProgressStatus, TaskFields, TaskRow, UserRecord};
use crate::services::database::{BatchInsert, TaskStore};
use crate::services::error::ServiceError;
use crate::utils::PasswordHashString;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

const FOREIGN_KEY_FAILURE: &str =
    "Cannot add or update a child row: a foreign key constraint fails (`tasklist`, CONSTRAINT `fk_tasklist_progress`)";

struct MockState {
    tasks: BTreeMap<i64, TaskFields>,
    progress: Vec<ProgressStatus>,
    users: Vec<UserRecord>,
    next_task_id: i64,
    available: bool,
}

/// Mirrors the MySQL schema: progress ids are foreign keys, ids auto-increment
/// (and stay consumed after a rollback), and batch inserts are all-or-nothing.
pub struct MockTaskStore {
    state: Mutex<MockState>,
}

impl Default for MockTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTaskStore {
    /// Empty store seeded with the default progress statuses.
    pub fn new() -> Self {
        let progress = [(1, "未着手"), (2, "進行中"), (3, "完了"), (4, "保留")]
            .into_iter()
            .map(|(id, name)| ProgressStatus {
                id,
                progress_name: name.to_string(),
            })
            .collect();

        Self {
            state: Mutex::new(MockState {
                tasks: BTreeMap::new(),
                progress,
                users: Vec::new(),
                next_task_id: 1,
                available: true,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Store(format!("Mock store mutex poisoned: {}", e)))
    }

    fn lock_available(&self) -> Result<MutexGuard<'_, MockState>, ServiceError> {
        let state = self.lock()?;
        if !state.available {
            return Err(ServiceError::Store("Can't connect to MySQL server".to_string()));
        }
        Ok(state)
    }

    /// Register a user with an already-hashed password.
    pub fn add_user(&self, username: &str, password_hash: PasswordHashString) {
        if let Ok(mut state) = self.lock() {
            let id = state.users.len() as i64 + 1;
            state.users.push(UserRecord {
                id,
                username: username.to_string(),
                password_hash: password_hash.into_string(),
            });
        }
    }

    /// Simulate the database going away (or coming back).
    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.lock() {
            state.available = available;
        }
    }

    /// Snapshot of the stored row, if any.
    pub fn task(&self, id: i64) -> Option<TaskFields> {
        self.lock().ok().and_then(|state| state.tasks.get(&id).cloned())
    }

    pub fn task_count(&self) -> usize {
        self.lock().map(|state| state.tasks.len()).unwrap_or_default()
    }
}

impl MockState {
    fn check_progress(&self, progress_id: i32) -> Result<(), String> {
        if self.progress.iter().any(|p| p.id == progress_id) {
            Ok(())
        } else {
            Err(FOREIGN_KEY_FAILURE.to_string())
        }
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock_available().map(|_| ())
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRow>, ServiceError> {
        let state = self.lock_available()?;

        let mut rows: Vec<TaskRow> = state
            .tasks
            .iter()
            .filter_map(|(id, task)| {
                let progress = state.progress.iter().find(|p| p.id == task.progress_id)?;
                Some(TaskRow {
                    id: *id,
                    title: task.title.clone(),
                    content: task.content.clone(),
                    due: task.due,
                    priority: task.priority,
                    progress_id: task.progress_id,
                    progress_name: progress.progress_name.clone(),
                    position: task.position,
                })
            })
            .collect();

        rows.sort_by(|a, b| a.position.total_cmp(&b.position).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn insert_tasks(&self, tasks: &[TaskFields]) -> Result<BatchInsert, ServiceError> {
        let mut state = self.lock_available()?;

        let mut staged = Vec::with_capacity(tasks.len());
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            match state.check_progress(task.progress_id) {
                Ok(()) => {
                    let id = state.next_task_id;
                    state.next_task_id += 1;
                    staged.push((id, task.clone()));
                    results.push(Ok(id));
                }
                Err(e) => results.push(Err(e)),
            }
        }

        let committed = results.iter().all(Result::is_ok);
        if committed {
            state.tasks.extend(staged);
        }

        Ok(BatchInsert { results, committed })
    }

    async fn update_task(&self, id: i64, task: &TaskFields) -> Result<u64, ServiceError> {
        let mut state = self.lock_available()?;

        if !state.tasks.contains_key(&id) {
            return Ok(0);
        }
        state.check_progress(task.progress_id).map_err(ServiceError::Store)?;

        state.tasks.insert(id, task.clone());
        Ok(1)
    }

    async fn delete_task(&self, id: i64) -> Result<u64, ServiceError> {
        let mut state = self.lock_available()?;
        Ok(state.tasks.remove(&id).map_or(0, |_| 1))
    }

    /// Matches case-insensitively, like MySQL's default `_ci` collations.
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let state = self.lock_available()?;
        Ok(state
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fields(title: &str, progress_id: i32) -> TaskFields {
        TaskFields {
            title: title.to_string(),
            content: "content".to_string(),
            due: Utc.with_ymd_and_hms(2024, 2, 23, 12, 0, 0).unwrap(),
            priority: 1,
            progress_id,
            position: 0.0,
        }
    }

    #[tokio::test]
    async fn failed_row_rolls_back_whole_batch() {
        let store = MockTaskStore::new();

        let outcome = store
            .insert_tasks(&[fields("ok", 1), fields("bad", 99), fields("also ok", 2)])
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert!(outcome.results[0].is_ok());
        assert!(outcome.results[1].is_err());
        assert!(outcome.results[2].is_ok());
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn ids_stay_consumed_after_rollback() {
        let store = MockTaskStore::new();
        store.insert_tasks(&[fields("bad", 99)]).await.unwrap();

        let outcome = store.insert_tasks(&[fields("ok", 1)]).await.unwrap();
        assert_eq!(outcome.results, vec![Ok(1)]);

        store.insert_tasks(&[fields("x", 1), fields("y", 99)]).await.unwrap();
        let outcome = store.insert_tasks(&[fields("z", 1)]).await.unwrap();
        assert_eq!(outcome.results, vec![Ok(3)]);
    }

    #[tokio::test]
    async fn listing_orders_by_position_then_id() {
        let store = MockTaskStore::new();
        let mut later = fields("later", 1);
        later.position = 2000.0;
        let mut earlier = fields("earlier", 3);
        earlier.position = 1000.0;
        store.insert_tasks(&[later, earlier]).await.unwrap();

        let rows = store.list_tasks().await.unwrap();
        assert_eq!(rows[0].title, "earlier");
        assert_eq!(rows[0].progress_name, "完了");
        assert_eq!(rows[1].title, "later");
    }

    #[tokio::test]
    async fn unavailable_store_errors() {
        let store = MockTaskStore::new();
        store.set_available(false);
        assert!(store.health_check().await.is_err());
        assert!(store.list_tasks().await.is_err());

        store.set_available(true);
        assert!(store.health_check().await.is_ok());
    }
}
