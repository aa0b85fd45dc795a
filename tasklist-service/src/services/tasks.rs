//! Batch reconciliation for task inserts and updates.

use crate::dtos::tasks::{FailedInsert, FailedUpdate, InsertedTask, UpdatedTask};
use crate::models::{TaskFields, TaskView};
use crate::services::database::TaskStore;
use crate::services::error::ServiceError;
use crate::services::metrics::{record_error, record_task_operation};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const MISSING_ID_MESSAGE: &str = "IDは必須です";
const NO_MATCHING_ROW_MESSAGE: &str = "指定されたIDのタスクが見つからないか、変更がありません";

/// How a batch turned out as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every row succeeded (also an empty batch).
    Complete,
    /// Some rows succeeded and some failed.
    Partial,
    /// No row succeeded.
    Failed,
}

impl BatchOutcome {
    fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Complete,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Result of a batch insert. Ids listed in `inserted` are only persisted when
/// the store committed the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertReport {
    pub inserted: Vec<InsertedTask>,
    pub failed: Vec<FailedInsert>,
    committed: bool,
}

impl InsertReport {
    pub fn committed(&self) -> bool {
        self.committed
    }
}

/// Result of a batch update, both lists in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub succeeded: Vec<UpdatedTask>,
    pub failed: Vec<FailedUpdate>,
}

impl UpdateReport {
    pub fn outcome(&self) -> BatchOutcome {
        BatchOutcome::from_counts(self.succeeded.len(), self.failed.len())
    }
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<TaskView>, ServiceError> {
        let rows = self.store.list_tasks().await.inspect_err(|e| {
            warn!(error = %e, "Failed to list tasks");
            record_error("list_tasks");
        })?;

        Ok(rows.into_iter().map(TaskView::from).collect())
    }

    /// Insert a batch atomically and pair each row with its outcome.
    #[instrument(skip(self, tasks), fields(batch_size = tasks.len()))]
    pub async fn insert_batch(&self, tasks: Vec<TaskFields>) -> Result<InsertReport, ServiceError> {
        let batch = self.store.insert_tasks(&tasks).await.inspect_err(|e| {
            warn!(error = %e, "Task batch insert aborted");
            record_error("insert_tasks");
        })?;

        let mut report = InsertReport {
            inserted: Vec::new(),
            failed: Vec::new(),
            committed: batch.committed,
        };

        for (task, result) in tasks.into_iter().zip(batch.results) {
            match result {
                Ok(id) => report.inserted.push(InsertedTask { id }),
                Err(error) => report.failed.push(FailedInsert {
                    title: task.title,
                    error,
                }),
            }
        }

        let status = if report.committed() {
            "committed"
        } else {
            "rolled_back"
        };
        record_task_operation("insert", status);
        info!(
            inserted = report.inserted.len(),
            failed = report.failed.len(),
            status,
            "Task batch insert finished"
        );

        Ok(report)
    }

    /// Apply each update on its own; earlier successes stay committed when a
    /// later row fails.
    #[instrument(skip(self, updates), fields(batch_size = updates.len()))]
    pub async fn update_batch(&self, updates: Vec<(Option<i64>, TaskFields)>) -> UpdateReport {
        let mut report = UpdateReport {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        for (id, fields) in updates {
            let Some(id) = id else {
                report.failed.push(FailedUpdate {
                    id: None,
                    error: MISSING_ID_MESSAGE.to_string(),
                });
                continue;
            };

            match self.store.update_task(id, &fields).await {
                Ok(0) => {
                    warn!(task_id = id, "No task matched update");
                    report.failed.push(FailedUpdate {
                        id: Some(id),
                        error: NO_MATCHING_ROW_MESSAGE.to_string(),
                    });
                }
                Ok(_) => report.succeeded.push(UpdatedTask::new(id, fields)),
                Err(e) => {
                    warn!(task_id = id, error = %e, "Task update failed");
                    record_error("update_task");
                    report.failed.push(FailedUpdate {
                        id: Some(id),
                        error: e.row_message(),
                    });
                }
            }
        }

        let outcome = report.outcome();
        record_task_operation("update", outcome.as_str());
        info!(
            updated = report.succeeded.len(),
            failed = report.failed.len(),
            outcome = outcome.as_str(),
            "Task batch update finished"
        );

        report
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let removed = self.store.delete_task(id).await.inspect_err(|e| {
            warn!(error = %e, "Task delete failed");
            record_error("delete_task");
        })?;

        if removed == 0 {
            record_task_operation("delete", "not_found");
            return Err(ServiceError::TaskNotFound);
        }

        record_task_operation("delete", "deleted");
        info!(task_id = id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockTaskStore;
    use chrono::{TimeZone, Utc};

    fn fields(title: &str, progress_id: i32) -> TaskFields {
        TaskFields {
            title: title.to_string(),
            content: "content".to_string(),
            due: Utc.with_ymd_and_hms(2024, 2, 23, 12, 0, 0).unwrap(),
            priority: 2,
            progress_id,
            position: 0.0,
        }
    }

    fn service() -> (Arc<MockTaskStore>, TaskService) {
        let store = Arc::new(MockTaskStore::new());
        let service = TaskService::new(store.clone());
        (store, service)
    }

    #[test]
    fn outcome_from_counts() {
        assert_eq!(BatchOutcome::from_counts(0, 0), BatchOutcome::Complete);
        assert_eq!(BatchOutcome::from_counts(3, 0), BatchOutcome::Complete);
        assert_eq!(BatchOutcome::from_counts(2, 1), BatchOutcome::Partial);
        assert_eq!(BatchOutcome::from_counts(0, 2), BatchOutcome::Failed);
    }

    #[tokio::test]
    async fn insert_failure_lists_failed_titles() {
        let (store, service) = service();

        let report = service
            .insert_batch(vec![fields("first", 1), fields("broken", 42)])
            .await
            .unwrap();

        assert!(!report.committed());
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].title, "broken");
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn insert_success_persists_all() {
        let (store, service) = service();

        let report = service
            .insert_batch(vec![fields("a", 1), fields("b", 2)])
            .await
            .unwrap();

        assert!(report.committed());
        assert_eq!(
            report.inserted,
            vec![InsertedTask { id: 1 }, InsertedTask { id: 2 }]
        );
        assert_eq!(store.task_count(), 2);
    }

    #[tokio::test]
    async fn empty_insert_is_committed() {
        let (store, service) = service();

        let report = service.insert_batch(Vec::new()).await.unwrap();

        assert!(report.committed());
        assert!(report.inserted.is_empty());
        assert_eq!(store.task_count(), 0);
    }

    #[tokio::test]
    async fn update_results_keep_input_order() {
        let (store, service) = service();
        service
            .insert_batch(vec![fields("a", 1), fields("b", 1)])
            .await
            .unwrap();

        let report = service
            .update_batch(vec![
                (Some(2), fields("b2", 2)),
                (None, fields("no id", 1)),
                (Some(99), fields("ghost", 1)),
                (Some(1), fields("a2", 3)),
            ])
            .await;

        assert_eq!(report.outcome(), BatchOutcome::Partial);
        let ok_ids: Vec<i64> = report.succeeded.iter().map(|t| t.id).collect();
        assert_eq!(ok_ids, vec![2, 1]);
        let failed_ids: Vec<Option<i64>> = report.failed.iter().map(|f| f.id).collect();
        assert_eq!(failed_ids, vec![None, Some(99)]);
        assert_eq!(report.failed[0].error, MISSING_ID_MESSAGE);
        assert_eq!(report.failed[1].error, NO_MATCHING_ROW_MESSAGE);

        assert_eq!(store.task(1).unwrap().title, "a2");
        assert_eq!(store.task(2).unwrap().title, "b2");
    }

    #[tokio::test]
    async fn update_success_survives_later_failure() {
        let (store, service) = service();
        service.insert_batch(vec![fields("a", 1)]).await.unwrap();

        let report = service
            .update_batch(vec![(Some(1), fields("changed", 2)), (Some(1), fields("bad", 77))])
            .await;

        assert_eq!(report.outcome(), BatchOutcome::Partial);
        assert_eq!(store.task(1).unwrap().title, "changed");
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (_, service) = service();
        assert!(matches!(
            service.delete(5).await,
            Err(ServiceError::TaskNotFound)
        ));
    }
}
