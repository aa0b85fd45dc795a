//! Data access for tasklist-service.

use crate::models::{TaskFields, TaskRow, UserRecord};
use crate::services::error::ServiceError;
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Per-row results of a batch insert, in input order.
///
/// `committed` is true only when every row succeeded; otherwise the whole
/// batch was rolled back and the generated ids are not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInsert {
    pub results: Vec<Result<i64, String>>,
    pub committed: bool,
}

/// Storage operations behind the HTTP handlers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    /// All tasks joined with their progress label, ordered by position then id.
    async fn list_tasks(&self) -> Result<Vec<TaskRow>, ServiceError>;

    /// Insert every row inside one transaction; any row failure rolls back all.
    async fn insert_tasks(&self, tasks: &[TaskFields]) -> Result<BatchInsert, ServiceError>;

    /// Overwrite one task. Returns the number of rows affected.
    async fn update_task(&self, id: i64, task: &TaskFields) -> Result<u64, ServiceError>;

    /// Returns the number of rows removed.
    async fn delete_task(&self, id: i64) -> Result<u64, ServiceError>;

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError>;
}

/// MySQL connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "tasklist-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to MySQL"
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("MySQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1").execute(&self.pool).await?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<TaskRow>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_tasks"])
            .start_timer();

        let tasks = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT tasklist.id, tasklist.title, tasklist.content, tasklist.due, tasklist.priority,
                   tasklist.progress_id, task_progress.progress_name, tasklist.position
            FROM tasklist
            JOIN task_progress ON tasklist.progress_id = task_progress.id
            ORDER BY tasklist.position, tasklist.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        info!(count = tasks.len(), "Task list fetched");

        Ok(tasks)
    }

    #[instrument(skip(self, tasks), fields(batch_size = tasks.len()))]
    async fn insert_tasks(&self, tasks: &[TaskFields]) -> Result<BatchInsert, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_tasks"])
            .start_timer();

        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(tasks.len());

        for task in tasks {
            let result = sqlx::query(
                r#"
                INSERT INTO tasklist (title, content, due, priority, progress_id, position)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.title)
            .bind(&task.content)
            .bind(task.due)
            .bind(task.priority)
            .bind(task.progress_id)
            .bind(task.position)
            .execute(&mut *tx)
            .await;

            // MySQL keeps the transaction open after a failed statement, so the
            // remaining rows still run and report their own outcome.
            let row = match result {
                Ok(done) => i64::try_from(done.last_insert_id())
                    .map_err(|_| "ID取得に失敗しました".to_string()),
                Err(e) => {
                    warn!(title = %task.title, error = %e, "Task insert failed");
                    Err(ServiceError::from(e).row_message())
                }
            };
            results.push(row);
        }

        let committed = results.iter().all(Result::is_ok);
        if committed {
            tx.commit().await?;
            info!(inserted = results.len(), "Task batch committed");
        } else {
            tx.rollback().await?;
            warn!(
                failed = results.iter().filter(|r| r.is_err()).count(),
                "Task batch rolled back"
            );
        }

        timer.observe_duration();

        Ok(BatchInsert { results, committed })
    }

    #[instrument(skip(self, task), fields(task_id = id))]
    async fn update_task(&self, id: i64, task: &TaskFields) -> Result<u64, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_task"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE tasklist
            SET title = ?, content = ?, due = ?, priority = ?, progress_id = ?, position = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.content)
        .bind(task.due)
        .bind(task.priority)
        .bind(task.progress_id)
        .bind(task.position)
        .bind(id)
        .execute(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(task_id = id))]
    async fn delete_task(&self, id: i64) -> Result<u64, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_task"])
            .start_timer();

        let result = sqlx::query("DELETE FROM tasklist WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_username"])
            .start_timer();

        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(user)
    }
}
