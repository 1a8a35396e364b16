use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{CreateTaskRequest, Task, TaskId, UpdateTaskRequest};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use super::{now_millis, validate_patch, NewTask, SharedClock, TaskStore};
use crate::error::{StoreError, StoreResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, completed, created_at, updated_at FROM tasks";

/// Timestamps are stored as integer milliseconds since the epoch.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> StoreResult<Self> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

fn from_millis(millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Unavailable(format!("corrupt timestamp {millis}")))
}

pub struct SqliteTaskStore {
    pool: SqlitePool,
    clock: SharedClock,
}

impl SqliteTaskStore {
    /// Opens (creating if missing) the database at `url` and runs migrations.
    pub async fn connect(url: &str, clock: SharedClock) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, clock).await
    }

    /// Private in-memory database. A single connection that is never recycled
    /// keeps the data alive for the lifetime of the store.
    pub async fn in_memory(clock: SharedClock) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, clock).await
    }

    async fn with_pool(pool: SqlitePool, clock: SharedClock) -> StoreResult<Self> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(StoreError::NotFound(id))?.try_into()
    }

    async fn create(&self, request: CreateTaskRequest) -> StoreResult<Task> {
        let new_task = NewTask::try_from(request)?;
        let now = now_millis(self.clock.as_ref());

        let result = sqlx::query(
            "INSERT INTO tasks (title, description, completed, created_at, updated_at) \
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let task = new_task.into_task(result.last_insert_rowid(), now);
        tracing::debug!(id = task.id, "Created todo");
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: UpdateTaskRequest) -> StoreResult<Task> {
        validate_patch(&patch)?;
        let now = now_millis(self.clock.as_ref());

        // single statement: the write lock is held before the row is read.
        // Same merge rules as `apply_patch`.
        let row = sqlx::query_as::<_, TaskRow>(
            "UPDATE tasks SET \
                 title = COALESCE(?, title), \
                 description = CASE WHEN ? THEN ? ELSE description END, \
                 completed = COALESCE(?, completed), \
                 updated_at = MAX(?, created_at) \
             WHERE id = ? \
             RETURNING id, title, description, completed, created_at, updated_at",
        )
        .bind(patch.title.flatten())
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.completed)
        .bind(now.timestamp_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let task = Task::try_from(row.ok_or(StoreError::NotFound(id))?)?;
        tracing::debug!(id, "Updated todo");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id, "Deleted todo");
        Ok(())
    }
}
