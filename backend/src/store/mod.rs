//! Task persistence.
//!
//! [`TaskStore`] is the only owner of task records: it assigns ids, stamps
//! timestamps and applies partial updates. Every backend runs [`validate_patch`]
//! before touching storage. The key-value backends merge with [`apply_patch`];
//! SQLite expresses the same rules in a single `UPDATE`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use shared::{CreateTaskRequest, Task, TaskId, UpdateTaskRequest};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};

pub mod memory;
pub mod redis;
pub mod sqlite;

pub use self::memory::InMemoryTaskStore;
pub use self::redis::RedisTaskStore;
pub use self::sqlite::SqliteTaskStore;

pub type SharedClock = Arc<dyn Clock + Send + Sync>;
pub type SharedStore = Arc<dyn TaskStore>;

#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// All tasks, newest `created_at` first; equal timestamps put the later
    /// insertion first.
    async fn list(&self) -> StoreResult<Vec<Task>>;

    async fn get(&self, id: TaskId) -> StoreResult<Task>;

    async fn create(&self, request: CreateTaskRequest) -> StoreResult<Task>;

    /// Applies only the fields present in `patch`. `updated_at` is refreshed
    /// even when the patch is empty.
    async fn update(&self, id: TaskId, patch: UpdateTaskRequest) -> StoreResult<Task>;

    async fn delete(&self, id: TaskId) -> StoreResult<()>;
}

pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// Opens the configured backend.
pub async fn connect(config: &StoreConfig, clock: SharedClock) -> StoreResult<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => Arc::new(InMemoryTaskStore::new(clock)),
        StoreBackend::Sqlite => {
            Arc::new(SqliteTaskStore::connect(&config.database_url, clock).await?)
        }
        StoreBackend::Redis => Arc::new(RedisTaskStore::connect(&config.redis_url, clock).await?),
    };
    tracing::info!(backend = ?config.backend, "Task store ready");
    Ok(store)
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
}

impl TryFrom<CreateTaskRequest> for NewTask {
    type Error = StoreError;

    fn try_from(request: CreateTaskRequest) -> StoreResult<Self> {
        match request.title {
            Some(title) if !is_blank(&title) => Ok(NewTask {
                title,
                description: request.description,
            }),
            _ => Err(StoreError::title_required()),
        }
    }
}

impl NewTask {
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

fn is_blank(title: &str) -> bool {
    title.trim().is_empty()
}

/// Rejects patches that would leave a task without a title.
pub fn validate_patch(patch: &UpdateTaskRequest) -> StoreResult<()> {
    match &patch.title {
        Some(None) => Err(StoreError::title_required()),
        Some(Some(title)) if is_blank(title) => Err(StoreError::title_required()),
        _ => Ok(()),
    }
}

/// Merges a patch that already passed [`validate_patch`] into `task`. Absent
/// fields are left alone.
pub fn apply_patch(task: &mut Task, patch: UpdateTaskRequest, now: DateTime<Utc>) {
    if let Some(Some(title)) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    task.updated_at = now.max(task.created_at);
}

/// Current time truncated to whole milliseconds, the precision every backend
/// persists.
pub fn now_millis(clock: &dyn Clock) -> DateTime<Utc> {
    let now = clock.utc();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
