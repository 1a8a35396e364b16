//! Redis-backed store.
//!
//! Key layout, each key behind an optional namespace:
//! - `todo:{id}` holds the task as JSON
//! - `todos:index` is a sorted set of ids scored by `created_at` millis
//! - `todos:next_id` is the id counter (`INCR`, so ids are never reused)

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use shared::{CreateTaskRequest, Task, TaskId, UpdateTaskRequest};

use super::{
    apply_patch, now_millis, sort_newest_first, validate_patch, NewTask, SharedClock, TaskStore,
};
use crate::error::{StoreError, StoreResult};

const TASK_KEY_PREFIX: &str = "todo:";
const INDEX_KEY: &str = "todos:index";
const NEXT_ID_KEY: &str = "todos:next_id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Keys {
    namespace: String,
}

impl Keys {
    fn task(&self, id: TaskId) -> String {
        format!("{}{TASK_KEY_PREFIX}{id}", self.namespace)
    }

    fn index(&self) -> String {
        format!("{}{INDEX_KEY}", self.namespace)
    }

    fn next_id(&self) -> String {
        format!("{}{NEXT_ID_KEY}", self.namespace)
    }
}

#[allow(clippy::cast_precision_loss)]
fn index_score(task: &Task) -> f64 {
    task.created_at.timestamp_millis() as f64
}

pub struct RedisTaskStore {
    connection: MultiplexedConnection,
    keys: Keys,
    clock: SharedClock,
}

impl RedisTaskStore {
    pub async fn connect(url: &str, clock: SharedClock) -> StoreResult<Self> {
        Self::connect_namespaced(url, "", clock).await
    }

    /// Like [`connect`](Self::connect), but every key is prefixed with
    /// `namespace` so several stores can share one Redis database.
    pub async fn connect_namespaced(
        url: &str,
        namespace: &str,
        clock: SharedClock,
    ) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            keys: Keys {
                namespace: namespace.to_string(),
            },
            clock,
        })
    }

    fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        let mut conn = self.connection();
        let ids: Vec<TaskId> = conn.zrevrange(self.keys.index(), 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|&id| self.keys.task(id)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // an id can briefly outlive its value while a delete is in flight
        let mut tasks = values
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str::<Task>(&json))
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(self.keys.task(id)).await?;
        let json = value.ok_or(StoreError::NotFound(id))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn create(&self, request: CreateTaskRequest) -> StoreResult<Task> {
        let new_task = NewTask::try_from(request)?;
        let mut conn = self.connection();

        let id: TaskId = conn.incr(self.keys.next_id(), 1).await?;
        let task = new_task.into_task(id, now_millis(self.clock.as_ref()));
        let json = serde_json::to_string(&task)?;

        redis::pipe()
            .atomic()
            .set(self.keys.task(id), json)
            .ignore()
            .zadd(self.keys.index(), id, index_score(&task))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(id, "Created todo");
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: UpdateTaskRequest) -> StoreResult<Task> {
        validate_patch(&patch)?;

        let mut task = self.get(id).await?;
        apply_patch(&mut task, patch, now_millis(self.clock.as_ref()));
        let json = serde_json::to_string(&task)?;

        // XX: a task deleted since the read above stays deleted
        let written: Option<String> = redis::cmd("SET")
            .arg(self.keys.task(id))
            .arg(json)
            .arg("XX")
            .query_async(&mut self.connection())
            .await?;
        if written.is_none() {
            return Err(StoreError::NotFound(id));
        }

        tracing::debug!(id, "Updated todo");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> StoreResult<()> {
        let mut conn = self.connection();
        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .del(self.keys.task(id))
            .zrem(self.keys.index(), id)
            .query_async(&mut conn)
            .await?;

        if removed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id, "Deleted todo");
        Ok(())
    }
}
