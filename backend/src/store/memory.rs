use std::collections::BTreeMap;

use async_trait::async_trait;
use shared::{CreateTaskRequest, Task, TaskId, UpdateTaskRequest};
use tokio::sync::RwLock;

use super::{
    apply_patch, now_millis, sort_newest_first, validate_patch, NewTask, SharedClock, TaskStore,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    tasks: BTreeMap<TaskId, Task>,
    last_id: TaskId,
}

/// Process-local store. Nothing survives a restart.
pub struct InMemoryTaskStore {
    state: RwLock<State>,
    clock: SharedClock,
}

impl InMemoryTaskStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn get(&self, id: TaskId) -> StoreResult<Task> {
        let state = self.state.read().await;
        state.tasks.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, request: CreateTaskRequest) -> StoreResult<Task> {
        let new_task = NewTask::try_from(request)?;

        let mut state = self.state.write().await;
        // ids are never handed out twice, even after the newest task is deleted
        state.last_id += 1;
        let task = new_task.into_task(state.last_id, now_millis(self.clock.as_ref()));
        state.tasks.insert(task.id, task.clone());

        tracing::debug!(id = task.id, "Created todo");
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: UpdateTaskRequest) -> StoreResult<Task> {
        validate_patch(&patch)?;

        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        apply_patch(task, patch, now_millis(self.clock.as_ref()));
        let updated = task.clone();

        tracing::debug!(id, "Updated todo");
        Ok(updated)
    }

    async fn delete(&self, id: TaskId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.tasks.remove(&id).ok_or(StoreError::NotFound(id))?;
        tracing::debug!(id, "Deleted todo");
        Ok(())
    }
}
