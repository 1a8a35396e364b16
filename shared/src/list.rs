use crate::{Task, TaskId};

/// Local copy of the server's task collection.
///
/// Only server responses are applied to it; callers never edit a task in place.
/// Order follows the server: newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection with a fresh server snapshot.
    pub fn reset(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// A newly created task goes to the front. A task whose id is already
    /// present replaces the stale copy instead.
    pub fn insert_created(&mut self, task: Task) {
        self.tasks.retain(|existing| existing.id != task.id);
        self.tasks.insert(0, task);
    }

    /// Swaps in the server's version of a task. Returns `false` when the task is
    /// no longer in the list (e.g. deleted while the request was in flight).
    pub fn replace(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.completed)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.completed)
    }

    pub fn completed_ids(&self) -> Vec<TaskId> {
        self.completed().map(|task| task.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stats(&self) -> TaskStats {
        let completed = self.completed().count();
        TaskStats {
            total: self.tasks.len(),
            completed,
            pending: self.tasks.len() - completed,
        }
    }
}
