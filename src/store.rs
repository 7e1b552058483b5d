//! In-memory task store
//!
//! [`TaskStore`] owns the authoritative task sequence and the active filter.
//! Its methods are the only write path; every mutation completes before it
//! returns. Operations naming a missing id are no-ops, not errors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{CreateTaskInput, Task, TaskFilter, TaskStats, TaskStatus, UpdateTaskInput};
use crate::query;

/// Source of "now" for timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct TaskStore {
    tasks: Vec<Task>,
    filter: TaskFilter,
    clock: Clock,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Store whose timestamps come from `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            tasks: Vec::new(),
            filter: TaskFilter::default(),
            clock,
        }
    }

    /// Replace the whole task sequence (startup load, import).
    ///
    /// Ids stay unique: a later record repeating an earlier id is dropped.
    pub fn set_tasks(&mut self, mut tasks: Vec<Task>) {
        let mut seen = HashSet::with_capacity(tasks.len());
        let before = tasks.len();
        tasks.retain(|task| seen.insert(task.id.clone()));
        if tasks.len() < before {
            tracing::warn!(dropped = before - tasks.len(), "Dropped tasks with repeated ids");
        }
        tracing::debug!(count = tasks.len(), "Replacing task sequence");
        self.tasks = tasks;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Append a new pending task built from `input` and return it.
    ///
    /// # Errors
    /// Returns [`StoreError::EmptyTitle`] for a blank title; the store is left untouched.
    pub fn create(&mut self, input: CreateTaskInput) -> Result<Task, StoreError> {
        if input.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }

        let now = self.now();
        let task = Task {
            id: self.generate_id(),
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: TaskStatus::Pending,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
            tags: input.tags,
        };

        tracing::debug!(id = %task.id, priority = %task.priority, "Task created");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Merge the present fields of `input` into the matching task.
    ///
    /// Returns `Ok(false)` when no task has the given id. Naming
    /// `Completed` as the new status stamps `completed_at`; moving away from
    /// it clears the stamp.
    ///
    /// # Errors
    /// Returns [`StoreError::EmptyTitle`] when the update would blank the title.
    pub fn update(&mut self, input: UpdateTaskInput) -> Result<bool, StoreError> {
        if input.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(StoreError::EmptyTitle);
        }

        let now = self.now();
        let Some(task) = self.find_mut(&input.id) else {
            tracing::debug!(id = %input.id, "Update skipped, task not found");
            return Ok(false);
        };

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(due_date) = input.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = input.tags {
            task.tags = tags;
        }
        match input.status {
            Some(TaskStatus::Completed) => {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(now);
            }
            Some(status) => {
                task.status = status;
                task.completed_at = None;
            }
            None => {}
        }
        task.updated_at = now;

        tracing::debug!(id = %task.id, status = %task.status, "Task updated");
        Ok(true)
    }

    /// Remove the task with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            tracing::debug!(id, "Task deleted");
        }
        removed
    }

    /// Step the task through `pending -> in_progress -> completed -> pending`.
    ///
    /// Returns the new status, or `None` when the id is unknown.
    pub fn advance_status(&mut self, id: &str) -> Option<TaskStatus> {
        let now = self.now();
        let task = self.find_mut(id)?;
        let next = task.status.next();
        task.transition(next, now);
        tracing::debug!(id, status = %next, "Task status advanced");
        Some(next)
    }

    /// Force the task to `Completed`, stamping `completed_at` with now.
    pub fn complete(&mut self, id: &str) -> bool {
        let now = self.now();
        let Some(task) = self.find_mut(id) else {
            return false;
        };
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        task.updated_at = now;
        tracing::debug!(id, "Task completed");
        true
    }

    /// Remove every completed task, returning how many were removed.
    pub fn delete_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.status.is_completed());
        let removed = before - self.tasks.len();
        tracing::debug!(removed, "Completed tasks deleted");
        removed
    }

    /// Complete every open task. Tasks already completed are not touched.
    ///
    /// Returns how many tasks changed.
    pub fn complete_all(&mut self) -> usize {
        let now = self.now();
        let mut changed = 0;
        for task in self.tasks.iter_mut().filter(|task| !task.status.is_completed()) {
            task.transition(TaskStatus::Completed, now);
            changed += 1;
        }
        tracing::debug!(changed, "All tasks completed");
        changed
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Tasks matching the active filter, in insertion order.
    pub fn filtered(&self) -> Vec<Task> {
        query::filter_tasks(&self.tasks, &self.filter)
    }

    /// All tasks, most important first.
    pub fn sorted(&self) -> Vec<Task> {
        query::sort_tasks(&self.tasks)
    }

    pub fn stats(&self) -> TaskStats {
        query::compute_stats(&self.tasks)
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// Override the active filter with the present fields of `patch`.
    pub fn set_filter(&mut self, patch: TaskFilter) {
        self.filter.merge(patch);
    }

    pub fn clear_filter(&mut self) {
        self.filter = TaskFilter::default();
    }
}
