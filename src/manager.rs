//! Application layer joining the in-memory store with persistence.
//!
//! Mutations are applied to the [`TaskStore`] synchronously and the full
//! sequence is then saved. A failed save is reported to the caller and kept in
//! [`TaskManager::error`]; the in-memory change is not rolled back.

use crate::error::ManagerError;
use crate::models::{CreateTaskInput, Task, TaskFilter, TaskStats, TaskStatus, UpdateTaskInput};
use crate::service::{StorageStats, TaskService};
use crate::storage::KeyValueStorage;
use crate::store::TaskStore;

pub struct TaskManager<S> {
    store: TaskStore,
    service: TaskService<S>,
    is_loading: bool,
    error: Option<String>,
}

impl<S: KeyValueStorage> TaskManager<S> {
    pub fn new(service: TaskService<S>) -> Self {
        Self::with_store(TaskStore::new(), service)
    }

    pub fn with_store(store: TaskStore, service: TaskService<S>) -> Self {
        Self {
            store,
            service,
            is_loading: false,
            error: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn service(&self) -> &TaskService<S> {
        &self.service
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message of the last failed operation, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn record<T, E>(&mut self, result: Result<T, E>) -> Result<T, ManagerError>
    where
        E: Into<ManagerError>,
    {
        match result {
            Ok(value) => {
                self.error = None;
                Ok(value)
            }
            Err(err) => {
                let err = err.into();
                tracing::error!(error = %err, "Task operation failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn persist(&mut self) -> Result<(), ManagerError> {
        let result = self.service.save(self.store.tasks()).await;
        self.record(result)
    }

    /// Save after a mutation; a mutation that changed nothing still counts
    /// as a success.
    async fn persist_if(&mut self, changed: bool) -> Result<(), ManagerError> {
        if changed {
            self.persist().await
        } else {
            self.error = None;
            Ok(())
        }
    }

    /// Replace the in-memory tasks with whatever is persisted.
    pub async fn load(&mut self) -> Result<(), ManagerError> {
        self.is_loading = true;
        let result = self.service.load().await;
        self.is_loading = false;

        let tasks = self.record(result)?;
        self.store.set_tasks(tasks);
        Ok(())
    }

    pub async fn create_task(&mut self, input: CreateTaskInput) -> Result<Task, ManagerError> {
        let result = self.store.create(input);
        let task = self.record(result)?;
        self.persist().await?;
        Ok(task)
    }

    /// Returns whether a task with the given id existed.
    pub async fn update_task(&mut self, input: UpdateTaskInput) -> Result<bool, ManagerError> {
        let result = self.store.update(input);
        let updated = self.record(result)?;
        self.persist_if(updated).await?;
        Ok(updated)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<bool, ManagerError> {
        let deleted = self.store.delete(id);
        self.persist_if(deleted).await?;
        Ok(deleted)
    }

    pub async fn advance_status(&mut self, id: &str) -> Result<Option<TaskStatus>, ManagerError> {
        let status = self.store.advance_status(id);
        self.persist_if(status.is_some()).await?;
        Ok(status)
    }

    pub async fn complete_task(&mut self, id: &str) -> Result<bool, ManagerError> {
        let completed = self.store.complete(id);
        self.persist_if(completed).await?;
        Ok(completed)
    }

    pub async fn delete_completed(&mut self) -> Result<usize, ManagerError> {
        let removed = self.store.delete_completed();
        self.persist_if(removed > 0).await?;
        Ok(removed)
    }

    pub async fn complete_all(&mut self) -> Result<usize, ManagerError> {
        let changed = self.store.complete_all();
        self.persist_if(changed > 0).await?;
        Ok(changed)
    }

    pub async fn export(&mut self) -> Result<String, ManagerError> {
        let result = self.service.export().await;
        self.record(result)
    }

    /// Replace every task with the contents of `json`.
    ///
    /// On failure neither storage nor the in-memory tasks change.
    pub async fn import(&mut self, json: &str) -> Result<Vec<Task>, ManagerError> {
        self.is_loading = true;
        let result = self.service.import(json).await;
        self.is_loading = false;

        let tasks = self.record(result)?;
        self.store.set_tasks(tasks.clone());
        Ok(tasks)
    }

    /// Drop persisted tasks and empty the store.
    pub async fn clear(&mut self) -> Result<(), ManagerError> {
        let result = self.service.clear().await;
        self.record(result)?;
        self.store.set_tasks(Vec::new());
        Ok(())
    }

    pub async fn storage_stats(&self) -> StorageStats {
        self.service.storage_stats().await
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn sorted(&self) -> Vec<Task> {
        self.store.sorted()
    }

    pub fn filtered(&self) -> Vec<Task> {
        self.store.filtered()
    }

    pub fn stats(&self) -> TaskStats {
        self.store.stats()
    }

    pub fn set_filter(&mut self, patch: TaskFilter) {
        self.store.set_filter(patch);
    }

    pub fn clear_filter(&mut self) {
        self.store.clear_filter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, StorageError, StoreError};
    use crate::models::Priority;
    use crate::storage::{MemoryStorage, keys};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory storage whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStorage for FlakyStorage {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("disk full".into()));
            }
            self.inner.set_item(key, value).await
        }

        async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key).await
        }
    }

    fn manager() -> TaskManager<FlakyStorage> {
        TaskManager::new(TaskService::new(FlakyStorage::default()))
    }

    async fn stored(manager: &TaskManager<FlakyStorage>) -> Vec<Task> {
        manager.service().load().await.unwrap()
    }

    #[tokio::test]
    async fn mutations_are_saved() {
        let mut manager = manager();
        let task = manager
            .create_task(CreateTaskInput::new("Write tests", Priority::High))
            .await
            .unwrap();
        assert_eq!(stored(&manager).await, [task.clone()]);

        manager.advance_status(&task.id).await.unwrap();
        manager.complete_task(&task.id).await.unwrap();
        assert_eq!(stored(&manager).await[0].status, TaskStatus::Completed);

        assert_eq!(manager.delete_completed().await.unwrap(), 1);
        assert!(stored(&manager).await.is_empty());
    }

    #[tokio::test]
    async fn load_reads_persisted_tasks_into_store() {
        let mut writer = manager();
        writer
            .create_task(CreateTaskInput::new("Persisted", Priority::Low))
            .await
            .unwrap();
        let raw = writer
            .service()
            .storage()
            .get_item(keys::TASKS)
            .await
            .unwrap()
            .unwrap();

        let mut reader = manager();
        reader.service().storage().set_item(keys::TASKS, &raw).await.unwrap();
        reader.load().await.unwrap();

        assert!(!reader.is_loading());
        assert_eq!(reader.store().tasks(), writer.store().tasks());
    }

    #[tokio::test]
    async fn save_failure_is_reported_and_recorded() {
        let mut manager = manager();
        manager.service().storage().fail_writes.store(true, Ordering::SeqCst);

        let err = manager
            .create_task(CreateTaskInput::new("Unsaved", Priority::Low))
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::Service(ServiceError::Save(_))));
        assert_eq!(manager.error(), Some("failed to save tasks"));
        assert_eq!(manager.store().len(), 1);

        manager.service().storage().fail_writes.store(false, Ordering::SeqCst);
        manager.complete_all().await.unwrap();
        assert_eq!(manager.error(), None);
        assert_eq!(stored(&manager).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_create_is_rejected_without_saving() {
        let mut manager = manager();

        let err = manager
            .create_task(CreateTaskInput::new("", Priority::Low))
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::Store(StoreError::EmptyTitle)));
        assert!(manager.store().is_empty());
        assert_eq!(manager.error(), Some("task title must not be empty"));
    }

    /// Leave a recorded error behind without touching the store.
    async fn record_failure(manager: &mut TaskManager<FlakyStorage>) {
        let _ = manager.create_task(CreateTaskInput::new("", Priority::Low)).await;
        assert!(manager.error().is_some());
    }

    #[tokio::test]
    async fn missing_ids_are_noops_that_clear_the_error() {
        let mut manager = manager();

        record_failure(&mut manager).await;
        assert!(!manager.delete_task("nope").await.unwrap());
        assert_eq!(manager.error(), None);

        record_failure(&mut manager).await;
        assert!(!manager.complete_task("nope").await.unwrap());
        assert_eq!(manager.error(), None);

        record_failure(&mut manager).await;
        assert_eq!(manager.advance_status("nope").await.unwrap(), None);
        assert_eq!(manager.error(), None);

        record_failure(&mut manager).await;
        let update = UpdateTaskInput {
            priority: Some(Priority::High),
            ..UpdateTaskInput::new("nope")
        };
        assert!(!manager.update_task(update).await.unwrap());
        assert_eq!(manager.error(), None);

        record_failure(&mut manager).await;
        assert_eq!(manager.delete_completed().await.unwrap(), 0);
        assert_eq!(manager.error(), None);

        record_failure(&mut manager).await;
        assert_eq!(manager.complete_all().await.unwrap(), 0);
        assert_eq!(manager.error(), None);

        assert!(manager.store().is_empty());
        assert!(stored(&manager).await.is_empty());
    }

    #[tokio::test]
    async fn failed_import_leaves_store_untouched() {
        let mut manager = manager();
        let task = manager
            .create_task(CreateTaskInput::new("Keep me", Priority::Medium))
            .await
            .unwrap();

        assert!(manager.import("[{\"title\":\"missing id\"}]").await.is_err());

        assert!(manager.error().is_some());
        assert_eq!(manager.store().tasks(), [task.clone()]);
        assert_eq!(stored(&manager).await, [task]);
    }

    #[tokio::test]
    async fn import_replaces_store_and_export_reflects_it() {
        let mut manager = manager();
        manager
            .create_task(CreateTaskInput::new("Old", Priority::Low))
            .await
            .unwrap();

        let imported = manager
            .import(
                r#"[{"id":"a","title":"Imported","priority":"urgent","status":"in_progress",
                     "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}]"#,
            )
            .await
            .unwrap();

        assert_eq!(manager.store().tasks(), imported.as_slice());
        assert_eq!(manager.get("a").map(|t| t.priority), Some(Priority::Urgent));
        assert!(manager.export().await.unwrap().contains("\"Imported\""));
    }

    #[tokio::test]
    async fn clear_empties_store_and_storage() {
        let mut manager = manager();
        manager
            .create_task(CreateTaskInput::new("Temp", Priority::Low))
            .await
            .unwrap();

        manager.clear().await.unwrap();

        assert!(manager.store().is_empty());
        assert!(stored(&manager).await.is_empty());
        assert_eq!(manager.storage_stats().await.task_count, 0);
    }

    #[tokio::test]
    async fn views_follow_the_active_filter() {
        let mut manager = manager();
        manager
            .create_task(CreateTaskInput::new("Low", Priority::Low))
            .await
            .unwrap();
        let urgent = manager
            .create_task(CreateTaskInput::new("Urgent", Priority::Urgent))
            .await
            .unwrap();

        manager.set_filter(TaskFilter {
            priority: Some(vec![Priority::Urgent]),
            ..TaskFilter::default()
        });
        assert_eq!(manager.filtered(), [urgent.clone()]);
        assert_eq!(manager.sorted()[0], urgent);
        assert_eq!(manager.stats().total, 2);

        manager.clear_filter();
        assert_eq!(manager.filtered().len(), 2);
    }
}
