//! Persistence gateway: the task sequence as JSON under a single storage key.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{ServiceError, ValidationError};
use crate::models::Task;
use crate::storage::{KeyValueStorage, keys};

/// Fields every imported record must carry as non-empty strings.
const REQUIRED_FIELDS: [&str; 4] = ["id", "title", "priority", "status"];

/// Summary of what is currently persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub task_count: usize,
    /// Size of the stored JSON in bytes
    pub storage_size: usize,
    /// Latest `updated_at` across stored tasks
    pub last_modified: Option<DateTime<Utc>>,
}

pub struct TaskService<S> {
    storage: S,
}

impl<S: KeyValueStorage> TaskService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the persisted task sequence; nothing stored yet means no tasks.
    pub async fn load(&self) -> Result<Vec<Task>, ServiceError> {
        let raw = self
            .storage
            .get_item(keys::TASKS)
            .await
            .map_err(ServiceError::Load)?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        let tasks: Vec<Task> = serde_json::from_str(&raw).map_err(ServiceError::Corrupt)?;
        tracing::info!(count = tasks.len(), "Tasks loaded");
        Ok(tasks)
    }

    /// Persist the full sequence, overwriting whatever was stored before.
    pub async fn save(&self, tasks: &[Task]) -> Result<(), ServiceError> {
        let json = serde_json::to_string(tasks).map_err(ServiceError::Serialize)?;
        self.storage
            .set_item(keys::TASKS, &json)
            .await
            .map_err(ServiceError::Save)?;
        tracing::debug!(count = tasks.len(), bytes = json.len(), "Tasks saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ServiceError> {
        self.storage
            .remove_item(keys::TASKS)
            .await
            .map_err(ServiceError::Clear)?;
        tracing::info!("Stored tasks cleared");
        Ok(())
    }

    /// Pretty-printed JSON of the persisted sequence.
    pub async fn export(&self) -> Result<String, ServiceError> {
        let tasks = self.load().await?;
        serde_json::to_string_pretty(&tasks).map_err(ServiceError::Serialize)
    }

    /// Validate `json`, then replace the persisted sequence with it.
    ///
    /// Any invalid record rejects the whole payload and nothing is written.
    pub async fn import(&self, json: &str) -> Result<Vec<Task>, ServiceError> {
        let tasks = parse_import(json).inspect_err(|err| {
            tracing::warn!(error = %err, "Import rejected");
        })?;
        self.save(&tasks).await?;
        tracing::info!(count = tasks.len(), "Tasks imported");
        Ok(tasks)
    }

    /// Size and freshness of the stored data. Read failures yield empty stats.
    pub async fn storage_stats(&self) -> StorageStats {
        match self.try_storage_stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(error = %err, "Could not read storage stats");
                StorageStats::default()
            }
        }
    }

    async fn try_storage_stats(&self) -> Result<StorageStats, ServiceError> {
        let raw = self
            .storage
            .get_item(keys::TASKS)
            .await
            .map_err(ServiceError::Load)?;

        let Some(raw) = raw else {
            return Ok(StorageStats::default());
        };

        let tasks: Vec<Task> = serde_json::from_str(&raw).map_err(ServiceError::Corrupt)?;
        Ok(StorageStats {
            task_count: tasks.len(),
            storage_size: raw.len(),
            last_modified: tasks.iter().map(|task| task.updated_at).max(),
        })
    }
}

/// Parse and validate an import payload without touching storage.
pub fn parse_import(json: &str) -> Result<Vec<Task>, ValidationError> {
    let value: Value = serde_json::from_str(json).map_err(ValidationError::Json)?;
    let Value::Array(records) = value else {
        return Err(ValidationError::NotAnArray);
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut tasks = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        for field in REQUIRED_FIELDS {
            let present = record
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(ValidationError::MissingField { index, field });
            }
        }
        let task: Task = serde_json::from_value(record)
            .map_err(|source| ValidationError::Malformed { index, source })?;
        if !seen.insert(task.id.clone()) {
            return Err(ValidationError::DuplicateId { index, id: task.id });
        }
        tasks.push(task);
    }
    Ok(tasks)
}
