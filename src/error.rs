//! Error types

use thiserror::Error;

/// Rejection of a structurally invalid store mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("task title must not be empty")]
    EmptyTitle,
}

/// An enum value that does not match any known variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Failure inside a key-value storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage connection lock poisoned")]
    Poisoned,
    #[error("{0}")]
    Backend(String),
}

/// Reasons an import payload is rejected as a whole.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("expected a JSON array of tasks")]
    NotAnArray,
    #[error("task at index {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("task at index {index} repeats id {id:?}")]
    DuplicateId { index: usize, id: String },
    #[error("task at index {index} is malformed: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure at the persistence boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to load tasks")]
    Load(#[source] StorageError),
    #[error("failed to save tasks")]
    Save(#[source] StorageError),
    #[error("failed to clear tasks")]
    Clear(#[source] StorageError),
    #[error("stored task data is corrupt")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize tasks")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to import tasks: {0}")]
    Validation(#[from] ValidationError),
}

/// Any failure surfaced by [`crate::manager::TaskManager`].
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}
