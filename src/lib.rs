//! taskmate - local-first task manager
//!
//! Tasks with priority, status, due dates and tags, kept in an in-memory
//! [`store::TaskStore`] and persisted as a JSON array through a key-value
//! [`storage::KeyValueStorage`] backend.

pub mod config;
pub mod error;
pub mod labels;
pub mod manager;
pub mod models;
pub mod query;
pub mod service;
pub mod storage;
pub mod store;

pub use error::{ManagerError, ServiceError, StorageError, StoreError, ValidationError};
pub use manager::TaskManager;
pub use models::{
    CreateTaskInput, DateRange, Priority, PriorityCounts, Task, TaskFilter, TaskStats, TaskStatus,
    UpdateTaskInput,
};
pub use query::{compute_stats, filter_tasks, priority_weight, sort_tasks};
pub use service::{StorageStats, TaskService};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::TaskStore;
