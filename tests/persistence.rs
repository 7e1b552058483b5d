use std::path::Path;

use serde_json::Value;

use taskmate::{
    CreateTaskInput, ManagerError, Priority, ServiceError, SqliteStorage, TaskManager,
    TaskService, TaskStatus, UpdateTaskInput, ValidationError,
};

async fn open(path: &Path) -> TaskManager<SqliteStorage> {
    let storage = SqliteStorage::open(path).expect("open database");
    let mut manager = TaskManager::new(TaskService::new(storage));
    manager.load().await.expect("load tasks");
    manager
}

#[tokio::test]
async fn tasks_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite");

    let (kept, dropped) = {
        let mut manager = open(&path).await;
        let kept = manager
            .create_task(
                CreateTaskInput::new("Renew passport", Priority::High)
                    .with_description("photos first")
                    .with_tags(["admin"]),
            )
            .await
            .unwrap();
        let dropped = manager
            .create_task(CreateTaskInput::new("Old errand", Priority::Low))
            .await
            .unwrap();
        manager.complete_task(&dropped.id).await.unwrap();
        manager.delete_completed().await.unwrap();
        (kept, dropped)
    };

    let manager = open(&path).await;
    assert_eq!(manager.store().tasks(), [kept]);
    assert!(manager.get(&dropped.id).is_none());
}

#[tokio::test]
async fn advancing_three_times_returns_to_pending() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite");
    let mut manager = open(&path).await;
    let task = manager
        .create_task(CreateTaskInput::new("Cycle", Priority::Medium))
        .await
        .unwrap();

    let first = manager.advance_status(&task.id).await.unwrap();
    assert_eq!(first, Some(TaskStatus::InProgress));
    assert!(manager.get(&task.id).unwrap().completed_at.is_none());

    let second = manager.advance_status(&task.id).await.unwrap();
    assert_eq!(second, Some(TaskStatus::Completed));
    assert!(manager.get(&task.id).unwrap().completed_at.is_some());

    let third = manager.advance_status(&task.id).await.unwrap();
    assert_eq!(third, Some(TaskStatus::Pending));
    assert!(manager.get(&task.id).unwrap().completed_at.is_none());

    let reopened = open(&path).await;
    assert_eq!(reopened.get(&task.id).unwrap().status, TaskStatus::Pending);
}

#[tokio::test]
async fn import_then_export_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = open(&dir.path().join("taskmate.sqlite")).await;
    let payload = r#"[
        {
            "id": "1",
            "title": "x",
            "description": "imported",
            "priority": "low",
            "status": "completed",
            "dueDate": "2024-06-30T18:00:00Z",
            "createdAt": "2024-06-01T08:00:00Z",
            "updatedAt": "2024-06-02T08:00:00Z",
            "completedAt": "2024-06-02T08:00:00Z",
            "tags": ["a", "b"]
        }
    ]"#;

    let imported = manager.import(payload).await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(manager.stats().completed, 1);

    let exported: Value = serde_json::from_str(&manager.export().await.unwrap()).unwrap();
    let original: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(exported, original);
}

#[tokio::test]
async fn import_with_missing_id_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite");
    let mut manager = open(&path).await;

    let err = manager
        .import(r#"[{"title":"missing id"}]"#)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Service(ServiceError::Validation(ValidationError::MissingField {
            index: 0,
            field: "id"
        }))
    ));
    assert!(open(&path).await.store().is_empty());
    assert_eq!(manager.storage_stats().await.task_count, 0);
}

#[tokio::test]
async fn updates_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite");
    let mut manager = open(&path).await;
    let task = manager
        .create_task(CreateTaskInput::new("Draft", Priority::Low))
        .await
        .unwrap();

    manager
        .update_task(UpdateTaskInput {
            title: Some("Final".into()),
            status: Some(TaskStatus::Completed),
            ..UpdateTaskInput::new(&task.id)
        })
        .await
        .unwrap();

    let reopened = open(&path).await;
    let stored = reopened.get(&task.id).unwrap();
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.status, TaskStatus::Completed);
    assert!(stored.completed_at.is_some());
    assert!(stored.created_at <= stored.updated_at);
}

#[tokio::test]
async fn import_with_repeated_ids_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite");
    let mut manager = open(&path).await;
    let kept = manager
        .create_task(CreateTaskInput::new("Keep me", Priority::Medium))
        .await
        .unwrap();
    let record = r#"{"id":"1","title":"twin","priority":"low","status":"pending",
        "createdAt":"2024-06-01T08:00:00Z","updatedAt":"2024-06-01T08:00:00Z"}"#;

    let err = manager
        .import(&format!("[{record},{record}]"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Service(ServiceError::Validation(ValidationError::DuplicateId {
            index: 1,
            ..
        }))
    ));
    assert_eq!(manager.store().tasks(), [kept.clone()]);
    assert!(!manager.delete_task("1").await.unwrap());
    assert_eq!(open(&path).await.store().tasks(), [kept]);
}
