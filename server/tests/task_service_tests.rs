use sea_orm::DatabaseConnection;
use std::collections::BTreeSet;
use std::time::Duration;
use taskmanager_server::task::{Task, TaskInput, TaskService, TaskServiceError};
use testcontainers_modules::{postgres, testcontainers};

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

fn task_input(title: &str, description: Option<&str>, completed: Option<bool>) -> TaskInput {
    TaskInput {
        title: title.to_string(),
        description: description.map(String::from),
        completed,
    }
}

/// Timestamps have microsecond resolution in Postgres; a short pause keeps
/// "strictly later" assertions meaningful.
async fn pause() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn ids(tasks: &[Task]) -> BTreeSet<i64> {
    tasks.iter().map(Task::id).collect()
}

#[tokio::test]
async fn can_create_and_fetch_task() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Buy milk", Some("2%"), Some(false)))
        .await
        .expect("Failed to create task");

    assert_eq!(created.title(), "Buy milk");
    assert_eq!(created.description(), Some("2%"));
    assert!(!created.completed());
    assert_eq!(created.created_at(), created.updated_at());

    let fetched = task_service
        .get_by_id(created.id())
        .await
        .expect("Failed to fetch task");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_defaults_completed_to_false() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Walk the dog", None, None))
        .await
        .expect("Failed to create task");

    assert!(!created.completed());
    assert_eq!(created.description(), None);
}

#[tokio::test]
async fn rejects_short_title_without_persisting() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let result = task_service.create(task_input("ab", None, None)).await;
    assert!(matches!(result, Err(TaskServiceError::Validation(_))));

    let tasks = task_service
        .list_all()
        .await
        .expect("Failed to list tasks");
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn can_handle_missing_task() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let result = task_service.get_by_id(999).await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(999))));
    if let Err(e) = result {
        assert_eq!(e.to_string(), "Task with ID 999 not found");
    }
}

#[tokio::test]
async fn toggle_is_an_involution() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Water plants", Some("balcony only"), None))
        .await
        .expect("Failed to create task");

    pause().await;
    let toggled = task_service
        .toggle_completed(created.id())
        .await
        .expect("Failed to toggle task");
    assert!(toggled.completed());
    assert!(toggled.updated_at() > created.updated_at());

    pause().await;
    let toggled_back = task_service
        .toggle_completed(created.id())
        .await
        .expect("Failed to toggle task back");
    assert!(!toggled_back.completed());
    assert!(toggled_back.updated_at() > toggled.updated_at());

    // Everything except the completion flag and updated_at is untouched.
    assert_eq!(toggled_back.id(), created.id());
    assert_eq!(toggled_back.title(), created.title());
    assert_eq!(toggled_back.description(), created.description());
    assert_eq!(toggled_back.created_at(), created.created_at());
}

#[tokio::test]
async fn can_handle_toggle_when_task_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let result = task_service.toggle_completed(42).await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(42))));
}

#[tokio::test]
async fn update_overwrites_fields_but_preserves_identity() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Initial title", Some("initial"), None))
        .await
        .expect("Failed to create task");

    pause().await;
    let updated = task_service
        .update(
            created.id(),
            task_input("Updated title", Some("updated"), Some(true)),
        )
        .await
        .expect("Failed to update task");

    assert_eq!(updated.id(), created.id());
    assert_eq!(updated.title(), "Updated title");
    assert_eq!(updated.description(), Some("updated"));
    assert!(updated.completed());
    assert_eq!(updated.created_at(), created.created_at());
    assert!(updated.updated_at() > created.updated_at());
}

#[tokio::test]
async fn can_handle_update_when_task_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let result = task_service
        .update(12345, task_input("Another title", None, None))
        .await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(12345))));
}

#[tokio::test]
async fn update_validates_before_touching_the_store() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Keep me intact", None, None))
        .await
        .expect("Failed to create task");

    let result = task_service
        .update(created.id(), task_input("ab", None, None))
        .await;
    assert!(matches!(result, Err(TaskServiceError::Validation(_))));

    let fetched = task_service
        .get_by_id(created.id())
        .await
        .expect("Failed to fetch task");
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn delete_then_fetch_is_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let created = task_service
        .create(task_input("Short-lived", None, None))
        .await
        .expect("Failed to create task");

    task_service
        .delete(created.id())
        .await
        .expect("Failed to delete task");

    let result = task_service.get_by_id(created.id()).await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(_))));
}

#[tokio::test]
async fn can_handle_delete_when_task_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let result = task_service.delete(7).await;
    assert!(matches!(result, Err(TaskServiceError::TaskNotFound(7))));
}

#[tokio::test]
async fn partitions_tasks_by_completion_flag() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    task_service
        .create(task_input("Pending one", None, None))
        .await
        .expect("Failed to create task");
    task_service
        .create(task_input("Pending two", None, Some(false)))
        .await
        .expect("Failed to create task");
    task_service
        .create(task_input("Already done", None, Some(true)))
        .await
        .expect("Failed to create task");

    let done = task_service
        .list_by_completed(true)
        .await
        .expect("Failed to list done tasks");
    let pending = task_service
        .list_by_completed(false)
        .await
        .expect("Failed to list pending tasks");
    let all = task_service.list_all().await.expect("Failed to list tasks");

    assert_eq!(done.len(), 1);
    assert_eq!(pending.len(), 2);
    assert!(done.iter().all(Task::completed));
    assert!(pending.iter().all(|task| !task.completed()));

    let union: BTreeSet<i64> = ids(&done).union(&ids(&pending)).copied().collect();
    assert_eq!(union, ids(&all));
}

#[tokio::test]
async fn searches_titles_case_insensitively() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let lower = task_service
        .create(task_input("Teste", None, None))
        .await
        .expect("Failed to create task");
    let upper = task_service
        .create(task_input("TESTE", None, None))
        .await
        .expect("Failed to create task");
    task_service
        .create(task_input("Groceries", None, None))
        .await
        .expect("Failed to create task");

    let matches = task_service
        .search_by_title("te")
        .await
        .expect("Failed to search tasks");

    assert_eq!(ids(&matches), BTreeSet::from([lower.id(), upper.id()]));
}

#[tokio::test]
async fn searches_treat_wildcard_characters_literally() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let literal = task_service
        .create(task_input("Donate 100% of proceeds", None, None))
        .await
        .expect("Failed to create task");
    task_service
        .create(task_input("100 pushups", None, None))
        .await
        .expect("Failed to create task");
    let underscored = task_service
        .create(task_input("review task_list", None, None))
        .await
        .expect("Failed to create task");
    task_service
        .create(task_input("review taskXlist", None, None))
        .await
        .expect("Failed to create task");

    let percent_matches = task_service
        .search_by_title("100%")
        .await
        .expect("Failed to search tasks");
    assert_eq!(ids(&percent_matches), BTreeSet::from([literal.id()]));

    let underscore_matches = task_service
        .search_by_title("task_")
        .await
        .expect("Failed to search tasks");
    assert_eq!(ids(&underscore_matches), BTreeSet::from([underscored.id()]));
}

#[tokio::test]
async fn lists_tasks_newest_first() {
    let state = setup().await.expect("Failed to setup test context");
    let task_service = TaskService::new(&state.db);

    let older = task_service
        .create(task_input("Older task", None, None))
        .await
        .expect("Failed to create task");
    pause().await;
    let newer = task_service
        .create(task_input("Newer task", None, None))
        .await
        .expect("Failed to create task");

    let all = task_service.list_all().await.expect("Failed to list tasks");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id(), newer.id());
    assert_eq!(all[1].id(), older.id());
}
