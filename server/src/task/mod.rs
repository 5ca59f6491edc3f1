use crate::entities::*;
use chrono::{DateTime, FixedOffset};
use sea_orm::*;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod api;
pub mod store;

pub use api::v1::create_task_router;
use store::{TaskRecord, TaskStore};

/// A persisted to-do task.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<FixedOffset>,
    updated_at: DateTime<FixedOffset>,
}

impl Task {
    pub fn new(
        id: i64,
        title: String,
        description: Option<String>,
        completed: bool,
        created_at: DateTime<FixedOffset>,
        updated_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            completed,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the task is completed.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    /// Returns the last-modification timestamp.
    pub fn updated_at(&self) -> DateTime<FixedOffset> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.completed,
            model.created_at,
            model.updated_at,
        )
    }
}

/// Input for creating or updating a task.
///
/// Validation happens before any store interaction, so a rejected input
/// never results in a partial write.
#[derive(Debug, Clone)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskInput {
    /// Checks the length constraints on `title` and `description`.
    ///
    /// Errors are collected per field so the API layer can report all
    /// violations in a single response.
    pub fn validate(&self) -> Result<(), TaskServiceError> {
        let mut errors = BTreeMap::new();
        if self.title.trim().is_empty() {
            errors.insert("title".to_string(), "Title is required".to_string());
        } else if !(3..=100).contains(&self.title.chars().count()) {
            errors.insert(
                "title".to_string(),
                "Title must be between 3 and 100 characters".to_string(),
            );
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 500 {
                errors.insert(
                    "description".to_string(),
                    "Description must be at most 500 characters".to_string(),
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TaskServiceError::Validation(errors))
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents invalid input, with one message per offending field.
    #[error("Invalid task input")]
    Validation(BTreeMap<String, String>),
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i64),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Shared state handed to the task API handlers.
#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Retrieves all tasks, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Task>, TaskServiceError> {
        tracing::info!("Listing all tasks");
        let models = TaskStore::new(self.db).find_all().await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    /// Retrieves a task by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Task`, or `TaskNotFound` if no task with
    /// that ID exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<Task, TaskServiceError> {
        tracing::info!("Fetching task with ID: {}", id);
        let model = TaskStore::new(self.db)
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        Ok(Task::from(model))
    }

    /// Creates a new task.
    ///
    /// `completed` defaults to `false` when unset. The store assigns the ID
    /// and both timestamps.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, input: TaskInput) -> Result<Task, TaskServiceError> {
        tracing::info!("Creating new task: {}", input.title);
        input.validate()?;
        let created = TaskStore::new(self.db)
            .save(TaskRecord {
                id: None,
                title: input.title,
                description: input.description,
                completed: input.completed.unwrap_or(false),
            })
            .await?;
        Ok(Task::from(created))
    }

    /// Overwrites the title, description and completion flag of an existing
    /// task.
    ///
    /// The read and the subsequent write run inside a single transaction.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: i64, input: TaskInput) -> Result<Task, TaskServiceError> {
        tracing::info!("Updating task with ID: {}", id);
        input.validate()?;
        let txn = self.db.begin().await?;
        let store = TaskStore::new(&txn);
        let existing = store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let updated = store
            .save(TaskRecord {
                id: Some(existing.id),
                title: input.title,
                description: input.description,
                completed: input.completed.unwrap_or(false),
            })
            .await?;
        txn.commit().await?;
        Ok(Task::from(updated))
    }

    /// Flips the completion flag of an existing task.
    ///
    /// The read and the subsequent write run inside a single transaction.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_completed(&self, id: i64) -> Result<Task, TaskServiceError> {
        tracing::info!("Toggling completion of task with ID: {}", id);
        let txn = self.db.begin().await?;
        let store = TaskStore::new(&txn);
        let existing = store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        let toggled = store
            .save(TaskRecord {
                id: Some(existing.id),
                title: existing.title,
                description: existing.description,
                completed: !existing.completed,
            })
            .await?;
        txn.commit().await?;
        Ok(Task::from(toggled))
    }

    /// Permanently removes a task.
    ///
    /// Deleting a nonexistent ID is an error, so the task is loaded first;
    /// the read and the delete run inside a single transaction.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), TaskServiceError> {
        tracing::info!("Deleting task with ID: {}", id);
        let txn = self.db.begin().await?;
        let store = TaskStore::new(&txn);
        let existing = store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))?;
        store.delete(existing.id).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Retrieves tasks filtered by their completion flag, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_completed(&self, completed: bool) -> Result<Vec<Task>, TaskServiceError> {
        tracing::info!("Listing tasks with completed: {}", completed);
        let models = TaskStore::new(self.db).find_by_completed(completed).await?;
        Ok(models.into_iter().map(Task::from).collect())
    }

    /// Retrieves tasks whose title contains the given fragment,
    /// case-insensitively, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_title(&self, fragment: &str) -> Result<Vec<Task>, TaskServiceError> {
        tracing::info!("Searching tasks with title containing: {}", fragment);
        let models = TaskStore::new(self.db)
            .find_by_title_contains(fragment)
            .await?;
        Ok(models.into_iter().map(Task::from).collect())
    }
}
