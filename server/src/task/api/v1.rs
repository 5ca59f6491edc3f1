use crate::task::{Task, TaskInput, TaskService, TaskServiceError, TaskState};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier for the task
    id: i64,
    /// Short title of the task
    title: String,
    /// Optional free-form description
    description: Option<String>,
    /// Whether the task is done
    completed: bool,
    /// Creation time (RFC 3339)
    created_at: DateTime<FixedOffset>,
    /// Last modification time (RFC 3339)
    updated_at: DateTime<FixedOffset>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(String::from),
            completed: task.completed(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Request body for creating or updating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskPayload {
    /// Title, 3 to 100 characters
    title: String,
    /// Optional description, at most 500 characters
    #[serde(default)]
    description: Option<String>,
    /// Completion flag, defaults to false on creation
    #[serde(default)]
    completed: Option<bool>,
}

impl From<TaskPayload> for TaskInput {
    fn from(payload: TaskPayload) -> Self {
        Self {
            title: payload.title,
            description: payload.description,
            completed: payload.completed,
        }
    }
}

/// Query parameters for searching tasks by title.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Fragment to match against task titles, case-insensitively
    title: String,
}

/// Error body shared by all failure responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// When the error occurred (RFC 3339)
    timestamp: DateTime<FixedOffset>,
    /// HTTP status code
    status: u16,
    /// Short error category
    error: String,
    /// Human-readable message, absent for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// Per-field validation messages, present only for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
}

/// Wrapper translating [`TaskServiceError`] into HTTP responses.
#[derive(Debug)]
pub struct ApiError(TaskServiceError);

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        Self(err)
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, message, errors) = match self.0 {
            TaskServiceError::Validation(field_errors) => (
                StatusCode::BAD_REQUEST,
                "Validation Error",
                None,
                Some(field_errors),
            ),
            TaskServiceError::TaskNotFound(id) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                Some(format!("Task with ID {} not found", id)),
                None,
            ),
            TaskServiceError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    Some("An internal error occurred. Please try again later.".to_string()),
                    None,
                )
            }
        };
        let body = ErrorResponse {
            timestamp: Utc::now().fixed_offset(),
            status: status.as_u16(),
            error: error.to_string(),
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Handler for GET /tasks - Returns all tasks, newest first.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.list_all().await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = i64, Path, description = "ID of the task")),
    responses(
        (status = 200, description = "Successfully retrieved task", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::new(&state.db);
    let task = service.get_by_id(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for POST /tasks - Creates a new task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = TaskPayload,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(payload): Json<TaskPayload>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let service = TaskService::new(&state.db);
    let task = service.create(TaskInput::from(payload)).await?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for PUT /tasks/{id} - Overwrites an existing task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(("id" = i64, Path, description = "ID of the task")),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::new(&state.db);
    let task = service.update(id, TaskInput::from(payload)).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PATCH /tasks/{id}/toggle - Flips the completion flag.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/tasks/{id}/toggle",
    params(("id" = i64, Path, description = "ID of the task")),
    responses(
        (status = 200, description = "Task toggled", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn toggle_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::new(&state.db);
    let task = service.toggle_completed(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /tasks/{id} - Permanently removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = i64, Path, description = "ID of the task")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let service = TaskService::new(&state.db);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /tasks/status/{completed} - Filters tasks by completion.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/status/{completed}",
    params(("completed" = bool, Path, description = "Completion flag to filter by")),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn tasks_by_status_handler(
    State(state): State<Arc<TaskState>>,
    Path(completed): Path<bool>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.list_by_completed(completed).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/search?title=x - Case-insensitive title search.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/search",
    params(("title" = String, Query, description = "Fragment to match against titles")),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn search_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.search_by_title(&query.title).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Creates and returns the tasks API router.
pub fn create_task_router(state: TaskState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route(
            "/tasks",
            get(list_tasks_handler).post(create_task_handler),
        )
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/tasks/{id}/toggle", patch(toggle_task_handler))
        .route("/tasks/status/{completed}", get(tasks_by_status_handler))
        .route("/tasks/search", get(search_tasks_handler))
        .with_state(state)
}
