use crate::task::{TaskState, create_task_router};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document covering the task endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::v1::list_tasks_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::toggle_task_handler,
        crate::task::api::v1::delete_task_handler,
        crate::task::api::v1::tasks_by_status_handler,
        crate::task::api::v1::search_tasks_handler,
    ),
    tags((name = "Tasks", description = "Task management endpoints"))
)]
pub struct ApiDoc;

/// Creates the JSON API routes along with the Swagger UI.
pub fn create_api_router(task_state: TaskState) -> Router {
    Router::new()
        .merge(create_task_router(task_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
