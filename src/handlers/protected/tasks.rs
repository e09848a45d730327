use axum::{http::StatusCode, Extension};
use serde::Deserialize;

use crate::database::models::{StatusChange, Task, TaskInput};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::TaskService;

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    #[serde(alias = "projectId")]
    pub project_id: Option<i64>,
}

/// GET /api/tasks[?projectId=]
pub async fn list(Extension(auth): Extension<AuthUser>, ApiQuery(query): ApiQuery<TaskQuery>) -> ApiResult<Vec<Task>> {
    let tasks = TaskService::new().await?.list(auth.id, query.project_id).await?;
    Ok(ApiResponse::success(tasks))
}

/// POST /api/tasks
pub async fn post(Extension(auth): Extension<AuthUser>, ApiJson(body): ApiJson<TaskInput>) -> ApiResult<Task> {
    let task = TaskService::new().await?.create(auth.id, body).await?;
    Ok(ApiResponse::created(task))
}

/// GET /api/tasks/:id
pub async fn get(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<Task> {
    let task = TaskService::new().await?.get(auth.id, id).await?;
    Ok(ApiResponse::success(task))
}

/// PUT /api/tasks/:id
pub async fn put(
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<TaskInput>,
) -> ApiResult<Task> {
    let task = TaskService::new().await?.update(auth.id, id, body).await?;
    Ok(ApiResponse::success(task))
}

/// PATCH /api/tasks/:id/status - Kanban drag and drop
pub async fn patch_status(
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult<Task> {
    let task = TaskService::new().await?.set_status(auth.id, id, body.status).await?;
    Ok(ApiResponse::success(task))
}

/// DELETE /api/tasks/:id
pub async fn delete(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode, ApiError> {
    TaskService::new().await?.delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
