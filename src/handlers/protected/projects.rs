use axum::{http::StatusCode, Extension};

use crate::database::models::{Project, ProjectInput};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::ProjectService;

/// GET /api/projects
pub async fn list(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<Project>> {
    let projects = ProjectService::new().await?.list(auth.id).await?;
    Ok(ApiResponse::success(projects))
}

/// POST /api/projects
pub async fn post(Extension(auth): Extension<AuthUser>, ApiJson(body): ApiJson<ProjectInput>) -> ApiResult<Project> {
    let project = ProjectService::new().await?.create(auth.id, body).await?;
    Ok(ApiResponse::created(project))
}

/// GET /api/projects/:id
pub async fn get(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<Project> {
    let project = ProjectService::new().await?.get(auth.id, id).await?;
    Ok(ApiResponse::success(project))
}

/// PUT /api/projects/:id - saves the changes, then re-derives the status
pub async fn put(
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ProjectInput>,
) -> ApiResult<Project> {
    let project = ProjectService::new().await?.update(auth.id, id, body).await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/projects/:id
pub async fn delete(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode, ApiError> {
    ProjectService::new().await?.delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
