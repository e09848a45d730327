use axum::{http::StatusCode, Extension};

use crate::database::models::{NewTimeEntry, TimeEntry};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::{TimeEntryFilter, TimeEntryService};

/// GET /api/time-entries[?taskId=&billed=]
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    ApiQuery(filter): ApiQuery<TimeEntryFilter>,
) -> ApiResult<Vec<TimeEntry>> {
    let entries = TimeEntryService::new().await?.list(auth.id, &filter).await?;
    Ok(ApiResponse::success(entries))
}

/// POST /api/time-entries - a finished stopwatch session
pub async fn post(Extension(auth): Extension<AuthUser>, ApiJson(body): ApiJson<NewTimeEntry>) -> ApiResult<TimeEntry> {
    let entry = TimeEntryService::new().await?.create(auth.id, body).await?;
    Ok(ApiResponse::created(entry))
}

/// GET /api/time-entries/:id
pub async fn get(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<TimeEntry> {
    let entry = TimeEntryService::new().await?.get(auth.id, id).await?;
    Ok(ApiResponse::success(entry))
}

/// DELETE /api/time-entries/:id
pub async fn delete(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode, ApiError> {
    TimeEntryService::new().await?.delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
