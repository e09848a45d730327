use axum::{http::StatusCode, Extension};

use crate::database::models::{Client, ClientInput};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::ClientService;

/// GET /api/clients
pub async fn list(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<Client>> {
    let clients = ClientService::new().await?.list(auth.id).await?;
    Ok(ApiResponse::success(clients))
}

/// POST /api/clients
pub async fn post(Extension(auth): Extension<AuthUser>, ApiJson(body): ApiJson<ClientInput>) -> ApiResult<Client> {
    let client = ClientService::new().await?.create(auth.id, body).await?;
    Ok(ApiResponse::created(client))
}

/// GET /api/clients/:id
pub async fn get(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<Client> {
    let client = ClientService::new().await?.get(auth.id, id).await?;
    Ok(ApiResponse::success(client))
}

/// PUT /api/clients/:id
pub async fn put(
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ClientInput>,
) -> ApiResult<Client> {
    let client = ClientService::new().await?.update(auth.id, id, body).await?;
    Ok(ApiResponse::success(client))
}

/// DELETE /api/clients/:id
pub async fn delete(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> Result<StatusCode, crate::error::ApiError> {
    ClientService::new().await?.delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
