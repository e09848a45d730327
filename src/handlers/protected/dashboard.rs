use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{DashboardService, DashboardSummary};

/// GET /api/inicio
pub async fn get(Extension(auth): Extension<AuthUser>) -> ApiResult<DashboardSummary> {
    let summary = DashboardService::new().await?.summary(auth.id).await?;
    Ok(ApiResponse::success(summary))
}
