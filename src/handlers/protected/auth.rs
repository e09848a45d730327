use axum::Extension;

use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;

/// GET /api/auth/whoami
pub async fn whoami(Extension(auth): Extension<AuthUser>) -> ApiResult<PublicUser> {
    let user = UserService::new().await?.find(auth.id).await?;
    Ok(ApiResponse::success(user))
}
