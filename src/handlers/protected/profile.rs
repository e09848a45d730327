use axum::Extension;
use serde::Serialize;

use crate::database::models::{BillingProfile, BillingProfileInput};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::ProfileService;

/// Renders as `{}` until the user saves a profile
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProfileBody {
    Stored(BillingProfile),
    Empty {},
}

/// GET /api/profile
pub async fn get(Extension(auth): Extension<AuthUser>) -> ApiResult<ProfileBody> {
    let body = match ProfileService::new().await?.get(auth.id).await? {
        Some(profile) => ProfileBody::Stored(profile),
        None => ProfileBody::Empty {},
    };
    Ok(ApiResponse::success(body))
}

/// POST|PUT /api/profile
pub async fn save(
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<BillingProfileInput>,
) -> ApiResult<BillingProfile> {
    let profile = ProfileService::new().await?.upsert(auth.id, body).await?;
    Ok(ApiResponse::success(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_is_an_empty_object() {
        assert_eq!(serde_json::to_value(ProfileBody::Empty {}).unwrap(), serde_json::json!({}));
    }
}
