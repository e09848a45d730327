// handlers/public/auth.rs - account creation and login

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{generate_jwt, Claims};
use crate::database::models::PublicUser;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::{require_fields, UserService};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

/// POST /api/auth/register
pub async fn register(ApiJson(body): ApiJson<RegisterRequest>) -> ApiResult<PublicUser> {
    let user = UserService::new()
        .await?
        .register(body.name, body.email, body.password)
        .await?;
    Ok(ApiResponse::created(user))
}

/// POST /api/auth/login - same 401 for an unknown email and a wrong password
pub async fn login(ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<LoginResponse> {
    require_fields(&[("email", body.email.is_some()), ("password", body.password.is_some())])?;
    let (email, password) = (body.email.unwrap_or_default(), body.password.unwrap_or_default());

    let Some(user) = UserService::new().await?.authenticate(&email, &password).await? else {
        warn!("Failed login attempt");
        return Err(ApiError::unauthorized("invalid credentials"));
    };

    let token = generate_jwt(&Claims::new(user.id, user.email.clone()))?;
    info!("User {} logged in", user.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        user: user.into(),
    }))
}
