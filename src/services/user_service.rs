use sqlx::PgPool;
use tracing::info;

use super::{is_unique_violation, require_fields, ServiceError};
use crate::auth::{hash_password, verify_password};
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, PublicUser, User};

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an account; emails are unique (case-insensitive)
    pub async fn register(
        &self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<PublicUser, ServiceError> {
        let email = non_blank(email).map(|e| e.to_lowercase());
        let password = password.filter(|p| !p.is_empty());
        require_fields(&[("email", email.is_some()), ("password", password.is_some())])?;
        let (email, password) = (email.unwrap_or_default(), password.unwrap_or_default());

        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let hash = hash_password(&password).await?;

        let user: User = sqlx::query_as(
            "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(non_blank(name))
        .bind(&email)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("Email already registered".to_string())
            } else {
                e.into()
            }
        })?;

        info!("Registered user {}", user.id);
        Ok(user.into())
    }

    /// The user matching the credentials, or `None` for an unknown email or a
    /// wrong password alike
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, ServiceError> {
        let Some(user) = self.find_by_email(&email.trim().to_lowercase()).await? else {
            return Ok(None);
        };

        let valid = verify_password(password, &user.password).await;
        Ok(valid.then_some(user))
    }

    pub async fn find(&self, id: i64) -> Result<PublicUser, ServiceError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        user.map(PublicUser::from)
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
