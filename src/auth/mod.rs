use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(id: i64, email: String) -> Self {
        Self::with_expiry(id, email, config::config().security.jwt_expiry_hours)
    }

    pub fn with_expiry(id: i64, email: String, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id,
            email,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    encode_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    decode_with_secret(token, &config::config().security.jwt_secret)
}

pub fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_with_secret(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Hash a password with the configured bcrypt cost. bcrypt is CPU-bound, so
/// it runs on the blocking pool instead of a runtime worker.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_with_cost(password, config::config().security.bcrypt_cost).await
}

async fn hash_with_cost(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// A malformed stored hash counts as a mismatch
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let (password, hash) = (password.to_string(), hash.to_string());
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips_claims() {
        let claims = Claims::with_expiry(42, "ana@example.com".to_string(), 1);
        let token = encode_with_secret(&claims, SECRET).unwrap();
        let decoded = decode_with_secret(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let claims = Claims::with_expiry(1, "a@b.c".to_string(), 1);
        let token = encode_with_secret(&claims, "other").unwrap();
        assert!(matches!(
            decode_with_secret(&token, SECRET),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::with_expiry(1, "a@b.c".to_string(), 1);
        claims.exp = Utc::now().timestamp() - 3600;
        claims.iat = claims.exp - 60;
        let token = encode_with_secret(&claims, SECRET).unwrap();
        assert!(decode_with_secret(&token, SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = Claims::with_expiry(1, "a@b.c".to_string(), 1);
        assert!(matches!(encode_with_secret(&claims, ""), Err(JwtError::InvalidSecret)));
        assert!(matches!(decode_with_secret("x.y.z", ""), Err(JwtError::InvalidSecret)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hash = hash_with_cost("hunter22", 4).await.unwrap();
        assert!(verify_password("hunter22", &hash).await);
        assert!(!verify_password("hunter23", &hash).await);
        assert!(!verify_password("hunter22", "not-a-bcrypt-hash").await);
    }

    #[tokio::test]
    async fn hashing_leaves_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        // cost 10 takes tens of milliseconds; the single-threaded test runtime
        // keeps ticking only if the hash runs elsewhere
        let hash = hash_with_cost("hunter22", 10).await.unwrap();
        ticker.abort();

        assert!(ticks.load(Ordering::SeqCst) > 0);
        assert!(verify_password("hunter22", &hash).await);
    }
}
