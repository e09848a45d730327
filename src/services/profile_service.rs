use rust_decimal::Decimal;
use sqlx::PgPool;

use super::ServiceError;
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, BillingProfile, BillingProfileInput};

pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<BillingProfile>, ServiceError> {
        let profile = sqlx::query_as("SELECT * FROM billing_profile WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// One profile per user: the first save creates it, later saves replace it
    pub async fn upsert(&self, user_id: i64, input: BillingProfileInput) -> Result<BillingProfile, ServiceError> {
        let hourly_rate = input.hourly_rate.unwrap_or(Decimal::ZERO);
        if hourly_rate < Decimal::ZERO {
            return Err(ServiceError::Validation("hourly_rate cannot be negative".to_string()));
        }

        let profile = sqlx::query_as(
            r#"
            INSERT INTO billing_profile
                (user_id, hourly_rate, cpf_cnpj, address, cep, city, state, phone,
                 bank_name, agency, account, account_type, pix_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                hourly_rate = EXCLUDED.hourly_rate,
                cpf_cnpj = EXCLUDED.cpf_cnpj,
                address = EXCLUDED.address,
                cep = EXCLUDED.cep,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                phone = EXCLUDED.phone,
                bank_name = EXCLUDED.bank_name,
                agency = EXCLUDED.agency,
                account = EXCLUDED.account,
                account_type = EXCLUDED.account_type,
                pix_key = EXCLUDED.pix_key,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(hourly_rate)
        .bind(non_blank(input.cpf_cnpj))
        .bind(non_blank(input.address))
        .bind(non_blank(input.cep))
        .bind(non_blank(input.city))
        .bind(non_blank(input.state))
        .bind(non_blank(input.phone))
        .bind(non_blank(input.bank_name))
        .bind(non_blank(input.agency))
        .bind(non_blank(input.account))
        .bind(non_blank(input.account_type))
        .bind(non_blank(input.pix_key))
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}
