use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoicing details of a user: rate, tax id, address and bank data
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BillingProfile {
    pub id: i64,
    pub user_id: i64,
    pub hourly_rate: Decimal,
    pub cpf_cnpj: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub bank_name: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    pub account_type: Option<String>,
    pub pix_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BillingProfile {
    /// The configured Pix key, or the CPF/CNPJ digits which are valid keys too
    pub fn pix_key(&self) -> Option<String> {
        self.pix_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let digits: String = self
                    .cpf_cnpj
                    .as_deref()?
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect();
                (!digits.is_empty()).then_some(digits)
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingProfileInput {
    pub hourly_rate: Option<Decimal>,
    pub cpf_cnpj: Option<String>,
    pub address: Option<String>,
    pub cep: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub bank_name: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    pub account_type: Option<String>,
    pub pix_key: Option<String>,
}
