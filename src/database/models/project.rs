use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{BillingType, ProjectStatus};

/// A project row joined with its client's name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub client_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub billing_type: BillingType,
    pub fixed_value: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: Option<String>,
}

/// Body of create and update requests. On update, absent fields keep their
/// stored value; a null or blank date clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    pub client_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::deserialize_date_patch")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::deserialize_date_patch")]
    pub due_date: Option<Option<NaiveDate>>,
    pub billing_type: Option<String>,
    pub fixed_value: Option<Decimal>,
    pub status: Option<String>,
}
