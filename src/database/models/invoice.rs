use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::InvoiceStatus;

/// An invoice row joined with its client's name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub user_id: i64,
    pub client_id: i64,
    pub invoice_number: String,
    pub amount: Decimal,
    /// Rate the amount was computed with
    pub hourly_rate: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: Option<String>,
}

/// A billed time entry as it appears on an invoice
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceLine {
    pub time_entry_id: i64,
    pub task_title: String,
    pub project_title: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInvoice {
    pub time_entry_ids: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "super::deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusChange {
    pub status: Option<String>,
}
