pub mod client_service;
pub mod dashboard_service;
pub mod invoice_service;
pub mod profile_service;
pub mod project_service;
pub mod task_service;
pub mod time_entry_service;
pub mod user_service;

pub use client_service::ClientService;
pub use dashboard_service::{DashboardService, DashboardSummary, UpcomingTask};
pub use invoice_service::{CreatedInvoice, InvoiceDetail, InvoiceService};
pub use profile_service::ProfileService;
pub use project_service::{refresh_project_status, ProjectService};
pub use task_service::TaskService;
pub use time_entry_service::{TimeEntryFilter, TimeEntryService};
pub use user_service::UserService;

use crate::auth::PasswordError;
use crate::billing::pix::PixError;
use crate::billing::BillingError;
use crate::database::manager::DatabaseError;
use crate::types::StatusParseError;

/// Errors shared by the entity services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database manager error: {0}")]
    DatabaseManager(#[from] DatabaseError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error(transparent)]
    Pix(#[from] PixError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<StatusParseError> for ServiceError {
    fn from(err: StatusParseError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }
}

/// Fails with the names of every `None` field
pub fn require_fields(fields: &[(&'static str, bool)]) -> Result<(), ServiceError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::MissingFields(missing))
    }
}

/// `foreign_key_violation` or `restrict_violation`
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23503" || code == "23001")
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505")
}
