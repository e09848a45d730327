pub mod billing_profile;
pub mod client;
pub mod invoice;
pub mod project;
pub mod task;
pub mod time_entry;
pub mod user;

pub use billing_profile::{BillingProfile, BillingProfileInput};
pub use client::{Client, ClientInput};
pub use invoice::{Invoice, InvoiceLine, NewInvoice, StatusChange};
pub use project::{Project, ProjectInput};
pub use task::{Task, TaskInput};
pub use time_entry::{NewTimeEntry, TimeEntry};
pub use user::{PublicUser, User};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

/// Parse a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp, keeping
/// only the date part of the latter. Empty strings mean "no date".
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Serde adapter for optional date fields sent by forms: accepts null, "",
/// `YYYY-MM-DD` or a full timestamp.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw))),
    }
}

/// Date field of a partial update: `None` when the key is absent, `Some(None)`
/// when it is sent as null or blank, which clears the stored date. Use with
/// `#[serde(default)]` so a missing key stays `None`.
pub fn deserialize_date_patch<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_date(deserializer).map(Some)
}

/// Treat blank strings from forms as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
