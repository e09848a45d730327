use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::TaskStatus;

/// A task row joined with its project's title
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub project_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// `Some(None)` clears the due date
    #[serde(default, alias = "dueDate", deserialize_with = "super::deserialize_date_patch")]
    pub due_date: Option<Option<NaiveDate>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_due_date() {
        let input: TaskInput =
            serde_json::from_str(r#"{"title": "Wireframes", "dueDate": "2025-11-08T00:00:00.000Z"}"#).unwrap();
        assert_eq!(input.due_date, Some(NaiveDate::from_ymd_opt(2025, 11, 8)));
        assert_eq!(input.title.as_deref(), Some("Wireframes"));
        assert!(input.project_id.is_none());
    }

    #[test]
    fn null_due_date_clears_while_missing_keeps() {
        let cleared: TaskInput = serde_json::from_str(r#"{"title": "Wireframes", "due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let untouched: TaskInput = serde_json::from_str(r#"{"title": "Wireframes"}"#).unwrap();
        assert_eq!(untouched.due_date, None);
    }
}
