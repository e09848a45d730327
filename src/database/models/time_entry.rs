use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A time entry joined with the task, project and client it belongs to
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimeEntry {
    pub id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub notes: Option<String>,
    pub is_billed: bool,
    pub invoice_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_title: Option<String>,
    pub project_id: Option<i64>,
    pub project_title: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub task_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub notes: Option<String>,
}
