use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use super::{require_fields, ServiceError};
use crate::billing::MAX_ENTRY_SECONDS;
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, NewTimeEntry, TimeEntry};

const ENTRY_SELECT: &str = r#"
    SELECT te.id, te.task_id, te.start_time, te.end_time, te.duration_seconds, te.notes,
           te.is_billed, te.invoice_id, te.created_at, te.updated_at,
           t.title AS task_title, p.id AS project_id, p.title AS project_title,
           c.id AS client_id, c.name AS client_name
    FROM time_entries te
    JOIN tasks t ON t.id = te.task_id
    JOIN projects p ON p.id = t.project_id
    LEFT JOIN clients c ON c.id = p.client_id
"#;

/// Query string of the list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryFilter {
    pub task_id: Option<i64>,
    pub billed: Option<bool>,
}

/// Checks a new entry's fields before touching the database
fn validate(input: &NewTimeEntry) -> Result<(i64, DateTime<Utc>, i64), ServiceError> {
    require_fields(&[
        ("task_id", input.task_id.is_some()),
        ("start_time", input.start_time.is_some()),
        ("duration_seconds", input.duration_seconds.is_some()),
    ])?;
    let (Some(task_id), Some(start_time), Some(duration_seconds)) =
        (input.task_id, input.start_time, input.duration_seconds)
    else {
        return Err(ServiceError::MissingFields(vec!["task_id", "start_time", "duration_seconds"]));
    };

    if duration_seconds < 0 {
        return Err(ServiceError::Validation("duration_seconds cannot be negative".to_string()));
    }
    if duration_seconds > MAX_ENTRY_SECONDS {
        return Err(ServiceError::Validation(format!(
            "duration_seconds cannot exceed {} (one year)",
            MAX_ENTRY_SECONDS
        )));
    }
    if input.end_time.is_some_and(|end| end < start_time) {
        return Err(ServiceError::Validation("end_time cannot be before start_time".to_string()));
    }

    Ok((task_id, start_time, duration_seconds))
}

pub struct TimeEntryService {
    pool: PgPool,
}

impl TimeEntryService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64, filter: &TimeEntryFilter) -> Result<Vec<TimeEntry>, ServiceError> {
        let sql = format!(
            "{ENTRY_SELECT} WHERE p.user_id = $1 \
             AND ($2::BIGINT IS NULL OR te.task_id = $2) \
             AND ($3::BOOLEAN IS NULL OR te.is_billed = $3) \
             ORDER BY te.start_time DESC, te.id DESC"
        );
        let entries = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(filter.task_id)
            .bind(filter.billed)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<TimeEntry, ServiceError> {
        let sql = format!("{ENTRY_SELECT} WHERE te.id = $1 AND p.user_id = $2");
        let entry: Option<TimeEntry> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        entry.ok_or_else(|| ServiceError::not_found("Time entry"))
    }

    /// Record a finished stopwatch session. New entries are never billed.
    pub async fn create(&self, user_id: i64, input: NewTimeEntry) -> Result<TimeEntry, ServiceError> {
        let (task_id, start_time, duration_seconds) = validate(&input)?;

        let owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tasks t JOIN projects p ON p.id = t.project_id
                WHERE t.id = $1 AND p.user_id = $2
            )
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        if !owned {
            return Err(ServiceError::not_found("Task"));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO time_entries (task_id, start_time, end_time, duration_seconds, notes, is_billed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id
            "#,
        )
        .bind(task_id)
        .bind(start_time)
        .bind(input.end_time)
        .bind(duration_seconds)
        .bind(non_blank(input.notes))
        .fetch_one(&self.pool)
        .await?;

        self.get(user_id, id).await
    }

    /// Billed entries belong to an invoice and stay until it is canceled
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), ServiceError> {
        let entry = self.get(user_id, id).await?;
        if entry.is_billed {
            return Err(ServiceError::Conflict("Billed time entries cannot be deleted".to_string()));
        }

        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1 AND is_billed = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            // billed between the read and the delete
            return Err(ServiceError::Conflict("Billed time entries cannot be deleted".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> NewTimeEntry {
        NewTimeEntry {
            task_id: Some(4),
            start_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            end_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()),
            duration_seconds: Some(5400),
            notes: None,
        }
    }

    #[test]
    fn accepts_complete_entry() {
        let (task_id, _, duration) = validate(&entry()).unwrap();
        assert_eq!((task_id, duration), (4, 5400));
    }

    #[test]
    fn lists_missing_fields() {
        let input = NewTimeEntry {
            start_time: None,
            duration_seconds: None,
            ..entry()
        };
        match validate(&input) {
            Err(ServiceError::MissingFields(fields)) => assert_eq!(fields, vec!["start_time", "duration_seconds"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_negative_duration_and_reversed_interval() {
        let negative = NewTimeEntry { duration_seconds: Some(-1), ..entry() };
        assert!(matches!(validate(&negative), Err(ServiceError::Validation(_))));

        let reversed = NewTimeEntry {
            end_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            ..entry()
        };
        assert!(matches!(validate(&reversed), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn rejects_durations_longer_than_a_year() {
        let longest = NewTimeEntry { duration_seconds: Some(MAX_ENTRY_SECONDS), end_time: None, ..entry() };
        assert!(validate(&longest).is_ok());

        let too_long = NewTimeEntry { duration_seconds: Some(MAX_ENTRY_SECONDS + 1), ..longest.clone() };
        assert!(matches!(validate(&too_long), Err(ServiceError::Validation(_))));

        let huge = NewTimeEntry { duration_seconds: Some(i64::MAX), ..longest };
        assert!(matches!(validate(&huge), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn filter_reads_camel_case_query() {
        let filter: TimeEntryFilter = serde_json::from_str(r#"{"taskId": 3, "billed": false}"#).unwrap();
        assert_eq!(filter.task_id, Some(3));
        assert_eq!(filter.billed, Some(false));
    }
}
