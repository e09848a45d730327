use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::ServiceError;
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::types::TaskStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UpcomingTask {
    pub id: i64,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub project_title: String,
    pub client_name: Option<String>,
}

/// Home screen numbers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_projects: i64,
    pub total_clients: i64,
    pub total_hours_all: Decimal,
    pub total_value_pending: Decimal,
    pub upcoming_tasks: Vec<UpcomingTask>,
}

fn two_places(mut value: Decimal) -> Decimal {
    value = value.round_dp(2);
    value.rescale(2);
    value
}

/// Summed seconds as hours; the sum is NUMERIC so it cannot overflow
fn total_hours(seconds: Decimal) -> Decimal {
    two_places(seconds / Decimal::from(3600))
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn summary(&self, user_id: i64) -> Result<DashboardSummary, ServiceError> {
        let total_projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let total_clients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let total_seconds: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(te.duration_seconds), 0)::NUMERIC
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let total_pending: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM invoices WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(crate::types::InvoiceStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        let horizon = Utc::now().date_naive() + Duration::days(config::config().billing.upcoming_task_days);
        let upcoming_tasks = sqlx::query_as(
            r#"
            SELECT t.id, t.title, t.due_date, t.status, p.title AS project_title, c.name AS client_name
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            LEFT JOIN clients c ON c.id = p.client_id
            WHERE p.user_id = $1
              AND t.status IN ('todo', 'doing')
              AND t.due_date IS NOT NULL
              AND t.due_date <= $2
            ORDER BY t.due_date ASC, t.title ASC
            "#,
        )
        .bind(user_id)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardSummary {
            total_projects,
            total_clients,
            total_hours_all: total_hours(total_seconds),
            total_value_pending: two_places(total_pending),
            upcoming_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_camel_case_keys() {
        let summary = DashboardSummary {
            total_projects: 2,
            total_clients: 1,
            total_hours_all: total_hours(Decimal::from(5400)),
            total_value_pending: two_places(Decimal::ZERO),
            upcoming_tasks: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalProjects"], 2);
        assert_eq!(json["totalHoursAll"], "1.50");
        assert_eq!(json["totalValuePending"], "0.00");
        assert!(json["upcomingTasks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn hours_beyond_bigint_range_still_add_up() {
        let seconds = Decimal::from(i64::MAX) * Decimal::from(2);
        assert!(total_hours(seconds) > Decimal::from(i64::MAX / 3600));
    }
}
