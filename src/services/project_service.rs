use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::{require_fields, ServiceError};
use crate::billing::derive_project_status;
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, Project, ProjectInput};
use crate::types::{BillingType, ProjectStatus, TaskStatus};

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.client_id, p.title, p.description, p.start_date, p.due_date,
           p.billing_type, p.fixed_value, p.status, p.created_at, p.updated_at,
           c.name AS client_name
    FROM projects p
    LEFT JOIN clients c ON c.id = p.client_id
"#;

/// Recompute a project's status from its tasks and store it when it changed.
/// Meant to run on the connection of the transaction that changed the tasks.
pub async fn refresh_project_status(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Option<ProjectStatus>, ServiceError> {
    let current: Option<String> = sqlx::query_scalar("SELECT status FROM projects WHERE id = $1 FOR UPDATE")
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(current) = current else {
        return Ok(None);
    };
    let current: ProjectStatus = current.parse()?;

    let statuses: Vec<String> = sqlx::query_scalar("SELECT status FROM tasks WHERE project_id = $1")
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await?;
    let tasks = statuses
        .iter()
        .map(|s| s.parse::<TaskStatus>())
        .collect::<Result<Vec<_>, _>>()?;

    match derive_project_status(current, &tasks) {
        Some(next) if next != current => {
            sqlx::query("UPDATE projects SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(next.as_str())
                .bind(project_id)
                .execute(&mut *conn)
                .await?;
            debug!("Project {} moved from {} to {}", project_id, current, next);
            Ok(Some(next))
        }
        _ => Ok(None),
    }
}

/// `fixed_value` only means something for fixed-price projects
fn fixed_value_for(billing_type: BillingType, value: Option<Decimal>) -> Result<Decimal, ServiceError> {
    match billing_type {
        BillingType::Hourly => Ok(Decimal::ZERO),
        BillingType::Fixed => {
            let value = value.unwrap_or(Decimal::ZERO);
            if value < Decimal::ZERO {
                return Err(ServiceError::Validation("fixed_value cannot be negative".to_string()));
            }
            Ok(value)
        }
    }
}

pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Project>, ServiceError> {
        let sql = format!("{PROJECT_SELECT} WHERE p.user_id = $1 ORDER BY p.created_at DESC, p.id DESC");
        let projects = sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(projects)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Project, ServiceError> {
        let sql = format!("{PROJECT_SELECT} WHERE p.id = $1 AND p.user_id = $2");
        let project: Option<Project> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        project.ok_or_else(|| ServiceError::not_found("Project"))
    }

    pub async fn create(&self, user_id: i64, input: ProjectInput) -> Result<Project, ServiceError> {
        let title = non_blank(input.title);
        let billing_type = non_blank(input.billing_type);
        require_fields(&[
            ("client_id", input.client_id.is_some()),
            ("title", title.is_some()),
            ("billing_type", billing_type.is_some()),
        ])?;
        let client_id = input.client_id.unwrap_or_default();
        let billing_type: BillingType = billing_type.unwrap_or_default().parse()?;
        let fixed_value = fixed_value_for(billing_type, input.fixed_value)?;

        self.ensure_client(user_id, client_id).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO projects
                (user_id, client_id, title, description, start_date, due_date, billing_type, fixed_value, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .bind(title)
        .bind(non_blank(input.description))
        .bind(input.start_date.flatten())
        .bind(input.due_date.flatten())
        .bind(billing_type.as_str())
        .bind(fixed_value)
        .bind(ProjectStatus::Proposal.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.get(user_id, id).await
    }

    /// Partial update followed by an auto-status pass, in one transaction
    pub async fn update(&self, user_id: i64, id: i64, input: ProjectInput) -> Result<Project, ServiceError> {
        let existing = self.get(user_id, id).await?;

        let client_id = match input.client_id {
            Some(client_id) if client_id != existing.client_id => {
                self.ensure_client(user_id, client_id).await?;
                client_id
            }
            _ => existing.client_id,
        };
        let title = match input.title {
            Some(title) => non_blank(Some(title))
                .ok_or_else(|| ServiceError::Validation("Project title cannot be empty".to_string()))?,
            None => existing.title,
        };
        let description = match input.description {
            Some(description) => non_blank(Some(description)),
            None => existing.description,
        };
        let billing_type: BillingType = match non_blank(input.billing_type) {
            Some(raw) => raw.parse()?,
            None => existing.billing_type,
        };
        let fixed_value = fixed_value_for(billing_type, input.fixed_value.or(Some(existing.fixed_value)))?;
        let status: ProjectStatus = match non_blank(input.status) {
            Some(raw) => raw.parse()?,
            None => existing.status,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE projects
            SET client_id = $1, title = $2, description = $3, start_date = $4, due_date = $5,
                billing_type = $6, fixed_value = $7, status = $8, updated_at = NOW()
            WHERE id = $9 AND user_id = $10
            "#,
        )
        .bind(client_id)
        .bind(title)
        .bind(description)
        .bind(input.start_date.unwrap_or(existing.start_date))
        .bind(input.due_date.unwrap_or(existing.due_date))
        .bind(billing_type.as_str())
        .bind(fixed_value)
        .bind(status.as_str())
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        refresh_project_status(&mut *tx, id).await?;
        tx.commit().await?;

        self.get(user_id, id).await
    }

    /// Tasks and their time entries go with the project
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Project"));
        }
        Ok(())
    }

    async fn ensure_client(&self, user_id: i64, client_id: i64) -> Result<(), ServiceError> {
        let owned: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND user_id = $2)")
            .bind(client_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        if owned {
            Ok(())
        } else {
            Err(ServiceError::not_found("Client"))
        }
    }
}
