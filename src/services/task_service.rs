use sqlx::{PgConnection, PgPool};

use super::{refresh_project_status, require_fields, ServiceError};
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, Task, TaskInput};
use crate::types::TaskStatus;

const TASK_SELECT: &str = r#"
    SELECT t.id, t.project_id, t.title, t.description, t.status, t.due_date,
           t.created_at, t.updated_at, p.title AS project_title
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
"#;

/// Kanban tasks. Every mutation re-derives the owning project's status in the
/// same transaction.
pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64, project_id: Option<i64>) -> Result<Vec<Task>, ServiceError> {
        let sql = format!(
            "{TASK_SELECT} WHERE p.user_id = $1 AND ($2::BIGINT IS NULL OR t.project_id = $2) \
             ORDER BY t.created_at ASC, t.id ASC"
        );
        let tasks = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Task, ServiceError> {
        let sql = format!("{TASK_SELECT} WHERE t.id = $1 AND p.user_id = $2");
        let task: Option<Task> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        task.ok_or_else(|| ServiceError::not_found("Task"))
    }

    pub async fn create(&self, user_id: i64, input: TaskInput) -> Result<Task, ServiceError> {
        let title = non_blank(input.title);
        require_fields(&[("project_id", input.project_id.is_some()), ("title", title.is_some())])?;
        let project_id = input.project_id.unwrap_or_default();
        let status: TaskStatus = match non_blank(input.status) {
            Some(raw) => raw.parse()?,
            None => TaskStatus::Todo,
        };

        let mut tx = self.pool.begin().await?;
        ensure_project(&mut *tx, user_id, project_id).await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (project_id, title, description, status, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(title)
        .bind(non_blank(input.description))
        .bind(status.as_str())
        .bind(input.due_date.flatten())
        .fetch_one(&mut *tx)
        .await?;
        refresh_project_status(&mut *tx, project_id).await?;
        tx.commit().await?;

        self.get(user_id, id).await
    }

    /// Partial update; a task may move to another project of the same user,
    /// in which case both projects are refreshed
    pub async fn update(&self, user_id: i64, id: i64, input: TaskInput) -> Result<Task, ServiceError> {
        let existing = self.get(user_id, id).await?;

        let title = match input.title {
            Some(title) => non_blank(Some(title))
                .ok_or_else(|| ServiceError::Validation("Task title cannot be empty".to_string()))?,
            None => existing.title,
        };
        let description = match input.description {
            Some(description) => non_blank(Some(description)),
            None => existing.description,
        };
        let status: TaskStatus = match non_blank(input.status) {
            Some(raw) => raw.parse()?,
            None => existing.status,
        };
        let project_id = input.project_id.unwrap_or(existing.project_id);

        let mut tx = self.pool.begin().await?;
        if project_id != existing.project_id {
            ensure_project(&mut *tx, user_id, project_id).await?;
        }
        sqlx::query(
            r#"
            UPDATE tasks
            SET project_id = $1, title = $2, description = $3, status = $4, due_date = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .bind(input.due_date.unwrap_or(existing.due_date))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        refresh_project_status(&mut *tx, project_id).await?;
        if project_id != existing.project_id {
            refresh_project_status(&mut *tx, existing.project_id).await?;
        }
        tx.commit().await?;

        self.get(user_id, id).await
    }

    /// Moves a task between Kanban columns
    pub async fn set_status(&self, user_id: i64, id: i64, status: Option<String>) -> Result<Task, ServiceError> {
        let status = non_blank(status);
        require_fields(&[("status", status.is_some())])?;
        let status: TaskStatus = status.unwrap_or_default().parse()?;

        let mut tx = self.pool.begin().await?;
        let project_id = owning_project(&mut *tx, user_id, id).await?;
        sqlx::query("UPDATE tasks SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_project_status(&mut *tx, project_id).await?;
        tx.commit().await?;

        self.get(user_id, id).await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        let project_id = owning_project(&mut *tx, user_id, id).await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_project_status(&mut *tx, project_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn ensure_project(conn: &mut PgConnection, user_id: i64, project_id: i64) -> Result<(), ServiceError> {
    let owned: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1 AND user_id = $2)")
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    if owned {
        Ok(())
    } else {
        Err(ServiceError::not_found("Project"))
    }
}

async fn owning_project(conn: &mut PgConnection, user_id: i64, task_id: i64) -> Result<i64, ServiceError> {
    let project_id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT t.project_id
        FROM tasks t
        JOIN projects p ON p.id = t.project_id
        WHERE t.id = $1 AND p.user_id = $2
        FOR UPDATE OF t
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    project_id.ok_or_else(|| ServiceError::not_found("Task"))
}
