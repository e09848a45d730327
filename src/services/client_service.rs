use sqlx::PgPool;

use super::{is_foreign_key_violation, require_fields, ServiceError};
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, Client, ClientInput};

pub struct ClientService {
    pool: PgPool,
}

impl ClientService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Client>, ServiceError> {
        let clients = sqlx::query_as("SELECT * FROM clients WHERE user_id = $1 ORDER BY name ASC, id ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Client, ServiceError> {
        let client: Option<Client> = sqlx::query_as("SELECT * FROM clients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        client.ok_or_else(|| ServiceError::not_found("Client"))
    }

    pub async fn create(&self, user_id: i64, input: ClientInput) -> Result<Client, ServiceError> {
        let name = non_blank(input.name);
        require_fields(&[("name", name.is_some())])?;

        let client = sqlx::query_as(
            r#"
            INSERT INTO clients (user_id, name, contact_person, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(non_blank(input.contact_person))
        .bind(non_blank(input.email))
        .bind(non_blank(input.phone))
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    /// Partial update: absent fields keep their stored value, blank ones clear
    /// the optional columns
    pub async fn update(&self, user_id: i64, id: i64, input: ClientInput) -> Result<Client, ServiceError> {
        let existing = self.get(user_id, id).await?;

        let name = match input.name {
            Some(name) => non_blank(Some(name))
                .ok_or_else(|| ServiceError::Validation("Client name cannot be empty".to_string()))?,
            None => existing.name,
        };
        let contact_person = merge(input.contact_person, existing.contact_person);
        let email = merge(input.email, existing.email);
        let phone = merge(input.phone, existing.phone);

        let client = sqlx::query_as(
            r#"
            UPDATE clients
            SET name = $1, contact_person = $2, email = $3, phone = $4, updated_at = NOW()
            WHERE id = $5 AND user_id = $6
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(contact_person)
        .bind(email)
        .bind(phone)
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::Conflict("Client still has projects or invoices".to_string())
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::not_found("Client"));
        }
        Ok(())
    }
}

fn merge(input: Option<String>, existing: Option<String>) -> Option<String> {
    match input {
        Some(value) => non_blank(Some(value)),
        None => existing,
    }
}

#[cfg(test)]
mod tests {
    use super::merge;

    #[test]
    fn merge_keeps_absent_and_clears_blank() {
        let stored = Some("Maria".to_string());
        assert_eq!(merge(None, stored.clone()), stored);
        assert_eq!(merge(Some("  ".to_string()), stored.clone()), None);
        assert_eq!(merge(Some("João".to_string()), stored), Some("João".to_string()));
    }
}
