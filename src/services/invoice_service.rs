use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use super::ServiceError;
use crate::billing::document::InvoiceDocument;
use crate::billing::pix::PixPayload;
use crate::billing::{
    amount_for, check_invoice_transition, effective_hourly_rate, hours_for, next_invoice_number, BillableEntry,
    InvoiceDraft,
};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{non_blank, BillingProfile, Invoice, InvoiceLine, NewInvoice};
use crate::types::InvoiceStatus;

const INVOICE_SELECT: &str = r#"
    SELECT i.id, i.user_id, i.client_id, i.invoice_number, i.amount, i.hourly_rate, i.issue_date,
           i.due_date, i.status, i.created_at, i.updated_at, c.name AS client_name
    FROM invoices i
    LEFT JOIN clients c ON c.id = i.client_id
"#;

#[derive(Debug, Serialize)]
pub struct CreatedInvoice {
    pub message: &'static str,
    pub invoice: Invoice,
    pub time_entry_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceItem {
    #[serde(flatten)]
    pub line: InvoiceLine,
    pub hours: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Serialize)]
pub struct PixCode {
    pub invoice_number: String,
    pub amount: Decimal,
    pub payload: String,
}

pub struct InvoiceService {
    pool: PgPool,
}

impl InvoiceService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Invoice>, ServiceError> {
        let sql = format!("{INVOICE_SELECT} WHERE i.user_id = $1 ORDER BY i.issue_date DESC, i.id DESC");
        let invoices = sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(invoices)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Invoice, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice(&mut conn, user_id, id).await
    }

    /// The invoice with one priced item per billed time entry
    pub async fn detail(&self, user_id: i64, id: i64) -> Result<InvoiceDetail, ServiceError> {
        let invoice = self.get(user_id, id).await?;
        let items = self
            .lines(invoice.id)
            .await?
            .into_iter()
            .map(|line| InvoiceItem {
                hours: hours_for(line.duration_seconds),
                value: amount_for(line.duration_seconds, invoice.hourly_rate),
                line,
            })
            .collect();

        Ok(InvoiceDetail { invoice, items })
    }

    /// Bill a set of the user's unbilled time entries. The entries are locked
    /// for the duration of the transaction so two concurrent requests cannot
    /// bill the same work twice.
    pub async fn create(&self, user_id: i64, input: NewInvoice) -> Result<CreatedInvoice, ServiceError> {
        let ids = input.time_entry_ids.unwrap_or_default();
        if ids.is_empty() {
            return Err(ServiceError::Validation(
                "time_entry_ids must be a non-empty array of time entry ids".to_string(),
            ));
        }

        let billing = &config::config().billing;
        let profile_rate: Option<Decimal> =
            sqlx::query_scalar("SELECT hourly_rate FROM billing_profile WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let hourly_rate = effective_hourly_rate(profile_rate, billing.default_hourly_rate);

        let mut tx = self.pool.begin().await?;

        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT te.id, p.client_id, te.duration_seconds
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE te.id = ANY($1) AND p.user_id = $2 AND te.is_billed = FALSE
            ORDER BY te.id
            FOR UPDATE OF te
            "#,
        )
        .bind(&ids)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        let entries: Vec<BillableEntry> = rows
            .into_iter()
            .map(|(id, client_id, duration_seconds)| BillableEntry {
                id,
                client_id,
                duration_seconds,
            })
            .collect();

        let draft = InvoiceDraft::from_entries(&entries, hourly_rate)?;
        if draft.entry_ids.len() < ids.len() {
            warn!(
                "Invoice for user {} skips {} unknown or already billed entries",
                user_id,
                ids.len() - draft.entry_ids.len()
            );
        }

        let issue_date = Utc::now().date_naive();
        let due_date = input
            .due_date
            .unwrap_or(issue_date + Duration::days(billing.invoice_due_days));

        let invoice_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (user_id, client_id, invoice_number, amount, hourly_rate, issue_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(draft.client_id)
        .bind(next_invoice_number())
        .bind(draft.amount)
        .bind(draft.hourly_rate)
        .bind(issue_date)
        .bind(due_date)
        .bind(InvoiceStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE time_entries SET is_billed = TRUE, invoice_id = $1, updated_at = NOW() WHERE id = ANY($2)",
        )
        .bind(invoice_id)
        .bind(&draft.entry_ids)
        .execute(&mut *tx)
        .await?;

        let invoice = fetch_invoice(&mut tx, user_id, invoice_id).await?;
        tx.commit().await?;

        info!(
            "Created invoice {} for user {} ({} entries, {})",
            invoice.invoice_number,
            user_id,
            draft.entry_ids.len(),
            invoice.amount
        );

        Ok(CreatedInvoice {
            message: "Invoice created and time entries marked as billed",
            invoice,
            time_entry_ids: draft.entry_ids,
        })
    }

    /// Cancelling releases the invoice's entries so they can be billed again
    pub async fn set_status(&self, user_id: i64, id: i64, status: Option<String>) -> Result<Invoice, ServiceError> {
        let status: InvoiceStatus = non_blank(status)
            .ok_or_else(|| ServiceError::Validation("status must be one of pending, paid, canceled".to_string()))?
            .parse()?;

        let mut tx = self.pool.begin().await?;
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let current: InvoiceStatus = current.ok_or_else(|| ServiceError::not_found("Invoice"))?.parse()?;
        check_invoice_transition(current, status)?;

        sqlx::query("UPDATE invoices SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if status == InvoiceStatus::Canceled && current != InvoiceStatus::Canceled {
            let released = sqlx::query(
                "UPDATE time_entries SET is_billed = FALSE, invoice_id = NULL, updated_at = NOW() WHERE invoice_id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            info!("Invoice {} canceled, released {} time entries", id, released.rows_affected());
        }

        let invoice = fetch_invoice(&mut tx, user_id, id).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Pix copy-and-paste code for the invoice amount
    pub async fn pix(&self, user_id: i64, id: i64) -> Result<PixCode, ServiceError> {
        let invoice = self.get(user_id, id).await?;
        let (issuer, profile) = self.issuer(user_id).await?;
        let payload = pix_payload(&invoice, &issuer, profile.as_ref())?;

        Ok(PixCode {
            invoice_number: invoice.invoice_number,
            amount: invoice.amount,
            payload,
        })
    }

    /// Markdown invoice; the Pix section is left out when no key is configured
    pub async fn document(&self, user_id: i64, id: i64) -> Result<String, ServiceError> {
        let invoice = self.get(user_id, id).await?;
        let lines = self.lines(invoice.id).await?;
        let (issuer, profile) = self.issuer(user_id).await?;
        let pix = pix_payload(&invoice, &issuer, profile.as_ref()).ok();

        Ok(InvoiceDocument {
            invoice: &invoice,
            lines: &lines,
            issuer_name: &issuer,
            profile: profile.as_ref(),
            pix_payload: pix.as_deref(),
        }
        .render())
    }

    async fn lines(&self, invoice_id: i64) -> Result<Vec<InvoiceLine>, ServiceError> {
        let lines = sqlx::query_as(
            r#"
            SELECT te.id AS time_entry_id, t.title AS task_title, p.title AS project_title,
                   te.start_time, te.duration_seconds, te.notes
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE te.invoice_id = $1
            ORDER BY te.start_time ASC, te.id ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Display name of the user and their billing profile
    async fn issuer(&self, user_id: i64) -> Result<(String, Option<BillingProfile>), ServiceError> {
        let user: Option<(Option<String>, String)> = sqlx::query_as("SELECT name, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        let (name, email) = user.ok_or_else(|| ServiceError::not_found("User"))?;

        let profile = sqlx::query_as("SELECT * FROM billing_profile WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok((non_blank(name).unwrap_or(email), profile))
    }
}

async fn fetch_invoice(conn: &mut PgConnection, user_id: i64, id: i64) -> Result<Invoice, ServiceError> {
    let sql = format!("{INVOICE_SELECT} WHERE i.id = $1 AND i.user_id = $2");
    let invoice: Option<Invoice> = sqlx::query_as(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    invoice.ok_or_else(|| ServiceError::not_found("Invoice"))
}

fn pix_payload(invoice: &Invoice, issuer: &str, profile: Option<&BillingProfile>) -> Result<String, ServiceError> {
    let key = profile.and_then(BillingProfile::pix_key).unwrap_or_default();
    let city = profile.and_then(|p| p.city.as_deref()).unwrap_or_default();

    let payload = PixPayload::new(key, issuer, city)?
        .with_amount(invoice.amount)
        .with_txid(&invoice.invoice_number)
        .encode()?;
    Ok(payload)
}
