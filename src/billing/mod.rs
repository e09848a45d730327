//! Billing rules: project auto-status, invoice drafting from time entries,
//! and the documents handed to clients (Pix payload, Markdown invoice).
//!
//! Everything here is pure; the services load rows, call into this module and
//! persist the result inside their own transaction.

pub mod document;
pub mod pix;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{InvoiceStatus, ProjectStatus, TaskStatus};

const SECONDS_PER_HOUR: i64 = 3600;

/// Longest single time entry accepted: one leap year
pub const MAX_ENTRY_SECONDS: i64 = 366 * 24 * SECONDS_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("No valid time entries found, or the entries were already billed")]
    NoEntries,
    #[error("All time entries must belong to the same client")]
    MixedClients,
    #[error("Hourly rate cannot be negative")]
    NegativeRate,
    #[error("Canceled invoices cannot change status")]
    InvoiceCanceled,
    #[error("Total duration of the time entries is too large")]
    DurationOverflow,
}

/// Status a project should move to given its tasks, or `None` when the
/// current status is outside automation (`Concluído` and `Faturado`).
pub fn derive_project_status(current: ProjectStatus, tasks: &[TaskStatus]) -> Option<ProjectStatus> {
    if matches!(current, ProjectStatus::Completed | ProjectStatus::Invoiced) {
        return None;
    }

    if tasks.is_empty() {
        return Some(ProjectStatus::Proposal);
    }

    let derived = if tasks.iter().all(|t| *t == TaskStatus::Done) {
        ProjectStatus::Completed
    } else if tasks.iter().any(|t| *t == TaskStatus::Doing) {
        ProjectStatus::InProgress
    } else {
        ProjectStatus::Proposal
    };

    Some(derived)
}

/// The profile's rate when it is set and positive, otherwise the default
pub fn effective_hourly_rate(profile_rate: Option<Decimal>, default_rate: Decimal) -> Decimal {
    match profile_rate {
        Some(rate) if rate > Decimal::ZERO => rate,
        _ => default_rate,
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Billed value of `seconds` of work at `hourly_rate`, rounded to cents
pub fn amount_for(seconds: i64, hourly_rate: Decimal) -> Decimal {
    round_money(Decimal::from(seconds) * hourly_rate / Decimal::from(SECONDS_PER_HOUR))
}

pub fn hours_for(seconds: i64) -> Decimal {
    round_money(Decimal::from(seconds) / Decimal::from(SECONDS_PER_HOUR))
}

/// An unbilled time entry as seen by invoice generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillableEntry {
    pub id: i64,
    pub client_id: i64,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub client_id: i64,
    pub entry_ids: Vec<i64>,
    pub total_seconds: i64,
    pub hourly_rate: Decimal,
    pub amount: Decimal,
}

impl InvoiceDraft {
    /// Aggregate entries into a single-client invoice. The amount is computed
    /// from the summed duration so per-entry rounding does not accumulate.
    pub fn from_entries(entries: &[BillableEntry], hourly_rate: Decimal) -> Result<Self, BillingError> {
        if hourly_rate < Decimal::ZERO {
            return Err(BillingError::NegativeRate);
        }

        let first = entries.first().ok_or(BillingError::NoEntries)?;
        if entries.iter().any(|e| e.client_id != first.client_id) {
            return Err(BillingError::MixedClients);
        }

        let total_seconds = entries
            .iter()
            .try_fold(0i64, |total, e| total.checked_add(e.duration_seconds))
            .ok_or(BillingError::DurationOverflow)?;

        Ok(Self {
            client_id: first.client_id,
            entry_ids: entries.iter().map(|e| e.id).collect(),
            total_seconds,
            hourly_rate,
            amount: amount_for(total_seconds, hourly_rate),
        })
    }
}

/// `INV-<unix millis>-<000..999>`
pub fn invoice_number(at: DateTime<Utc>, suffix: u16) -> String {
    format!("INV-{}-{:03}", at.timestamp_millis(), suffix % 1000)
}

pub fn next_invoice_number() -> String {
    let random = uuid::Uuid::new_v4().as_u128();
    invoice_number(Utc::now(), (random % 1000) as u16)
}

/// A canceled invoice has released its entries and stays canceled
pub fn check_invoice_transition(from: InvoiceStatus, to: InvoiceStatus) -> Result<(), BillingError> {
    if from == InvoiceStatus::Canceled && to != InvoiceStatus::Canceled {
        return Err(BillingError::InvoiceCanceled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use TaskStatus::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn project_without_tasks_is_a_proposal() {
        assert_eq!(
            derive_project_status(ProjectStatus::InProgress, &[]),
            Some(ProjectStatus::Proposal)
        );
    }

    #[test]
    fn all_done_completes_project() {
        assert_eq!(
            derive_project_status(ProjectStatus::Proposal, &[Done, Done]),
            Some(ProjectStatus::Completed)
        );
    }

    #[test]
    fn any_doing_means_in_progress() {
        assert_eq!(
            derive_project_status(ProjectStatus::Planning, &[Todo, Doing, Done]),
            Some(ProjectStatus::InProgress)
        );
    }

    #[test]
    fn todo_and_done_without_doing_falls_back_to_proposal() {
        assert_eq!(
            derive_project_status(ProjectStatus::InProgress, &[Todo, Done]),
            Some(ProjectStatus::Proposal)
        );
    }

    #[test]
    fn completed_and_invoiced_projects_are_left_alone() {
        assert_eq!(derive_project_status(ProjectStatus::Completed, &[Todo]), None);
        assert_eq!(derive_project_status(ProjectStatus::Invoiced, &[Doing]), None);
    }

    #[test]
    fn profile_rate_wins_only_when_positive() {
        let default = dec("50.00");
        assert_eq!(effective_hourly_rate(Some(dec("120")), default), dec("120"));
        assert_eq!(effective_hourly_rate(Some(Decimal::ZERO), default), default);
        assert_eq!(effective_hourly_rate(None, default), default);
    }

    #[test]
    fn amount_rounds_half_away_from_zero() {
        // 1 second at 90/h is 0.025
        assert_eq!(amount_for(1, dec("90")), dec("0.03"));
        assert_eq!(amount_for(5400, dec("50")), dec("75.00"));
        assert_eq!(hours_for(4500), dec("1.25"));
    }

    #[test]
    fn draft_sums_durations_for_single_client() {
        let entries = vec![
            BillableEntry { id: 1, client_id: 9, duration_seconds: 1800 },
            BillableEntry { id: 2, client_id: 9, duration_seconds: 2700 },
        ];
        let draft = InvoiceDraft::from_entries(&entries, dec("80")).unwrap();
        assert_eq!(draft.client_id, 9);
        assert_eq!(draft.entry_ids, vec![1, 2]);
        assert_eq!(draft.total_seconds, 4500);
        assert_eq!(draft.amount, dec("100.00"));
    }

    #[test]
    fn draft_rejects_mixed_clients_and_empty_input() {
        let entries = vec![
            BillableEntry { id: 1, client_id: 1, duration_seconds: 60 },
            BillableEntry { id: 2, client_id: 2, duration_seconds: 60 },
        ];
        assert_eq!(
            InvoiceDraft::from_entries(&entries, dec("50")),
            Err(BillingError::MixedClients)
        );
        assert_eq!(InvoiceDraft::from_entries(&[], dec("50")), Err(BillingError::NoEntries));
        assert_eq!(
            InvoiceDraft::from_entries(&entries[..1], dec("-1")),
            Err(BillingError::NegativeRate)
        );
    }

    #[test]
    fn draft_reports_overflowing_totals() {
        let half = i64::MAX / 2 + 1;
        let entries = vec![
            BillableEntry { id: 1, client_id: 3, duration_seconds: half },
            BillableEntry { id: 2, client_id: 3, duration_seconds: half },
        ];
        assert_eq!(
            InvoiceDraft::from_entries(&entries, dec("50")),
            Err(BillingError::DurationOverflow)
        );
    }

    #[test]
    fn invoice_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(invoice_number(at, 7), "INV-1714564800000-007");
        assert!(next_invoice_number().starts_with("INV-"));
    }

    #[test]
    fn canceled_invoice_is_terminal() {
        assert!(check_invoice_transition(InvoiceStatus::Pending, InvoiceStatus::Paid).is_ok());
        assert!(check_invoice_transition(InvoiceStatus::Paid, InvoiceStatus::Canceled).is_ok());
        assert_eq!(
            check_invoice_transition(InvoiceStatus::Canceled, InvoiceStatus::Pending),
            Err(BillingError::InvoiceCanceled)
        );
    }
}
