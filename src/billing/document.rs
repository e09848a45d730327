//! Markdown rendering of an invoice, suitable for pandoc or any Markdown
//! viewer.

use std::fmt::Write;

use rust_decimal::Decimal;

use super::{amount_for, hours_for};
use crate::database::models::{BillingProfile, Invoice, InvoiceLine};

pub struct InvoiceDocument<'a> {
    pub invoice: &'a Invoice,
    pub lines: &'a [InvoiceLine],
    /// Name of the freelancer issuing the invoice
    pub issuer_name: &'a str,
    pub profile: Option<&'a BillingProfile>,
    pub pix_payload: Option<&'a str>,
}

fn two_places(value: Decimal) -> String {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value.to_string()
}

fn money(value: Decimal) -> String {
    format!("R$ {}", two_places(value))
}

/// Pipes would break the table layout
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn push_opt(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        let _ = writeln!(out, "{label}: {value}  ");
    }
}

impl InvoiceDocument<'_> {
    pub fn render(&self) -> String {
        let invoice = self.invoice;
        let mut out = String::new();

        let _ = writeln!(out, "# Invoice {}\n", invoice.invoice_number);
        let _ = writeln!(out, "Issued on {}  ", invoice.issue_date.format("%d/%m/%Y"));
        if let Some(due) = invoice.due_date {
            let _ = writeln!(out, "Due on {}  ", due.format("%d/%m/%Y"));
        }
        let _ = writeln!(out, "Status: {}\n", invoice.status);

        out.push_str("## From\n\n");
        let _ = writeln!(out, "**{}**  ", self.issuer_name);
        if let Some(profile) = self.profile {
            push_opt(&mut out, "CPF/CNPJ", profile.cpf_cnpj.as_deref());
            push_opt(&mut out, "Address", profile.address.as_deref());
            let place = [profile.city.as_deref(), profile.state.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" - ");
            push_opt(&mut out, "City", Some(&place));
            push_opt(&mut out, "CEP", profile.cep.as_deref());
            push_opt(&mut out, "Phone", profile.phone.as_deref());
        }
        out.push('\n');

        out.push_str("## Bill to\n\n");
        let _ = writeln!(out, "**{}**\n", invoice.client_name.as_deref().unwrap_or("-"));

        out.push_str("## Services\n\n");
        out.push_str("| Date | Project | Task | Hours | Value |\n");
        out.push_str("|------|---------|------|------:|------:|\n");
        let mut total_seconds = 0;
        for line in self.lines {
            total_seconds += line.duration_seconds;
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                line.start_time.format("%d/%m/%Y"),
                cell(&line.project_title),
                cell(&line.task_title),
                two_places(hours_for(line.duration_seconds)),
                money(amount_for(line.duration_seconds, invoice.hourly_rate)),
            );
        }
        let _ = writeln!(
            out,
            "| | | **Total** | **{}** | **{}** |\n",
            two_places(hours_for(total_seconds)),
            money(invoice.amount)
        );
        let _ = writeln!(out, "Hourly rate: {}\n", money(invoice.hourly_rate));

        if let Some(profile) = self.profile {
            if profile.bank_name.is_some() || profile.account.is_some() {
                out.push_str("## Payment\n\n");
                push_opt(&mut out, "Bank", profile.bank_name.as_deref());
                push_opt(&mut out, "Agency", profile.agency.as_deref());
                push_opt(&mut out, "Account", profile.account.as_deref());
                push_opt(&mut out, "Account type", profile.account_type.as_deref());
                out.push('\n');
            }
        }

        if let Some(pix) = self.pix_payload {
            out.push_str("## Pix\n\n");
            let _ = writeln!(out, "```\n{pix}\n```");
        }

        out
    }
}
