use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_success, output_table};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum InvoiceCommands {
    #[command(about = "List invoices")]
    List,

    #[command(about = "Bill time entries of one client")]
    Create {
        #[arg(required = true, help = "Time entry ids")]
        time_entry_ids: Vec<i64>,
        #[arg(long, help = "Due date (YYYY-MM-DD)")]
        due_date: Option<NaiveDate>,
    },

    #[command(about = "Show an invoice with its items")]
    Show {
        id: i64,
    },

    #[command(about = "Pix copy-and-paste code for an invoice")]
    Pix {
        id: i64,
    },

    #[command(about = "Print the Markdown invoice document")]
    Document {
        id: i64,
    },
}

pub async fn handle(cmd: InvoiceCommands, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_session(url.as_deref())?;

    match cmd {
        InvoiceCommands::List => {
            let invoices: Value = client.get("/api/invoices").await?;
            let rows = invoices
                .as_array()
                .map(|invoices| {
                    invoices
                        .iter()
                        .map(|i| {
                            vec![
                                field(i, "id"),
                                field(i, "invoice_number"),
                                field(i, "client_name"),
                                field(i, "amount"),
                                field(i, "issue_date"),
                                field(i, "due_date"),
                                field(i, "status"),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();

            output_table(
                output_format,
                &invoices,
                &["ID", "NUMBER", "CLIENT", "AMOUNT", "ISSUED", "DUE", "STATUS"],
                rows,
                "No invoices",
            )
        }
        InvoiceCommands::Create { time_entry_ids, due_date } => {
            let created: Value = client
                .post(
                    "/api/invoices",
                    &json!({ "time_entry_ids": time_entry_ids, "due_date": due_date }),
                )
                .await?;
            let invoice = created.get("invoice").cloned().unwrap_or(Value::Null);
            let message = format!(
                "Invoice {} for {}: R$ {}",
                field(&invoice, "invoice_number"),
                field(&invoice, "client_name"),
                field(&invoice, "amount")
            );
            output_success(output_format, &message, Some(created))
        }
        InvoiceCommands::Show { id } => {
            let invoice: Value = client.get(&format!("/api/invoices/{}", id)).await?;
            let rows = invoice
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            vec![
                                field(item, "project_title"),
                                field(item, "task_title"),
                                field(item, "hours"),
                                field(item, "value"),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();

            if output_format == OutputFormat::Text {
                println!(
                    "{}  {}  {}  R$ {}",
                    field(&invoice, "invoice_number"),
                    field(&invoice, "client_name"),
                    field(&invoice, "status"),
                    field(&invoice, "amount")
                );
            }
            output_table(output_format, &invoice, &["PROJECT", "TASK", "HOURS", "VALUE"], rows, "No items")
        }
        InvoiceCommands::Pix { id } => {
            let pix: Value = client.get(&format!("/api/invoices/{}/pix", id)).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pix)?),
                OutputFormat::Text => println!("{}", field(&pix, "payload")),
            }
            Ok(())
        }
        InvoiceCommands::Document { id } => {
            let markdown = client.text(&format!("/api/invoices/{}/document", id)).await?;
            match output_format {
                OutputFormat::Json => println!("{}", json!({ "document": markdown })),
                OutputFormat::Text => print!("{}", markdown),
            }
            Ok(())
        }
    }
}
