use clap::Subcommand;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::stopwatch::format_duration;
use crate::cli::utils::{field, output_table};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum EntriesCommands {
    #[command(about = "List time entries, newest first")]
    List {
        #[arg(long, help = "Only entries not yet invoiced")]
        unbilled: bool,
        #[arg(long, help = "Only entries of this task")]
        task: Option<i64>,
    },
}

pub fn list_path(unbilled: bool, task: Option<i64>) -> String {
    let mut params = Vec::new();
    if let Some(task) = task {
        params.push(format!("taskId={}", task));
    }
    if unbilled {
        params.push("billed=false".to_string());
    }

    if params.is_empty() {
        "/api/time-entries".to_string()
    } else {
        format!("/api/time-entries?{}", params.join("&"))
    }
}

pub async fn handle(cmd: EntriesCommands, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EntriesCommands::List { unbilled, task } => {
            let client = ApiClient::from_session(url.as_deref())?;
            let entries: Value = client.get(&list_path(unbilled, task)).await?;

            let rows = entries
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| {
                            vec![
                                field(e, "id"),
                                field(e, "start_time").chars().take(16).collect(),
                                format_duration(e.get("duration_seconds").and_then(Value::as_i64).unwrap_or(0)),
                                field(e, "client_name"),
                                field(e, "project_title"),
                                field(e, "task_title"),
                                if e.get("is_billed").and_then(Value::as_bool) == Some(true) {
                                    "billed".to_string()
                                } else {
                                    String::new()
                                },
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();

            output_table(
                output_format,
                &entries,
                &["ID", "START", "DURATION", "CLIENT", "PROJECT", "TASK", ""],
                rows,
                "No time entries",
            )
        }
    }
}
