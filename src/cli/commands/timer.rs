use anyhow::bail;
use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{clear_timer, load_timer, save_timer};
use crate::cli::stopwatch::{format_duration, Stopwatch};
use crate::cli::utils::{field, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TimerCommands {
    #[command(about = "Start timing a task")]
    Start {
        #[arg(help = "Task id")]
        task_id: i64,
    },

    #[command(about = "Pause the running stopwatch")]
    Pause,

    #[command(about = "Resume a paused stopwatch")]
    Resume,

    #[command(about = "Show the stopwatch")]
    Status,

    #[command(about = "Stop and record a time entry")]
    Stop {
        #[arg(long, help = "Notes for the time entry")]
        notes: Option<String>,
    },

    #[command(about = "Throw the stopwatch away without recording anything")]
    Discard,
}

fn current() -> anyhow::Result<Stopwatch> {
    match load_timer()? {
        Some(stopwatch) => Ok(stopwatch),
        None => bail!("No stopwatch; start one with `fhub timer start <task_id>`"),
    }
}

fn describe(stopwatch: &Stopwatch) -> Value {
    let now = Utc::now();
    json!({
        "task_id": stopwatch.task_id,
        "started_at": stopwatch.started_at,
        "running": stopwatch.is_running(),
        "elapsed_seconds": stopwatch.elapsed_seconds(now),
        "elapsed": format_duration(stopwatch.elapsed_seconds(now)),
    })
}

pub async fn handle(cmd: TimerCommands, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TimerCommands::Start { task_id } => {
            if let Some(existing) = load_timer()? {
                bail!(
                    "A stopwatch for task {} already exists; stop or discard it first",
                    existing.task_id
                );
            }
            let stopwatch = Stopwatch::start(task_id, Utc::now());
            save_timer(&stopwatch)?;
            output_success(output_format, &format!("Started timing task {}", task_id), Some(describe(&stopwatch)))
        }
        TimerCommands::Pause => {
            let mut stopwatch = current()?;
            stopwatch.pause(Utc::now())?;
            save_timer(&stopwatch)?;
            let elapsed = format_duration(stopwatch.accumulated_seconds);
            output_success(output_format, &format!("Paused at {}", elapsed), Some(describe(&stopwatch)))
        }
        TimerCommands::Resume => {
            let mut stopwatch = current()?;
            stopwatch.resume(Utc::now())?;
            save_timer(&stopwatch)?;
            output_success(output_format, "Resumed", Some(describe(&stopwatch)))
        }
        TimerCommands::Status => {
            let Some(stopwatch) = load_timer()? else {
                return output_success(output_format, "No stopwatch", None);
            };
            let state = if stopwatch.is_running() { "running" } else { "paused" };
            let message = format!(
                "Task {}: {} ({})",
                stopwatch.task_id,
                format_duration(stopwatch.elapsed_seconds(Utc::now())),
                state
            );
            output_success(output_format, &message, Some(describe(&stopwatch)))
        }
        TimerCommands::Stop { notes } => {
            let stopwatch = current()?;
            let entry = stopwatch.finish(Utc::now(), notes);

            // The stopwatch is kept if the upload fails so nothing is lost
            let client = ApiClient::from_session(url.as_deref())?;
            let created: Value = client.post("/api/time-entries", &entry).await?;
            clear_timer()?;

            let message = format!(
                "Recorded {} on task {} (entry {})",
                format_duration(entry.duration_seconds.unwrap_or_default()),
                stopwatch.task_id,
                field(&created, "id")
            );
            output_success(output_format, &message, Some(created))
        }
        TimerCommands::Discard => {
            current()?;
            clear_timer()?;
            output_success(output_format, "Stopwatch discarded", None)
        }
    }
}
