pub mod client;
pub mod commands;
pub mod config;
pub mod stopwatch;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "fhub")]
#[command(about = "FreelancerHub CLI - track time and bill clients from the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API base URL (overrides FHUB_API_URL and the saved session)")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Account registration, login and session")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Stopwatch for a task; stopping it records a time entry")]
    Timer {
        #[command(subcommand)]
        cmd: commands::timer::TimerCommands,
    },

    #[command(about = "Recorded time entries")]
    Entries {
        #[command(subcommand)]
        cmd: commands::entries::EntriesCommands,
    },

    #[command(about = "Invoices and Pix payment codes")]
    Invoice {
        #[command(subcommand)]
        cmd: commands::invoice::InvoiceCommands,
    },

    #[command(about = "API server status")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let url = cli.url;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, url, output_format).await,
        Commands::Timer { cmd } => commands::timer::handle(cmd, url, output_format).await,
        Commands::Entries { cmd } => commands::entries::handle(cmd, url, output_format).await,
        Commands::Invoice { cmd } => commands::invoice::handle(cmd, url, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, url, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["fhub", "timer", "start", "12", "--json"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Timer {
                cmd: commands::timer::TimerCommands::Start { task_id: 12 }
            }
        ));
    }

    #[test]
    fn invoice_create_takes_many_ids() {
        let cli = Cli::try_parse_from(["fhub", "invoice", "create", "3", "4", "9"]).unwrap();
        match cli.command {
            Commands::Invoice {
                cmd: commands::invoice::InvoiceCommands::Create { time_entry_ids, .. },
            } => assert_eq!(time_entry_ids, vec![3, 4, 9]),
            _ => panic!("expected invoice create"),
        }
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
