use clap::Subcommand;
use reqwest::Method;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::load_session;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from API /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health => {
            let session = load_session()?;
            let client = ApiClient::anonymous(&session, url.as_deref())?;
            let (status, body) = client.raw(Method::GET, "/health", None).await?;

            let database = body["data"]["database"].as_str().unwrap_or("unavailable").to_string();
            let data = json!({
                "server": client.base_url().as_str(),
                "http_status": status.as_u16(),
                "database": database,
            });

            if status.is_success() {
                output_success(output_format, &format!("{} is up (database {})", client.base_url(), database), Some(data))
            } else {
                anyhow::bail!("{} answered {} (database unavailable)", client.base_url(), status)
            }
        }
    }
}
