use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{field, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account")]
    Register {
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    #[command(about = "Log in and save the token")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    #[command(about = "Forget the saved token")]
    Logout,

    #[command(about = "Show the logged in user")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register { name, email, password } => {
            let session = load_session()?;
            let client = ApiClient::anonymous(&session, url.as_deref())?;
            let user: Value = client
                .post("/api/auth/register", &json!({ "name": name, "email": email, "password": password }))
                .await?;
            output_success(
                output_format,
                &format!("Registered {} (id {})", field(&user, "email"), field(&user, "id")),
                Some(user),
            )
        }
        AuthCommands::Login { email, password } => {
            let mut session = load_session()?;
            let client = ApiClient::anonymous(&session, url.as_deref())?;
            let response: Value = client
                .post("/api/auth/login", &json!({ "email": email, "password": password }))
                .await?;

            let token = response
                .get("token")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("login response has no token"))?;
            session.server_url = client.base_url().as_str().trim_end_matches('/').to_string();
            session.token = Some(token.to_string());
            session.email = Some(email.clone());
            session.logged_in_at = Some(Utc::now());
            save_session(&session)?;

            output_success(
                output_format,
                &format!("Logged in as {} on {}", email, session.server_url),
                response.get("user").cloned(),
            )
        }
        AuthCommands::Logout => {
            let mut session = load_session()?;
            session.token = None;
            session.email = None;
            session.logged_in_at = None;
            save_session(&session)?;
            output_success(output_format, "Logged out", None)
        }
        AuthCommands::Whoami => {
            let client = ApiClient::from_session(url.as_deref())?;
            let user: Value = client.get("/api/auth/whoami").await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Text => {
                    println!("User:  {} (id {})", field(&user, "email"), field(&user, "id"));
                    let name = field(&user, "name");
                    if !name.is_empty() {
                        println!("Name:  {}", name);
                    }
                    println!("Server: {}", client.base_url());
                }
            }
            Ok(())
        }
    }
}
