//! Files under the CLI config directory: `session.json` (server and token)
//! and `timer.json` (the running stopwatch, if any).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::stopwatch::Stopwatch;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub server_url: String,
    pub token: Option<String>,
    pub email: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            email: None,
            logged_in_at: None,
        }
    }
}

impl Session {
    /// `--url`, then `FHUB_API_URL`, then the saved server
    pub fn resolve_url(&self, cli_url: Option<&str>) -> String {
        cli_url
            .map(str::to_string)
            .or_else(|| std::env::var("FHUB_API_URL").ok().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| self.server_url.clone())
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("FHUB_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("fhub")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn load_json<T: DeserializeOwned>(name: &str) -> anyhow::Result<Option<T>> {
    let file = get_config_dir()?.join(name);
    if !file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(file)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn save_json<T: Serialize>(name: &str, value: &T) -> anyhow::Result<()> {
    let file = get_config_dir()?.join(name);
    let content = serde_json::to_string_pretty(value)?;
    fs::write(file, content)?;
    Ok(())
}

fn remove(name: &str) -> anyhow::Result<()> {
    let file = get_config_dir()?.join(name);
    if file.exists() {
        fs::remove_file(file)?;
    }
    Ok(())
}

pub fn load_session() -> anyhow::Result<Session> {
    Ok(load_json("session.json")?.unwrap_or_default())
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    save_json("session.json", session)
}

pub fn load_timer() -> anyhow::Result<Option<Stopwatch>> {
    load_json("timer.json")
}

pub fn save_timer(stopwatch: &Stopwatch) -> anyhow::Result<()> {
    save_json("timer.json", stopwatch)
}

pub fn clear_timer() -> anyhow::Result<()> {
    remove("timer.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_wins_over_saved_server() {
        let session = Session {
            server_url: "http://saved:3000".to_string(),
            ..Session::default()
        };
        assert_eq!(session.resolve_url(Some("http://flag:4000")), "http://flag:4000");
    }

    #[test]
    fn default_session_points_at_localhost() {
        let session = Session::default();
        assert_eq!(session.server_url, DEFAULT_SERVER_URL);
        assert!(session.token.is_none());
    }
}
