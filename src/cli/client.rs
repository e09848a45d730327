//! Thin reqwest wrapper that unwraps the `{"success", "data"}` envelope

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use super::config::{load_session, Session};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid server URL '{}'", base_url))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, base_url, token })
    }

    /// Client for the saved session, requiring a login
    pub fn from_session(cli_url: Option<&str>) -> anyhow::Result<Self> {
        let session = load_session()?;
        let token = session
            .token
            .clone()
            .ok_or_else(|| anyhow!("Not logged in; run `fhub auth login` first"))?;
        Self::new(&session.resolve_url(cli_url), Some(token))
    }

    /// Client for public endpoints
    pub fn anonymous(session: &Session, cli_url: Option<&str>) -> anyhow::Result<Self> {
        Self::new(&session.resolve_url(cli_url), None)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Status and raw JSON body, without interpreting the envelope
    pub async fn raw(&self, method: Method, path: &str, body: Option<&Value>) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = self.http.request(method, self.url(path)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url))?;
        let status = response.status();
        let text = response.text().await?;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }

    /// Text body of a non-JSON endpoint
    pub async fn text(&self, path: &str) -> anyhow::Result<String> {
        let (status, body) = self.raw(Method::GET, path, None).await?;
        match body {
            Value::String(text) if status.is_success() => Ok(text),
            other => Err(envelope_error(status, &other)),
        }
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> anyhow::Result<T> {
        let (status, value) = self.raw(method, path, body).await?;
        let data = unwrap_envelope(status, value)?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(&body)).await
    }
}

fn envelope_error(status: StatusCode, body: &Value) -> anyhow::Error {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    match body.get("code").and_then(Value::as_str) {
        Some(code) => anyhow!("{} ({})", message, code),
        None => anyhow!("{}", message),
    }
}

/// `data` of a successful response; the server's message otherwise
pub fn unwrap_envelope(status: StatusCode, body: Value) -> anyhow::Result<Value> {
    if !status.is_success() || body.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(envelope_error(status, &body));
    }

    match body {
        Value::Object(mut map) => Ok(map.remove("data").unwrap_or(Value::Null)),
        _ => bail!("unexpected response from server"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_data_of_successful_responses() {
        let data = unwrap_envelope(StatusCode::OK, json!({"success": true, "data": {"id": 4}})).unwrap();
        assert_eq!(data, json!({"id": 4}));
    }

    #[test]
    fn surfaces_server_error_and_code() {
        let err = unwrap_envelope(
            StatusCode::CONFLICT,
            json!({"success": false, "error": "Billed time entries cannot be deleted", "code": "CONFLICT"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Billed time entries cannot be deleted (CONFLICT)");
    }

    #[test]
    fn non_json_failures_fall_back_to_status() {
        let err = unwrap_envelope(StatusCode::BAD_GATEWAY, Value::String("<html>".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "502 Bad Gateway");
    }

    #[test]
    fn joins_paths_onto_base_url() {
        let client = ApiClient::new("http://localhost:3000", None).unwrap();
        assert_eq!(client.url("/api/invoices/3/pix").unwrap().as_str(), "http://localhost:3000/api/invoices/3/pix");
    }
}
