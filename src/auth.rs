//! Thin proxy to the upstream authentication service (GoTrue-compatible
//! REST: `/signup` and `/token?grant_type=password`).
//!
//! Transport failures are retried with backoff; upstream refusals come back
//! as their human-readable message so the API layer can run them through
//! [`crate::retry::friendly_error_message`]. Credentials and emails are never
//! written to the log.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::AuthConfig;
use crate::retry::{retry_with_backoff, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};

/// Signup payload as the reporting client sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub struct AuthClient {
    http: reqwest::Client,
    cfg: AuthConfig,
}

impl AuthClient {
    pub fn new(cfg: AuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("civic-issue-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { http, cfg }
    }

    /// Create an account. Profile fields ride along as user metadata.
    pub async fn sign_up(&self, req: &SignUpRequest) -> Result<Value> {
        let body = json!({
            "email": req.email,
            "password": req.password,
            "data": {
                "full_name": req.full_name,
                "phone": req.phone,
                "role": req.role,
            },
        });
        self.call("signup", &body).await
    }

    /// Password grant. Returns the upstream session object untouched.
    pub async fn sign_in(&self, req: &SignInRequest) -> Result<Value> {
        let body = json!({
            "email": req.email,
            "password": req.password,
        });
        self.call("token?grant_type=password", &body).await
    }

    async fn call(&self, path: &str, body: &Value) -> Result<Value> {
        retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, || {
            self.post_once(path, body)
        })
        .await
    }

    async fn post_once(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.cfg.service_key)
            .bearer_auth(&self.cfg.service_key)
            .json(body)
            .send()
            .await
            // Worded so the retry allow-list and the friendly-message table
            // both recognize a transport failure.
            .map_err(|e| anyhow!("Network request failed: {e}"))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.is_success() {
            serde_json::from_str(&text)
                .map_err(|_| anyhow!("not valid JSON: auth service returned a malformed body"))
        } else {
            Err(anyhow!("{}", upstream_message(status.as_u16(), &text)))
        }
    }
}

/// Pull the human-readable message out of an upstream error body. GoTrue
/// spells it `msg`, `message`, `error_description` or `error` depending on
/// the endpoint and version.
fn upstream_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|k| v.get(k).and_then(Value::as_str).map(str::to_string))
    });
    match detail {
        Some(d) => d,
        None if body.trim().is_empty() => format!("auth service returned HTTP {status}"),
        None => format!(
            "HTTP {status}: {}",
            body.chars().take(160).collect::<String>()
        ),
    }
}
