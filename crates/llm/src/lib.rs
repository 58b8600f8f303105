use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_VAR: &str = "OPENROUTER_API_KEY";
const BASE_URL_VAR: &str = "OPENROUTER_BASE_URL";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = read_api_key(API_KEY_VAR)?;
        let mut settings = Self::new(api_key);
        if let Ok(base_url) = env::var(BASE_URL_VAR) {
            if !base_url.trim().is_empty() {
                settings.base_url = base_url;
            }
        }
        Ok(settings)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http,
            api_key: settings.api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, req: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));
        let payload = json!({
            "model": req.model,
            "messages": messages,
        });
        debug!(model = %req.model, %url, "sending chat completion");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let value = decode_body(response).await?;
        let content = extract_message_text(&value)
            .ok_or_else(|| LlmError::Decode("missing choices[0].message.content".to_string()))?;
        let usage: Usage = value
            .get("usage")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();
        Ok(LlmResponse {
            content,
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
        })
    }
}

async fn decode_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(LlmError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| LlmError::Decode(err.to_string()))
}

fn extract_message_text(value: &Value) -> Option<String> {
    let choice = value.get("choices")?.as_array()?.first()?;
    let content = choice.get("message")?.get("content")?;
    if let Some(text) = content.as_str() {
        return Some(text.to_string());
    }
    // Some providers return content as a list of typed parts.
    content
        .as_array()?
        .iter()
        .find_map(|part| part.get("text").and_then(|t| t.as_str()))
        .map(|text| text.to_string())
}

fn read_api_key(var: &'static str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(LlmError::MissingApiKey(var)),
    }
}

#[derive(Default, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}
