use std::thread::sleep;
use std::time::Duration;

use feedback_llm::{LlmClient, LlmRequest, LlmSettings};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::model::{parse_themes, Insight, Sentiment};
use crate::prompt::{PromptTemplate, SYSTEM_PROMPT};

pub trait InsightSource: Send + Sync {
    fn fetch(&self, message: &str, model: &str) -> std::result::Result<Insight, FetchError>;
}

impl<T: InsightSource + ?Sized> InsightSource for &T {
    fn fetch(&self, message: &str, model: &str) -> std::result::Result<Insight, FetchError> {
        (**self).fetch(message, model)
    }
}

impl<T: InsightSource> InsightSource for Option<T> {
    fn fetch(&self, message: &str, model: &str) -> std::result::Result<Insight, FetchError> {
        match self {
            Some(source) => source.fetch(message, model),
            None => Err(FetchError::Transport(
                "no insight client configured".to_string(),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    retries: usize,
    base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(retries: usize, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay_ms: base_delay.as_millis().max(1) as u64,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::from_millis(500))
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(backoff.max(self.base_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

pub struct OpenRouterInsights {
    llm: LlmClient,
    runtime: Runtime,
    template: PromptTemplate,
    retry: RetryPolicy,
}

impl OpenRouterInsights {
    pub fn new(settings: LlmSettings, template: PromptTemplate) -> Result<Self> {
        let llm = LlmClient::new(settings)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            llm,
            runtime,
            template,
            retry: RetryPolicy::none(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn fetch_once(&self, message: &str, model: &str) -> std::result::Result<Insight, FetchError> {
        let request = LlmRequest {
            model: model.to_string(),
            system: Some(SYSTEM_PROMPT.to_string()),
            user: self.template.render(message),
        };
        let response = self.runtime.block_on(self.llm.chat(&request))?;
        debug!(
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "insight reply received"
        );
        parse_insight_reply(&response.content)
    }
}

impl InsightSource for OpenRouterInsights {
    fn fetch(&self, message: &str, model: &str) -> std::result::Result<Insight, FetchError> {
        let mut attempt = 0usize;
        loop {
            match self.fetch_once(message, model) {
                Ok(insight) => return Ok(insight),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.retry.retries {
                        return Err(err);
                    }
                    warn!(
                        attempt,
                        retries = self.retry.retries,
                        error = %err,
                        "insight fetch failed, retrying"
                    );
                    sleep(self.retry.delay_for_attempt(attempt));
                }
            }
        }
    }
}

pub fn parse_insight_reply(content: &str) -> std::result::Result<Insight, FetchError> {
    let body = strip_code_fence(content);
    let value: Value =
        serde_json::from_str(body).map_err(|err| FetchError::Parse(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| FetchError::Parse("reply is not a JSON object".to_string()))?;
    let summary = object
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();
    let sentiment = object
        .get("sentiment")
        .and_then(|v| v.as_str())
        .map(Sentiment::normalize)
        .unwrap_or_default();
    let themes = match object.get("themes") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| item.to_string())
            .collect(),
        Some(Value::String(raw)) => parse_themes(raw),
        _ => Vec::new(),
    };
    Ok(Insight::new(summary, sentiment, themes))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // drop the language tag line, e.g. ```json
    match rest.find('\n') {
        Some(idx) if !rest[..idx].trim_start().starts_with('{') => rest[idx + 1..].trim(),
        _ => rest.trim(),
    }
}
