//! Feedback insight extraction: per-message LLM insights with a CSV cache
//! and a bounded, order-preserving batch pipeline.

mod cache;
mod client;
mod config;
mod error;
mod model;
mod pipeline;
mod prompt;
mod report;
mod table;

pub use cache::{CacheEntries, InsightCache};
pub use client::{parse_insight_reply, InsightSource, OpenRouterInsights, RetryPolicy};
pub use config::{ModelConfig, DEFAULT_CONFIG_PATH, DEFAULT_MODEL, KNOWN_MODELS};
pub use error::{FetchError, InsightError, Result};
pub use model::{
    join_themes, parse_themes, FeedbackMessage, Insight, Sentiment, PLACEHOLDER_SUMMARY,
};
pub use pipeline::{
    pending_fetches, DegradedItem, InsightPipeline, InsightRow, Origin, PipelineOptions,
    PipelineResult, PipelineStats, Progress, DEFAULT_MAX_CONCURRENCY,
};
pub use prompt::{PromptTemplate, MESSAGE_PLACEHOLDER, SYSTEM_PROMPT};
pub use report::{InsightReport, SentimentCount, ThemeCount, DEFAULT_TOP_THEMES};
pub use table::{write_enriched, FeedbackTable, MESSAGE_COLUMN};

pub use feedback_llm::{LlmSettings, DEFAULT_BASE_URL as DEFAULT_LLM_BASE_URL};
