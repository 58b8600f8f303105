use std::env;
use std::path::PathBuf;
use std::time::Duration;

use feedback_core::DEFAULT_MAX_CONCURRENCY;

pub const DEFAULT_CACHE_PATH: &str = "feedback_insights_cache.csv";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RETRIES: usize = 0;
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub cache_path: PathBuf,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub retries: usize,
    pub prompt_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            prompt_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            cache_path: non_empty("FEEDBACK_INSIGHTS_CACHE")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            max_concurrency: non_empty("FEEDBACK_INSIGHTS_MAX_CONCURRENCY")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_concurrency),
            timeout_secs: non_empty("FEEDBACK_INSIGHTS_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            retries: non_empty("FEEDBACK_INSIGHTS_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.retries),
            prompt_path: non_empty("FEEDBACK_INSIGHTS_PROMPT").map(PathBuf::from),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
