use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const KNOWN_MODELS: [&str; 3] = [
    "openai/gpt-3.5-turbo",
    "anthropic/claude-3-sonnet",
    "mistral/mistral-7b-instruct",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "model config unavailable, using {DEFAULT_MODEL}"
                );
                return Self::default();
            }
        };
        match serde_json::from_str::<ModelConfig>(&raw) {
            Ok(config) if !config.model.trim().is_empty() => config,
            Ok(_) => {
                warn!(path = %path.display(), "model config has an empty model, using {DEFAULT_MODEL}");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "model config is corrupt, using {DEFAULT_MODEL}"
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn is_known(&self) -> bool {
        KNOWN_MODELS.contains(&self.model.as_str())
    }
}
