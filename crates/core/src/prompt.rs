use std::fs;
use std::path::Path;

use crate::error::Result;

pub const SYSTEM_PROMPT: &str = "You are an AI customer feedback analyzer.";
pub const MESSAGE_PLACEHOLDER: &str = "{{customer_message}}";
const DEFAULT_TEMPLATE: &str = include_str!("../prompts/insight_prompt.txt");

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let template = fs::read_to_string(path)?;
        if !template.contains(MESSAGE_PLACEHOLDER) {
            tracing::warn!(
                path = %path.display(),
                "prompt template has no {MESSAGE_PLACEHOLDER} placeholder; the message will not be sent"
            );
        }
        Ok(Self::new(template))
    }

    pub fn render(&self, message: &str) -> String {
        self.template.replace(MESSAGE_PLACEHOLDER, message)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
