use std::fmt;

use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_SUMMARY: &str = "Error";
const THEME_SEPARATOR: &str = ", ";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
    Unknown,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Unknown => "Unknown",
        }
    }

    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Sentiment::Neutral;
        }
        match capitalize(&trimmed.to_lowercase()).as_str() {
            "Positive" => Sentiment::Positive,
            "Negative" => Sentiment::Negative,
            "Neutral" => Sentiment::Neutral,
            _ => Sentiment::Unknown,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

fn capitalize(lower: &str) -> String {
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
    pub sentiment: Sentiment,
    pub themes: Vec<String>,
}

impl Insight {
    pub fn new(summary: impl Into<String>, sentiment: Sentiment, themes: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            sentiment,
            themes,
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_SUMMARY, Sentiment::Neutral, Vec::new())
    }

    pub fn themes_joined(&self) -> String {
        join_themes(&self.themes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackMessage {
    pub message: String,
    // every source column, aligned with the table headers
    pub fields: Vec<String>,
}

impl FeedbackMessage {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            fields: vec![message.clone()],
            message,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty()
    }
}

pub fn parse_themes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|theme| theme.trim())
        .filter(|theme| !theme.is_empty())
        .map(|theme| theme.to_string())
        .collect()
}

pub fn join_themes(themes: &[String]) -> String {
    themes.join(THEME_SEPARATOR)
}
