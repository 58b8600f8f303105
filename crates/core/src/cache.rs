use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InsightError, Result};
use crate::model::{join_themes, parse_themes, Insight, Sentiment};

pub type CacheEntries = BTreeMap<String, Insight>;

#[derive(Serialize, Deserialize)]
struct CacheRow {
    message: String,
    summary: String,
    sentiment: String,
    themes: String,
}

#[derive(Debug, Clone, Default)]
pub struct InsightCache {
    path: Option<PathBuf>,
}

impl InsightCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<CacheEntries> {
        let Some(path) = &self.path else {
            return Ok(CacheEntries::new());
        };
        if !path.exists() {
            debug!(path = %path.display(), "no cache file yet");
            return Ok(CacheEntries::new());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = CacheEntries::new();
        for (idx, row) in reader.deserialize::<CacheRow>().enumerate() {
            let row = row.map_err(|err| InsightError::CorruptCache {
                path: path.clone(),
                reason: format!("row {}: {err}", idx + 1),
            })?;
            entries.insert(
                row.message,
                Insight::new(
                    row.summary,
                    Sentiment::normalize(&row.sentiment),
                    parse_themes(&row.themes),
                ),
            );
        }
        debug!(path = %path.display(), entries = entries.len(), "loaded insight cache");
        Ok(entries)
    }

    pub fn save(&self, entries: &CacheEntries) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(path)?);
        let mut writer = csv::Writer::from_writer(file);
        for (message, insight) in entries {
            writer.serialize(CacheRow {
                message: message.clone(),
                summary: insight.summary.clone(),
                sentiment: insight.sentiment.to_string(),
                themes: join_themes(&insight.themes),
            })?;
        }
        if entries.is_empty() {
            writer.write_record(["message", "summary", "sentiment", "themes"])?;
        }
        writer.flush()?;
        debug!(path = %path.display(), entries = entries.len(), "saved insight cache");
        Ok(())
    }
}
