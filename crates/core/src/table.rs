use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{InsightError, Result};
use crate::model::FeedbackMessage;
use crate::pipeline::InsightRow;

pub const MESSAGE_COLUMN: &str = "message";
const INSIGHT_COLUMNS: [&str; 3] = ["summary", "sentiment", "themes"];

#[derive(Debug, Clone)]
pub struct FeedbackTable {
    pub headers: Vec<String>,
    pub messages: Vec<FeedbackMessage>,
}

impl FeedbackTable {
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let message_idx = headers
            .iter()
            .position(|h| h.trim() == MESSAGE_COLUMN)
            .ok_or_else(|| InsightError::MissingColumn {
                path: path.to_path_buf(),
                column: MESSAGE_COLUMN,
            })?;
        let mut messages = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(InsightError::RaggedRow {
                    path: path.to_path_buf(),
                    line: record.position().map(|pos| pos.line()).unwrap_or(0),
                    fields: record.len(),
                    columns: headers.len(),
                });
            }
            let mut fields: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
            fields.resize(headers.len(), String::new());
            messages.push(FeedbackMessage {
                message: fields[message_idx].clone(),
                fields,
            });
        }
        Ok(Self { headers, messages })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn write_enriched(path: &Path, headers: &[String], rows: &[InsightRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out_headers = headers.to_vec();
    let mut slots = [0usize; 3];
    for (slot, column) in slots.iter_mut().zip(INSIGHT_COLUMNS) {
        *slot = match out_headers.iter().position(|h| h.trim() == column) {
            Some(idx) => idx,
            None => {
                out_headers.push(column.to_string());
                out_headers.len() - 1
            }
        };
    }
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    writer.write_record(&out_headers)?;
    for row in rows {
        let mut fields = row.message.fields.clone();
        fields.resize(out_headers.len(), String::new());
        let [summary, sentiment, themes] = slots;
        fields[summary] = row.insight.summary.clone();
        fields[sentiment] = row.insight.sentiment.to_string();
        fields[themes] = row.insight.themes_joined();
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}
