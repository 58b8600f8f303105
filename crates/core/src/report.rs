use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{InsightError, Result};
use crate::model::{parse_themes, Insight, Sentiment};

pub const DEFAULT_TOP_THEMES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentCount {
    pub sentiment: Sentiment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeCount {
    pub theme: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub total: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub sentiment_counts: Vec<SentimentCount>,
    pub top_themes: Vec<ThemeCount>,
}

impl InsightReport {
    pub fn build<'a>(insights: impl IntoIterator<Item = &'a Insight>, top_n: usize) -> Self {
        let mut total = 0usize;
        let mut by_sentiment: HashMap<Sentiment, usize> = HashMap::new();
        // (count, first seen position)
        let mut themes: HashMap<&str, (usize, usize)> = HashMap::new();
        for insight in insights {
            total += 1;
            *by_sentiment.entry(insight.sentiment).or_default() += 1;
            for theme in &insight.themes {
                let next = themes.len();
                themes.entry(theme.as_str()).or_insert((0, next)).0 += 1;
            }
        }
        let sentiment_counts = Sentiment::ALL
            .iter()
            .map(|sentiment| SentimentCount {
                sentiment: *sentiment,
                count: by_sentiment.get(sentiment).copied().unwrap_or(0),
            })
            .collect();
        let mut ranked: Vec<(&str, usize, usize)> = themes
            .into_iter()
            .map(|(theme, (count, first))| (theme, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let top_themes = ranked
            .into_iter()
            .take(top_n)
            .map(|(theme, count, _)| ThemeCount {
                theme: theme.to_string(),
                count,
            })
            .collect();
        let pct = |sentiment: Sentiment| {
            if total == 0 {
                0.0
            } else {
                by_sentiment.get(&sentiment).copied().unwrap_or(0) as f64 * 100.0 / total as f64
            }
        };
        Self {
            total,
            positive_pct: pct(Sentiment::Positive),
            negative_pct: pct(Sentiment::Negative),
            sentiment_counts,
            top_themes,
        }
    }

    pub fn from_csv(path: &Path, top_n: usize) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let sentiment_idx = column("sentiment").ok_or_else(|| InsightError::MissingColumn {
            path: path.to_path_buf(),
            column: "sentiment",
        })?;
        let summary_idx = column("summary");
        let themes_idx = column("themes");
        let mut insights = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
            insights.push(Insight::new(
                field(summary_idx),
                Sentiment::normalize(field(Some(sentiment_idx))),
                parse_themes(field(themes_idx)),
            ));
        }
        Ok(Self::build(&insights, top_n))
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        self.sentiment_counts
            .iter()
            .find(|entry| entry.sentiment == sentiment)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

impl fmt::Display for InsightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total messages: {}", self.total)?;
        writeln!(f, "Positive: {:.1}%", self.positive_pct)?;
        writeln!(f, "Negative: {:.1}%", self.negative_pct)?;
        writeln!(f, "Sentiment distribution:")?;
        for entry in self.sentiment_counts.iter().filter(|entry| entry.count > 0) {
            writeln!(f, "  {:<8} {}", entry.sentiment, entry.count)?;
        }
        if self.top_themes.is_empty() {
            writeln!(f, "No themes found.")?;
        } else {
            writeln!(f, "Top themes:")?;
            for entry in &self.top_themes {
                writeln!(f, "  {:<24} {}", entry.theme, entry.count)?;
            }
        }
        Ok(())
    }
}
