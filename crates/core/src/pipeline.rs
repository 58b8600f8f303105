use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::cache::InsightCache;
use crate::client::InsightSource;
use crate::error::{FetchError, InsightError, Result};
use crate::model::{FeedbackMessage, Insight};

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub model: String,
    pub force_refresh: bool,
    pub max_concurrency: usize,
}

impl PipelineOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            force_refresh: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cached,
    Fetched,
    Placeholder,
    Blank,
}

#[derive(Debug, Clone)]
pub struct InsightRow {
    pub message: FeedbackMessage,
    pub insight: Insight,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
pub struct DegradedItem {
    pub index: usize,
    pub message: String,
    pub error: FetchError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub eta: Duration,
}

impl Progress {
    pub fn estimate(completed: usize, total: usize, elapsed: Duration) -> Self {
        let eta = if completed == 0 {
            Duration::ZERO
        } else {
            let avg = elapsed.div_f64(completed as f64);
            avg.mul_f64(total.saturating_sub(completed) as f64)
        };
        Self {
            completed,
            total,
            elapsed,
            eta,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub cache_hits: usize,
    pub fetched: usize,
    pub failed: usize,
    pub blank: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub rows: Vec<InsightRow>,
    pub degraded: Vec<DegradedItem>,
    pub stats: PipelineStats,
    pub cache_error: Option<InsightError>,
}

impl PipelineResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insights(&self) -> impl Iterator<Item = &Insight> {
        self.rows.iter().map(|row| &row.insight)
    }
}

// Number of messages a run would send to the client: non-blank and not
// served from the cache.
pub fn pending_fetches(
    cache: &InsightCache,
    messages: &[FeedbackMessage],
    options: &PipelineOptions,
) -> Result<usize> {
    if messages.iter().all(FeedbackMessage::is_blank) {
        return Ok(0);
    }
    let entries = if options.force_refresh {
        Default::default()
    } else {
        cache.load()?
    };
    Ok(messages
        .iter()
        .filter(|message| !message.is_blank() && !entries.contains_key(&message.message))
        .count())
}

pub struct InsightPipeline<S> {
    source: S,
    cache: InsightCache,
    options: PipelineOptions,
}

impl<S: InsightSource> InsightPipeline<S> {
    pub fn new(source: S, cache: InsightCache, options: PipelineOptions) -> Self {
        Self {
            source,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn cache(&self) -> &InsightCache {
        &self.cache
    }

    pub fn run(&self, messages: Vec<FeedbackMessage>) -> Result<PipelineResult> {
        self.run_with_progress(messages, |_| {})
    }

    // on_progress runs on worker threads, in completion order
    pub fn run_with_progress<F>(
        &self,
        messages: Vec<FeedbackMessage>,
        on_progress: F,
    ) -> Result<PipelineResult>
    where
        F: Fn(Progress) + Sync,
    {
        let started = Instant::now();
        let mut entries = self.cache.load()?;
        let mut stats = PipelineStats::default();
        let mut slots: Vec<Option<(Insight, Origin)>> = vec![None; messages.len()];
        let mut pending = Vec::new();
        for (idx, message) in messages.iter().enumerate() {
            if message.is_blank() {
                slots[idx] = Some((Insight::default(), Origin::Blank));
                stats.blank += 1;
                continue;
            }
            if !self.options.force_refresh {
                if let Some(hit) = entries.get(&message.message) {
                    slots[idx] = Some((hit.clone(), Origin::Cached));
                    stats.cache_hits += 1;
                    continue;
                }
            }
            pending.push(idx);
        }

        let total = pending.len();
        info!(
            total = messages.len(),
            cached = stats.cache_hits,
            dispatching = total,
            model = %self.options.model,
            force_refresh = self.options.force_refresh,
            "starting insight batch"
        );

        let fetched: Vec<(usize, std::result::Result<Insight, FetchError>)> = if pending.is_empty()
        {
            Vec::new()
        } else {
            let completed = AtomicUsize::new(0);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.max_concurrency.max(1))
                .thread_name(|i| format!("insight-worker-{i}"))
                .build()?;
            pool.install(|| {
                pending
                    .par_iter()
                    .map(|&idx| {
                        let result = self
                            .source
                            .fetch(&messages[idx].message, &self.options.model);
                        if let Err(err) = &result {
                            warn!(index = idx, error = %err, "insight fetch failed, using placeholder");
                        }
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        on_progress(Progress::estimate(done, total, started.elapsed()));
                        (idx, result)
                    })
                    .collect()
            })
        };

        let mut degraded = Vec::new();
        for (idx, result) in fetched {
            match result {
                Ok(insight) => {
                    entries.insert(messages[idx].message.clone(), insight.clone());
                    slots[idx] = Some((insight, Origin::Fetched));
                    stats.fetched += 1;
                }
                Err(error) => {
                    degraded.push(DegradedItem {
                        index: idx,
                        message: messages[idx].message.clone(),
                        error,
                    });
                    slots[idx] = Some((Insight::placeholder(), Origin::Placeholder));
                    stats.failed += 1;
                }
            }
        }

        let cache_error = match self.cache.save(&entries) {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "failed to save insight cache");
                Some(err)
            }
        };

        let rows = messages
            .into_iter()
            .zip(slots)
            .map(|(message, slot)| {
                let (insight, origin) =
                    slot.unwrap_or_else(|| (Insight::placeholder(), Origin::Placeholder));
                InsightRow {
                    message,
                    insight,
                    origin,
                }
            })
            .collect();
        stats.elapsed = started.elapsed();
        info!(
            cached = stats.cache_hits,
            fetched = stats.fetched,
            failed = stats.failed,
            elapsed = ?stats.elapsed,
            "insight batch finished"
        );
        Ok(PipelineResult {
            rows,
            degraded,
            stats,
            cache_error,
        })
    }
}
