use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

use feedback_core::{
    parse_insight_reply, pending_fetches, FeedbackMessage, FetchError, Insight, InsightCache, InsightPipeline,
    InsightSource, Origin, PipelineOptions, Sentiment,
};
use tempfile::tempdir;

#[derive(Default)]
struct StubSource {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    failing: HashSet<String>,
    replies: HashMap<String, String>,
    models: Mutex<Vec<String>>,
}

impl StubSource {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl InsightSource for StubSource {
    fn fetch(&self, message: &str, model: &str) -> Result<Insight, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        sleep(
            self.delays
                .get(message)
                .copied()
                .unwrap_or(self.default_delay),
        );
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(message) {
            return Err(FetchError::RemoteRejected {
                status: 500,
                body: "boom".to_string(),
            });
        }
        match self.replies.get(message) {
            Some(raw) => parse_insight_reply(raw),
            None => Ok(Insight::new(
                format!("summary of {message}"),
                Sentiment::Neutral,
                vec![message.to_string()],
            )),
        }
    }
}

fn messages(n: usize) -> Vec<FeedbackMessage> {
    (0..n)
        .map(|i| FeedbackMessage::new(format!("msg-{i}")))
        .collect()
}

fn texts(rows: &[feedback_core::InsightRow]) -> Vec<String> {
    rows.iter().map(|row| row.message.message.clone()).collect()
}

#[test]
fn output_order_matches_input_despite_shuffled_completion() {
    let input = messages(12);
    // later messages finish first
    let delays = input
        .iter()
        .enumerate()
        .map(|(i, m)| (m.message.clone(), Duration::from_millis(((12 - i) * 4) as u64)))
        .collect();
    let source = StubSource {
        delays,
        ..Default::default()
    };
    let pipeline = InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("stub").with_max_concurrency(5),
    );
    let result = pipeline.run(input.clone()).unwrap();
    assert_eq!(result.len(), input.len());
    assert_eq!(texts(&result.rows), texts_of(&input));
    for row in &result.rows {
        assert_eq!(row.insight.summary, format!("summary of {}", row.message.message));
        assert_eq!(row.origin, Origin::Fetched);
    }
}

fn texts_of(input: &[FeedbackMessage]) -> Vec<String> {
    input.iter().map(|m| m.message.clone()).collect()
}

#[test]
fn second_run_is_served_from_cache() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource::default();
    let pipeline = InsightPipeline::new(&source, cache, PipelineOptions::new("stub"));

    let first = pipeline.run(messages(6)).unwrap();
    assert_eq!(source.calls(), 6);
    assert_eq!(first.stats.fetched, 6);

    let second = pipeline.run(messages(6)).unwrap();
    assert_eq!(source.calls(), 6);
    assert_eq!(second.stats.cache_hits, 6);
    assert!(second.rows.iter().all(|row| row.origin == Origin::Cached));
    let first_insights: Vec<_> = first.insights().cloned().collect();
    let second_insights: Vec<_> = second.insights().cloned().collect();
    assert_eq!(first_insights, second_insights);
}

#[test]
fn force_refresh_refetches_everything() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource::default();
    InsightPipeline::new(&source, cache.clone(), PipelineOptions::new("stub"))
        .run(messages(4))
        .unwrap();
    let refreshed = InsightPipeline::new(
        &source,
        cache,
        PipelineOptions::new("stub").with_force_refresh(true),
    )
    .run(messages(4))
    .unwrap();
    assert_eq!(source.calls(), 8);
    assert_eq!(refreshed.stats.cache_hits, 0);
    assert!(refreshed.rows.iter().all(|row| row.origin == Origin::Fetched));
}

#[test]
fn disabled_cache_always_fetches() {
    let source = StubSource::default();
    let pipeline = InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("stub"),
    );
    pipeline.run(messages(3)).unwrap();
    pipeline.run(messages(3)).unwrap();
    assert_eq!(source.calls(), 6);
}

#[test]
fn in_flight_calls_stay_within_bound_and_overlap() {
    for k in [1usize, 5, 20] {
        let source = StubSource {
            default_delay: Duration::from_millis(15),
            ..Default::default()
        };
        let pipeline = InsightPipeline::new(
            &source,
            InsightCache::disabled(),
            PipelineOptions::new("stub").with_max_concurrency(k),
        );
        let result = pipeline.run(messages(40)).unwrap();
        assert_eq!(result.len(), 40);
        assert_eq!(source.calls(), 40);
        assert!(
            source.peak() <= k,
            "peak {} exceeded bound {k}",
            source.peak()
        );
        if k == 1 {
            assert_eq!(source.peak(), 1);
        } else {
            assert!(
                source.peak() > 1,
                "bound {k} but calls never overlapped"
            );
        }
    }
}

#[test]
fn zero_concurrency_is_clamped_to_one_worker() {
    let source = StubSource::default();
    let pipeline = InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("stub").with_max_concurrency(0),
    );
    let result = pipeline.run(messages(5)).unwrap();
    assert_eq!(result.len(), 5);
    assert_eq!(source.peak(), 1);
}

#[test]
fn failed_fetch_becomes_placeholder_without_aborting() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource {
        failing: HashSet::from(["msg-3".to_string()]),
        ..Default::default()
    };
    let pipeline = InsightPipeline::new(&source, cache.clone(), PipelineOptions::new("stub"));
    let result = pipeline.run(messages(10)).unwrap();

    assert_eq!(result.len(), 10);
    assert_eq!(result.rows[3].insight, Insight::placeholder());
    assert_eq!(result.rows[3].origin, Origin::Placeholder);
    for (idx, row) in result.rows.iter().enumerate().filter(|(i, _)| *i != 3) {
        assert_eq!(row.insight.summary, format!("summary of msg-{idx}"));
    }
    assert_eq!(result.degraded.len(), 1);
    assert_eq!(result.degraded[0].index, 3);
    assert_eq!(result.stats.failed, 1);
    assert_eq!(result.stats.fetched, 9);

    let saved = cache.load().unwrap();
    assert_eq!(saved.len(), 9);
    assert!(!saved.contains_key("msg-3"));
}

#[test]
fn sentiment_scenario_normalizes_labels() {
    let replies = HashMap::from([
        (
            "great service".to_string(),
            r#"{"summary":"S1","sentiment":"positive","themes":["speed"]}"#.to_string(),
        ),
        (
            "bad support".to_string(),
            r#"{"summary":"S2","sentiment":"NEGATIVE ","themes":["support"]}"#.to_string(),
        ),
        (
            "ok experience".to_string(),
            r#"{"summary":"S3","sentiment":"neutral","themes":[]}"#.to_string(),
        ),
    ]);
    let source = StubSource {
        replies,
        ..Default::default()
    };
    let pipeline = InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("stub"),
    );
    let input = ["great service", "bad support", "ok experience"]
        .into_iter()
        .map(FeedbackMessage::new)
        .collect();
    let result = pipeline.run(input).unwrap();
    let sentiments: Vec<String> = result
        .insights()
        .map(|insight| insight.sentiment.to_string())
        .collect();
    assert_eq!(sentiments, vec!["Positive", "Negative", "Neutral"]);
    assert!(result.degraded.is_empty());
}

#[test]
fn save_keeps_entries_untouched_by_the_run() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let mut seeded = feedback_core::CacheEntries::new();
    seeded.insert(
        "older message".to_string(),
        Insight::new("old", Sentiment::Negative, vec!["legacy".into()]),
    );
    cache.save(&seeded).unwrap();

    let source = StubSource::default();
    InsightPipeline::new(&source, cache.clone(), PipelineOptions::new("stub"))
        .run(messages(2))
        .unwrap();
    let saved = cache.load().unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved["older message"].summary, "old");
}

#[test]
fn cache_keys_are_exact_strings() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource::default();
    let pipeline = InsightPipeline::new(&source, cache, PipelineOptions::new("stub"));
    pipeline.run(vec![FeedbackMessage::new("hello")]).unwrap();
    let result = pipeline.run(vec![FeedbackMessage::new("hello ")]).unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(result.rows[0].origin, Origin::Fetched);
}

#[test]
fn blank_messages_are_not_sent() {
    let source = StubSource::default();
    let pipeline = InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("stub"),
    );
    let input = vec![FeedbackMessage::new("  "), FeedbackMessage::new("real")];
    let result = pipeline.run(input).unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(result.rows[0].origin, Origin::Blank);
    assert_eq!(result.rows[0].insight.sentiment, Sentiment::Neutral);
    assert_eq!(result.stats.blank, 1);
}

#[test]
fn unwritable_cache_is_reported_but_results_survive() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let cache = InsightCache::new(blocker.join("cache.csv"));
    let source = StubSource::default();
    let result = InsightPipeline::new(&source, cache, PipelineOptions::new("stub"))
        .run(messages(3))
        .unwrap();
    assert_eq!(result.len(), 3);
    assert!(result.cache_error.is_some());
}

#[test]
fn progress_reports_every_completed_fetch() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource {
        default_delay: Duration::from_millis(2),
        ..Default::default()
    };
    let pipeline = InsightPipeline::new(&source, cache, PipelineOptions::new("stub"));
    pipeline.run(messages(3)).unwrap();

    let events = Mutex::new(Vec::new());
    pipeline
        .run_with_progress(messages(8), |progress| {
            events.lock().unwrap().push(progress);
        })
        .unwrap();
    let mut events = events.into_inner().unwrap();
    // only the five uncached messages are dispatched
    assert_eq!(events.len(), 5);
    events.sort_by_key(|p| p.completed);
    for (i, progress) in events.iter().enumerate() {
        assert_eq!(progress.completed, i + 1);
        assert_eq!(progress.total, 5);
    }
    assert_eq!(events.last().unwrap().eta, Duration::ZERO);
}

#[test]
fn model_is_passed_to_every_fetch() {
    let source = StubSource::default();
    InsightPipeline::new(
        &source,
        InsightCache::disabled(),
        PipelineOptions::new("anthropic/claude-3-sonnet"),
    )
    .run(messages(4))
    .unwrap();
    let models = source.models.lock().unwrap();
    assert_eq!(models.len(), 4);
    assert!(models.iter().all(|m| m == "anthropic/claude-3-sonnet"));
}

#[test]
fn pending_fetches_counts_what_a_run_would_send() {
    let dir = tempdir().unwrap();
    let cache = InsightCache::new(dir.path().join("cache.csv"));
    let source = StubSource::default();
    let options = PipelineOptions::new("stub");
    InsightPipeline::new(&source, cache.clone(), options.clone())
        .run(messages(3))
        .unwrap();

    let mut batch = messages(5);
    batch.push(FeedbackMessage::new("   "));
    assert_eq!(pending_fetches(&cache, &batch, &options).unwrap(), 2);
    assert_eq!(pending_fetches(&cache, &messages(3), &options).unwrap(), 0);
    assert_eq!(
        pending_fetches(&cache, &batch, &options.clone().with_force_refresh(true)).unwrap(),
        5
    );
    assert_eq!(
        pending_fetches(&InsightCache::disabled(), &messages(3), &options).unwrap(),
        3
    );
}
