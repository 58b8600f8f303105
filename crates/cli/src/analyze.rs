use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use feedback_core::{
    pending_fetches, write_enriched, FeedbackTable, InsightCache, InsightPipeline, InsightReport,
    InsightSource, LlmSettings, ModelConfig, OpenRouterInsights, PipelineOptions, Progress,
    PromptTemplate, RetryPolicy, DEFAULT_TOP_THEMES,
};
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info, warn};

use crate::cli::AnalyzeArgs;
use crate::config::{AppConfig, RETRY_BASE_DELAY};
use crate::logging;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let app = AppConfig::from_env();
    let template = match args.prompt.as_ref().or(app.prompt_path.as_ref()) {
        Some(path) => PromptTemplate::load(path)
            .with_context(|| format!("failed to read prompt template {}", path.display()))?,
        None => PromptTemplate::default(),
    };
    let connect = || -> Result<OpenRouterInsights> {
        let settings = LlmSettings::from_env()
            .context("OpenRouter credentials are required to fetch new insights")?
            .with_timeout(app.timeout());
        Ok(OpenRouterInsights::new(settings, template)?
            .with_retry(RetryPolicy::new(app.retries, RETRY_BASE_DELAY)))
    };
    let stdout = std::io::stdout();
    run_with_source(&args, &app, connect, &mut stdout.lock())
}

// `connect` is only called when at least one message misses the cache.
pub fn run_with_source<S, C>(
    args: &AnalyzeArgs,
    app: &AppConfig,
    connect: C,
    out: &mut impl Write,
) -> Result<()>
where
    S: InsightSource,
    C: FnOnce() -> Result<S>,
{
    let table = FeedbackTable::read(&args.input)
        .with_context(|| format!("failed to read feedback from {}", args.input.display()))?;
    let model = match &args.model {
        Some(model) => model.clone(),
        None => ModelConfig::load_or_default(&args.config).model,
    };
    let cache = if args.no_cache {
        InsightCache::disabled()
    } else {
        InsightCache::new(args.cache.clone().unwrap_or_else(|| app.cache_path.clone()))
    };
    let options = PipelineOptions::new(model)
        .with_force_refresh(args.force_refresh)
        .with_max_concurrency(args.max_concurrency.unwrap_or(app.max_concurrency));
    let pending = pending_fetches(&cache, &table.messages, &options)?;
    info!(
        input = %args.input.display(),
        rows = table.len(),
        pending,
        model = %options.model,
        cache = ?cache.path(),
        "analyzing feedback"
    );
    let source = if pending == 0 {
        debug!("nothing to fetch, skipping client setup");
        None
    } else {
        Some(connect()?)
    };

    let bar = progress_bar(args.quiet)?;
    let guard = (!args.quiet).then(|| logging::attach_progress(&bar));
    let pipeline = InsightPipeline::new(source, cache, options);
    let result = pipeline.run_with_progress(table.messages, |progress: Progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.completed as u64);
        bar.set_message(format!("eta {}", HumanDuration(progress.eta)));
    });
    bar.finish_and_clear();
    drop(guard);
    let result = result?;

    for item in &result.degraded {
        warn!(row = item.index + 1, error = %item.error, "row written with placeholder insight");
    }
    if let Some(err) = &result.cache_error {
        warn!(error = %err, "insights were not persisted to the cache");
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    write_enriched(&output, &table.headers, &result.rows)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stats = &result.stats;
    writeln!(out, "Wrote {} rows to {}", result.len(), output.display())?;
    writeln!(
        out,
        "cached: {}  fetched: {}  failed: {}  blank: {}  ({})",
        stats.cache_hits,
        stats.fetched,
        stats.failed,
        stats.blank,
        HumanDuration(stats.elapsed)
    )?;
    writeln!(out)?;
    let report = InsightReport::build(result.insights(), DEFAULT_TOP_THEMES);
    write!(out, "{report}")?;
    Ok(())
}

fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    if quiet {
        bar.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(bar);
    }
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .context("invalid progress template")?
        .progress_chars("=>-"),
    );
    Ok(bar)
}

pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feedback".to_string());
    input.with_file_name(format!("{stem}_insights.csv"))
}
