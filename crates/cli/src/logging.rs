use std::env;
use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

const VERBOSE_VAR: &str = "FEEDBACK_INSIGHTS_VERBOSE";

static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

// RUST_LOG wins over the verbose flag
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| BarAwareStderr)
        .with_target(false)
        .try_init();
    if verbose {
        tracing::debug!("verbose logging enabled");
    }
}

pub fn env_flag() -> bool {
    env::var(VERBOSE_VAR)
        .map(|value| parse_bool(value.trim()))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub struct ProgressGuard(());

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = ACTIVE_BAR.lock() {
            *slot = None;
        }
    }
}

// Log lines are written with the bar suspended until the guard drops.
pub fn attach_progress(bar: &ProgressBar) -> ProgressGuard {
    if let Ok(mut slot) = ACTIVE_BAR.lock() {
        *slot = Some(bar.clone());
    }
    ProgressGuard(())
}

fn active_bar() -> Option<ProgressBar> {
    ACTIVE_BAR.lock().ok().and_then(|slot| slot.clone())
}

struct BarAwareStderr;

impl Write for BarAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match active_bar() {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match active_bar() {
            Some(bar) => bar.suspend(|| io::stderr().write_all(buf)),
            None => io::stderr().write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
