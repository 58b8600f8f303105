use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use feedback_core::InsightReport;

pub fn run(input: &Path, top: usize, json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    render(input, top, json, &mut stdout.lock())
}

fn render(input: &Path, top: usize, json: bool, out: &mut impl Write) -> Result<()> {
    let report = InsightReport::from_csv(input, top)
        .with_context(|| format!("failed to build report from {}", input.display()))?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    Ok(())
}
