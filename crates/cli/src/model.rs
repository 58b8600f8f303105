use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use feedback_core::{ModelConfig, KNOWN_MODELS};
use tracing::{info, warn};

use crate::cli::ModelCommand;

pub fn run(action: ModelCommand, config: &Path) -> Result<()> {
    let stdout = std::io::stdout();
    execute(action, config, &mut stdout.lock())
}

fn execute(action: ModelCommand, config: &Path, out: &mut impl Write) -> Result<()> {
    match action {
        ModelCommand::Show => {
            let current = ModelConfig::load_or_default(config);
            writeln!(out, "{}", current.model)?;
        }
        ModelCommand::List => {
            let current = ModelConfig::load_or_default(config);
            for model in KNOWN_MODELS {
                let marker = if model == current.model { "*" } else { " " };
                writeln!(out, "{marker} {model}")?;
            }
            if !current.is_known() {
                writeln!(out, "* {} (custom)", current.model)?;
            }
        }
        ModelCommand::Set { model } => {
            let model = model.trim();
            anyhow::ensure!(!model.is_empty(), "model id must not be empty");
            let updated = ModelConfig::new(model);
            if !updated.is_known() {
                warn!(model, "model is not in the known list; saving anyway");
            }
            updated
                .save(config)
                .with_context(|| format!("failed to write {}", config.display()))?;
            info!(model, path = %config.display(), "model updated");
            writeln!(out, "Model set to {model}")?;
        }
    }
    Ok(())
}
