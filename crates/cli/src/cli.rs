use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use feedback_core::{DEFAULT_CONFIG_PATH, DEFAULT_TOP_THEMES};

#[derive(Parser, Debug)]
#[command(
    name = "feedback-insights",
    version,
    about = "Summaries, sentiment and themes for customer feedback CSVs"
)]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Fetch insights for a feedback CSV and write an enriched copy")]
    Analyze(AnalyzeArgs),
    #[command(about = "Print KPIs and top themes from an enriched CSV or cache file")]
    Report {
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TOP_THEMES)]
        top: usize,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    #[command(about = "Show or change the model stored in the config file")]
    Model {
        #[command(subcommand)]
        action: ModelCommand,
        #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    pub input: PathBuf,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub cache: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "cache")]
    pub no_cache: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    pub force_refresh: bool,
    #[arg(long)]
    pub max_concurrency: Option<usize>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    #[arg(long)]
    pub prompt: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    Show,
    List,
    Set { model: String },
}
