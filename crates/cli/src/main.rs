mod analyze;
mod cli;
mod config;
mod logging;
mod model;
mod report;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose || logging::env_flag());
    match cli.command {
        Command::Analyze(args) => analyze::run(args),
        Command::Report { input, top, json } => report::run(&input, top, json),
        Command::Model { action, config } => model::run(action, &config),
    }
}
