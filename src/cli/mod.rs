//! Command-line interface wiring for survey-annotator.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod clean;
pub mod evaluate;
pub mod run;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Survey comment annotation pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Run(args) => run::run(args, settings),
            Commands::Clean(args) => clean::run(args, settings),
            Commands::Evaluate(args) => evaluate::run(args, settings),
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean, annotate and persist a survey CSV.
    Run(run::Args),
    /// Merge and redact survey text without running any model.
    Clean(clean::Args),
    /// Score predicted sentiment labels against a gold column.
    Evaluate(evaluate::Args),
}
