//! CLI entry-point for scoring predictions against gold labels.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, evaluation};

/// Args for the `evaluate` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// CSV holding both label columns, e.g. an annotated pipeline output.
    #[arg(long)]
    pub data: PathBuf,
    /// Column with reference labels.
    #[arg(long, default_value = "gold_label")]
    pub gold: String,
    /// Column with predicted labels.
    #[arg(long, default_value = "sentiment_label")]
    pub predicted: String,
    /// Output directory; defaults to `OUTPUTS_DIR` or `results/`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let (gold, predicted) =
        evaluation::load_label_columns(&args.data, &args.gold, &args.predicted)?;
    let report = evaluation::classification_report(&gold, &predicted)?;

    let out_dir = args.out.unwrap_or(settings.outputs_dir);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;
    let path = out_dir.join("evaluation_report.csv");
    evaluation::write_report(&report, &path)?;
    info!(path = %path.display(), accuracy = report.accuracy, "wrote evaluation report");
    println!("{report}");
    Ok(())
}
