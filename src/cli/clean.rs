//! CLI entry-point for text normalisation only.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    config::Settings,
    data::{io, normalize},
};

/// Args for the `clean` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Survey CSV to clean.
    #[arg(long)]
    pub data: PathBuf,
    /// Output directory; defaults to `OUTPUTS_DIR` or `results/`.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Treat this column as pre-combined comment text.
    #[arg(long)]
    pub text_column: Option<String>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let mut dataset = io::load_dataset(&args.data, args.text_column.as_deref())?;
    normalize::normalize(&mut dataset);
    normalize::filter_blank(&mut dataset);

    let out_dir = args.out.unwrap_or(settings.outputs_dir);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;
    let path = out_dir.join("clean_output.csv");
    io::write_clean(&dataset, &path)?;
    println!("Cleaned {} rows. Output: {}", dataset.len(), path.display());
    Ok(())
}
