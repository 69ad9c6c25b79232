//! CLI entry-point for the full annotation pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    nlp::{topics::TopicConfig, Models},
    pipeline::{self, PipelineOptions},
};

/// Args for the `run` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Survey CSV to annotate.
    #[arg(long)]
    pub data: PathBuf,
    /// Output directory; defaults to `OUTPUTS_DIR` or `results/`.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Advisory topic count (0 keeps every cluster).
    #[arg(long)]
    pub topics: Option<usize>,
    /// Treat this column as pre-combined comment text.
    #[arg(long)]
    pub text_column: Option<String>,
}

#[instrument(skip(settings))]
pub fn run(args: Args, settings: Settings) -> Result<()> {
    let desired_topics = match args.topics {
        Some(0) => None,
        Some(n) => Some(n),
        None => settings.topic_count,
    };
    let options = PipelineOptions {
        input: args.data,
        output_dir: args.out.unwrap_or_else(|| settings.outputs_dir.clone()),
        text_column: args.text_column,
        topics: TopicConfig {
            desired_topics,
            min_topic_size: settings.min_topic_size,
            top_n_words: settings.topic_keywords,
        },
    };

    let mut models = Models::load(&settings)?;
    let report = pipeline::run(&options, &mut models)?;
    info!(
        rows = report.rows_kept,
        dropped = report.rows_dropped,
        topics = ?report.topics,
        "pipeline finished"
    );
    println!("Pipeline completed. Output: {}", report.output.display());
    Ok(())
}
