//! Entry point wiring CLI dispatch to the annotation pipeline.

use anyhow::Result;
use survey_annotator::{cli::Cli, config::Settings, logging};
use tracing::{info, instrument};

#[instrument]
fn main() -> Result<()> {
    logging::init_tracing()?;
    let settings = Settings::load()?;
    let cli = Cli::parse();

    info!(?cli, "starting command");
    cli.dispatch(settings)
}
