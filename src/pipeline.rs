//! Annotation pipeline orchestration.
//!
//! Stages run strictly in sequence over the whole dataset:
//! load → normalise → sentiment → topics → entities → persist. Only the
//! topic stage may fail without aborting the run; its failure leaves every
//! `topic_id` null. Nothing is written until every stage has finished.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    data::{self, normalize, Dataset},
    nlp::{
        ner, sentiment,
        topics::{self, TopicConfig, TopicFit, TopicModel},
        Models,
    },
};

pub const OUTPUT_FILE: &str = "pipeline_output.csv";
pub const TOPICS_FILE: &str = "topics.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Progress through one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Loaded,
    Normalized,
    SentimentAnnotated,
    TopicAnnotated,
    TopicSkipped,
    EntityAnnotated,
    Persisted,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Forces single-column mode on this input column.
    pub text_column: Option<String>,
    pub topics: TopicConfig,
}

/// How the topic stage ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TopicStatus {
    Annotated { topics: usize, outliers: usize },
    Skipped { reason: String },
}

/// Summary of a completed run, also written as `run_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_loaded: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub stages: Vec<Stage>,
    pub topics: TopicStatus,
    pub embedder: String,
    pub recognizer: String,
    pub finished_at: DateTime<Utc>,
}

struct Trail(Vec<Stage>);

impl Trail {
    fn enter(&mut self, stage: Stage) {
        info!(?stage, "stage complete");
        self.0.push(stage);
    }
}

/// Run every stage over the input and persist the annotated table.
pub fn run(options: &PipelineOptions, models: &mut Models) -> Result<RunReport> {
    let mut trail = Trail(Vec::new());

    let mut dataset = data::io::load_dataset(&options.input, options.text_column.as_deref())?;
    let rows_loaded = dataset.len();
    trail.enter(Stage::Loaded);

    normalize::normalize(&mut dataset);
    let rows_dropped = normalize::filter_blank(&mut dataset);
    trail.enter(Stage::Normalized);

    let texts = dataset.texts();

    info!(rows = texts.len(), "running sentiment analysis");
    let sentiments = sentiment::predict(models.sentiment.as_ref(), &texts)
        .context("sentiment stage failed")?;
    for (record, prediction) in dataset.records.iter_mut().zip(sentiments) {
        record.sentiment = Some(prediction);
    }
    trail.enter(Stage::SentimentAnnotated);

    info!(rows = texts.len(), "fitting topics");
    let (topic_model, topic_status) =
        match topics::fit(&texts, models.embedder.as_mut(), &options.topics) {
            Ok(fit) => {
                let model = apply_topics(&mut dataset, fit);
                trail.enter(Stage::TopicAnnotated);
                let status = TopicStatus::Annotated {
                    topics: model.topics.len(),
                    outliers: model.outliers,
                };
                (Some(model), status)
            }
            Err(err) => {
                warn!(error = %err, "topic modeling failed; leaving topics empty");
                for record in &mut dataset.records {
                    record.topic_id = None;
                }
                trail.enter(Stage::TopicSkipped);
                let status = TopicStatus::Skipped {
                    reason: err.to_string(),
                };
                (None, status)
            }
        };

    info!(rows = texts.len(), recognizer = models.recognizer.name(), "extracting named entities");
    let entities = ner::extract(models.recognizer.as_ref(), &texts);
    for (record, found) in dataset.records.iter_mut().zip(entities) {
        record.entities = found;
    }
    trail.enter(Stage::EntityAnnotated);

    let output = persist(&dataset, &options.output_dir, topic_model.as_ref())?;
    trail.enter(Stage::Persisted);

    let report = RunReport {
        input: options.input.clone(),
        output,
        rows_loaded,
        rows_kept: dataset.len(),
        rows_dropped,
        stages: trail.0,
        topics: topic_status,
        embedder: models.embedder.name().to_string(),
        recognizer: models.recognizer.name().to_string(),
        finished_at: Utc::now(),
    };
    write_summary(&report, &options.output_dir)?;
    Ok(report)
}

fn apply_topics(dataset: &mut Dataset, fit: TopicFit) -> TopicModel {
    for (record, topic) in dataset.records.iter_mut().zip(fit.assignments) {
        record.topic_id = Some(topic);
    }
    fit.model
}

fn persist(dataset: &Dataset, output_dir: &Path, topics: Option<&TopicModel>) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output dir {}", output_dir.display()))?;
    let output = output_dir.join(OUTPUT_FILE);
    data::io::write_annotated(dataset, &output)?;
    if let Some(model) = topics {
        write_topics(model, &output_dir.join(TOPICS_FILE))?;
    }
    Ok(output)
}

fn write_topics(model: &TopicModel, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating topics file {}", path.display()))?;
    writer.write_record(["topic_id", "size", "keywords"])?;
    for topic in &model.topics {
        writer.write_record([
            topic.topic_id.to_string(),
            topic.size.to_string(),
            topic.keywords.join(" "),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), topics = model.topics.len(), "wrote topic summary");
    Ok(())
}

fn write_summary(report: &RunReport, output_dir: &Path) -> Result<()> {
    let path = output_dir.join(SUMMARY_FILE);
    let body = serde_json::to_string_pretty(report)?;
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
