//! CSV loading and persistence for survey datasets.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use super::{Dataset, Entity, Record, TextLayout};

/// Name of the derived text column.
pub const TEXT_COLUMN: &str = "text";

/// Columns appended by the annotation stages, in output order.
pub const ANNOTATION_COLUMNS: &[&str] = &[
    TEXT_COLUMN,
    "sentiment_label",
    "sentiment_score",
    "topic_id",
    "entities",
];

const PROMPT_COLUMN: &str = "prompt";
const RESPONSE_COLUMN: &str = "response";
const SINGLE_COLUMNS: &[&str] = &["comment", "text"];

/// Annotated row as read back from `pipeline_output.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatedRow {
    pub text: String,
    pub sentiment_label: String,
    pub sentiment_score: f32,
    pub topic_id: Option<i32>,
    /// JSON array of `{"text", "label"}` objects.
    pub entities: String,
}

impl AnnotatedRow {
    pub fn parsed_entities(&self) -> Result<Vec<Entity>> {
        serde_json::from_str(&self.entities).context("parsing entities column")
    }
}

/// Read a survey CSV fully into memory.
///
/// `text_column` forces single-column mode on the named column; otherwise
/// `prompt`/`response` are preferred over `comment`/`text`.
pub fn load_dataset(path: &Path, text_column: Option<&str>) -> Result<Dataset> {
    info!(path = %path.display(), "loading survey data");
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening input {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let layout = resolve_layout(&columns, text_column)?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("parsing row {} of {}", idx + 1, path.display()))?;
        let source: Vec<String> = row.iter().map(str::to_string).collect();
        let (prompt, response) = match layout {
            TextLayout::PromptResponse { prompt, response } => {
                (cell(&source, prompt), cell(&source, response))
            }
            TextLayout::Single { column } => (None, cell(&source, Some(column))),
        };
        records.push(Record {
            source,
            prompt,
            response,
            ..Record::default()
        });
    }
    info!(rows = records.len(), ?layout, "loaded survey rows");
    Ok(Dataset {
        columns,
        layout,
        records,
    })
}

fn resolve_layout(columns: &[String], text_column: Option<&str>) -> Result<TextLayout> {
    let find = |name: &str| columns.iter().position(|c| c.eq_ignore_ascii_case(name));
    if let Some(name) = text_column {
        return match find(name) {
            Some(column) => Ok(TextLayout::Single { column }),
            None => bail!("text column `{name}` not found in input header {columns:?}"),
        };
    }
    let prompt = find(PROMPT_COLUMN);
    let response = find(RESPONSE_COLUMN);
    if prompt.is_some() || response.is_some() {
        return Ok(TextLayout::PromptResponse { prompt, response });
    }
    match SINGLE_COLUMNS.iter().find_map(|name| find(name)) {
        Some(column) => Ok(TextLayout::Single { column }),
        None => bail!(
            "input has no text columns; expected prompt/response or comment/text, found {columns:?}"
        ),
    }
}

fn cell(source: &[String], idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| source.get(i))
        .filter(|value| !value.is_empty())
        .cloned()
}

/// Persist the fully annotated dataset.
pub fn write_annotated(dataset: &Dataset, path: &Path) -> Result<()> {
    write_table(dataset, path, ANNOTATION_COLUMNS, |record| {
        let entities =
            serde_json::to_string(&record.entities).context("serialising entities")?;
        Ok(vec![
            record.text.clone(),
            record
                .sentiment
                .as_ref()
                .map(|s| s.label.clone())
                .unwrap_or_default(),
            record
                .sentiment
                .as_ref()
                .map(|s| s.score.to_string())
                .unwrap_or_default(),
            record.topic_id.map(|t| t.to_string()).unwrap_or_default(),
            entities,
        ])
    })
}

/// Persist the normalised dataset with only the derived text column appended.
pub fn write_clean(dataset: &Dataset, path: &Path) -> Result<()> {
    write_table(dataset, path, &[TEXT_COLUMN], |record| {
        Ok(vec![record.text.clone()])
    })
}

fn write_table<F>(dataset: &Dataset, path: &Path, appended: &[&str], derive: F) -> Result<()>
where
    F: Fn(&Record) -> Result<Vec<String>>,
{
    // Source columns that collide with derived ones are replaced.
    let kept: Vec<usize> = dataset
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !appended.iter().any(|a| a.eq_ignore_ascii_case(name)))
        .map(|(idx, _)| idx)
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating output {}", path.display()))?;
    let header: Vec<&str> = kept
        .iter()
        .map(|&idx| dataset.columns[idx].as_str())
        .chain(appended.iter().copied())
        .collect();
    writer.write_record(&header)?;
    for record in &dataset.records {
        let mut row: Vec<String> = kept
            .iter()
            .map(|&idx| record.source.get(idx).cloned().unwrap_or_default())
            .collect();
        row.extend(derive(record)?);
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = dataset.len(), "saved dataframe");
    Ok(())
}

/// Read an annotated output file back, returning its header and rows.
pub fn read_annotated(path: &Path) -> Result<(Vec<String>, Vec<AnnotatedRow>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening annotated file {}", path.display()))?;
    let header = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<AnnotatedRow>, _>>()
        .with_context(|| format!("parsing annotated file {}", path.display()))?;
    Ok((header, rows))
}
