//! Survey dataset model, CSV ingestion and text normalisation.

pub mod io;
pub mod normalize;

use serde::{Deserialize, Serialize};

/// Sentiment selected for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f32,
}

/// Named entity surfaced by the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

/// One survey response and the annotations attached to it.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Raw cells aligned with [`Dataset::columns`].
    pub source: Vec<String>,
    pub prompt: Option<String>,
    pub response: Option<String>,
    /// Normalised text fed to every model stage.
    pub text: String,
    pub sentiment: Option<Sentiment>,
    pub topic_id: Option<i32>,
    pub entities: Vec<Entity>,
}

/// Which input columns carry the survey text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayout {
    /// Separate prompt and response columns; a missing column reads as empty.
    PromptResponse {
        prompt: Option<usize>,
        response: Option<usize>,
    },
    /// A single pre-combined comment column.
    Single { column: usize },
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::PromptResponse {
            prompt: None,
            response: None,
        }
    }
}

/// Ordered collection of records sharing the input schema.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub layout: TextLayout,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Build a prompt/response dataset in memory.
    pub fn from_prompt_responses<I, P, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Option<P>, Option<R>)>,
        P: Into<String>,
        R: Into<String>,
    {
        let records = rows
            .into_iter()
            .map(|(prompt, response)| {
                let prompt: Option<String> = prompt.map(Into::into);
                let response: Option<String> = response.map(Into::into);
                Record {
                    source: vec![
                        prompt.clone().unwrap_or_default(),
                        response.clone().unwrap_or_default(),
                    ],
                    prompt: prompt.filter(|p| !p.is_empty()),
                    response: response.filter(|r| !r.is_empty()),
                    ..Record::default()
                }
            })
            .collect();
        Self {
            columns: vec!["prompt".into(), "response".into()],
            layout: TextLayout::PromptResponse {
                prompt: Some(0),
                response: Some(1),
            },
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Texts in record order.
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }
}
