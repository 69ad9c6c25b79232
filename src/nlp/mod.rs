//! Natural language processing layer: model handles for the sentiment,
//! topic and entity stages.

pub mod embeddings;
pub mod ner;
#[cfg(feature = "onx")]
pub mod onnx;
pub mod sentiment;
pub mod topics;

use anyhow::Result;
use tracing::info;

use crate::config::Settings;

use self::{
    embeddings::Embedder,
    ner::Recognizer,
    sentiment::{LexiconClassifier, SentimentClassifier},
};

/// Model handles owned for the duration of one pipeline run.
pub struct Models {
    pub sentiment: Box<dyn SentimentClassifier>,
    pub embedder: Box<dyn Embedder>,
    pub recognizer: Box<dyn Recognizer>,
}

impl Models {
    /// Load every handle the pipeline needs. Sentiment failures are fatal; a
    /// missing entity gazetteer degrades to the pattern baseline.
    pub fn load(settings: &Settings) -> Result<Self> {
        let sentiment = load_sentiment(settings)?;
        let embedder = embeddings::load_embedder(settings.embedding_backend)?;
        let recognizer = ner::load_recognizer(&settings.entity_gazetteer)?;
        info!(
            sentiment_labels = ?sentiment.labels(),
            embedder = embedder.name(),
            recognizer = recognizer.name(),
            "models ready"
        );
        Ok(Self {
            sentiment,
            embedder,
            recognizer,
        })
    }
}

fn load_sentiment(settings: &Settings) -> Result<Box<dyn SentimentClassifier>> {
    if let Some(dir) = &settings.sentiment_model_dir {
        #[cfg(feature = "onx")]
        {
            return Ok(Box::new(onnx::OnnxClassifier::load(dir)?));
        }
        #[cfg(not(feature = "onx"))]
        {
            anyhow::bail!(
                "SENTIMENT_MODEL_DIR={} requires the `onx` feature",
                dir.display()
            );
        }
    }
    match &settings.sentiment_lexicon {
        Some(path) => Ok(Box::new(LexiconClassifier::from_path(path)?)),
        None => {
            info!("using built-in sentiment lexicon");
            Ok(Box::new(LexiconClassifier::builtin()))
        }
    }
}
