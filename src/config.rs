//! Runtime configuration utilities for survey-annotator.

use std::{env, path::PathBuf};

use anyhow::bail;

/// Embedding backend used by the topic stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Feature-hashed bag of words; always available.
    Hashing,
    /// fastembed MiniLM; requires the `embeddings` feature.
    Fastembed,
}

impl EmbeddingBackend {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "fastembed" => Ok(Self::Fastembed),
            other => bail!("unknown EMBEDDING_BACKEND `{other}` (expected hashing or fastembed)"),
        }
    }
}

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Default folder for pipeline outputs.
    pub outputs_dir: PathBuf,
    /// Root folder for model resources.
    pub models_dir: PathBuf,
    /// Optional `term,valence` lexicon replacing the built-in one.
    pub sentiment_lexicon: Option<PathBuf>,
    /// Optional directory holding an ONNX sequence classifier.
    pub sentiment_model_dir: Option<PathBuf>,
    /// Gazetteer for the preferred entity recognizer.
    pub entity_gazetteer: PathBuf,
    pub embedding_backend: EmbeddingBackend,
    /// Advisory number of topics requested from the clusterer.
    pub topic_count: Option<usize>,
    pub min_topic_size: usize,
    pub topic_keywords: usize,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results"));
        let models_dir = env::var("MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models"));
        let sentiment_lexicon = env::var("SENTIMENT_LEXICON").ok().map(PathBuf::from);
        let sentiment_model_dir = env::var("SENTIMENT_MODEL_DIR").ok().map(PathBuf::from);
        let entity_gazetteer = env::var("ENTITY_GAZETTEER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| models_dir.join("entities.csv"));
        let embedding_backend = match env::var("EMBEDDING_BACKEND") {
            Ok(value) => EmbeddingBackend::parse(&value)?,
            Err(_) => EmbeddingBackend::Hashing,
        };
        // 0 disables topic reduction.
        let topic_count = match env::var("TOPIC_COUNT").ok().and_then(|v| v.parse().ok()) {
            Some(0) => None,
            Some(count) => Some(count),
            None => Some(15),
        };
        let min_topic_size = env::var("MIN_TOPIC_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let topic_keywords = env::var("TOPIC_KEYWORDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);

        Ok(Self {
            outputs_dir,
            models_dir,
            sentiment_lexicon,
            sentiment_model_dir,
            entity_gazetteer,
            embedding_backend,
            topic_count,
            min_topic_size,
            topic_keywords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_backend_parses_case_insensitively() {
        assert_eq!(EmbeddingBackend::parse(" FastEmbed ").unwrap(), EmbeddingBackend::Fastembed);
        assert_eq!(EmbeddingBackend::parse("hashing").unwrap(), EmbeddingBackend::Hashing);
        assert!(EmbeddingBackend::parse("word2vec").is_err());
    }
}
