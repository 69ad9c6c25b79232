//! Text embedding backends for topic clustering.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

#[cfg(feature = "embeddings")]
use fastembed::TextEmbedding;

/// Trait for embedding implementations.
pub trait Embedder {
    fn name(&self) -> &str;
    /// One vector per text, same order, uniform dimension.
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z][a-z']+").expect("valid regex"));

/// Lowercased content words used by the hashing embedder and topic keywords.
pub fn content_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().trim_end_matches('\''))
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

pub const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "but", "can", "could", "did", "didn't", "does", "doesn't", "don't", "for", "from", "had",
    "has", "have", "her", "his", "how", "into", "its", "just", "more", "most", "not", "our",
    "out", "over", "redacted", "email", "phone", "she", "should", "some", "than", "that",
    "the", "their", "them", "then", "there", "they", "this", "very", "was", "wasn't", "were",
    "what", "when", "where", "which", "who", "will", "with", "would", "you", "your",
];

/// Signed feature hashing of unigrams and bigrams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIM: usize = 256;

    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let words = content_words(text);
        let mut counts = vec![0.0f32; self.dim];
        let bigrams = words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        for feature in words.iter().cloned().chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            counts[bucket] += sign;
        }
        // Sublinear term frequency keeps repeated words from dominating.
        let mut vector: Vec<f32> = counts
            .into_iter()
            .map(|c| c.signum() * (1.0 + c.abs()).ln())
            .collect();
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIM)
    }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// MiniLM sentence embeddings via fastembed, initialised on first use.
#[cfg(feature = "embeddings")]
#[derive(Default)]
pub struct FastEmbedder {
    model: Option<TextEmbedding>,
}

#[cfg(feature = "embeddings")]
impl Embedder for FastEmbedder {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.model.is_none() {
            info!("loading fastembed model");
            self.model = Some(TextEmbedding::try_new(Default::default())?);
        }
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("fastembed model unavailable"))?;
        let documents: Vec<&str> = texts.iter().map(String::as_str).collect();
        Ok(model.embed(documents, None)?)
    }
}

/// Build the configured embedding backend.
pub fn load_embedder(backend: crate::config::EmbeddingBackend) -> Result<Box<dyn Embedder>> {
    use crate::config::EmbeddingBackend;
    let embedder: Box<dyn Embedder> = match backend {
        EmbeddingBackend::Hashing => Box::new(HashingEmbedder::default()),
        #[cfg(feature = "embeddings")]
        EmbeddingBackend::Fastembed => Box::new(FastEmbedder::default()),
        #[cfg(not(feature = "embeddings"))]
        EmbeddingBackend::Fastembed => {
            anyhow::bail!("EMBEDDING_BACKEND=fastembed requires the `embeddings` feature")
        }
    };
    info!(embedder = embedder.name(), "selected embedding backend");
    Ok(embedder)
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic_and_normalised() {
        let mut embedder = HashingEmbedder::default();
        let texts = vec!["Parking was hard to find".to_string(); 2];
        let vectors = embedder.embed(&texts).unwrap();
        assert_eq!(vectors[0], vectors[1]);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn stop_words_are_dropped() {
        assert_eq!(content_words("The nurse was kind"), vec!["nurse", "kind"]);
    }
}
