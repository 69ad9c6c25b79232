//! Topic discovery: embed texts, cluster with HDBSCAN, describe clusters with
//! class-based TF-IDF keywords.
//!
//! Topic ids are numbered by descending size starting at 0. [`OUTLIER_TOPIC`]
//! marks texts HDBSCAN left unassigned.

use std::collections::HashMap;

use hdbscan::{Hdbscan, HdbscanHyperParams};
use indexmap::IndexMap;
use ndarray::{Array2, Axis};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::embeddings::{content_words, cosine, Embedder};

/// Reserved id for texts that fit no topic.
pub const OUTLIER_TOPIC: i32 = -1;
/// Smallest batch the clusterer is given.
pub const MIN_DOCUMENTS: usize = 5;

#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Advisory upper bound on topic count; extra topics are merged.
    pub desired_topics: Option<usize>,
    pub min_topic_size: usize,
    pub top_n_words: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            desired_topics: Some(15),
            min_topic_size: 2,
            top_n_words: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicInfo {
    pub topic_id: i32,
    pub size: usize,
    pub keywords: Vec<String>,
}

/// Fitted topic description.
#[derive(Debug, Clone, Serialize)]
pub struct TopicModel {
    pub embedder: String,
    pub topics: Vec<TopicInfo>,
    pub outliers: usize,
}

#[derive(Debug, Clone)]
pub struct TopicFit {
    pub model: TopicModel,
    /// Topic id per text, input order.
    pub assignments: Vec<i32>,
    /// Similarity of each text to its topic centroid, 0 for outliers.
    pub scores: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("need at least {required} texts to fit topics, got {got}")]
    InsufficientData { got: usize, required: usize },
    #[error("degenerate embeddings: {0}")]
    DegenerateEmbeddings(String),
    #[error("embedding backend failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("clustering failed: {0}")]
    Clustering(String),
}

/// Fit topics over `texts`.
pub fn fit(
    texts: &[String],
    embedder: &mut dyn Embedder,
    config: &TopicConfig,
) -> Result<TopicFit, TopicError> {
    let min_topic_size = config.min_topic_size.max(2);
    let required = (min_topic_size * 2).max(MIN_DOCUMENTS);
    if texts.len() < required {
        return Err(TopicError::InsufficientData {
            got: texts.len(),
            required,
        });
    }

    let embeddings = embedder.embed(texts).map_err(TopicError::Embedding)?;
    let matrix = validate(&embeddings, texts.len())?;
    debug!(
        rows = matrix.nrows(),
        dim = matrix.ncols(),
        embedder = embedder.name(),
        "embedded texts"
    );

    let params = HdbscanHyperParams::builder()
        .min_cluster_size(min_topic_size)
        .build();
    let raw = Hdbscan::new(&embeddings, params)
        .cluster()
        .map_err(|err| TopicError::Clustering(err.to_string()))?;

    let mut assignments = renumber_by_size(&raw);
    let found = topic_count(&assignments);
    if let Some(desired) = config.desired_topics.filter(|&d| d > 0) {
        while topic_count(&assignments) > desired {
            merge_smallest(&mut assignments, &matrix);
        }
    }
    let topics = topic_count(&assignments);
    info!(found, topics, "clustered topics");

    let centroids = centroids(&matrix, &assignments, topics);
    let scores = assignments
        .iter()
        .zip(matrix.rows())
        .map(|(&topic, row)| match usize::try_from(topic) {
            Ok(t) => cosine(&row.to_vec(), &centroids[t]).clamp(0.0, 1.0),
            Err(_) => 0.0,
        })
        .collect();

    let keywords = keywords(texts, &assignments, topics, config.top_n_words);
    let topics = keywords
        .into_iter()
        .enumerate()
        .map(|(idx, words)| TopicInfo {
            topic_id: idx as i32,
            size: assignments.iter().filter(|&&a| a == idx as i32).count(),
            keywords: words,
        })
        .collect();
    let outliers = assignments.iter().filter(|&&a| a == OUTLIER_TOPIC).count();

    Ok(TopicFit {
        model: TopicModel {
            embedder: embedder.name().to_string(),
            topics,
            outliers,
        },
        assignments,
        scores,
    })
}

fn validate(embeddings: &[Vec<f32>], expected: usize) -> Result<Array2<f32>, TopicError> {
    if embeddings.len() != expected {
        return Err(TopicError::DegenerateEmbeddings(format!(
            "expected {expected} vectors, got {}",
            embeddings.len()
        )));
    }
    let dim = embeddings.first().map(Vec::len).unwrap_or_default();
    if dim == 0 || embeddings.iter().any(|v| v.len() != dim) {
        return Err(TopicError::DegenerateEmbeddings(
            "vectors are empty or of mixed dimension".into(),
        ));
    }
    if embeddings.iter().flatten().any(|v| !v.is_finite()) {
        return Err(TopicError::DegenerateEmbeddings(
            "vectors contain non-finite values".into(),
        ));
    }
    if embeddings.iter().all(|v| v.iter().all(|x| *x == 0.0)) {
        return Err(TopicError::DegenerateEmbeddings("every vector is zero".into()));
    }
    if embeddings.iter().all(|v| v == &embeddings[0]) {
        return Err(TopicError::DegenerateEmbeddings(
            "every text embeds to the same vector".into(),
        ));
    }
    let flat: Vec<f32> = embeddings.iter().flatten().copied().collect();
    Array2::from_shape_vec((expected, dim), flat)
        .map_err(|err| TopicError::DegenerateEmbeddings(err.to_string()))
}

fn topic_count(assignments: &[i32]) -> usize {
    assignments
        .iter()
        .copied()
        .max()
        .map(|max| (max + 1).max(0) as usize)
        .unwrap_or_default()
}

/// Relabel clusters so the largest is 0; ties keep first-appearance order.
fn renumber_by_size(labels: &[i32]) -> Vec<i32> {
    let mut sizes: IndexMap<i32, usize> = IndexMap::new();
    for &label in labels.iter().filter(|&&l| l >= 0) {
        *sizes.entry(label).or_default() += 1;
    }
    let mut order: Vec<(i32, usize)> = sizes.into_iter().collect();
    order.sort_by(|a, b| b.1.cmp(&a.1));
    let mapping: HashMap<i32, i32> = order
        .iter()
        .enumerate()
        .map(|(new, (old, _))| (*old, new as i32))
        .collect();
    labels
        .iter()
        .map(|l| mapping.get(l).copied().unwrap_or(OUTLIER_TOPIC))
        .collect()
}

/// Fold the smallest topic into the topic with the most similar centroid.
fn merge_smallest(assignments: &mut [i32], matrix: &Array2<f32>) {
    let topics = topic_count(assignments);
    if topics < 2 {
        return;
    }
    let centroids = centroids(matrix, assignments, topics);
    let smallest = topics - 1;
    let target = (0..smallest)
        .map(|t| (t, cosine(&centroids[smallest], &centroids[t])))
        .fold(None, |best: Option<(usize, f32)>, (t, sim)| match best {
            Some((_, best_sim)) if sim <= best_sim => best,
            _ => Some((t, sim)),
        })
        .map(|(t, _)| t)
        .unwrap_or_default();
    debug!(from = smallest, into = target, "merging topic");
    for a in assignments.iter_mut() {
        if *a == smallest as i32 {
            *a = target as i32;
        }
    }
    let renumbered = renumber_by_size(assignments);
    assignments.copy_from_slice(&renumbered);
}

fn centroids(matrix: &Array2<f32>, assignments: &[i32], topics: usize) -> Vec<Vec<f32>> {
    (0..topics)
        .map(|topic| {
            let members: Vec<usize> = assignments
                .iter()
                .enumerate()
                .filter(|(_, &a)| a == topic as i32)
                .map(|(idx, _)| idx)
                .collect();
            matrix
                .select(Axis(0), &members)
                .mean_axis(Axis(0))
                .map(|c| c.to_vec())
                .unwrap_or_else(|| vec![0.0; matrix.ncols()])
        })
        .collect()
}

/// Class-based TF-IDF: each topic is treated as one document.
fn keywords(texts: &[String], assignments: &[i32], topics: usize, top_n: usize) -> Vec<Vec<String>> {
    let mut per_topic: Vec<IndexMap<String, f32>> = vec![IndexMap::new(); topics];
    for (text, &topic) in texts.iter().zip(assignments) {
        let Ok(topic) = usize::try_from(topic) else {
            continue;
        };
        for word in content_words(text) {
            *per_topic[topic].entry(word).or_default() += 1.0;
        }
    }
    let mut corpus_freq: HashMap<&str, f32> = HashMap::new();
    for counts in &per_topic {
        for (word, count) in counts {
            *corpus_freq.entry(word.as_str()).or_default() += count;
        }
    }
    let total: f32 = corpus_freq.values().sum();
    let avg_words = if topics == 0 { 0.0 } else { total / topics as f32 };

    per_topic
        .iter()
        .map(|counts| {
            let mut weighted: Vec<(&str, f32)> = counts
                .iter()
                .map(|(word, &tf)| {
                    let freq = corpus_freq.get(word.as_str()).copied().unwrap_or(1.0);
                    (word.as_str(), tf * (1.0 + avg_words / freq).ln())
                })
                .collect();
            weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
            weighted
                .into_iter()
                .take(top_n)
                .map(|(word, _)| word.to_string())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbering_orders_by_size() {
        let labels = vec![3, 5, 5, -1, 3, 5];
        assert_eq!(renumber_by_size(&labels), vec![1, 0, 0, -1, 1, 0]);
    }

    #[test]
    fn merging_reduces_topic_count() {
        let matrix = Array2::from_shape_vec(
            (5, 2),
            vec![1.0, 0.0, 0.9, 0.1, 0.0, 1.0, 0.1, 0.9, 0.8, 0.2],
        )
        .unwrap();
        let mut assignments = vec![0, 0, 1, 1, 2];
        merge_smallest(&mut assignments, &matrix);
        assert_eq!(assignments, vec![0, 0, 1, 1, 0]);
    }

    #[test]
    fn keywords_prefer_topic_specific_words() {
        let texts = vec![
            "parking garage parking".to_string(),
            "nurse kindness".to_string(),
        ];
        let words = keywords(&texts, &[0, 1], 2, 1);
        assert_eq!(words, vec![vec!["parking".to_string()], vec!["nurse".to_string()]]);
    }
}
