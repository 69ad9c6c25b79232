//! Sentiment classification stage.
//!
//! Classifiers report a score for every category in their native label
//! order. [`predict`] then selects the highest score, breaking ties in
//! favour of the category that comes first in that order.

use std::{collections::HashMap, path::Path};

use anyhow::{bail, ensure, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::Sentiment;

/// Score the classifier assigned to one category.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Trait for sentiment classifier implementations.
pub trait SentimentClassifier {
    /// Category vocabulary in native order.
    fn labels(&self) -> &[String];
    /// Scores for every category of [`Self::labels`], in the same order.
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;
}

/// Classify every text and keep the top category per text.
pub fn predict(classifier: &dyn SentimentClassifier, texts: &[String]) -> Result<Vec<Sentiment>> {
    let labels = classifier.labels();
    let mut out = Vec::with_capacity(texts.len());
    for (idx, text) in texts.iter().enumerate() {
        let scores = classifier
            .classify(text)
            .with_context(|| format!("classifying text {idx}"))?;
        let Some(best) = select_label(&scores) else {
            bail!("classifier returned no scores for text {idx}");
        };
        ensure!(
            best.score.is_finite() && (0.0..=1.0).contains(&best.score),
            "classifier score {} for text {idx} is outside [0, 1]",
            best.score
        );
        ensure!(
            labels.iter().any(|l| l == &best.label),
            "classifier produced undeclared label `{}`",
            best.label
        );
        out.push(Sentiment {
            label: best.label.clone(),
            score: best.score,
        });
    }
    debug!(count = out.len(), "predicted sentiment");
    Ok(out)
}

/// Highest-scoring category; the first one wins a tie.
pub fn select_label(scores: &[LabelScore]) -> Option<&LabelScore> {
    let mut best: Option<&LabelScore> = None;
    for candidate in scores {
        match best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}

pub const NEGATIVE: &str = "NEGATIVE";
pub const NEUTRAL: &str = "NEUTRAL";
pub const POSITIVE: &str = "POSITIVE";

/// Normalisation constant for the compound valence.
const ALPHA: f32 = 15.0;
/// Logit scale applied to the compound valence.
const SHARPNESS: f32 = 4.0;
/// Logit given to the neutral class.
const NEUTRAL_PRIOR: f32 = 1.0;
const NEGATION_DAMPING: f32 = -0.74;
const INTENSIFIER_BOOST: f32 = 1.5;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("valid regex"));

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "hardly", "barely",
    "cannot", "without",
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "so",
    "incredibly",
    "absolutely",
    "truly",
    "super",
    "totally",
];

const DEFAULT_LEXICON: &[(&str, f32)] = &[
    ("amazing", 2.8),
    ("appreciate", 2.0),
    ("appreciated", 2.0),
    ("attentive", 2.0),
    ("awesome", 3.1),
    ("awful", -2.9),
    ("bad", -2.5),
    ("best", 3.2),
    ("better", 1.9),
    ("bored", -1.1),
    ("careless", -1.8),
    ("caring", 2.2),
    ("clean", 1.7),
    ("comfortable", 2.0),
    ("compassionate", 2.3),
    ("confused", -1.3),
    ("confusing", -1.4),
    ("courteous", 1.9),
    ("delay", -1.3),
    ("delayed", -1.4),
    ("dirty", -1.9),
    ("disappointed", -2.1),
    ("disappointing", -2.2),
    ("dismissive", -2.0),
    ("efficient", 1.8),
    ("excellent", 3.2),
    ("fantastic", 2.6),
    ("fine", 0.8),
    ("friendly", 2.2),
    ("frustrated", -2.1),
    ("frustrating", -2.2),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hate", -2.7),
    ("hated", -3.0),
    ("helpful", 1.9),
    ("horrible", -2.5),
    ("ignored", -1.9),
    ("kind", 2.4),
    ("late", -0.9),
    ("like", 1.5),
    ("liked", 1.8),
    ("long", -0.6),
    ("love", 3.2),
    ("loved", 2.9),
    ("messy", -1.5),
    ("nice", 1.8),
    ("okay", 0.9),
    ("ok", 0.9),
    ("pain", -2.0),
    ("painful", -2.3),
    ("pleasant", 2.3),
    ("pleased", 1.9),
    ("poor", -2.1),
    ("professional", 1.6),
    ("quick", 1.1),
    ("respectful", 2.0),
    ("rude", -2.0),
    ("rush", -0.9),
    ("rushed", -1.3),
    ("sad", -2.1),
    ("satisfied", 1.8),
    ("slow", -1.3),
    ("terrible", -2.5),
    ("thank", 1.5),
    ("thanks", 1.9),
    ("unhappy", -1.8),
    ("unhelpful", -1.9),
    ("unprofessional", -2.1),
    ("upset", -1.6),
    ("wonderful", 2.7),
    ("worse", -2.1),
    ("worst", -3.1),
];

#[derive(Debug, Deserialize)]
struct LexiconRow {
    term: String,
    valence: f32,
}

/// Valence-lexicon classifier over `NEGATIVE`, `NEUTRAL` and `POSITIVE`.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    labels: Vec<String>,
    valence: HashMap<String, f32>,
}

impl LexiconClassifier {
    /// Classifier backed by the built-in lexicon.
    pub fn builtin() -> Self {
        Self::from_terms(
            DEFAULT_LEXICON
                .iter()
                .map(|(term, valence)| ((*term).to_string(), *valence)),
        )
    }

    /// Load a `term,valence` CSV lexicon.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening sentiment lexicon {}", path.display()))?;
        let mut terms = Vec::new();
        for row in reader.deserialize() {
            let row: LexiconRow =
                row.with_context(|| format!("parsing sentiment lexicon {}", path.display()))?;
            terms.push((row.term.trim().to_lowercase(), row.valence));
        }
        ensure!(!terms.is_empty(), "sentiment lexicon {} is empty", path.display());
        info!(path = %path.display(), terms = terms.len(), "loaded sentiment lexicon");
        Ok(Self::from_terms(terms))
    }

    fn from_terms<I: IntoIterator<Item = (String, f32)>>(terms: I) -> Self {
        Self {
            labels: vec![NEGATIVE.into(), NEUTRAL.into(), POSITIVE.into()],
            valence: terms.into_iter().collect(),
        }
    }

    /// Compound valence in (-1, 1).
    pub fn compound(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN.find_iter(&lower).map(|m| m.as_str()).collect();
        let mut sum = 0.0f32;
        for (idx, token) in tokens.iter().enumerate() {
            let Some(&base) = self.valence.get(*token) else {
                continue;
            };
            let mut value = base;
            let window = &tokens[idx.saturating_sub(3)..idx];
            if window.last().is_some_and(|prev| INTENSIFIERS.contains(prev)) {
                value *= INTENSIFIER_BOOST;
            }
            if window
                .iter()
                .any(|prev| NEGATORS.contains(prev) || prev.ends_with("n't"))
            {
                value *= NEGATION_DAMPING;
            }
            sum += value;
        }
        sum / (sum * sum + ALPHA).sqrt()
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let compound = self.compound(text);
        let logits = [
            -SHARPNESS * compound,
            NEUTRAL_PRIOR,
            SHARPNESS * compound,
        ];
        let probs = softmax(&logits);
        Ok(self
            .labels
            .iter()
            .zip(probs)
            .map(|(label, score)| LabelScore {
                label: label.clone(),
                score,
            })
            .collect())
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f32)]) -> Vec<LabelScore> {
        pairs
            .iter()
            .map(|(label, score)| LabelScore {
                label: (*label).to_string(),
                score: *score,
            })
            .collect()
    }

    #[test]
    fn tie_goes_to_first_label() {
        let s = scores(&[("A", 0.2), ("B", 0.4), ("C", 0.4)]);
        assert_eq!(select_label(&s).unwrap().label, "B");
    }

    #[test]
    fn negation_flips_valence() {
        let clf = LexiconClassifier::builtin();
        assert!(clf.compound("the staff were helpful") > 0.0);
        assert!(clf.compound("the staff were not helpful") < 0.0);
    }

    #[test]
    fn softmax_sums_to_one() {
        let total: f32 = softmax(&[1.0, 2.0, 3.0]).iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
