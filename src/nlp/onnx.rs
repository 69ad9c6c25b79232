//! ONNX sequence-classification backend for the sentiment stage.
//!
//! Expects a Hugging Face export: `model.onnx`, `tokenizer.json` and a
//! `config.json` carrying `id2label`.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use anyhow::{ensure, Context, Result};
use ndarray::{Array2, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::info;

use super::sentiment::{softmax, LabelScore, SentimentClassifier};

#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: BTreeMap<String, String>,
}

pub struct OnnxClassifier {
    _environment: Arc<Environment>,
    session: Session,
    tokenizer: Tokenizer,
    labels: Vec<String>,
}

impl OnnxClassifier {
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.json");
        let config: ModelConfig = serde_json::from_str(
            &fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?,
        )
        .with_context(|| format!("parsing {}", config_path.display()))?;
        let mut ordered = config
            .id2label
            .into_iter()
            .map(|(id, label)| {
                id.parse::<usize>()
                    .map(|id| (id, label))
                    .with_context(|| format!("non-numeric label id `{id}`"))
            })
            .collect::<Result<Vec<_>>>()?;
        ordered.sort_by_key(|(id, _)| *id);
        let labels: Vec<String> = ordered.into_iter().map(|(_, label)| label).collect();
        ensure!(!labels.is_empty(), "{} declares no labels", config_path.display());

        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json"))
            .map_err(anyhow::Error::msg)
            .context("loading tokenizer.json")?;

        let environment = Environment::builder()
            .with_name("survey-annotator")
            .build()?
            .into_arc();
        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_model_from_file(dir.join("model.onnx"))?;
        info!(dir = %dir.display(), labels = ?labels, "loaded onnx sentiment model");

        Ok(Self {
            _environment: environment,
            session,
            tokenizer,
            labels,
        })
    }
}

impl SentimentClassifier for OnnxClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(anyhow::Error::msg)?;
        let len = encoding.get_ids().len();
        let widen = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<_>>();

        let ids = CowArray::from(Array2::from_shape_vec((1, len), widen(encoding.get_ids()))?)
            .into_dyn();
        let mask = CowArray::from(Array2::from_shape_vec(
            (1, len),
            widen(encoding.get_attention_mask()),
        )?)
        .into_dyn();
        let type_ids = CowArray::from(Array2::from_shape_vec(
            (1, len),
            widen(encoding.get_type_ids()),
        )?)
        .into_dyn();

        let mut inputs = vec![
            Value::from_array(self.session.allocator(), &ids)?,
            Value::from_array(self.session.allocator(), &mask)?,
        ];
        if self.session.inputs.len() > 2 {
            inputs.push(Value::from_array(self.session.allocator(), &type_ids)?);
        }
        let outputs = self.session.run(inputs)?;
        let logits = outputs[0].try_extract::<f32>()?;
        let logits: Vec<f32> = logits.view().iter().copied().collect();
        ensure!(
            logits.len() == self.labels.len(),
            "model produced {} logits for {} labels",
            logits.len(),
            self.labels.len()
        );

        Ok(self
            .labels
            .iter()
            .zip(softmax(&logits))
            .map(|(label, score)| LabelScore {
                label: label.clone(),
                score,
            })
            .collect())
    }
}
