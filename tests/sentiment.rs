use anyhow::Result;
use survey_annotator::nlp::sentiment::{
    predict, LabelScore, LexiconClassifier, SentimentClassifier, NEGATIVE, NEUTRAL, POSITIVE,
};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn one_prediction_per_text_in_order() {
    let classifier = LexiconClassifier::builtin();
    let input = texts(&["I loved the care.", "It was okay.", "I hated the wait."]);
    let predictions = predict(&classifier, &input).unwrap();

    assert_eq!(predictions.len(), 3);
    let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec![POSITIVE, NEUTRAL, NEGATIVE]);
    for prediction in &predictions {
        assert!((0.0..=1.0).contains(&prediction.score));
        assert!(classifier.labels().contains(&prediction.label));
    }
}

#[test]
fn empty_input_yields_empty_output() {
    let predictions = predict(&LexiconClassifier::builtin(), &[]).unwrap();
    assert!(predictions.is_empty());
}

struct Tied;

impl SentimentClassifier for Tied {
    fn labels(&self) -> &[String] {
        static LABELS: once_cell::sync::Lazy<Vec<String>> =
            once_cell::sync::Lazy::new(|| vec!["neg".into(), "pos".into()]);
        &LABELS
    }

    fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        Ok(self
            .labels()
            .iter()
            .map(|label| LabelScore {
                label: label.clone(),
                score: 0.5,
            })
            .collect())
    }
}

#[test]
fn ties_resolve_to_native_order() {
    let predictions = predict(&Tied, &texts(&["anything"])).unwrap();
    assert_eq!(predictions[0].label, "neg");
    assert_eq!(predictions[0].score, 0.5);
}

struct Broken;

impl SentimentClassifier for Broken {
    fn labels(&self) -> &[String] {
        &[]
    }

    fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        anyhow::bail!("model weights unavailable")
    }
}

#[test]
fn classifier_errors_are_fatal() {
    let err = predict(&Broken, &texts(&["hello"])).unwrap_err();
    assert!(format!("{err:#}").contains("model weights unavailable"));
}

#[test]
fn missing_lexicon_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    assert!(LexiconClassifier::from_path(&dir.path().join("absent.csv")).is_err());
}

#[test]
fn custom_lexicon_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lexicon.csv");
    std::fs::write(&path, "term,valence\nsplendid,3.0\n").unwrap();
    let classifier = LexiconClassifier::from_path(&path).unwrap();
    let predictions = predict(&classifier, &texts(&["splendid", "loved"])).unwrap();
    assert_eq!(predictions[0].label, POSITIVE);
    assert_eq!(predictions[1].label, NEUTRAL);
}
