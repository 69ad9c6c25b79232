use std::path::Path;

use anyhow::Result;
use survey_annotator::{
    data::io::read_annotated,
    nlp::{
        embeddings::Embedder,
        ner::GazetteerRecognizer,
        sentiment::{LabelScore, LexiconClassifier, SentimentClassifier},
        topics::TopicConfig,
        Models,
    },
    pipeline::{self, PipelineOptions, Stage, TopicStatus, OUTPUT_FILE, SUMMARY_FILE, TOPICS_FILE},
};

struct Failing;

impl Embedder for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn embed(&mut self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding service unreachable")
    }
}

struct Axes;

impl Embedder for Axes {
    fn name(&self) -> &str {
        "axes"
    }

    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let jitter = i as f32 * 0.01;
                if text.to_lowercase().contains("parking") {
                    vec![1.0, jitter]
                } else {
                    vec![jitter, 1.0]
                }
            })
            .collect())
    }
}

struct Flat;

impl Embedder for Flat {
    fn name(&self) -> &str {
        "flat"
    }

    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.5, 0.5]; texts.len()])
    }
}

struct Unavailable;

impl SentimentClassifier for Unavailable {
    fn labels(&self) -> &[String] {
        &[]
    }

    fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        anyhow::bail!("sentiment weights missing")
    }
}

fn models(embedder: Box<dyn Embedder>) -> Models {
    Models {
        sentiment: Box::new(LexiconClassifier::builtin()),
        embedder,
        recognizer: Box::new(
            GazetteerRecognizer::from_entries([("Santa Monica", "GPE"), ("UCLA", "ORG")]).unwrap(),
        ),
    }
}

fn write_input(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("surveys.csv");
    std::fs::write(
        &path,
        "prompt,response\n\
         How was your visit?,The nurses at UCLA were so kind\n\
         ,\n\
         Anything else?,\n\
         Parking?,Parking in Santa Monica was terrible\n",
    )
    .unwrap();
    path
}

fn options(input: &Path, out: &Path) -> PipelineOptions {
    PipelineOptions {
        input: input.to_path_buf(),
        output_dir: out.to_path_buf(),
        text_column: None,
        topics: TopicConfig::default(),
    }
}

#[test]
fn topic_failure_still_persists_annotated_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let out = dir.path().join("results");

    let report = pipeline::run(&options(&input, &out), &mut models(Box::new(Failing))).unwrap();

    assert_eq!(report.rows_loaded, 4);
    assert_eq!(report.rows_kept, 3);
    assert_eq!(report.rows_dropped, 1);
    assert!(report.stages.contains(&Stage::TopicSkipped));
    assert_eq!(report.stages.last(), Some(&Stage::Persisted));
    assert!(matches!(report.topics, TopicStatus::Skipped { .. }));

    let (_, rows) = read_annotated(&out.join(OUTPUT_FILE)).unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.topic_id, None);
        assert!(!row.sentiment_label.is_empty());
        assert!((0.0..=1.0).contains(&row.sentiment_score));
    }
    assert_eq!(rows[0].text, "How was your visit? - The nurses at UCLA were so kind");
    assert_eq!(rows[0].sentiment_label, "POSITIVE");
    assert_eq!(rows[1].text, "Anything else? -");
    assert_eq!(rows[1].entities, "[]");
    assert_eq!(rows[2].sentiment_label, "NEGATIVE");
    let entities = rows[2].parsed_entities().unwrap();
    assert_eq!(entities[0].text, "Santa Monica");
    assert_eq!(entities[0].label, "GPE");

    assert!(out.join(SUMMARY_FILE).exists());
    assert!(!out.join(TOPICS_FILE).exists());
}

#[test]
fn output_round_trips_row_count_and_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let out = dir.path().join("results");

    let report = pipeline::run(&options(&input, &out), &mut models(Box::new(Failing))).unwrap();
    let (header, rows) = read_annotated(&report.output).unwrap();

    assert_eq!(rows.len(), report.rows_kept);
    insta::assert_snapshot!(
        header.join(","),
        @"prompt,response,text,sentiment_label,sentiment_score,topic_id,entities"
    );
}

#[test]
fn sentiment_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let out = dir.path().join("results");
    let mut models = models(Box::new(Failing));
    models.sentiment = Box::new(Unavailable);

    let err = pipeline::run(&options(&input, &out), &mut models).unwrap_err();

    assert!(format!("{err:#}").contains("sentiment weights missing"));
    assert!(!out.exists());
}

#[test]
fn comment_column_input_gets_topics() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("comments.csv");
    std::fs::write(
        &input,
        "id,comment\n\
         1,Parking was hard to find\n\
         2,Parking garage was full\n\
         3,Parking cost too much\n\
         4,Parking attendant was rude\n\
         5,The nurse was kind\n\
         6,The doctor listened carefully\n\
         7,Staff explained everything\n\
         8,Reception staff were friendly\n",
    )
    .unwrap();
    let out = dir.path().join("results");

    let report = pipeline::run(&options(&input, &out), &mut models(Box::new(Axes))).unwrap();

    assert!(report.stages.contains(&Stage::TopicAnnotated));
    let (header, rows) = read_annotated(&report.output).unwrap();
    assert_eq!(header[..2], ["id".to_string(), "comment".to_string()]);
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.topic_id.is_some()));
    assert!(out.join(TOPICS_FILE).exists());
}

#[test]
fn degenerate_embeddings_mask_topics() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("comments.csv");
    std::fs::write(
        &input,
        "comment\n\
         Parking was hard to find\n\
         The nurse was kind\n\
         Staff explained everything\n\
         Parking cost too much\n\
         Reception staff were friendly\n",
    )
    .unwrap();
    let out = dir.path().join("results");

    let report = pipeline::run(&options(&input, &out), &mut models(Box::new(Flat))).unwrap();

    assert!(report.stages.contains(&Stage::TopicSkipped));
    match &report.topics {
        TopicStatus::Skipped { reason } => assert!(reason.contains("degenerate embeddings")),
        other => panic!("expected skipped topics, got {other:?}"),
    }
    let (_, rows) = read_annotated(&report.output).unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.topic_id.is_none()));
    assert!(!out.join(TOPICS_FILE).exists());
}
