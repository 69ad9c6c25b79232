use survey_annotator::evaluation::{classification_report, load_label_columns, write_report};

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn report_matches_hand_computed_metrics() {
    let gold = labels(&["POSITIVE", "POSITIVE", "NEGATIVE", "NEUTRAL"]);
    let predicted = labels(&["POSITIVE", "NEUTRAL", "NEGATIVE", "NEUTRAL"]);
    let report = classification_report(&gold, &predicted).unwrap();

    let names: Vec<&str> = report.labels.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(names, vec!["NEGATIVE", "NEUTRAL", "POSITIVE"]);
    assert!((report.accuracy - 0.75).abs() < 1e-9);

    let neutral = &report.labels[1];
    assert!((neutral.precision - 0.5).abs() < 1e-9);
    assert!((neutral.recall - 1.0).abs() < 1e-9);
    let positive = &report.labels[2];
    assert!((positive.precision - 1.0).abs() < 1e-9);
    assert!((positive.recall - 0.5).abs() < 1e-9);
    assert_eq!(positive.support, 2);

    assert_eq!(report.confusion[2], vec![0, 1, 1]);
    assert_eq!(report.weighted_avg.support, 4);
}

#[test]
fn mismatched_lengths_are_rejected() {
    assert!(classification_report(&labels(&["A"]), &labels(&["A", "B"])).is_err());
}

#[test]
fn report_round_trips_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scored.csv");
    std::fs::write(
        &input,
        "text,gold_label,sentiment_label\na,POSITIVE,POSITIVE\nb,,NEGATIVE\nc,NEGATIVE,POSITIVE\n",
    )
    .unwrap();
    let (gold, predicted) = load_label_columns(&input, "gold_label", "sentiment_label").unwrap();
    assert_eq!(gold.len(), 2);

    let report = classification_report(&gold, &predicted).unwrap();
    let path = dir.path().join("evaluation_report.csv");
    write_report(&report, &path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    insta::assert_snapshot!(
        written.lines().next().unwrap(),
        @"label,precision,recall,f1,support"
    );
    assert_eq!(written.lines().count(), 1 + report.labels.len() + 2);
}
