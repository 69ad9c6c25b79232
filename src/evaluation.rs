//! Classification report for comparing predicted labels to gold labels.

use std::{collections::BTreeSet, path::Path};

use anyhow::{bail, ensure, Context, Result};
use serde::Serialize;
use tracing::info;

/// Precision, recall and F1 for one label (or an average row).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    /// Per-label rows in sorted label order.
    pub labels: Vec<LabelMetrics>,
    pub accuracy: f64,
    pub macro_avg: LabelMetrics,
    pub weighted_avg: LabelMetrics,
    /// `confusion[gold][predicted]`, indexed like `labels`.
    pub confusion: Vec<Vec<usize>>,
}

/// Build a report over the sorted union of gold and predicted labels.
///
/// Undefined ratios (no predictions or no support) are reported as 0.
pub fn classification_report(gold: &[String], predicted: &[String]) -> Result<ClassificationReport> {
    ensure!(
        gold.len() == predicted.len(),
        "gold has {} labels but predictions have {}",
        gold.len(),
        predicted.len()
    );
    ensure!(!gold.is_empty(), "cannot evaluate an empty label set");

    let vocabulary: Vec<&str> = gold
        .iter()
        .chain(predicted)
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index = |label: &str| vocabulary.iter().position(|v| *v == label).unwrap_or_default();

    let n = vocabulary.len();
    let mut confusion = vec![vec![0usize; n]; n];
    for (g, p) in gold.iter().zip(predicted) {
        confusion[index(g)][index(p)] += 1;
    }

    let labels: Vec<LabelMetrics> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let tp = confusion[i][i] as f64;
            let predicted_count: usize = confusion.iter().map(|row| row[i]).sum();
            let support: usize = confusion[i].iter().sum();
            let precision = ratio(tp, predicted_count as f64);
            let recall = ratio(tp, support as f64);
            LabelMetrics {
                label: (*label).to_string(),
                precision,
                recall,
                f1: ratio(2.0 * precision * recall, precision + recall),
                support,
            }
        })
        .collect();

    let total = gold.len();
    let correct: usize = (0..n).map(|i| confusion[i][i]).sum();
    let macro_avg = average("macro avg", &labels, |_| 1.0);
    let weighted_avg = average("weighted avg", &labels, |m| m.support as f64);

    Ok(ClassificationReport {
        labels,
        accuracy: correct as f64 / total as f64,
        macro_avg,
        weighted_avg,
        confusion,
    })
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn average<F>(name: &str, rows: &[LabelMetrics], weight: F) -> LabelMetrics
where
    F: Fn(&LabelMetrics) -> f64,
{
    let total_weight: f64 = rows.iter().map(&weight).sum();
    let mean = |field: fn(&LabelMetrics) -> f64| {
        ratio(
            rows.iter().map(|m| field(m) * weight(m)).sum(),
            total_weight,
        )
    };
    LabelMetrics {
        label: name.to_string(),
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1: mean(|m| m.f1),
        support: rows.iter().map(|m| m.support).sum(),
    }
}

/// Read gold and predicted label columns from a CSV, skipping rows where
/// either is empty.
pub fn load_label_columns(path: &Path, gold: &str, predicted: &str) -> Result<(Vec<String>, Vec<String>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (Some(gold_idx), Some(pred_idx)) = (position(gold), position(predicted)) else {
        bail!(
            "{} needs columns `{gold}` and `{predicted}`, found {:?}",
            path.display(),
            headers.iter().collect::<Vec<_>>()
        );
    };
    let mut gold_labels = Vec::new();
    let mut predicted_labels = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("parsing {}", path.display()))?;
        let (Some(g), Some(p)) = (row.get(gold_idx), row.get(pred_idx)) else {
            continue;
        };
        if g.trim().is_empty() || p.trim().is_empty() {
            continue;
        }
        gold_labels.push(g.trim().to_string());
        predicted_labels.push(p.trim().to_string());
    }
    info!(rows = gold_labels.len(), "loaded label columns");
    Ok((gold_labels, predicted_labels))
}

/// Persist the per-label rows plus averages as CSV.
pub fn write_report(report: &ClassificationReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in report
        .labels
        .iter()
        .chain([&report.macro_avg, &report.weighted_avg])
    {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for row in &self.labels {
            write_row(f, row)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, &self.macro_avg)?;
        write_row(f, &self.weighted_avg)
    }
}

fn write_row(f: &mut std::fmt::Formatter<'_>, row: &LabelMetrics) -> std::fmt::Result {
    writeln!(
        f,
        "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        row.label, row.precision, row.recall, row.f1, row.support
    )
}
