//! Named entity recognition: a gazetteer recognizer backed by a model file,
//! degrading to pattern rules when that file is missing.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::Entity;

/// Extracted entity span with byte offsets into the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
}

/// Trait for NER implementations.
pub trait Recognizer {
    fn name(&self) -> &'static str;
    fn extract(&self, text: &str) -> Vec<Span>;
}

static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "DATE",
            r"(?i)\b(?:(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.? \d{1,2}(?:st|nd|rd|th)?(?:,? \d{4})?|\d{1,2}/\d{1,2}/\d{2,4}|(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
        ),
        ("TIME", r"(?i)\b\d{1,2}(?::\d{2})? ?(?:am|pm)\b"),
        ("MONEY", r"\$\d+(?:,\d{3})*(?:\.\d{2})?"),
        ("PERCENT", r"\b\d+(?:\.\d+)? ?(?:%|percent\b)"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid regex")))
    .collect()
});

fn find_patterns(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    for (label, regex) in PATTERNS.iter() {
        for m in regex.find_iter(text) {
            spans.push(Span {
                start: m.start(),
                end: m.end(),
                label: (*label).to_string(),
                text: m.as_str().to_string(),
            });
        }
    }
    spans
}

/// Rule-only baseline used when no trained resource is available.
#[derive(Debug, Default)]
pub struct PatternRecognizer;

impl Recognizer for PatternRecognizer {
    fn name(&self) -> &'static str {
        "pattern-baseline"
    }

    fn extract(&self, text: &str) -> Vec<Span> {
        find_patterns(text)
    }
}

#[derive(Debug, Deserialize)]
struct GazetteerRow {
    text: String,
    label: String,
}

/// Whole-word, case-insensitive dictionary matching plus the pattern rules.
#[derive(Debug)]
pub struct GazetteerRecognizer {
    entries: Vec<(Regex, String)>,
}

impl GazetteerRecognizer {
    /// Load a `text,label` CSV gazetteer.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening entity gazetteer {}", path.display()))?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            let row: GazetteerRow =
                row.with_context(|| format!("parsing entity gazetteer {}", path.display()))?;
            rows.push((row.text, row.label));
        }
        ensure!(!rows.is_empty(), "entity gazetteer {} is empty", path.display());
        let recognizer = Self::from_entries(rows)?;
        info!(path = %path.display(), entries = recognizer.entries.len(), "loaded entity gazetteer");
        Ok(recognizer)
    }

    pub fn from_entries<I, T, L>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, L)>,
        T: AsRef<str>,
        L: Into<String>,
    {
        let mut compiled = Vec::new();
        for (term, label) in entries {
            let term = term.as_ref().trim();
            if term.is_empty() {
                continue;
            }
            let regex = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
                .case_insensitive(true)
                .build()
                .with_context(|| format!("compiling gazetteer term `{term}`"))?;
            let label: String = label.into();
            compiled.push((regex, label.trim().to_uppercase()));
        }
        Ok(Self { entries: compiled })
    }
}

impl Recognizer for GazetteerRecognizer {
    fn name(&self) -> &'static str {
        "gazetteer"
    }

    fn extract(&self, text: &str) -> Vec<Span> {
        let mut spans = find_patterns(text);
        for (regex, label) in &self.entries {
            for m in regex.find_iter(text) {
                spans.push(Span {
                    start: m.start(),
                    end: m.end(),
                    label: label.clone(),
                    text: m.as_str().to_string(),
                });
            }
        }
        spans
    }
}

/// Load the preferred recognizer, degrading to [`PatternRecognizer`] when the
/// gazetteer file does not exist.
pub fn load_recognizer(gazetteer: &Path) -> Result<Box<dyn Recognizer>> {
    if gazetteer.exists() {
        return Ok(Box::new(GazetteerRecognizer::from_path(gazetteer)?));
    }
    let fallback = PatternRecognizer;
    warn!(
        path = %gazetteer.display(),
        recognizer = fallback.name(),
        "entity gazetteer missing; degrading to pattern baseline"
    );
    Ok(Box::new(fallback))
}

/// Extract entities for each text, one list per text in input order.
pub fn extract(recognizer: &dyn Recognizer, texts: &[String]) -> Vec<Vec<Entity>> {
    let out: Vec<Vec<Entity>> = texts
        .iter()
        .map(|text| {
            resolve_overlaps(recognizer.extract(text))
                .into_iter()
                .map(|span| Entity {
                    text: span.text,
                    label: span.label,
                })
                .collect()
        })
        .collect();
    debug!(
        recognizer = recognizer.name(),
        entities = out.iter().map(Vec::len).sum::<usize>(),
        "extracted entities"
    );
    out
}

/// Order spans by offset and drop any span overlapping an earlier or longer one.
fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_some_and(|last| span.start < last.end) {
            continue;
        }
        kept.push(span);
    }
    kept
}
