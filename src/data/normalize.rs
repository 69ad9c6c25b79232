//! Text cleaning, prompt/response merging and blank filtering.
//!
//! Redaction here is pattern-based demo redaction. It catches obvious email
//! addresses and ten-digit phone numbers only and is not an anonymisation
//! guarantee.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::{Dataset, TextLayout};

/// Literal joining prompt and response.
pub const SEPARATOR: &str = " - ";
pub const EMAIL_MARKER: &str = "[REDACTED_EMAIL]";
pub const PHONE_MARKER: &str = "[REDACTED_PHONE]";

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid regex"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("valid regex"));

/// Trim and redact email- and phone-like substrings.
pub fn clean(text: &str) -> String {
    let trimmed = text.trim();
    let text = EMAIL.replace_all(trimmed, EMAIL_MARKER);
    PHONE.replace_all(&text, PHONE_MARKER).into_owned()
}

/// Join prompt and response with [`SEPARATOR`], treating missing fields as
/// empty, then [`clean`] the result.
pub fn combine(prompt: Option<&str>, response: Option<&str>) -> String {
    let joined = format!(
        "{}{SEPARATOR}{}",
        prompt.unwrap_or_default(),
        response.unwrap_or_default()
    );
    clean(&joined)
}

/// Whether derived text carries no content.
///
/// Text is blank when it is empty after stripping whitespace. For the
/// prompt/response layout a lone separator dash, left by joining two empty
/// fields, is blank too; `"Q3 -"` is not. Single-column text never has a
/// separator added, so a comment of `-` is kept there.
pub fn is_blank(text: &str, layout: TextLayout) -> bool {
    let stripped = text.trim();
    match layout {
        TextLayout::PromptResponse { .. } => stripped.is_empty() || stripped == SEPARATOR.trim(),
        TextLayout::Single { .. } => stripped.is_empty(),
    }
}

/// Derive `text` for every record according to the dataset layout.
pub fn normalize(dataset: &mut Dataset) {
    let layout = dataset.layout;
    for record in &mut dataset.records {
        record.text = match layout {
            TextLayout::PromptResponse { .. } => {
                combine(record.prompt.as_deref(), record.response.as_deref())
            }
            TextLayout::Single { .. } => clean(record.response.as_deref().unwrap_or_default()),
        };
    }
    debug!(rows = dataset.len(), "normalised text");
}

/// Drop records whose derived text is blank, preserving order.
pub fn filter_blank(dataset: &mut Dataset) -> usize {
    let before = dataset.len();
    let layout = dataset.layout;
    dataset.records.retain(|record| !is_blank(&record.text, layout));
    let dropped = before - dataset.len();
    info!(kept = dataset.len(), dropped, "filtered blank rows");
    dropped
}
