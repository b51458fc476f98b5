//! Maps compiler/runtime diagnostic text onto zero-based source lines.
//!
//! The mapper knows nothing about the editor buffer: an index past the end of
//! the current source is still emitted and must be skipped by whoever applies
//! the annotation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `Line 12:` as produced by the compiler service summary.
static LINE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Line\s+(\d+):").expect("valid line label pattern"));

/// `Main.java:12:` style `file:line:` locations.
static FILE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(\d+):").expect("valid file line pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Zero-based source line.
    pub line: usize,
    /// The diagnostic line the index was read from.
    pub message: String,
}

/// Returns the implicated source lines in the order they appear in `text`.
/// Repeats are kept; marking a line twice is the annotator's concern.
pub fn extract_lines(text: &str) -> Vec<usize> {
    scan(text).map(|(line, _)| line).collect()
}

pub fn diagnostics(text: &str) -> Vec<Diagnostic> {
    scan(text)
        .map(|(line, message)| Diagnostic {
            line,
            message: message.to_string(),
        })
        .collect()
}

fn scan(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .filter_map(|raw| line_index(raw).map(|index| (index, raw)))
}

fn line_index(raw: &str) -> Option<usize> {
    let captures = LINE_LABEL
        .captures(raw)
        .or_else(|| FILE_LINE.captures(raw))?;
    let one_based: usize = captures.get(1)?.as_str().parse().ok()?;
    one_based.checked_sub(1)
}
