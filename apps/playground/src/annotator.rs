use std::collections::BTreeMap;

use playground_proto::Diagnostic;

use crate::controller::Annotator;

/// Annotates an in-memory copy of the submitted source.
///
/// Marking is idempotent per line; repeated diagnostics for the same line only
/// add their message once.
#[derive(Debug, Clone, Default)]
pub struct SourceAnnotator {
    lines: Vec<String>,
    marks: BTreeMap<usize, Vec<String>>,
}

impl SourceAnnotator {
    pub fn new(source: &str) -> Self {
        let mut annotator = Self::default();
        annotator.set_source(source);
        annotator
    }

    /// Replaces the buffer. Existing marks are dropped.
    pub fn set_source(&mut self, source: &str) {
        self.lines = source
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();
        self.marks.clear();
    }

    pub fn marked_lines(&self) -> Vec<usize> {
        self.marks.keys().copied().collect()
    }

    pub fn is_marked(&self, line: usize) -> bool {
        self.marks.contains_key(&line)
    }

    pub fn messages(&self, line: usize) -> &[String] {
        self.marks.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One row per marked line: one-based number, a gutter dot, the source.
    pub fn render_gutter(&self) -> Vec<String> {
        let width = self.lines.len().to_string().len();
        self.marks
            .keys()
            .map(|&line| {
                let text = self.lines.get(line).map(String::as_str).unwrap_or("");
                format!("{:>width$} ● {}", line + 1, text)
            })
            .collect()
    }
}

impl Annotator for SourceAnnotator {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn clear(&mut self) {
        self.marks.clear();
    }

    fn mark(&mut self, diagnostic: &Diagnostic) {
        if diagnostic.line >= self.lines.len() {
            return;
        }
        let messages = self.marks.entry(diagnostic.line).or_default();
        if !messages.contains(&diagnostic.message) {
            messages.push(diagnostic.message.clone());
        }
    }
}
