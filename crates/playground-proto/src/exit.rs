use serde::{Deserialize, Serialize};

/// Parsed form of an `EXIT:` payload.
///
/// Servers send either a bare status (`1`) or a sentence ending in one
/// (`Program finished with exit code 0`); anything else keeps the text and
/// leaves `code` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSummary {
    pub text: String,
    pub code: Option<i32>,
}

impl ExitSummary {
    pub fn parse(payload: &str) -> Self {
        let code = payload
            .trim_end()
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .and_then(|token| token.parse::<i32>().ok());
        Self {
            text: payload.to_string(),
            code,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sentence_form() {
        let summary = ExitSummary::parse("Program finished with exit code 0");
        assert_eq!(summary.code, Some(0));
        assert!(summary.succeeded());
    }

    #[test]
    fn parses_bare_status_and_negative_codes() {
        assert_eq!(ExitSummary::parse("1").code, Some(1));
        assert_eq!(ExitSummary::parse("exit code -9\n").code, Some(-9));
    }

    #[test]
    fn non_numeric_summary_has_no_code() {
        let summary = ExitSummary::parse("terminated");
        assert_eq!(summary.code, None);
        assert_eq!(summary.text, "terminated");
        assert!(!summary.succeeded());
        assert_eq!(ExitSummary::parse("").code, None);
    }
}
