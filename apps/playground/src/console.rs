use std::io::{self, IsTerminal, Write};

use crossterm::style::Stylize;
use tracing::{debug, warn};

use crate::controller::{Console, LineStyle, RunAffordance};

/// Writes the run transcript to a terminal (or any writer).
///
/// Program output is passed through untouched so prompts without a trailing
/// newline stay on the same line as the user's answer; every other line style
/// starts on a fresh line.
pub struct TerminalConsole<W: Write> {
    out: W,
    color: bool,
    at_line_start: bool,
    affordance: RunAffordance,
    write_failed: bool,
    echo_input: bool,
}

impl TerminalConsole<io::Stdout> {
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> TerminalConsole<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            at_line_start: true,
            affordance: RunAffordance::Idle,
            write_failed: false,
            echo_input: true,
        }
    }

    /// Skip `Input` lines, for terminals that already echo what was typed.
    pub fn with_input_echo(mut self, echo: bool) -> Self {
        self.echo_input = echo;
        self
    }

    pub fn affordance(&self) -> RunAffordance {
        self.affordance
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&self, text: &str, style: LineStyle) -> String {
        if !self.color {
            return text.to_string();
        }
        match style {
            LineStyle::Normal => text.to_string(),
            LineStyle::Error => text.red().to_string(),
            LineStyle::System => text.dim().to_string(),
            LineStyle::Input => text.cyan().to_string(),
            LineStyle::Assistant => text.magenta().to_string(),
        }
    }

    fn write_all(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            if !self.write_failed {
                warn!(error = %err, "console write failed");
                self.write_failed = true;
            }
            return;
        }
        if let Some(last) = text.chars().last() {
            self.at_line_start = last == '\n';
        }
    }
}

impl<W: Write> Console for TerminalConsole<W> {
    fn append(&mut self, text: &str, style: LineStyle) {
        if style == LineStyle::Input && !self.echo_input {
            return;
        }
        if style == LineStyle::Normal {
            self.write_all(text);
            return;
        }
        let mut line = String::new();
        if !self.at_line_start {
            line.push('\n');
        }
        line.push_str(&self.styled(text, style));
        if !text.ends_with('\n') {
            line.push('\n');
        }
        self.write_all(&line);
    }

    fn set_run_affordance(&mut self, affordance: RunAffordance) {
        debug!(?affordance, "run affordance");
        self.affordance = affordance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(console: TerminalConsole<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).expect("utf8")
    }

    #[test]
    fn output_chunks_pass_through_verbatim() {
        let mut console = TerminalConsole::new(Vec::new(), false);
        console.append("Enter your name:", LineStyle::Normal);
        console.append(" Alice\n", LineStyle::Normal);
        assert_eq!(transcript(console), "Enter your name: Alice\n");
    }

    #[test]
    fn status_lines_start_on_a_fresh_line() {
        let mut console = TerminalConsole::new(Vec::new(), false);
        console.append("prompt>", LineStyle::Normal);
        console.append("42 ↵", LineStyle::Input);
        console.append("=== 0 ===", LineStyle::System);
        assert_eq!(transcript(console), "prompt>\n42 ↵\n=== 0 ===\n");
    }

    #[test]
    fn color_is_optional() {
        let mut console = TerminalConsole::new(Vec::new(), true);
        console.append("boom", LineStyle::Error);
        let text = transcript(console);
        assert!(text.contains("boom"));
        assert!(text.contains('\u{1b}'));
    }

    #[test]
    fn input_echo_can_be_suppressed() {
        let mut console = TerminalConsole::new(Vec::new(), false).with_input_echo(false);
        console.append("Name? ", LineStyle::Normal);
        console.append("Alice ↵", LineStyle::Input);
        console.append("Hi Alice\n", LineStyle::Normal);
        assert_eq!(transcript(console), "Name? Hi Alice\n");
    }

    #[test]
    fn tracks_affordance() {
        let mut console = TerminalConsole::new(Vec::new(), false);
        console.set_run_affordance(RunAffordance::Running);
        assert_eq!(console.affordance(), RunAffordance::Running);
    }
}
