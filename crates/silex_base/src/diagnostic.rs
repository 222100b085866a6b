//! Diagnostics: structured errors with source locations.
//!
//! Every stage reports into a shared [`DiagnosticSink`]. The sink counts
//! errors and warnings — the counters drive the end-of-run exit gate — and
//! renders each diagnostic in the classic compiler shape:
//!
//! ```text
//! error: unclosed string literal
//!
//!    3 | char *s = "abc
//!      |           ^^^^
//!      | help: add `"` to the end of string literal
//! ```
//!
//! The sink is shared via `Rc` between the scanner, the parser and the
//! translation unit; interior mutability keeps the borrow story simple.

use crate::location::Location;
use std::cell::{Cell, RefCell};

/// ANSI styling used by the diagnostic renderer.
pub struct Style;

impl Style {
    pub fn bold_red(s: &str) -> String {
        format!("\x1b[1;31m{}\x1b[0m", s)
    }

    pub fn red(s: &str) -> String {
        format!("\x1b[31m{}\x1b[0m", s)
    }

    pub fn blue(s: &str) -> String {
        format!("\x1b[34m{}\x1b[0m", s)
    }

    pub fn cyan(s: &str) -> String {
        format!("\x1b[36m{}\x1b[0m", s)
    }

    pub fn green(s: &str) -> String {
        format!("\x1b[32m{}\x1b[0m", s)
    }

    pub fn yellow(s: &str) -> String {
        format!("\x1b[33m{}\x1b[0m", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// One reported problem.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Optional `help:` notes appended under the underline.
    pub helps: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            location,
            helps: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            location,
            helps: Vec::new(),
        }
    }

    pub fn note(message: impl Into<String>, location: Location) -> Self {
        Diagnostic {
            severity: Severity::Note,
            message: message.into(),
            location,
            helps: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    /// Renders the diagnostic against the source it points into.
    pub fn render(&self, source: &str) -> String {
        let (line_content, line_start) = line_at(source, self.location.start_pos);
        let col = self.location.start_pos.saturating_sub(line_start);
        let len = self.location.len().max(1).min(line_content.len().saturating_sub(col).max(1));
        let underline = format!("{}{}", " ".repeat(col), "^".repeat(len));

        let label = match self.severity {
            Severity::Error => Style::bold_red("error"),
            Severity::Warning => Style::yellow("warning"),
            Severity::Note => Style::cyan("note"),
        };
        let line_num = Style::blue(&format!("{:4}", self.location.start_line));
        let pipe = Style::blue("|");

        let mut out = format!(
            "{}: {}\n\n{} {} {}\n     {} {}",
            label,
            self.message,
            line_num,
            pipe,
            line_content,
            pipe,
            Style::red(&underline)
        );

        for help in &self.helps {
            let hint = Style::cyan("help");
            out.push_str(&format!("\n     {} {}: {}", pipe, hint, help));
        }

        out
    }
}

fn line_at(source: &str, pos: usize) -> (&str, usize) {
    let mut line_start = 0;
    for (i, c) in source.char_indices() {
        if i >= pos {
            break;
        }
        if c == '\n' {
            line_start = i + 1;
        }
    }
    let line_end = source[line_start..]
        .find('\n')
        .map(|off| line_start + off)
        .unwrap_or(source.len());
    (&source[line_start..line_end], line_start)
}

/// Shared collector for every diagnostic a translation unit produces.
///
/// Cloning the sink is not supported; share it behind `Rc`.
pub struct DiagnosticSink {
    count_error: Cell<usize>,
    count_warning: Cell<usize>,
    buffer: RefCell<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink {
            count_error: Cell::new(0),
            count_warning: Cell::new(0),
            buffer: RefCell::new(Vec::new()),
        }
    }

    /// Records a diagnostic, bumping the matching counter.
    pub fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.count_error.set(self.count_error.get() + 1),
            Severity::Warning => self.count_warning.set(self.count_warning.get() + 1),
            Severity::Note => {}
        }
        self.buffer.borrow_mut().push(diagnostic);
    }

    pub fn count_error(&self) -> usize {
        self.count_error.get()
    }

    pub fn count_warning(&self) -> usize {
        self.count_warning.get()
    }

    /// Drains and returns everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.buffer.borrow_mut())
    }

    /// Runs `f` over each buffered diagnostic without draining.
    pub fn for_each(&self, mut f: impl FnMut(&Diagnostic)) {
        for d in self.buffer.borrow().iter() {
            f(d);
        }
    }

    /// True if any buffered diagnostic message contains `needle`.
    ///
    /// Test helper; avoids draining the buffer mid-run.
    pub fn any_message_contains(&self, needle: &str) -> bool {
        self.buffer.borrow().iter().any(|d| d.message.contains(needle))
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn loc(start_pos: usize, end_pos: usize, line: usize) -> Location {
        let mut l = Location::new(Rc::from("test.c"));
        l.start(line, 1, start_pos);
        l.end(line, 1 + (end_pos - start_pos), end_pos);
        l
    }

    #[test]
    fn sink_counts_by_severity() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error("boom", loc(0, 1, 1)));
        sink.emit(Diagnostic::warning("hmm", loc(0, 1, 1)));
        sink.emit(Diagnostic::note("fyi", loc(0, 1, 1)));
        assert_eq!(sink.count_error(), 1);
        assert_eq!(sink.count_warning(), 1);
    }

    #[test]
    fn render_underlines_the_span() {
        let source = "int x = $;";
        let d = Diagnostic::error("unexpected token", loc(8, 9, 1));
        let rendered = d.render(source);
        assert!(rendered.contains("unexpected token"));
        assert!(rendered.contains('^'), "missing underline: {}", rendered);
    }

    #[test]
    fn render_appends_help_notes() {
        let source = "\"abc";
        let d = Diagnostic::error("unclosed string literal", loc(0, 4, 1))
            .with_help("add `\"` to the end of string literal");
        let rendered = d.render(source);
        assert!(rendered.contains("help"));
        assert!(rendered.contains("add `\"`"));
    }
}
