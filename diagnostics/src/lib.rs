//! Diagnostics for the shader IR and its backends
//!
//! A [`Diagnostic`] names a place in a module (function, block, instruction)
//! rather than a source span: the IR is built programmatically, so there is
//! no text to point into. Codes are plain strings such as `E9003`; the
//! compiler crate keeps the table that explains them.

use std::fmt;

pub mod shader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Note,
}

impl DiagnosticSeverity {
    fn as_str(self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Note => "note",
        }
    }

    /// ANSI color used for the header when coloring is on.
    fn ansi(self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "\x1b[1;31m",
            DiagnosticSeverity::Warning => "\x1b[1;33m",
            DiagnosticSeverity::Note => "\x1b[1;36m",
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in a module a diagnostic applies.
///
/// A default location refers to the module as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub function: Option<String>,
    pub block: Option<u32>,
    pub instruction: Option<u32>,
}

impl Location {
    pub fn module() -> Self {
        Self::default()
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn in_block(self, block: u32) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    pub fn at_instruction(self, instruction: u32) -> Self {
        Self {
            instruction: Some(instruction),
            ..self
        }
    }

    pub fn is_module(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_module() {
            return f.write_str("<module>");
        }
        let function = self.function.as_ref().map(|name| format!("fn {}", name));
        let block = self.block.map(|b| format!("%b{}", b));
        let instruction = self.instruction.map(|i| format!("inst {}", i));
        let parts: Vec<String> = [function, block, instruction].into_iter().flatten().collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub location: Location,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            location,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self::new(DiagnosticSeverity::Error, message, location)
    }

    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Self::new(DiagnosticSeverity::Warning, message, location)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]", self.severity, code)?,
            None => write!(f, "{}", self.severity)?,
        }
        write!(f, ": {} ({})", self.message, self.location)
    }
}

/// An ordered batch of diagnostics; the error type of validation and
/// generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.iter().any(Diagnostic::is_error)
    }

    /// True if any diagnostic carries `code`, e.g. `"E9003"`.
    pub fn has_code(&self, code: &str) -> bool {
        self.iter().any(|d| d.code.as_deref() == Some(code))
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.is_error())
    }

    pub fn with_severity(&self, severity: DiagnosticSeverity) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(move |d| d.severity == severity)
    }

    /// Turn the batch into a `Result`: `Err` as soon as one error is present.
    pub fn into_result<T>(self, value: T) -> Result<T, Diagnostics> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(value)
        }
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            diagnostics: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Multi-line rendering for terminals.
///
/// ```text
/// error[E9001]: block does not end with a terminator
///   --> fn f, %b2
///      help: every block must end in return, unreachable, or a region exit
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics) -> String {
        diagnostics
            .iter()
            .map(|d| self.format_diagnostic(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let header = match &diagnostic.code {
            Some(code) => format!("{}[{}]", diagnostic.severity, code),
            None => diagnostic.severity.to_string(),
        };
        let mut lines = vec![format!(
            "{}: {}",
            self.paint(diagnostic.severity.ansi(), &header),
            diagnostic.message
        )];
        lines.push(format!(
            "  {} {}",
            self.paint("\x1b[96m", "-->"),
            diagnostic.location
        ));
        for help in &diagnostic.help {
            lines.push(format!("     {}: {}", self.paint("\x1b[32m", "help"), help));
        }
        for note in &diagnostic.notes {
            lines.push(format!("{}: {}", self.paint("\x1b[34m", "note"), note));
        }
        let mut output = lines.join("\n");
        output.push('\n');
        output
    }
}

pub type DiagnosticResult<T> = Result<T, Diagnostics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::module().to_string(), "<module>");
        assert_eq!(
            Location::function("main").in_block(3).at_instruction(7).to_string(),
            "fn main, %b3, inst 7"
        );
        assert_eq!(Location::module().in_block(1).to_string(), "%b1");
    }

    #[test]
    fn test_diagnostic_chaining() {
        let diagnostic = Diagnostic::error("test error", Location::function("foo"))
            .with_code("E9001")
            .with_help("try this")
            .with_note("additional info");

        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code.as_deref(), Some("E9001"));
        assert_eq!(diagnostic.help, vec!["try this".to_string()]);
        assert_eq!(diagnostic.notes.len(), 1);
        assert_eq!(
            diagnostic.to_string(),
            "error[E9001]: test error (fn foo)"
        );
    }

    #[test]
    fn test_diagnostics_queries() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("w", Location::module()));
        assert!(!diags.has_errors());
        assert!(diags.clone().into_result(()).is_ok());

        diags.push(Diagnostic::error("e", Location::module()).with_code("E5001"));
        assert!(diags.has_errors());
        assert!(diags.has_code("E5001"));
        assert!(!diags.has_code("E5002"));
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.with_severity(DiagnosticSeverity::Warning).count(), 1);
        assert!(diags.into_result(()).is_err());
    }

    #[test]
    fn test_collect() {
        let diags: Diagnostics = (0..3)
            .map(|i| Diagnostic::error(format!("e{}", i), Location::module()))
            .collect();
        assert_eq!(diags.len(), 3);
        assert_eq!((&diags).into_iter().count(), 3);
    }

    #[test]
    fn test_formatter_plain() {
        let diagnostic = Diagnostic::error("missing terminator", Location::function("f").in_block(2))
            .with_code("E9001")
            .with_help("end the block with a terminator");
        let text = ErrorFormatter::new().format_diagnostic(&diagnostic);
        assert!(text.starts_with("error[E9001]: missing terminator\n"));
        assert!(text.contains("  --> fn f, %b2\n"));
        assert!(text.contains("     help: end the block with a terminator\n"));
    }

    #[test]
    fn test_formatter_colors_wrap_header() {
        let diagnostic = Diagnostic::warning("odd", Location::module());
        let text = ErrorFormatter::with_colors().format_diagnostic(&diagnostic);
        assert!(text.starts_with("\x1b[1;33mwarning\x1b[0m: odd"));
    }
}
