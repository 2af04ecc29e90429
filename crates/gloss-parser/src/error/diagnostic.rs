use std::fmt;

use crate::{
    error::{
        ErrorCode, Severity,
        label::{Label, LabelStyle},
    },
    span::Span,
};

/// One problem found while lexing, parsing or checking a Go file.
///
/// Spans are byte offsets into that file; the caller keeps the path and
/// text next to the error and hands both to the renderer. Built with a
/// chain of `with_*` calls:
///
/// ```
/// # use gloss_parser::error::{Diagnostic, ErrorCode};
/// # use gloss_parser::Span;
/// // const Timeout = DefaultTimeout * 2
/// let diag = Diagnostic::error("undefined: DefaultTimeout")
///     .with_code(ErrorCode::E200)
///     .with_label(Span::new(16..30), "not declared in this package")
///     .with_help("declare `DefaultTimeout` or qualify it with its package");
///
/// assert_eq!(diag.to_string(), "error[E200]: undefined: DefaultTimeout");
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(self, code: ErrorCode) -> Self {
        Self {
            code: Some(code),
            ..self
        }
    }

    /// Marks the offending code.
    pub fn with_label(self, span: Span, message: impl Into<String>) -> Self {
        self.labelled(LabelStyle::Primary, span, message)
    }

    /// Points at related code, such as an earlier declaration.
    pub fn with_secondary_label(self, span: Span, message: impl Into<String>) -> Self {
        self.labelled(LabelStyle::Secondary, span, message)
    }

    pub fn with_help(self, help: impl Into<String>) -> Self {
        Self {
            help: Some(help.into()),
            ..self
        }
    }

    fn labelled(mut self, style: LabelStyle, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(style, span, message));
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Labels in the order they were added.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

/// `severity[code]: message`, the header line of a rendered report.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}[{code}]: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_error() {
        let diag = Diagnostic::error("expected `}` to close struct type");

        assert!(diag.severity().is_error());
        assert_eq!(diag.code(), None);
        assert!(diag.labels().is_empty());
        assert_eq!(diag.help(), None);
        assert_eq!(diag.to_string(), "error: expected `}` to close struct type");
    }

    #[test]
    fn test_redeclared_constant() {
        // colors.go declares `Red` in two const blocks.
        let diag = Diagnostic::error("`Red` redeclared in this package")
            .with_code(ErrorCode::E201)
            .with_label(Span::new(97..100), "redeclared here")
            .with_secondary_label(Span::new(48..51), "first declared here")
            .with_help("rename one of the constants");

        assert_eq!(diag.code(), Some(ErrorCode::E201));
        let styles: Vec<_> = diag.labels().iter().map(Label::style).collect();
        assert_eq!(styles, [LabelStyle::Primary, LabelStyle::Secondary]);
        assert_eq!(diag.labels()[1].message(), "first declared here");
        assert_eq!(diag.help(), Some("rename one of the constants"));
        assert_eq!(
            diag.to_string(),
            "error[E201]: `Red` redeclared in this package"
        );
    }

    #[test]
    fn test_warning_header() {
        let diag = Diagnostic::warning("skipping `legacy.go`").with_code(ErrorCode::E102);

        assert!(diag.severity().is_warning());
        assert_eq!(diag.to_string(), "warning[E102]: skipping `legacy.go`");
    }
}
