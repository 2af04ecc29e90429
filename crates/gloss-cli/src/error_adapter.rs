//! Presents [`GlossError`]s as miette reports.
//!
//! Parse and check errors become one report per diagnostic, each rendered
//! against the Go file it was reported for. Every other error is a single
//! report without source.

use std::{fmt, path::Path};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, SourceSpan};

use gloss::{ConfigError, GlossError};
use gloss_parser::error::Diagnostic;

pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    /// The offending file, named for the report header.
    source: NamedSource<String>,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic, path: &Path, src: &str) -> Self {
        Self {
            diag,
            source: NamedSource::new(path.display().to_string(), src.to_string()),
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .field("file", &self.source.name())
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// A [`GlossError`] with a `gloss::*` code and, for go.mod problems, a hint.
pub struct ErrorAdapter<'a>(pub &'a GlossError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            GlossError::Io(_) => "gloss::io",
            GlossError::Config(_) => "gloss::config",
            GlossError::Parse { .. } => "gloss::parse",
            GlossError::TypeCheck { .. } => "gloss::check",
            GlossError::Export(_) => "gloss::export",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            GlossError::Config(ConfigError::MissingDescriptor(_)) => {
                "pass the directory that contains go.mod as the module argument"
            }
            GlossError::Config(ConfigError::MalformedDescriptor { .. }) => {
                "go.mod must start with a `module <path>` directive"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Anything `main` can hand to a miette report handler.
pub type Reportable<'a> = Box<dyn MietteDiagnostic + 'a>;

fn span_to_miette(span: gloss_parser::Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// The reports to print for `err`, at least one.
pub fn to_reportables(err: &GlossError) -> Vec<Reportable<'_>> {
    let (diagnostics, path, src) = match err {
        GlossError::Parse { err: parse_err, path, src } => (parse_err.diagnostics(), path, src),
        GlossError::TypeCheck { err: check_err, path, src } => (check_err.diagnostics(), path, src),
        _ => return vec![Box::new(ErrorAdapter(err)) as Reportable<'_>],
    };

    if diagnostics.is_empty() {
        return vec![Box::new(ErrorAdapter(err)) as Reportable<'_>];
    }

    diagnostics
        .iter()
        .map(|d| Box::new(DiagnosticAdapter::new(d, path, src)) as Reportable<'_>)
        .collect()
}
