//! Accumulates diagnostics so that one run reports every problem of a file.

use crate::error::{Diagnostic, Severity};

#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    worst: Option<Severity>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.worst = self.worst.max(Some(diagnostic.severity()));
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.worst.is_some_and(|s| s.is_error())
    }

    /// `Ok` unless an error was emitted. Warnings alone are dropped; once an
    /// error exists every diagnostic, warnings included, goes into `E`.
    pub fn finish<E: From<Vec<Diagnostic>>>(self) -> Result<(), E> {
        match self.worst {
            Some(Severity::Error) => Err(E::from(self.diagnostics)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{CheckError, ErrorCode, ParseError},
        span::Span,
    };

    #[test]
    fn test_empty_and_warning_only_batches_pass() {
        assert!(DiagnosticCollector::new().finish::<ParseError>().is_ok());

        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("`Limit` kept as written"));
        assert!(!collector.has_errors());
        assert!(collector.finish::<ParseError>().is_ok());
    }

    #[test]
    fn test_error_carries_the_whole_batch() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("`Limit` kept as written"));
        collector.emit(
            Diagnostic::error("constant division by zero")
                .with_code(ErrorCode::E202)
                .with_label(Span::new(31..36), "divisor is zero"),
        );
        collector.emit(Diagnostic::warning("`Burst` kept as written"));
        assert!(collector.has_errors());

        let err = collector.finish::<ParseError>().unwrap_err();
        let messages: Vec<_> = err.diagnostics().iter().map(Diagnostic::message).collect();
        assert_eq!(
            messages,
            [
                "`Limit` kept as written",
                "constant division by zero",
                "`Burst` kept as written",
            ]
        );
    }

    #[test]
    fn test_finish_into_check_error() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::error("undefined: MaxRetries").with_code(ErrorCode::E200));

        let err = collector.finish::<Vec<Diagnostic>>().unwrap_err();
        let err = CheckError::new(2, err);
        assert_eq!(err.file_index(), 2);
        assert_eq!(err.to_string(), "error[E200]: undefined: MaxRetries");
    }
}
