use std::fmt;

/// How serious a [`Diagnostic`](super::Diagnostic) is.
///
/// Ordered so that the worst of a batch is its maximum: `Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Reported, but the declarations of the file are still documented.
    Warning,
    /// Stops documentation of the file or package it was reported for.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        *self == Self::Error
    }

    pub fn is_warning(&self) -> bool {
        *self == Self::Warning
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
