//! Errors of the parsing and checking phases.
//!
//! Neither type stores source text. The caller pairs the error with the
//! file (or, for [`CheckError`], the file list) it came from.

use std::fmt;

use crate::error::Diagnostic;

/// Single-diagnostic result used inside the lexer and parser.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Displays as the first diagnostic plus a count of the rest.
struct Summary<'a>(&'a [Diagnostic]);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => Ok(()),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (+{} more)", rest.len()),
        }
    }
}

/// A Go file that could not be lexed or parsed.
#[derive(Debug)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Summary(&self.diagnostics))
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(vec![diagnostic])
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self::new(diagnostics)
    }
}

/// Constants of one type group that do not type-check.
///
/// All diagnostics refer to one file: the one at `file_index` in the slice
/// given to [`check_package`](crate::check_package). Obtained from
/// [`PackageInfo::group_error`](crate::PackageInfo::group_error).
#[derive(Debug)]
pub struct CheckError {
    file_index: usize,
    diagnostics: Vec<Diagnostic>,
}

impl CheckError {
    pub fn new(file_index: usize, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            file_index,
            diagnostics,
        }
    }

    pub fn file_index(&self) -> usize {
        self.file_index
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Summary(&self.diagnostics))
    }
}

impl std::error::Error for CheckError {}
