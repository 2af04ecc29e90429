//! Error types for gloss operations.
//!
//! This module provides the main error type [`GlossError`] which wraps
//! the error conditions that can abort a run, and [`ConfigError`] for
//! problems with the module descriptor or the configuration file.

use std::{io, path::PathBuf};

use thiserror::Error;

use gloss_parser::{CheckError, ParseError};

/// The main error type for gloss operations.
///
/// # Diagnostic Variants
///
/// The `Parse` and `TypeCheck` variants carry structured diagnostics with
/// source spans, together with the path and text of the offending file, so
/// callers can render rich error reports.
#[derive(Debug, Error)]
pub enum GlossError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}: {err}", path.display())]
    Parse {
        err: ParseError,
        path: PathBuf,
        src: String,
    },

    #[error("{}: {err}", path.display())]
    TypeCheck {
        err: CheckError,
        path: PathBuf,
        src: String,
    },

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error>),
}

impl GlossError {
    /// Create a new `Parse` error with the associated file.
    pub fn new_parse_error(err: ParseError, path: impl Into<PathBuf>, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            path: path.into(),
            src: src.into(),
        }
    }

    /// Create a new `TypeCheck` error with the associated file.
    pub fn new_type_check_error(
        err: CheckError,
        path: impl Into<PathBuf>,
        src: impl Into<String>,
    ) -> Self {
        Self::TypeCheck {
            err,
            path: path.into(),
            src: src.into(),
        }
    }
}

impl From<crate::export::Error> for GlossError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}

/// Errors in the module descriptor or the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing module descriptor: {0}")]
    MissingDescriptor(PathBuf),

    #[error("Malformed module descriptor {}:{line}: {message}", path.display())]
    MalformedDescriptor {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}
