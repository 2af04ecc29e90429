//! Rendering of resolved documents.
//!
//! This module provides the [`Exporter`] trait, the last stage of a run:
//!
//! ```text
//! go.mod + sources
//!     ↓ resolve
//! Ordered documents
//!     ↓ export
//! Rendered text
//! ```
//!
//! # Available Backends
//!
//! - [`markdown`]: headings and tables via [`markdown::Markdown`]
//! - [`json`]: the document list as pretty-printed JSON via [`json::Json`]
//!
//! Exporters render to a `String`; nothing is written until rendering has
//! succeeded. [`Error`] converts into [`GlossError::Export`] at the crate
//! boundary.
//!
//! [`GlossError::Export`]: crate::GlossError::Export

pub mod json;
pub mod markdown;

use gloss_core::document::Document;

use crate::config::OutputFormat;

/// Abstraction for document export backends.
pub trait Exporter {
    /// Render `documents`, in order, under `title`.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the documents cannot be converted to the target
    /// format.
    fn export(&self, title: &str, documents: &[Document]) -> Result<String, Error>;
}

/// The exporter for an output format.
pub fn exporter(format: OutputFormat) -> Box<dyn Exporter> {
    match format {
        OutputFormat::Markdown => Box::new(markdown::Markdown::new()),
        OutputFormat::Json => Box::new(json::Json::new()),
    }
}

/// Errors that can occur during export.
#[derive(Debug)]
pub enum Error {
    /// A rendering failure described by `message`.
    Render(String),
    /// Serialization to JSON failed.
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(msg) => write!(f, "Render error: {msg}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(_) => None,
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::Render(err.to_string())
    }
}
