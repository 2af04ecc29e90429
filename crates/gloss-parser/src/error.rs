//! Diagnostics reported while reading Go sources.
//!
//! Lexing and parsing failures are returned as [`ParseError`]; constant
//! checking failures as [`CheckError`]. Both wrap [`Diagnostic`]s.
//!
//! # Example
//!
//! ```
//! # use gloss_parser::error::{Diagnostic, ErrorCode};
//! # use gloss_parser::Span;
//!
//! let diag = Diagnostic::error("`Red` redeclared in this package")
//!     .with_code(ErrorCode::E201)
//!     .with_label(Span::new(120..123), "redeclared here")
//!     .with_secondary_label(Span::new(40..43), "first declared here")
//!     .with_help("rename one of the constants");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::{Label, LabelStyle};
pub use parse_error::{CheckError, ParseError};
pub use severity::Severity;
