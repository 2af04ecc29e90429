//! # gloss Parser
//!
//! Declaration-level parser for Go source files. This crate turns one file
//! into a [`SourceFile`] holding its package clause, imports, declarations,
//! comments and file scope, and checks the constants of a package. It also
//! reads the [build constraints](build_constraint) of a file.
//!
//! ## Usage
//!
//! ```
//! # use gloss_parser::{parse_file, check_package, ParseError};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = r#"
//! package colors
//!
//! // Color of a pixel.
//! type Color int
//!
//! const (
//!     Red Color = iota // primary
//!     Green
//! )
//! "#;
//!
//!     let file = parse_file(source)?;
//!     let info = check_package(&[&file]);
//!     assert_eq!(info.constant("Green").map(|c| c.value.to_string()), Some("1".into()));
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod build_constraint;
pub mod builtin_types;
mod check;
pub mod constant;
pub mod error;
mod lexer;
mod parser;
#[cfg(test)]
mod parser_tests;
mod span;
mod tokens;

pub use ast::SourceFile;
pub use check::{ConstInfo, ConstType, PackageInfo, check_package};
pub use error::{CheckError, Diagnostic, ParseError};
pub use span::{Span, Spanned};
pub use tokens::CommentGroup;

/// Parse one Go source file.
///
/// The pipeline has two steps:
///
/// 1. **Tokenize** - Convert source text to tokens, inserting semicolons
///    and attaching comment groups
/// 2. **Parse** - Build the declaration tree and the file scope
///
/// Lexer errors are collected for the whole file; parsing stops at the first
/// syntax error.
///
/// # Example
///
/// ```
/// # use gloss_parser::{parse_file, ParseError};
///
/// fn main() -> Result<(), ParseError> {
///     let file = parse_file("package model\n\ntype ID string\n")?;
///     assert!(file.lookup_type("ID").is_some());
///     Ok(())
/// }
/// ```
pub fn parse_file(source: &str) -> Result<SourceFile, ParseError> {
    let tokens = lexer::tokenize(source)?;
    parser::build_source_file(tokens).map_err(ParseError::from)
}
