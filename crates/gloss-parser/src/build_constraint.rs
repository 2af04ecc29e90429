//! Build constraints.
//!
//! A Go file can restrict the builds it takes part in with a constraint in
//! the comments above its package clause:
//!
//! ```go
//! //go:build (linux || darwin) && !cgo
//!
//! package fs
//! ```
//!
//! Files written before Go 1.17 use `// +build` lines instead, where spaces
//! separate alternatives, commas join requirements and every line must
//! hold. A `//go:build` line takes precedence over them.

use std::fmt;

use winnow::{
    Parser as _,
    ascii::space0,
    combinator::{alt, delimited, preceded, separated, terminated},
    error::{ContextError, ErrMode, ModalResult},
    token::take_while,
};

use crate::{
    error::{Diagnostic, ErrorCode},
    span::Span,
};

/// A boolean expression over build tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Tag(String),
    Not(Box<Constraint>),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    /// Evaluate with `has_tag` deciding each tag.
    pub fn eval(&self, has_tag: &impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Tag(tag) => has_tag(tag.as_str()),
            Self::Not(inner) => !inner.eval(has_tag),
            Self::And(lhs, rhs) => lhs.eval(has_tag) && rhs.eval(has_tag),
            Self::Or(lhs, rhs) => lhs.eval(has_tag) || rhs.eval(has_tag),
        }
    }

    fn and(lhs: Self, rhs: Self) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    fn or(lhs: Self, rhs: Self) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.write_str(tag),
            Self::Not(inner) => match **inner {
                Self::Tag(_) | Self::Not(_) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Self::And(lhs, rhs) => {
                write_operand(f, lhs)?;
                f.write_str(" && ")?;
                write_operand(f, rhs)
            }
            Self::Or(lhs, rhs) => write!(f, "{lhs} || {rhs}"),
        }
    }
}

/// Write one side of `&&`, parenthesizing a disjunction.
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Constraint) -> fmt::Result {
    match operand {
        Constraint::Or(..) => write!(f, "({operand})"),
        _ => write!(f, "{operand}"),
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn tag(input: &mut &str) -> ModalResult<Constraint> {
    take_while(1.., is_tag_char)
        .map(|tag: &str| Constraint::Tag(tag.to_string()))
        .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<Constraint> {
    preceded(
        space0,
        alt((
            preceded('!', unary).map(|inner| Constraint::Not(Box::new(inner))),
            delimited('(', expression, (space0, ')')),
            tag,
        )),
    )
    .parse_next(input)
}

/// Join parsed operands left to right.
fn fold(operands: Vec<Constraint>, join: fn(Constraint, Constraint) -> Constraint) -> ModalResult<Constraint> {
    operands
        .into_iter()
        .reduce(join)
        .ok_or_else(|| ErrMode::Backtrack(ContextError::new()))
}

fn conjunction(input: &mut &str) -> ModalResult<Constraint> {
    let operands: Vec<Constraint> = separated(1.., unary, (space0, "&&")).parse_next(input)?;
    fold(operands, Constraint::and)
}

fn expression(input: &mut &str) -> ModalResult<Constraint> {
    let operands: Vec<Constraint> = separated(1.., conjunction, (space0, "||")).parse_next(input)?;
    fold(operands, Constraint::or)
}

/// Parse the expression of a `//go:build` line.
pub fn parse_expression(text: &str) -> Option<Constraint> {
    terminated(expression, space0).parse(text).ok()
}

/// Parse the arguments of one `// +build` line.
fn parse_plus_build(text: &str) -> Option<Constraint> {
    let term = |term: &str| {
        let (negated, tag) = match term.strip_prefix('!') {
            Some(tag) => (true, tag),
            None => (false, term),
        };
        if tag.is_empty() || !tag.chars().all(is_tag_char) {
            return None;
        }
        let tag = Constraint::Tag(tag.to_string());
        Some(if negated { Constraint::Not(Box::new(tag)) } else { tag })
    };

    text.split_whitespace()
        .map(|option| {
            option
                .split(',')
                .map(term)
                .collect::<Option<Vec<_>>>()?
                .into_iter()
                .reduce(Constraint::and)
        })
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .reduce(Constraint::or)
}

/// The build constraint of a file, `None` when it has none.
///
/// Only comments before the package clause are considered.
///
/// # Errors
///
/// Returns an E008 diagnostic pointing at a constraint line that does not
/// parse.
pub fn file_constraint(source: &str) -> Result<Option<Constraint>, Diagnostic> {
    let mut plus_build: Option<Constraint> = None;
    let mut in_block_comment = false;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim();

        if in_block_comment {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("/*") {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        let Some(comment) = trimmed.strip_prefix("//") else {
            break;
        };

        let malformed = || {
            let indent = line.len() - line.trim_start().len();
            Diagnostic::error("malformed build constraint")
                .with_code(ErrorCode::E008)
                .with_label(
                    Span::new(start + indent..start + indent + trimmed.len()),
                    "cannot parse this constraint",
                )
                .with_help("combine tags with `&&`, `||`, `!` and parentheses")
        };

        if let Some(expression) = comment.strip_prefix("go:build") {
            if !expression.is_empty() && !expression.starts_with([' ', '\t']) {
                continue;
            }
            return parse_expression(expression).map(Some).ok_or_else(malformed);
        }

        if let Some(arguments) = comment.trim_start().strip_prefix("+build") {
            if !arguments.is_empty() && !arguments.starts_with([' ', '\t']) {
                continue;
            }
            let line_constraint = parse_plus_build(arguments).ok_or_else(malformed)?;
            plus_build = Some(match plus_build {
                Some(previous) => Constraint::and(previous, line_constraint),
                None => line_constraint,
            });
        }
    }

    Ok(plus_build)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holds(constraint: &Constraint, tags: &[&str]) -> bool {
        constraint.eval(&|tag| tags.contains(&tag))
    }

    #[test]
    fn test_go_build_expression() {
        let constraint = parse_expression(" (linux || darwin) && !cgo").unwrap();
        assert!(holds(&constraint, &["linux"]));
        assert!(holds(&constraint, &["darwin"]));
        assert!(!holds(&constraint, &["linux", "cgo"]));
        assert!(!holds(&constraint, &["windows"]));
        assert_eq!(constraint.to_string(), "(linux || darwin) && !cgo");
    }

    #[test]
    fn test_precedence() {
        let constraint = parse_expression("a || b && c").unwrap();
        assert!(holds(&constraint, &["a"]));
        assert!(!holds(&constraint, &["b"]));
        assert!(holds(&constraint, &["b", "c"]));
    }

    #[test]
    fn test_malformed_expressions() {
        assert_eq!(parse_expression("linux &&"), None);
        assert_eq!(parse_expression("(linux"), None);
        assert_eq!(parse_expression(""), None);
        assert_eq!(parse_expression("linux darwin"), None);
    }

    #[test]
    fn test_file_constraint_go_build() {
        let source = "// Copyright notice.\n\n//go:build ignore\n\npackage main\n";
        let constraint = file_constraint(source).unwrap().unwrap();
        assert_eq!(constraint, Constraint::Tag("ignore".to_string()));
        assert!(!holds(&constraint, &["linux"]));
    }

    #[test]
    fn test_file_constraint_plus_build_lines() {
        let source = "// +build linux,amd64 darwin\n// +build !cgo\n\npackage fs\n";
        let constraint = file_constraint(source).unwrap().unwrap();
        assert!(holds(&constraint, &["linux", "amd64"]));
        assert!(holds(&constraint, &["darwin"]));
        assert!(!holds(&constraint, &["linux", "arm64"]));
        assert!(!holds(&constraint, &["darwin", "cgo"]));
    }

    #[test]
    fn test_go_build_wins_over_plus_build() {
        let source = "// +build linux\n//go:build windows\n\npackage fs\n";
        let constraint = file_constraint(source).unwrap().unwrap();
        assert!(holds(&constraint, &["windows"]));
        assert!(!holds(&constraint, &["linux"]));
    }

    #[test]
    fn test_constraints_after_package_clause_ignored() {
        assert_eq!(file_constraint("package fs\n\n//go:build ignore\n").unwrap(), None);
        assert_eq!(file_constraint("/* header\n//go:build ignore\n*/\npackage fs\n").unwrap(), None);
        assert_eq!(file_constraint("//go:buildx linux\npackage fs\n").unwrap(), None);
    }

    #[test]
    fn test_malformed_constraint_points_at_line() {
        let source = "\n//go:build linux &&\n\npackage fs\n";
        let err = file_constraint(source).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E008));
        assert_eq!(err.labels()[0].span(), Span::new(1..20));
    }
}
