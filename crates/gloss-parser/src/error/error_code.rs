//! Stable codes for every diagnostic the parser and checker emit.
//!
//! The hundreds digit names the phase: `E0xx` lexing, `E1xx` parsing,
//! `E2xx` constant checking.

use std::fmt;

macro_rules! error_codes {
    ($($(#[$doc:meta])* $code:ident => $description:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($(#[$doc])* $code,)+
        }

        impl ErrorCode {
            /// The code as printed in reports, e.g. `"E201"`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$code => stringify!($code),)+
                }
            }

            /// Short lower-case phrase, used as the default label text.
            pub fn description(&self) -> &'static str {
                match self {
                    $(Self::$code => $description,)+
                }
            }
        }
    };
}

error_codes! {
    /// A `"` string reaches the end of its line.
    E001 => "unterminated string literal",
    E002 => "unexpected character",
    /// Unknown `\` escape, or a `\x`, `\u`, `\U` or octal escape of the wrong
    /// length.
    E003 => "invalid escape sequence",
    /// A back-quoted string is never closed.
    E004 => "unterminated raw string literal",
    /// `/*` without a matching `*/`.
    E005 => "unterminated comment",
    /// A rune literal holds zero or several characters.
    E006 => "invalid rune literal",
    /// Such as `0x`, `1e` or `0b102`.
    E007 => "malformed number literal",
    /// A `//go:build` or `// +build` line that is not a tag expression.
    E008 => "malformed build constraint",

    E100 => "unexpected token",
    /// The file ends inside a declaration.
    E101 => "incomplete input",
    /// The first declaration of a file must be `package <name>`.
    E102 => "missing package clause",

    /// A constant expression names something the package does not declare.
    E200 => "undefined identifier",
    /// Two package-level declarations share a name. A warning: the first
    /// declaration is kept.
    E201 => "redeclared",
    E202 => "division by zero",
    /// An integer needs more than 512 bits, or a value does not fit its
    /// type.
    E203 => "constant overflow",
    /// The operator does not apply to the operands, or an operand is not
    /// constant.
    E204 => "invalid constant operation",
    /// A constant depends on itself.
    E205 => "initialization cycle",
    /// A spec lists more names than values and has no previous spec to
    /// repeat.
    E206 => "missing init expression",
}

impl ErrorCode {
    /// `"lexer"`, `"parser"` or `"check"`, from the hundreds digit.
    pub fn phase(&self) -> &'static str {
        match self.as_str().as_bytes()[1] {
            b'0' => "lexer",
            b'1' => "parser",
            _ => "check",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
