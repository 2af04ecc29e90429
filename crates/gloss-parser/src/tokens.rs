//! Go tokens and their positions.

use std::fmt;

use crate::span::Span;

/// Go tokens as seen by the declaration parser.
///
/// Comments are not tokens; the lexer groups them separately and attaches
/// them to the neighbouring tokens (see [`PositionedToken::lead_comment`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Literals, kept as written
    Identifier(&'src str),
    Int(&'src str),
    Float(&'src str),
    Imaginary(&'src str),
    Rune(&'src str),
    /// Interpreted (`"..."`) or raw (`` `...` ``) string, including quotes.
    String(&'src str),

    // Operators used by declarations and constant expressions
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Amp,        // &
    Pipe,       // |
    Caret,      // ^
    Shl,        // <<
    Shr,        // >>
    AndNot,     // &^
    AndAnd,     // &&
    OrOr,       // ||
    Arrow,      // <-
    EqEq,       // ==
    NotEq,      // !=
    Lt,         // <
    Le,         // <=
    Gt,         // >
    Ge,         // >=
    Not,        // !
    Tilde,      // ~
    Assign,     // =
    Ellipsis,   // ...

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }
    Comma,        // ,
    Dot,          // .
    Colon,        // :
    /// Explicit `;` or one inserted at a line end.
    Semicolon,

    /// Operators that only occur inside function bodies and initializers
    /// (`:=`, `+=`, `++`, ...).
    Other(&'src str),
}

impl Token<'_> {
    /// Keyword for an identifier-like word, if it is one.
    pub(crate) fn keyword(word: &str) -> Option<Token<'static>> {
        let token = match word {
            "break" => Token::Break,
            "case" => Token::Case,
            "chan" => Token::Chan,
            "const" => Token::Const,
            "continue" => Token::Continue,
            "default" => Token::Default,
            "defer" => Token::Defer,
            "else" => Token::Else,
            "fallthrough" => Token::Fallthrough,
            "for" => Token::For,
            "func" => Token::Func,
            "go" => Token::Go,
            "goto" => Token::Goto,
            "if" => Token::If,
            "import" => Token::Import,
            "interface" => Token::Interface,
            "map" => Token::Map,
            "package" => Token::Package,
            "range" => Token::Range,
            "return" => Token::Return,
            "select" => Token::Select,
            "struct" => Token::Struct,
            "switch" => Token::Switch,
            "type" => Token::Type,
            "var" => Token::Var,
            _ => return None,
        };
        Some(token)
    }

    /// Whether a newline after this token ends the statement.
    pub(crate) fn terminates_line(&self) -> bool {
        matches!(
            self,
            Token::Identifier(_)
                | Token::Int(_)
                | Token::Float(_)
                | Token::Imaginary(_)
                | Token::Rune(_)
                | Token::String(_)
                | Token::Break
                | Token::Continue
                | Token::Fallthrough
                | Token::Return
                | Token::RightParen
                | Token::RightBracket
                | Token::RightBrace
        ) || matches!(self, Token::Other(op) if *op == "++" || *op == "--")
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Break => "break",
            Token::Case => "case",
            Token::Chan => "chan",
            Token::Const => "const",
            Token::Continue => "continue",
            Token::Default => "default",
            Token::Defer => "defer",
            Token::Else => "else",
            Token::Fallthrough => "fallthrough",
            Token::For => "for",
            Token::Func => "func",
            Token::Go => "go",
            Token::Goto => "goto",
            Token::If => "if",
            Token::Import => "import",
            Token::Interface => "interface",
            Token::Map => "map",
            Token::Package => "package",
            Token::Range => "range",
            Token::Return => "return",
            Token::Select => "select",
            Token::Struct => "struct",
            Token::Switch => "switch",
            Token::Type => "type",
            Token::Var => "var",
            Token::Identifier(text)
            | Token::Int(text)
            | Token::Float(text)
            | Token::Imaginary(text)
            | Token::Rune(text)
            | Token::String(text)
            | Token::Other(text) => text,
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::AndNot => "&^",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Arrow => "<-",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Not => "!",
            Token::Tilde => "~",
            Token::Assign => "=",
            Token::Ellipsis => "...",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Colon => ":",
            Token::Semicolon => ";",
        };
        write!(f, "{text}")
    }
}

/// A token with its span and the comment groups attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
    /// Comment group ending on the line right above this token.
    pub lead_comment: Option<usize>,
    /// Comment group starting on the same line, right after this token.
    pub line_comment: Option<usize>,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self {
            token,
            span,
            lead_comment: None,
            line_comment: None,
        }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// A run of adjacent comments with no blank line or token between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub span: Span,
    /// Comment text with markers stripped, one entry per source line.
    pub lines: Vec<String>,
}

impl CommentGroup {
    /// The group's text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Output of the lexer: significant tokens plus their comment groups.
#[derive(Debug, Clone, Default)]
pub struct TokenStream<'src> {
    pub tokens: Vec<PositionedToken<'src>>,
    pub comments: Vec<CommentGroup>,
}
