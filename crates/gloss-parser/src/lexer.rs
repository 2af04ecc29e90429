//! Lexical analyzer for Go source text.
//!
//! Lexing happens in two steps. [`positioned_lexeme`] recognizes raw lexemes
//! (tokens, comments, newlines, whitespace) with winnow combinators. The
//! [`Assembler`] then applies Go's automatic semicolon insertion, groups
//! adjacent comments and attaches each group to a token as its lead or line
//! comment.
//!
//! The public entry point is [`tokenize`], which recovers from errors and
//! reports every diagnostic found in one pass.

use winnow::{
    Parser as _,
    combinator::{alt, cut_err, preceded, repeat, terminated},
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{none_of, one_of, take_till, take_until, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{CommentGroup, PositionedToken, Token, TokenStream},
};

/// Diagnostic details attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    code: ErrorCode,
    message: &'static str,
    help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<'a, O> = ModalResult<O, ContextError<LexerDiagnostic>>;

/// Output of the first lexing step.
#[derive(Debug, Clone, PartialEq)]
enum Lexeme<'a> {
    Token(Token<'a>),
    /// Text after `//`.
    LineComment(&'a str),
    /// Text between `/*` and `*/`.
    BlockComment(&'a str),
    Newline,
    Whitespace,
}

/// Parse a line comment starting with `//`.
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    preceded("//", take_till(0.., '\n'))
        .map(Lexeme::LineComment)
        .parse_next(input)
}

/// Parse a general comment `/* ... */`, which may span lines.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let start = input.current_token_start();
    "/*".parse_next(input)?;

    cut_err(terminated(take_until(0.., "*/"), "*/"))
        .context(LexerDiagnostic {
            code: ErrorCode::E005,
            message: "comment not terminated",
            help: Some("add closing `*/`"),
            start,
        })
        .map(Lexeme::BlockComment)
        .parse_next(input)
}

/// Parse an escape sequence after a backslash in a string or rune literal.
///
/// Accepts the single-character escapes, `\xhh`, `\uhhhh`, `\Uhhhhhhhh` and
/// three-digit octal escapes.
fn escape<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    let start = input.current_token_start();
    '\\'.parse_next(input)?;

    let hex = |c: char| c.is_ascii_hexdigit();
    cut_err(alt((
        one_of(['a', 'b', 'f', 'n', 'r', 't', 'v', '\\', '\'', '"']).void(),
        preceded('x', take_while(2, hex)).void(),
        preceded('u', take_while(4, hex)).void(),
        preceded('U', take_while(8, hex)).void(),
        take_while(3, |c: char| ('0'..='7').contains(&c)).void(),
    )))
    .context(LexerDiagnostic {
        code: ErrorCode::E003,
        message: "unknown escape sequence",
        help: Some("valid escapes: `\\n`, `\\t`, `\\\\`, `\\\"`, `\\'`, `\\xhh`, `\\uhhhh`, `\\Uhhhhhhhh`, `\\ooo`"),
        start,
    })
    .parse_next(input)
}

fn interpreted_body<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    repeat(0.., alt((escape, none_of(['"', '\\', '\n']).void()))).parse_next(input)
}

/// Parse an interpreted string literal, keeping its quotes.
fn interpreted_string<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let start = input.current_token_start();

    (
        '"',
        cut_err((interpreted_body, '"')).context(LexerDiagnostic {
            code: ErrorCode::E001,
            message: "string literal not terminated",
            help: Some("add closing `\"` before the end of the line"),
            start,
        }),
    )
        .take()
        .map(|text| Lexeme::Token(Token::String(text)))
        .parse_next(input)
}

/// Parse a raw string literal, keeping its back quotes.
fn raw_string<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let start = input.current_token_start();

    (
        '`',
        cut_err((take_till(0.., '`'), '`')).context(LexerDiagnostic {
            code: ErrorCode::E004,
            message: "raw string literal not terminated",
            help: Some("add closing '`'"),
            start,
        }),
    )
        .take()
        .map(|text| Lexeme::Token(Token::String(text)))
        .parse_next(input)
}

/// Parse a rune literal holding exactly one character or escape.
fn rune_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let start = input.current_token_start();

    (
        '\'',
        cut_err((alt((escape, none_of(['\'', '\\', '\n']).void())), '\'')).context(
            LexerDiagnostic {
                code: ErrorCode::E006,
                message: "invalid rune literal",
                help: Some("a rune literal holds exactly one character, e.g. 'a' or '\\n'"),
                start,
            },
        ),
    )
        .take()
        .map(|text| Lexeme::Token(Token::Rune(text)))
        .parse_next(input)
}

/// Parse identifiers and keywords.
fn identifier<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .map(|word: &str| Lexeme::Token(Token::keyword(word).unwrap_or(Token::Identifier(word))))
        .parse_next(input)
}

fn number_start<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    alt((
        one_of(|c: char| c.is_ascii_digit()).void(),
        ('.', one_of(|c: char| c.is_ascii_digit())).void(),
    ))
    .parse_next(input)
}

fn number_tail<'a>(input: &mut Input<'a>) -> IResult<'a, ()> {
    repeat(
        0..,
        alt((
            // Exponent sign, only directly after the exponent marker
            (one_of(['e', 'E', 'p', 'P']), one_of(['+', '-'])).void(),
            one_of(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.').void(),
        )),
    )
    .parse_next(input)
}

/// Parse an integer, floating-point or imaginary literal.
///
/// The literal is scanned greedily and then validated, so `0x`, `1e+` and
/// `1.2.3` are reported as malformed instead of splitting into odd tokens.
fn number_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let start = input.current_token_start();
    let text = (number_start, number_tail).take().parse_next(input)?;

    match classify_number(text) {
        Some(token) => Ok(Lexeme::Token(token)),
        None => Err(ErrMode::Cut(ContextError::new().add_context(
            input,
            &input.checkpoint(),
            LexerDiagnostic {
                code: ErrorCode::E007,
                message: "malformed number literal",
                help: None,
                start,
            },
        ))),
    }
}

/// Validate a scanned number and decide its token kind.
fn classify_number(text: &str) -> Option<Token<'_>> {
    let (body, imaginary) = text
        .strip_suffix('i')
        .map_or((text, false), |body| (body, true));
    let lower = body.to_ascii_lowercase();

    let is_float = if let Some(digits) = lower.strip_prefix("0x") {
        let (mantissa, exponent) = split_exponent(digits, 'p');
        if !valid_number_parts(mantissa, exponent, |c| c.is_ascii_hexdigit()) {
            return None;
        }
        mantissa.contains('.') || exponent.is_some()
    } else if let Some(digits) = lower.strip_prefix("0b") {
        if !valid_number_parts(digits, None, |c| c == '0' || c == '1') || digits.contains('.') {
            return None;
        }
        false
    } else if let Some(digits) = lower.strip_prefix("0o") {
        if !valid_number_parts(digits, None, |c| ('0'..='7').contains(&c)) || digits.contains('.')
        {
            return None;
        }
        false
    } else {
        let (mantissa, exponent) = split_exponent(&lower, 'e');
        if !valid_number_parts(mantissa, exponent, |c| c.is_ascii_digit()) {
            return None;
        }
        mantissa.contains('.') || exponent.is_some()
    };

    Some(match (imaginary, is_float) {
        (true, _) => Token::Imaginary(text),
        (false, true) => Token::Float(text),
        (false, false) => Token::Int(text),
    })
}

fn split_exponent(digits: &str, marker: char) -> (&str, Option<&str>) {
    match digits.split_once(marker) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (digits, None),
    }
}

fn valid_number_parts(mantissa: &str, exponent: Option<&str>, is_digit: impl Fn(char) -> bool) -> bool {
    mantissa.matches('.').count() <= 1
        && mantissa.chars().any(&is_digit)
        && mantissa.chars().all(|c| is_digit(c) || c == '_' || c == '.')
        && exponent.is_none_or(|exponent| {
            let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            !exponent.is_empty() && exponent.chars().all(|c| c.is_ascii_digit() || c == '_')
        })
}

/// Parse operators and punctuation (longest match first).
fn operator<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    let op: &str = alt((
        alt((
            "...", "<<=", ">>=", "&^=", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=",
        )),
        alt((
            ":=", "<<", ">>", "&^", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
        )),
        one_of([
            '+', '-', '*', '/', '%', '&', '|', '^', '<', '>', '=', '!', '~', '(', ')', '[', ']',
            '{', '}', ',', '.', ':', ';',
        ])
        .take(),
    ))
    .parse_next(input)?;

    let token = match op {
        "+" => Token::Plus,
        "-" => Token::Minus,
        "*" => Token::Star,
        "/" => Token::Slash,
        "%" => Token::Percent,
        "&" => Token::Amp,
        "|" => Token::Pipe,
        "^" => Token::Caret,
        "<<" => Token::Shl,
        ">>" => Token::Shr,
        "&^" => Token::AndNot,
        "&&" => Token::AndAnd,
        "||" => Token::OrOr,
        "<-" => Token::Arrow,
        "==" => Token::EqEq,
        "!=" => Token::NotEq,
        "<" => Token::Lt,
        "<=" => Token::Le,
        ">" => Token::Gt,
        ">=" => Token::Ge,
        "!" => Token::Not,
        "~" => Token::Tilde,
        "=" => Token::Assign,
        "..." => Token::Ellipsis,
        "(" => Token::LeftParen,
        ")" => Token::RightParen,
        "[" => Token::LeftBracket,
        "]" => Token::RightBracket,
        "{" => Token::LeftBrace,
        "}" => Token::RightBrace,
        "," => Token::Comma,
        "." => Token::Dot,
        ":" => Token::Colon,
        ";" => Token::Semicolon,
        other => Token::Other(other),
    };
    Ok(Lexeme::Token(token))
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    '\n'.value(Lexeme::Newline).parse_next(input)
}

/// Parse whitespace other than newlines.
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<'a, Lexeme<'a>> {
    take_while(1.., [' ', '\t', '\r', '\u{feff}'])
        .value(Lexeme::Whitespace)
        .parse_next(input)
}

/// Parse a single lexeme with position tracking.
fn positioned_lexeme<'a>(input: &mut Input<'a>) -> IResult<'a, (Lexeme<'a>, Span)> {
    let start_pos = input.current_token_start();

    let lexeme = alt((
        line_comment,       // Must come before operators ('/')
        block_comment,      // Must come before operators ('/')
        interpreted_string, //
        raw_string,         //
        rune_literal,       //
        number_literal,     // Must come before operators ('.')
        identifier,         // Also yields keywords
        operator,           //
        newline,            // Must come before whitespace
        whitespace,         //
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok((lexeme, Span::new(start_pos..end_pos)))
}

/// A comment group still open for extension.
#[derive(Debug)]
struct OpenGroup {
    span: Span,
    lines: Vec<String>,
    start_line: usize,
    end_line: usize,
}

/// Turns raw lexemes into the final [`TokenStream`].
///
/// Tracks line numbers to insert semicolons and to decide whether a comment
/// group documents the following token (lead comment) or trails the
/// preceding one (line comment).
#[derive(Debug, Default)]
struct Assembler<'a> {
    tokens: Vec<PositionedToken<'a>>,
    comments: Vec<CommentGroup>,
    line: usize,
    /// Index of the last non-semicolon token.
    last: Option<usize>,
    /// Line on which the last non-semicolon token ended.
    last_line: Option<usize>,
    needs_semicolon: bool,
    group: Option<OpenGroup>,
    /// Most recent closed lead-candidate group and its end line.
    lead: Option<(usize, usize)>,
}

impl<'a> Assembler<'a> {
    fn push(&mut self, lexeme: Lexeme<'a>, span: Span) {
        match lexeme {
            Lexeme::Whitespace => {}
            Lexeme::Newline => {
                self.insert_semicolon(span);
                self.line += 1;
            }
            Lexeme::LineComment(text) => self.comment(span, vec![clean_comment_line(text)], 0),
            Lexeme::BlockComment(text) => {
                let newlines = text.matches('\n').count();
                if newlines > 0 {
                    // A general comment spanning lines acts like a newline
                    self.insert_semicolon(Span::at(span.start()));
                }
                let mut lines: Vec<String> = text.lines().map(clean_comment_line).collect();
                while lines.last().is_some_and(String::is_empty) {
                    lines.pop();
                }
                let leading_blank = lines.iter().take_while(|line| line.is_empty()).count();
                lines.drain(..leading_blank);
                self.comment(span, lines, newlines);
                self.line += newlines;
            }
            Lexeme::Token(token) => self.token(token, span),
        }
    }

    fn comment(&mut self, span: Span, lines: Vec<String>, newlines: usize) {
        let start_line = self.line;
        let end_line = self.line + newlines;
        let last_line = self.last_line;

        if let Some(group) = self.group.as_mut() {
            // A trailing group only collects comments on its own line
            let reach = if last_line == Some(group.start_line) { 0 } else { 1 };
            if start_line <= group.end_line + reach {
                group.span = group.span.union(span);
                group.lines.extend(lines);
                group.end_line = end_line;
                return;
            }
        }

        self.close_group();
        self.group = Some(OpenGroup {
            span,
            lines,
            start_line,
            end_line,
        });
    }

    fn close_group(&mut self) {
        let Some(group) = self.group.take() else {
            return;
        };

        let index = self.comments.len();
        self.comments.push(CommentGroup {
            span: group.span,
            lines: group.lines,
        });

        match self.last {
            Some(last)
                if self.last_line == Some(group.start_line)
                    && self.tokens[last].line_comment.is_none() =>
            {
                self.tokens[last].line_comment = Some(index);
            }
            _ => self.lead = Some((index, group.end_line)),
        }
    }

    fn token(&mut self, token: Token<'a>, span: Span) {
        self.close_group();

        if token == Token::Semicolon {
            self.tokens.push(PositionedToken::new(token, span));
            self.needs_semicolon = false;
            return;
        }

        let mut positioned = PositionedToken::new(token, span);
        if let Some((group, end_line)) = self.lead.take() {
            if end_line + 1 >= self.line {
                positioned.lead_comment = Some(group);
            }
        }

        if let Token::String(text) = positioned.token {
            self.line += text.matches('\n').count();
        }
        self.needs_semicolon = positioned.token.terminates_line();
        self.last_line = Some(self.line);
        self.last = Some(self.tokens.len());
        self.tokens.push(positioned);
    }

    fn insert_semicolon(&mut self, span: Span) {
        if self.needs_semicolon {
            self.tokens.push(PositionedToken::new(Token::Semicolon, span));
            self.needs_semicolon = false;
        }
    }

    fn finish(mut self, end: usize) -> TokenStream<'a> {
        self.close_group();
        self.insert_semicolon(Span::new(end..end));
        TokenStream {
            tokens: self.tokens,
            comments: self.comments,
        }
    }
}

fn clean_comment_line(line: &str) -> String {
    line.replace('\t', "").trim().to_string()
}

/// Lexer that accumulates lexemes and diagnostics during tokenization.
struct Lexer<'a> {
    assembler: Assembler<'a>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            assembler: Assembler::default(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, collecting lexemes and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_lexeme(&mut input) {
                Ok((lexeme, span)) => self.assembler.push(lexeme, span),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    let diagnostic = Self::convert_err_mode(e, error_pos);

                    // Unterminated literals swallow the rest of their extent so
                    // their contents do not cascade into more errors.
                    match diagnostic.code() {
                        Some(ErrorCode::E004 | ErrorCode::E005) => {
                            input.finish();
                        }
                        Some(ErrorCode::E001 | ErrorCode::E006) => {
                            let _: IResult<'a, &str> = take_till(0.., '\n').parse_next(&mut input);
                        }
                        _ => {
                            if !input.is_empty() {
                                input.next_token();
                            }
                        }
                    }
                    self.diagnostics.emit(diagnostic);
                }
            }
        }
    }

    /// Finish lexing and return the token stream or collected errors.
    fn finish(self, end: usize) -> Result<TokenStream<'a>, ParseError> {
        self.diagnostics
            .finish()
            .map(|()| self.assembler.finish(end))
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) when no context is attached.
    fn convert_err_mode(err: ErrMode<ContextError<LexerDiagnostic>>, error_pos: usize) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos.max(*start + 1));

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
    }
}

/// Tokenize Go source, collecting every lexical error.
///
/// # Returns
///
/// - `Ok(stream)` - significant tokens (with inserted semicolons) and comment groups
/// - `Err(ParseError)` - one or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str) -> Result<TokenStream<'_>, ParseError> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish(input.len())
}
