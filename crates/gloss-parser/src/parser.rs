//! Parser for Go declarations.
//!
//! This module turns the token stream from the [`lexer`](super::lexer) into a
//! [`SourceFile`]. Type and const declarations are parsed completely. Var
//! initializers, function signatures and function bodies are skipped as
//! balanced token runs. The entry point is [`build_source_file`].

use winnow::{
    Parser as _,
    combinator::{opt, separated},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use gloss_core::identifier::Id;

use crate::{
    ast::{
        BinaryOp, ChanDir, CommentId, Decl, Expr, FieldGroup, FuncDecl, FuncType, ImportSpec,
        LitKind, SourceFile, StructField, TypeExpr, TypeSpec, TypeTerm, UnaryOp, ValueSpec,
    },
    error::{Diagnostic, ErrorCode},
    span::{Span, Spanned},
    tokens::{PositionedToken, Token, TokenStream},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what was expected
    Label(&'static str),
    /// Remaining token count (`eof_offset()`) where the failing declaration started
    StartOffset(usize),
}

type Input<'src> = GoTokenSlice<'src>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;
/// Type alias for winnow TokenSlice with our positioned tokens
type GoTokenSlice<'src> = TokenSlice<'src, PositionedToken<'src>>;

/// Commit to the current declaration: any failure inside `f` becomes a cut
/// error that remembers where the declaration started.
fn cut_err<'src, O, F>(input: &mut Input<'src>, f: F) -> IResult<O>
where
    F: FnOnce(&mut Input<'src>) -> IResult<O>,
{
    let start_remaining = input.eof_offset();

    match f(input) {
        Ok(o) => Ok(o),
        Err(ErrMode::Backtrack(mut e)) | Err(ErrMode::Cut(mut e)) => {
            e.push(Context::StartOffset(start_remaining));
            Err(ErrMode::Cut(e))
        }
        Err(e) => Err(e),
    }
}

/// Backtrack error carrying an expectation label.
fn expected(label: &'static str) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::Label(label));
    ErrMode::Backtrack(e)
}

fn peek<'src>(input: &Input<'src>) -> Option<&'src Token<'src>> {
    input.peek_token().map(|token| &token.token)
}

fn at(input: &Input<'_>, expected: &Token<'_>) -> bool {
    peek(input).is_some_and(|token| token == expected)
}

/// Parse one specific token.
fn token<'src>(
    expected: Token<'static>,
    label: &'static str,
) -> impl FnMut(&mut Input<'src>) -> IResult<&'src PositionedToken<'src>> {
    move |input: &mut Input<'src>| {
        any.verify(|token: &PositionedToken<'_>| token.token == expected)
            .context(Context::Label(label))
            .parse_next(input)
    }
}

/// Consume a `;`, which may be omitted before a closing `)` or `}`.
fn statement_end<'src>(input: &mut Input<'src>) -> IResult<()> {
    match peek(input) {
        Some(Token::RightParen | Token::RightBrace) | None => Ok(()),
        _ => token(Token::Semicolon, "`;` or newline")
            .void()
            .parse_next(input),
    }
}

/// Parse an identifier with span preservation
fn identifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<Id>> {
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::Identifier(name) => Some(Spanned::new(Id::new(name), token.span)),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

/// Parse `a, b, c`
fn identifier_list<'src>(input: &mut Input<'src>) -> IResult<Vec<Spanned<Id>>> {
    separated(1.., identifier, token(Token::Comma, "`,`")).parse_next(input)
}

/// Parse a string literal, keeping its quotes
fn string_literal<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::String(text) => Some(Spanned::new(text.to_string(), token.span)),
        _ => None,
    })
    .context(Context::Label("string literal"))
    .parse_next(input)
}

/// Run `parser` and pick up the lead comment of its first token and the line
/// comment of its last token.
fn with_comments<'src, O>(
    input: &mut Input<'src>,
    parser: impl FnMut(&mut Input<'src>) -> IResult<O>,
) -> IResult<(O, Option<CommentId>, Option<CommentId>)> {
    let (value, taken) = parser.with_taken().parse_next(input)?;
    let doc = taken
        .first()
        .and_then(|token| token.lead_comment)
        .map(CommentId);
    let comment = taken
        .last()
        .and_then(|token| token.line_comment)
        .map(CommentId);
    Ok((value, doc, comment))
}

/// Parse a single spec or a parenthesized group of specs.
fn grouped<'src, O>(
    input: &mut Input<'src>,
    mut spec: impl FnMut(&mut Input<'src>) -> IResult<O>,
) -> IResult<Vec<O>> {
    if !at(input, &Token::LeftParen) {
        return Ok(vec![spec(input)?]);
    }

    input.next_token();
    let mut specs = Vec::new();
    while !at(input, &Token::RightParen) {
        specs.push(spec(input)?);
        statement_end(input)?;
    }
    token(Token::RightParen, "`)`").parse_next(input)?;
    Ok(specs)
}

/// Skip tokens up to a `;` or an unmatched closing delimiter, keeping
/// brackets balanced.
fn skip_balanced<'src>(input: &mut Input<'src>) -> IResult<()> {
    let mut depth = 0usize;
    loop {
        match peek(input) {
            None if depth == 0 => return Ok(()),
            None => return Err(expected("closing delimiter")),
            Some(Token::LeftParen | Token::LeftBracket | Token::LeftBrace) => depth += 1,
            Some(Token::RightParen | Token::RightBracket | Token::RightBrace) => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Some(Token::Semicolon) if depth == 0 => return Ok(()),
            Some(_) => {}
        }
        input.next_token();
    }
}

/// Skip an opening delimiter and everything up to its matching closer.
fn skip_delimited<'src>(input: &mut Input<'src>) -> IResult<()> {
    let mut depth = 0usize;
    loop {
        match peek(input) {
            None => return Err(expected("closing delimiter")),
            Some(Token::LeftParen | Token::LeftBracket | Token::LeftBrace) => depth += 1,
            Some(Token::RightParen | Token::RightBracket | Token::RightBrace) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    input.next_token();
                    return Ok(());
                }
            }
            Some(_) if depth == 0 => return Err(expected("opening delimiter")),
            Some(_) => {}
        }
        input.next_token();
    }
}

/// Whether `token` can start a type.
fn starts_type(token: Option<&Token<'_>>) -> bool {
    matches!(
        token,
        Some(
            Token::Identifier(_)
                | Token::Star
                | Token::LeftBracket
                | Token::LeftParen
                | Token::Func
                | Token::Map
                | Token::Chan
                | Token::Arrow
                | Token::Struct
                | Token::Interface
        )
    )
}

/// Parse a type expression.
fn type_expr<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    match peek(input) {
        Some(Token::Identifier(_)) => type_name(input),
        Some(Token::Star) => {
            input.next_token();
            Ok(TypeExpr::Pointer(Box::new(type_expr(input)?)))
        }
        Some(Token::LeftBracket) => array_or_slice_type(input),
        Some(Token::Ellipsis) => {
            input.next_token();
            Ok(TypeExpr::Ellipsis(Box::new(type_expr(input)?)))
        }
        Some(Token::Map) => map_type(input),
        Some(Token::Chan | Token::Arrow) => chan_type(input),
        Some(Token::Func) => {
            input.next_token();
            Ok(TypeExpr::Func(signature(input)?))
        }
        Some(Token::Interface) => {
            input.next_token();
            skip_delimited(input)?;
            Ok(TypeExpr::Interface)
        }
        Some(Token::Struct) => struct_type(input),
        Some(Token::LeftParen) => {
            input.next_token();
            let inner = type_expr(input)?;
            token(Token::RightParen, "`)`").parse_next(input)?;
            Ok(TypeExpr::Paren(Box::new(inner)))
        }
        _ => Err(expected("type")),
    }
}

/// Parse `T`, `pkg.T`, and their instantiations `T[A, B]`.
fn type_name<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    let first = identifier(input)?;
    let base = if at(input, &Token::Dot) {
        input.next_token();
        let name = identifier(input)?;
        TypeExpr::Qualified {
            package: *first.inner(),
            name: *name.inner(),
        }
    } else {
        TypeExpr::Name(*first.inner())
    };

    if at(input, &Token::LeftBracket) {
        let checkpoint = input.checkpoint();
        match type_args(input) {
            Ok(args) => {
                return Ok(TypeExpr::Generic {
                    base: Box::new(base),
                    args,
                });
            }
            Err(_) => input.reset(&checkpoint),
        }
    }
    Ok(base)
}

/// Parse `[A, B]`
fn type_args<'src>(input: &mut Input<'src>) -> IResult<Vec<TypeExpr>> {
    token(Token::LeftBracket, "`[`").parse_next(input)?;
    let args = separated(1.., type_expr, token(Token::Comma, "`,`")).parse_next(input)?;
    opt(token(Token::Comma, "`,`")).parse_next(input)?;
    token(Token::RightBracket, "`]`").parse_next(input)?;
    Ok(args)
}

/// Parse `[]T`, `[N]T` and `[...]T`
fn array_or_slice_type<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    token(Token::LeftBracket, "`[`").parse_next(input)?;

    if at(input, &Token::RightBracket) {
        input.next_token();
        return Ok(TypeExpr::Slice(Box::new(type_expr(input)?)));
    }

    let len = if at(input, &Token::Ellipsis) {
        input.next_token();
        None
    } else {
        Some(expression(input)?)
    };
    token(Token::RightBracket, "`]`").parse_next(input)?;
    let elem = type_expr(input)?;
    Ok(TypeExpr::Array {
        len,
        elem: Box::new(elem),
    })
}

/// Parse `map[K]V`
fn map_type<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    token(Token::Map, "map").parse_next(input)?;
    token(Token::LeftBracket, "`[`").parse_next(input)?;
    let key = type_expr(input)?;
    token(Token::RightBracket, "`]`").parse_next(input)?;
    let value = type_expr(input)?;
    Ok(TypeExpr::Map {
        key: Box::new(key),
        value: Box::new(value),
    })
}

/// Parse `chan T`, `chan<- T` and `<-chan T`
fn chan_type<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    let dir = if at(input, &Token::Arrow) {
        input.next_token();
        token(Token::Chan, "chan").parse_next(input)?;
        ChanDir::Recv
    } else {
        token(Token::Chan, "chan").parse_next(input)?;
        if at(input, &Token::Arrow) {
            input.next_token();
            ChanDir::Send
        } else {
            ChanDir::Both
        }
    };

    let elem = type_expr(input)?;
    Ok(TypeExpr::Chan {
        dir,
        elem: Box::new(elem),
    })
}

/// Parse a function signature after `func`.
fn signature<'src>(input: &mut Input<'src>) -> IResult<FuncType> {
    let params = parameters(input)?;
    let results = if at(input, &Token::LeftParen) {
        parameters(input)?
    } else if starts_type(peek(input)) {
        vec![FieldGroup {
            names: Vec::new(),
            ty: type_expr(input)?,
        }]
    } else {
        Vec::new()
    };
    Ok(FuncType { params, results })
}

/// Parse a parenthesized parameter list.
fn parameters<'src>(input: &mut Input<'src>) -> IResult<Vec<FieldGroup>> {
    token(Token::LeftParen, "`(`").parse_next(input)?;

    let mut entries = Vec::new();
    while !at(input, &Token::RightParen) {
        entries.push(parameter(input)?);
        if !at(input, &Token::RightParen) {
            token(Token::Comma, "`,`").parse_next(input)?;
        }
    }
    token(Token::RightParen, "`)`").parse_next(input)?;

    Ok(group_parameters(entries))
}

/// Parse `name T` or just `T`.
fn parameter<'src>(input: &mut Input<'src>) -> IResult<(Option<Id>, TypeExpr)> {
    if let Some(Token::Identifier(_)) = peek(input) {
        let checkpoint = input.checkpoint();
        let name = identifier(input)?;
        if starts_type(peek(input)) || at(input, &Token::Ellipsis) {
            if let Ok(ty) = type_expr(input) {
                return Ok((Some(*name.inner()), ty));
            }
        }
        input.reset(&checkpoint);
    }
    Ok((None, type_expr(input)?))
}

/// Fold `a, b int` style entries into groups.
///
/// When any entry is named, the bare identifiers before it are further
/// names of the same group.
fn group_parameters(entries: Vec<(Option<Id>, TypeExpr)>) -> Vec<FieldGroup> {
    if entries.iter().all(|(name, _)| name.is_none()) {
        return entries
            .into_iter()
            .map(|(_, ty)| FieldGroup {
                names: Vec::new(),
                ty,
            })
            .collect();
    }

    let mut groups = Vec::new();
    let mut pending = Vec::new();
    for (name, ty) in entries {
        match (name, ty) {
            (Some(name), ty) => {
                pending.push(name);
                groups.push(FieldGroup {
                    names: std::mem::take(&mut pending),
                    ty,
                });
            }
            (None, TypeExpr::Name(name)) => pending.push(name),
            (None, ty) => groups.push(FieldGroup {
                names: Vec::new(),
                ty,
            }),
        }
    }
    groups
}

/// Parse `struct { ... }`
fn struct_type<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    token(Token::Struct, "struct").parse_next(input)?;
    token(Token::LeftBrace, "`{`").parse_next(input)?;

    let mut fields = Vec::new();
    while !at(input, &Token::RightBrace) {
        fields.push(field_decl(input)?);
        statement_end(input)?;
    }
    token(Token::RightBrace, "`}`").parse_next(input)?;

    Ok(TypeExpr::Struct(fields))
}

/// Parse one struct member line with its comments.
fn field_decl<'src>(input: &mut Input<'src>) -> IResult<StructField> {
    let ((names, ty, tag), doc, comment) = with_comments(input, field_body)?;
    Ok(StructField {
        names,
        ty,
        tag,
        doc,
        comment,
    })
}

type FieldBody = (Vec<Spanned<Id>>, TypeExpr, Option<String>);

fn field_body<'src>(input: &mut Input<'src>) -> IResult<FieldBody> {
    let checkpoint = input.checkpoint();
    let (names, ty) = match (identifier_list, type_expr).parse_next(input) {
        Ok(named) => named,
        Err(_) => {
            input.reset(&checkpoint);
            (Vec::new(), embedded_type(input)?)
        }
    };

    let tag = opt(string_literal).parse_next(input)?;
    Ok((names, ty, tag.map(Spanned::into_inner)))
}

/// Parse an embedded field type: `T`, `*T`, `pkg.T`, `T[A]`
fn embedded_type<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    if at(input, &Token::Star) {
        input.next_token();
        return Ok(TypeExpr::Pointer(Box::new(type_name(input)?)));
    }
    type_name(input)
}

/// Parse type parameters `[K comparable, V any]`
fn type_params<'src>(input: &mut Input<'src>) -> IResult<Vec<FieldGroup>> {
    token(Token::LeftBracket, "`[`").parse_next(input)?;
    let groups = separated(1.., type_param_group, token(Token::Comma, "`,`")).parse_next(input)?;
    opt(token(Token::Comma, "`,`")).parse_next(input)?;
    token(Token::RightBracket, "`]`").parse_next(input)?;
    Ok(groups)
}

fn type_param_group<'src>(input: &mut Input<'src>) -> IResult<FieldGroup> {
    let names = identifier_list(input)?;
    let ty = constraint(input)?;
    Ok(FieldGroup {
        names: names.into_iter().map(Spanned::into_inner).collect(),
        ty,
    })
}

/// Parse a constraint: a type or a union of `~`-terms
fn constraint<'src>(input: &mut Input<'src>) -> IResult<TypeExpr> {
    let mut terms: Vec<TypeTerm> =
        separated(1.., type_term, token(Token::Pipe, "`|`")).parse_next(input)?;
    if terms.len() == 1 && !terms[0].tilde {
        return Ok(terms.remove(0).ty);
    }
    Ok(TypeExpr::Union(terms))
}

fn type_term<'src>(input: &mut Input<'src>) -> IResult<TypeTerm> {
    let tilde = opt(token(Token::Tilde, "`~`")).parse_next(input)?.is_some();
    let ty = type_expr(input)?;
    Ok(TypeTerm { tilde, ty })
}

fn binary_op(token: &Token<'_>) -> Option<BinaryOp> {
    let op = match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        Token::Amp => BinaryOp::And,
        Token::Pipe => BinaryOp::Or,
        Token::Caret => BinaryOp::Xor,
        Token::Shl => BinaryOp::Shl,
        Token::Shr => BinaryOp::Shr,
        Token::AndNot => BinaryOp::AndNot,
        Token::AndAnd => BinaryOp::LogicalAnd,
        Token::OrOr => BinaryOp::LogicalOr,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        _ => return None,
    };
    Some(op)
}

/// Parse a constant expression.
fn expression<'src>(input: &mut Input<'src>) -> IResult<Spanned<Expr>> {
    binary_expr(input, 1)
}

/// Precedence climbing over binary operators.
fn binary_expr<'src>(input: &mut Input<'src>, min_precedence: u8) -> IResult<Spanned<Expr>> {
    let mut lhs = unary_expr(input)?;

    while let Some(op) = peek(input).and_then(binary_op) {
        if op.precedence() < min_precedence {
            break;
        }
        input.next_token();
        let rhs = binary_expr(input, op.precedence() + 1)?;
        let span = lhs.span().union(rhs.span());
        lhs = Spanned::new(
            Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        );
    }
    Ok(lhs)
}

fn unary_expr<'src>(input: &mut Input<'src>) -> IResult<Spanned<Expr>> {
    let op = match peek(input) {
        Some(Token::Plus) => UnaryOp::Plus,
        Some(Token::Minus) => UnaryOp::Neg,
        Some(Token::Not) => UnaryOp::Not,
        Some(Token::Caret) => UnaryOp::Complement,
        _ => return primary_expr(input),
    };

    let op_span = input.next_token().map(|token| token.span).unwrap_or_default();
    let operand = unary_expr(input)?;
    let span = op_span.union(operand.span());
    Ok(Spanned::new(
        Expr::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    ))
}

/// Parse an operand followed by selectors and call arguments.
fn primary_expr<'src>(input: &mut Input<'src>) -> IResult<Spanned<Expr>> {
    let mut expr = operand(input)?;

    loop {
        match peek(input) {
            Some(Token::Dot) => {
                input.next_token();
                let name = identifier(input)?;
                let Expr::Ident(package) = expr.inner() else {
                    return Err(expected("package-qualified identifier"));
                };
                let span = expr.span().union(name.span());
                expr = Spanned::new(
                    Expr::Qualified {
                        package: *package,
                        name: *name.inner(),
                    },
                    span,
                );
            }
            Some(Token::LeftParen) => {
                input.next_token();
                let mut args = Vec::new();
                while !at(input, &Token::RightParen) {
                    args.push(expression(input)?);
                    if !at(input, &Token::RightParen) {
                        token(Token::Comma, "`,`").parse_next(input)?;
                    }
                }
                let close = token(Token::RightParen, "`)`").parse_next(input)?;
                let span = expr.span().union(close.span);
                expr = Spanned::new(
                    Expr::Call {
                        func: Box::new(expr),
                        args,
                    },
                    span,
                );
            }
            _ => return Ok(expr),
        }
    }
}

fn operand<'src>(input: &mut Input<'src>) -> IResult<Spanned<Expr>> {
    match peek(input) {
        Some(Token::Identifier(_)) => Ok(identifier(input)?.map(Expr::Ident)),
        Some(Token::LeftParen) => {
            let open = token(Token::LeftParen, "`(`").parse_next(input)?;
            let inner = expression(input)?;
            let close = token(Token::RightParen, "`)`").parse_next(input)?;
            Ok(Spanned::new(
                Expr::Paren(Box::new(inner)),
                open.span.union(close.span),
            ))
        }
        _ => literal(input),
    }
}

fn literal<'src>(input: &mut Input<'src>) -> IResult<Spanned<Expr>> {
    any.verify_map(|token: &PositionedToken<'_>| {
        let kind = match token.token {
            Token::Int(_) => LitKind::Int,
            Token::Float(_) => LitKind::Float,
            Token::Imaginary(_) => LitKind::Imaginary,
            Token::Rune(_) => LitKind::Rune,
            Token::String(_) => LitKind::String,
            _ => return None,
        };
        let text = token.token.to_string();
        Some(Spanned::new(Expr::Literal { kind, text }, token.span))
    })
    .context(Context::Label("expression"))
    .parse_next(input)
}

/// Parse `package name`
fn package_clause<'src>(input: &mut Input<'src>) -> IResult<Spanned<Id>> {
    token(Token::Package, "package").parse_next(input)?;
    cut_err(input, |input| {
        let name = identifier(input)?;
        statement_end(input)?;
        Ok(name)
    })
}

fn import_spec<'src>(input: &mut Input<'src>) -> IResult<ImportSpec> {
    let name = match peek(input) {
        Some(Token::Identifier(_)) => Some(identifier(input)?),
        Some(Token::Dot) => {
            let dot = token(Token::Dot, "`.`").parse_next(input)?;
            Some(Spanned::new(Id::new("."), dot.span))
        }
        _ => None,
    };
    let path = string_literal(input)?.map(|text| text.trim_matches(['"', '`']).to_string());
    Ok(ImportSpec { name, path })
}

/// Parse `import "path"` or `import ( ... )`
fn import_decl<'src>(input: &mut Input<'src>) -> IResult<Vec<ImportSpec>> {
    token(Token::Import, "import").parse_next(input)?;
    cut_err(input, |input| {
        let specs = grouped(input, import_spec)?;
        statement_end(input)?;
        Ok(specs)
    })
}

/// Parse `Name[P any] = T` or `Name T`
fn type_spec<'src>(input: &mut Input<'src>) -> IResult<TypeSpec> {
    let name = identifier(input)?;

    let mut type_params_list = Vec::new();
    if at(input, &Token::LeftBracket) {
        // `type A [N]int` also starts with `[`; fall back to an array type
        let checkpoint = input.checkpoint();
        match type_params(input) {
            Ok(params) if starts_type(peek(input)) || at(input, &Token::Assign) => {
                type_params_list = params;
            }
            _ => input.reset(&checkpoint),
        }
    }

    let alias = opt(token(Token::Assign, "`=`")).parse_next(input)?.is_some();
    let ty = type_expr(input)?;

    Ok(TypeSpec {
        name,
        type_params: type_params_list,
        alias,
        ty,
    })
}

fn type_decl<'src>(input: &mut Input<'src>) -> IResult<Decl> {
    token(Token::Type, "type").parse_next(input)?;
    cut_err(input, |input| {
        let specs = grouped(input, type_spec)?;
        statement_end(input)?;
        Ok(Decl::Type(specs))
    })
}

/// Parse `A, B T = x, y`
fn const_spec<'src>(input: &mut Input<'src>) -> IResult<ValueSpec> {
    let names = identifier_list(input)?;
    let ty = if starts_type(peek(input)) {
        Some(type_expr(input)?)
    } else {
        None
    };

    let values = if at(input, &Token::Assign) {
        input.next_token();
        separated(1.., expression, token(Token::Comma, "`,`")).parse_next(input)?
    } else {
        Vec::new()
    };

    Ok(ValueSpec {
        names,
        ty,
        values,
        doc: None,
        comment: None,
    })
}

/// Parse `a, b T = ...`, skipping the initializer.
fn var_spec<'src>(input: &mut Input<'src>) -> IResult<ValueSpec> {
    let names = identifier_list(input)?;
    let ty = if at(input, &Token::Assign) {
        None
    } else {
        Some(type_expr(input)?)
    };
    if at(input, &Token::Assign) {
        input.next_token();
        skip_balanced(input)?;
    }

    Ok(ValueSpec {
        names,
        ty,
        values: Vec::new(),
        doc: None,
        comment: None,
    })
}

/// Parse a const or var declaration. An ungrouped spec takes its doc comment
/// from the keyword.
fn value_decl<'src>(
    input: &mut Input<'src>,
    keyword: Token<'static>,
    label: &'static str,
    spec: fn(&mut Input<'src>) -> IResult<ValueSpec>,
) -> IResult<Vec<ValueSpec>> {
    let keyword = token(keyword, label).parse_next(input)?;
    let decl_doc = keyword.lead_comment.map(CommentId);

    cut_err(input, |input| {
        let is_group = at(input, &Token::LeftParen);
        let mut specs = grouped(input, |input| {
            let (mut value_spec, doc, comment) = with_comments(input, spec)?;
            value_spec.doc = doc;
            value_spec.comment = comment;
            Ok(value_spec)
        })?;
        if !is_group {
            for value_spec in &mut specs {
                value_spec.doc = value_spec.doc.or(decl_doc);
            }
        }
        statement_end(input)?;
        Ok(specs)
    })
}

/// Parse a function or method declaration, keeping only its name.
fn func_decl<'src>(input: &mut Input<'src>) -> IResult<Decl> {
    token(Token::Func, "func").parse_next(input)?;
    cut_err(input, |input| {
        let is_method = at(input, &Token::LeftParen);
        if is_method {
            skip_delimited(input)?;
        }
        let name = identifier(input)?;
        skip_balanced(input)?;
        statement_end(input)?;
        Ok(Decl::Func(FuncDecl { name, is_method }))
    })
}

fn top_level_decl<'src>(input: &mut Input<'src>) -> IResult<Decl> {
    match peek(input) {
        Some(Token::Type) => type_decl(input),
        Some(Token::Const) => value_decl(input, Token::Const, "const", const_spec).map(Decl::Const),
        Some(Token::Var) => value_decl(input, Token::Var, "var", var_spec).map(Decl::Var),
        Some(Token::Func) => func_decl(input),
        _ => cut_err(input, |_| Err(expected("declaration"))),
    }
}

type FileParts = (Spanned<Id>, Vec<ImportSpec>, Vec<Decl>);

fn source_file<'src>(input: &mut Input<'src>) -> IResult<FileParts> {
    let package = package_clause(input)?;

    let mut imports = Vec::new();
    while at(input, &Token::Import) {
        imports.extend(import_decl(input)?);
    }

    let mut decls = Vec::new();
    while let Some(next) = peek(input) {
        if *next == Token::Semicolon {
            input.next_token();
            continue;
        }
        decls.push(top_level_decl(input)?);
    }

    Ok((package, imports, decls))
}

fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    current_remaining: usize,
) -> Diagnostic {
    let context_error = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let start_remaining = context_error.context().find_map(|ctx| match ctx {
        Context::StartOffset(n) => Some(*n),
        Context::Label(_) => None,
    });
    let label = context_error.context().find_map(|ctx| match ctx {
        Context::Label(label) => Some(*label),
        Context::StartOffset(_) => None,
    });

    let end_offset = tokens.len() - current_remaining;
    let start_offset = start_remaining.map(|r| tokens.len() - r);

    let Some(found) = tokens.get(end_offset) else {
        let span = tokens.last().map(|token| token.span).unwrap_or_default();
        let eof = Span::at(span.end());
        let message = match label {
            Some(label) => format!("unexpected end of file, expected {label}"),
            None => "unexpected end of file".to_string(),
        };
        return Diagnostic::error(message)
            .with_code(ErrorCode::E101)
            .with_label(eof, "file ends here")
            .with_help("the declaration is incomplete");
    };

    let found_text = match &found.token {
        Token::Semicolon => "end of statement".to_string(),
        token => format!("`{token}`"),
    };
    let message = match label {
        Some(label) => format!("expected {label}, found {found_text}"),
        None => format!("unexpected {found_text}"),
    };

    let mut diagnostic = Diagnostic::error(message)
        .with_code(ErrorCode::E100)
        .with_label(found.span, "unexpected token");

    if let Some(start) = start_offset.and_then(|offset| tokens.get(offset)) {
        if start.span.start() < found.span.start() {
            diagnostic = diagnostic.with_secondary_label(start.span, "in this declaration");
        }
    }
    diagnostic
}

/// Build the syntax tree of one file from its token stream.
pub(crate) fn build_source_file(stream: TokenStream<'_>) -> Result<SourceFile, Diagnostic> {
    let TokenStream { tokens, comments } = stream;

    let parts = {
        let mut slice = TokenSlice::new(&tokens);

        if !matches!(peek(&slice), Some(Token::Package)) {
            let span = tokens.first().map(|token| token.span).unwrap_or_default();
            return Err(Diagnostic::error("expected `package` clause")
                .with_code(ErrorCode::E102)
                .with_label(span, "files must start with `package <name>`")
                .with_help("add a package clause, e.g. `package models`"));
        }

        match source_file.parse_next(&mut slice) {
            Ok(parts) => parts,
            Err(e) => {
                let current_remaining = slice.eof_offset();
                return Err(convert_error(e, &tokens, current_remaining));
            }
        }
    };

    let (package, imports, decls) = parts;
    Ok(SourceFile::new(package, imports, decls, comments))
}
