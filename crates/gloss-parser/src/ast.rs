//! Declaration-level Go syntax tree.
//!
//! The tree covers what documentation extraction needs: the package clause,
//! imports, type, const and var declarations, and function names. Function
//! bodies and variable initializers are skipped by the parser.

use std::fmt;

use indexmap::IndexMap;

use gloss_core::identifier::Id;

use crate::{span::Spanned, tokens::CommentGroup};

/// Index of a [`CommentGroup`] in [`SourceFile::comments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommentId(pub(crate) usize);

/// One parsed Go file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub package: Spanned<Id>,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    comments: Vec<CommentGroup>,
    scope: IndexMap<Id, Object>,
}

impl SourceFile {
    pub(crate) fn new(
        package: Spanned<Id>,
        imports: Vec<ImportSpec>,
        decls: Vec<Decl>,
        comments: Vec<CommentGroup>,
    ) -> Self {
        let scope = build_scope(&decls);
        Self {
            package,
            imports,
            decls,
            comments,
            scope,
        }
    }

    /// Look up a package-level name declared in this file.
    pub fn lookup(&self, name: &str) -> Option<&Object> {
        self.scope.get(&Id::new(name))
    }

    /// Type declaration for `name`, if the file declares `name` as a type.
    pub fn lookup_type(&self, name: &str) -> Option<&TypeSpec> {
        let object = self.lookup(name)?;
        if object.kind != ObjectKind::Type {
            return None;
        }
        match &self.decls[object.decl] {
            Decl::Type(specs) => specs.get(object.spec),
            _ => None,
        }
    }

    /// File-level objects in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = (Id, &Object)> {
        self.scope.iter().map(|(name, object)| (*name, object))
    }

    /// Const declarations in source order, one slice of specs per block.
    pub fn const_blocks(&self) -> impl Iterator<Item = &[ValueSpec]> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Const(specs) => Some(specs.as_slice()),
            _ => None,
        })
    }

    /// Text of a comment group, lines joined with `\n`.
    pub fn comment_text(&self, id: CommentId) -> String {
        self.comments
            .get(id.0)
            .map(CommentGroup::text)
            .unwrap_or_default()
    }

    pub fn comments(&self) -> &[CommentGroup] {
        &self.comments
    }
}

fn build_scope(decls: &[Decl]) -> IndexMap<Id, Object> {
    let mut scope = IndexMap::new();
    let mut declare = |name: &Spanned<Id>, kind, decl, spec| {
        if name.is_blank() {
            return;
        }
        scope
            .entry(*name.inner())
            .or_insert(Object { kind, decl, spec });
    };

    for (decl_index, decl) in decls.iter().enumerate() {
        match decl {
            Decl::Type(specs) => {
                for (spec_index, spec) in specs.iter().enumerate() {
                    declare(&spec.name, ObjectKind::Type, decl_index, spec_index);
                }
            }
            Decl::Const(specs) | Decl::Var(specs) => {
                let kind = if matches!(decl, Decl::Const(_)) {
                    ObjectKind::Const
                } else {
                    ObjectKind::Var
                };
                for (spec_index, spec) in specs.iter().enumerate() {
                    for name in &spec.names {
                        declare(name, kind, decl_index, spec_index);
                    }
                }
            }
            Decl::Func(func) => {
                if !func.is_method && *func.name.inner() != "init" {
                    declare(&func.name, ObjectKind::Func, decl_index, 0);
                }
            }
        }
    }
    scope
}

/// Kind of a package-level object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Type,
    Const,
    Var,
    Func,
}

/// A package-level object in a file scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Object {
    pub kind: ObjectKind,
    /// Index into [`SourceFile::decls`].
    pub decl: usize,
    /// Index of the spec within the declaration.
    pub spec: usize,
}

/// `import name "path"`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    /// Explicit package name (`_`, `.` or an alias), if any.
    pub name: Option<Spanned<Id>>,
    /// Import path without quotes.
    pub path: Spanned<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Type(Vec<TypeSpec>),
    Const(Vec<ValueSpec>),
    Var(Vec<ValueSpec>),
    Func(FuncDecl),
}

/// `type Name[P any] T` or `type Name = T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: Spanned<Id>,
    pub type_params: Vec<FieldGroup>,
    pub alias: bool,
    pub ty: TypeExpr,
}

impl TypeSpec {
    /// Names of the declared type parameters.
    pub fn type_param_names(&self) -> impl Iterator<Item = Id> + '_ {
        self.type_params
            .iter()
            .flat_map(|group| group.names.iter().copied())
    }
}

/// A const or var spec: `A, B T = x, y`
///
/// Var initializers are not parsed; `values` is always empty for vars.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Spanned<Id>>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Spanned<Expr>>,
    pub doc: Option<CommentId>,
    pub comment: Option<CommentId>,
}

/// A function or method declaration. Only its name is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Spanned<Id>,
    pub is_method: bool,
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `T`
    Name(Id),
    /// `pkg.T`
    Qualified { package: Id, name: Id },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`, or `[...]T` when `len` is `None`
    Array {
        len: Option<Spanned<Expr>>,
        elem: Box<TypeExpr>,
    },
    /// `...T` in a final parameter
    Ellipsis(Box<TypeExpr>),
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `chan<- T`, `<-chan T`
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    /// `func(params) results`
    Func(FuncType),
    /// `interface{ ... }`; the body is not kept
    Interface,
    /// `struct{ ... }`
    Struct(Vec<StructField>),
    /// `T[A, B]`
    Generic {
        base: Box<TypeExpr>,
        args: Vec<TypeExpr>,
    },
    /// `(T)`
    Paren(Box<TypeExpr>),
    /// `~int | string` in a constraint position
    Union(Vec<TypeTerm>),
}

/// One term of a constraint union.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTerm {
    pub tilde: bool,
    pub ty: TypeExpr,
}

/// Parameters and results of a function type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<FieldGroup>,
    pub results: Vec<FieldGroup>,
}

/// A parameter, result or type-parameter group: `a, b int` or just `int`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub names: Vec<Id>,
    pub ty: TypeExpr,
}

/// A struct member line.
///
/// `names` is empty for embedded fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub names: Vec<Spanned<Id>>,
    pub ty: TypeExpr,
    /// Raw tag literal, quotes included.
    pub tag: Option<String>,
    pub doc: Option<CommentId>,
    pub comment: Option<CommentId>,
}

impl StructField {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// Unary operators in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Complement,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Plus => "+",
            Self::Neg => "-",
            Self::Not => "!",
            Self::Complement => "^",
        };
        f.write_str(op)
    }
}

/// Binary operators in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LogicalAnd,
    LogicalOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Go operator precedence, 5 binding tightest.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Rem | Self::Shl | Self::Shr | Self::And | Self::AndNot => 5,
            Self::Add | Self::Sub | Self::Or | Self::Xor => 4,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 3,
            Self::LogicalAnd => 2,
            Self::LogicalOr => 1,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::AndNot => "&^",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(op)
    }
}

/// Basic literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imaginary,
    Rune,
    String,
}

/// A constant expression (or array length).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Id),
    /// `pkg.Name`
    Qualified { package: Id, name: Id },
    /// Literal text as written.
    Literal { kind: LitKind, text: String },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Paren(Box<Spanned<Expr>>),
    /// Builtin calls and conversions: `len(s)`, `Status(3)`, `time.Duration(5)`
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::Qualified { package, name } => write!(f, "{package}.{name}"),
            Self::Literal { text, .. } => f.write_str(text),
            Self::Unary { op, operand } => write!(f, "{op}{operand}"),
            Self::Binary { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Self::Paren(inner) => write!(f, "({inner})"),
            Self::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
