//! Package-level constant checking.
//!
//! [`check_package`] takes every file of one Go package and computes the
//! type and value of each package-level constant, following Go's rules for
//! implicit repetition, `iota`, untyped constants and representability.
//!
//! A constant that fails to evaluate does not stop the check. Its failure is
//! recorded under the type it was declared with, and
//! [`PackageInfo::group_error`] reports it once that group is documented.
//! Redeclared names keep their first declaration and become warnings.
//!
//! Values that depend on other packages (`5 * time.Second`) cannot be
//! computed from the package alone and are kept as their expression text.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use gloss_core::identifier::Id;

use crate::{
    ast::{BinaryOp, Decl, Expr, LitKind, SourceFile, TypeExpr, TypeSpec, UnaryOp},
    builtin_types,
    constant::{self, ConstError, ConstKind, ConstValue},
    error::{CheckError, Diagnostic, ErrorCode},
    span::{Span, Spanned},
};

/// Type of a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstType {
    /// `untyped int`, `untyped string`, ...
    Untyped(ConstKind),
    /// A predeclared type: `int`, `string`, `byte`, ...
    Basic(Id),
    /// A type declared in the package.
    Named(Id),
    /// A type from an imported package.
    Qualified { package: Id, name: Id },
    /// The type of a value computed outside the package.
    Unknown,
}

impl ConstType {
    /// Key under which constants of this type are grouped: the bare type
    /// name for named types, the display text otherwise.
    pub fn group_key(&self) -> String {
        match self {
            Self::Named(name) | Self::Qualified { name, .. } => name.to_string(),
            other => other.to_string(),
        }
    }

    fn untyped_kind(&self) -> Option<ConstKind> {
        match self {
            Self::Untyped(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ConstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped(kind) => write!(f, "untyped {kind}"),
            Self::Basic(name) | Self::Named(name) => write!(f, "{name}"),
            Self::Qualified { package, name } => write!(f, "{package}.{name}"),
            Self::Unknown => f.write_str("invalid type"),
        }
    }
}

/// Type and value of one constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstInfo {
    pub ty: ConstType,
    pub value: ConstValue,
}

/// A constant that could not be evaluated.
#[derive(Debug, Clone)]
struct Failure {
    /// Type named by the declaration, if any.
    group: Option<Id>,
    /// File declaring the constant.
    file: usize,
    /// Index of the diagnostic that explains it.
    problem: usize,
}

/// Checked facts about one package.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    name: Id,
    constants: IndexMap<Id, ConstInfo>,
    types: IndexMap<Id, Option<Id>>,
    failures: Vec<Failure>,
    /// Diagnostics with the index of the file they point into.
    problems: Vec<(usize, Diagnostic)>,
    warnings: Vec<(usize, Diagnostic)>,
}

impl PackageInfo {
    fn empty(name: Id) -> Self {
        Self {
            name,
            constants: IndexMap::new(),
            types: IndexMap::new(),
            failures: Vec::new(),
            problems: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Name from the package clause.
    pub fn name(&self) -> Id {
        self.name
    }

    pub fn constant(&self, name: &str) -> Option<&ConstInfo> {
        self.constants.get(&Id::new(name))
    }

    /// All non-blank constants, in file then declaration order.
    pub fn constants(&self) -> impl Iterator<Item = (Id, &ConstInfo)> {
        self.constants.iter().map(|(name, info)| (*name, info))
    }

    /// The predeclared scalar a package type is ultimately defined as, if any.
    ///
    /// `type Level Priority` with `type Priority uint8` yields `uint8`.
    pub fn underlying_scalar(&self, type_name: &str) -> Option<Id> {
        self.types.get(&Id::new(type_name)).copied().flatten()
    }

    /// Text of the underlying type of a constant type.
    pub fn underlying_label(&self, ty: &ConstType) -> String {
        match ty {
            ConstType::Named(name) => self
                .types
                .get(name)
                .copied()
                .flatten()
                .map(|scalar| scalar.to_string())
                .unwrap_or_else(|| name.to_string()),
            other => other.to_string(),
        }
    }

    /// Why constants declared with type `group` could not be evaluated.
    ///
    /// With `file` set, only constants declared in that file count. The
    /// error is reported against the file of the first cause and holds
    /// every distinct cause located there. A failing constant can point
    /// into another file when it depends on a broken constant declared
    /// elsewhere.
    pub fn group_error(&self, group: &str, file: Option<usize>) -> Option<CheckError> {
        let mut causes: Vec<usize> = Vec::new();
        for failure in &self.failures {
            let in_group = failure.group.is_some_and(|name| name == group);
            let in_scope = file.is_none_or(|file| failure.file == file);
            if in_group && in_scope && !causes.contains(&failure.problem) {
                causes.push(failure.problem);
            }
        }

        let target = self.problems[*causes.first()?].0;
        let diagnostics = causes
            .iter()
            .map(|&problem| &self.problems[problem])
            .filter(|(file, _)| *file == target)
            .map(|(_, diagnostic)| diagnostic.clone())
            .collect();
        Some(CheckError::new(target, diagnostics))
    }

    /// Diagnostics that do not affect any value, with the index of the file
    /// they point into.
    pub fn warnings(&self) -> impl Iterator<Item = (usize, &Diagnostic)> {
        self.warnings.iter().map(|(file, diagnostic)| (*file, diagnostic))
    }
}

/// Check the constants of one package.
///
/// `files` must share one package clause; the name of the first is used.
pub fn check_package(files: &[&SourceFile]) -> PackageInfo {
    let Some(first) = files.first() else {
        return PackageInfo::empty(Id::new("_"));
    };

    debug!(package = first.package.to_string(), files = files.len(); "Checking package");

    let mut checker = Checker::new(files);
    checker.declare();
    checker.compute_types();
    checker.collect_constants();
    checker.evaluate_all();
    checker.finish(*first.package.inner())
}

/// What a package-level name denotes.
#[derive(Debug, Clone, Copy)]
enum Declared<'a> {
    /// Index into the constant entries, set once the constants are collected.
    Const(Option<usize>),
    Type(&'a TypeSpec),
    Var,
    Func,
}

#[derive(Debug, Clone, Copy)]
struct Declaration<'a> {
    file: usize,
    span: Span,
    kind: Declared<'a>,
}

/// One constant name with the expression it is initialized by, after
/// implicit repetition.
#[derive(Debug)]
struct ConstEntry<'a> {
    file: usize,
    name: &'a Spanned<Id>,
    ty: Option<&'a TypeExpr>,
    expr: Option<&'a Spanned<Expr>>,
    iota: usize,
    group: Option<Id>,
    /// False for a redeclaration shadowed by an earlier declaration.
    live: bool,
}

#[derive(Debug)]
enum Slot {
    Pending,
    Evaluating,
    Done(ConstInfo),
    /// Holds the index of the problem that caused it.
    Failed(usize),
}

/// Evaluation failure.
#[derive(Debug)]
enum EvalError {
    /// Already recorded as the problem at this index.
    Failed(usize),
    New(Diagnostic),
}

impl From<Diagnostic> for EvalError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::New(diagnostic)
    }
}

type Eval<T> = Result<T, EvalError>;

struct Checker<'a> {
    files: &'a [&'a SourceFile],
    scope: IndexMap<Id, Declaration<'a>>,
    types: IndexMap<Id, Option<Id>>,
    entries: Vec<ConstEntry<'a>>,
    slots: Vec<Slot>,
    problems: Vec<(usize, Diagnostic)>,
    warnings: Vec<(usize, Diagnostic)>,
}

impl<'a> Checker<'a> {
    fn new(files: &'a [&'a SourceFile]) -> Self {
        Self {
            files,
            scope: IndexMap::new(),
            types: IndexMap::new(),
            entries: Vec::new(),
            slots: Vec::new(),
            problems: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a problem located in `file` and return its index.
    fn problem(&mut self, file: usize, diagnostic: Diagnostic) -> usize {
        self.problems.push((file, diagnostic));
        self.problems.len() - 1
    }

    fn declare(&mut self) {
        let files = self.files;
        for (file_index, file) in files.iter().enumerate() {
            for decl in &file.decls {
                match decl {
                    Decl::Type(specs) => {
                        for spec in specs {
                            self.declare_name(file_index, &spec.name, Declared::Type(spec));
                        }
                    }
                    Decl::Const(specs) => {
                        for spec in specs {
                            for name in &spec.names {
                                self.declare_name(file_index, name, Declared::Const(None));
                            }
                        }
                    }
                    Decl::Var(specs) => {
                        for spec in specs {
                            for name in &spec.names {
                                self.declare_name(file_index, name, Declared::Var);
                            }
                        }
                    }
                    Decl::Func(func) => {
                        if !func.is_method && *func.name.inner() != "init" {
                            self.declare_name(file_index, &func.name, Declared::Func);
                        }
                    }
                }
            }
        }
    }

    fn declare_name(&mut self, file: usize, name: &Spanned<Id>, kind: Declared<'a>) {
        if name.is_blank() {
            return;
        }

        if let Some(previous) = self.scope.get(name.inner()).copied() {
            let mut diagnostic = Diagnostic::warning(format!("`{name}` redeclared in this package"))
                .with_code(ErrorCode::E201)
                .with_label(name.span(), "redeclared here; the first declaration is used");
            if previous.file == file {
                diagnostic = diagnostic.with_secondary_label(previous.span, "first declared here");
            } else {
                diagnostic = diagnostic.with_help(format!(
                    "`{name}` is already declared in another file of the package"
                ));
            }
            debug!(name = name.to_string(), file = file, first_file = previous.file; "Ignoring redeclared name");
            self.warnings.push((file, diagnostic));
            return;
        }

        self.scope.insert(
            *name.inner(),
            Declaration {
                file,
                span: name.span(),
                kind,
            },
        );
    }

    fn compute_types(&mut self) {
        let specs: Vec<&'a TypeSpec> = self
            .scope
            .values()
            .filter_map(|declaration| match declaration.kind {
                Declared::Type(spec) => Some(spec),
                _ => None,
            })
            .collect();

        for spec in specs {
            let scalar = self.scalar_of(&spec.ty, 0);
            trace!(name = spec.name.to_string(), scalar:? = scalar.map(|s| s.to_string()); "Computed underlying scalar");
            self.types.insert(*spec.name.inner(), scalar);
        }
    }

    /// The predeclared scalar a type expression resolves to through local
    /// type declarations.
    fn scalar_of(&self, ty: &TypeExpr, depth: usize) -> Option<Id> {
        const MAX_DEPTH: usize = 64;
        if depth > MAX_DEPTH {
            return None;
        }

        match ty {
            TypeExpr::Paren(inner) => self.scalar_of(inner, depth + 1),
            TypeExpr::Name(name) => match self.scope.get(name).map(|declaration| declaration.kind) {
                Some(Declared::Type(spec)) if spec.type_params.is_empty() => {
                    self.scalar_of(&spec.ty, depth + 1)
                }
                Some(_) => None,
                None => builtin_types::is_builtin_scalar(&name.to_string()).then_some(*name),
            },
            _ => None,
        }
    }

    fn collect_constants(&mut self) {
        let files = self.files;
        for (file_index, file) in files.iter().enumerate() {
            for decl in &file.decls {
                let Decl::Const(specs) = decl else { continue };

                let mut repeated: Option<(Option<&'a TypeExpr>, &'a [Spanned<Expr>])> = None;
                for (iota, spec) in specs.iter().enumerate() {
                    let (ty, values) = if spec.values.is_empty() && spec.ty.is_none() {
                        match repeated {
                            Some(previous) => previous,
                            None => (None, &[][..]),
                        }
                    } else {
                        let current = (spec.ty.as_ref(), spec.values.as_slice());
                        repeated = Some(current);
                        current
                    };

                    // Names from this position on fail with the recorded problem
                    let mut failed_from = None;
                    if values.len() < spec.names.len() {
                        let name = &spec.names[values.len()];
                        let problem = self.problem(
                            file_index,
                            Diagnostic::error(format!("missing init expression for `{name}`"))
                                .with_code(ErrorCode::E206)
                                .with_label(name.span(), "constant has no value"),
                        );
                        failed_from = Some((values.len(), problem));
                    } else if values.len() > spec.names.len() {
                        let extra = &values[spec.names.len()];
                        let problem = self.problem(
                            file_index,
                            Diagnostic::error("extra init expression")
                                .with_code(ErrorCode::E206)
                                .with_label(extra.span(), "no constant to assign this value to"),
                        );
                        failed_from = Some((0, problem));
                    }

                    for (position, name) in spec.names.iter().enumerate() {
                        let index = self.entries.len();
                        let mut live = name.is_blank();
                        if let Some(declaration) = self.scope.get_mut(name.inner()) {
                            let is_this = declaration.file == file_index && declaration.span == name.span();
                            if is_this {
                                declaration.kind = Declared::Const(Some(index));
                                live = true;
                            }
                        }

                        let expr = values.get(position);
                        self.entries.push(ConstEntry {
                            file: file_index,
                            name,
                            ty,
                            expr,
                            iota,
                            group: declared_group(ty, expr),
                            live,
                        });
                        self.slots.push(match failed_from {
                            Some((from, problem)) if position >= from => Slot::Failed(problem),
                            _ => Slot::Pending,
                        });
                    }
                }
            }
        }
    }

    fn evaluate_all(&mut self) {
        for index in 0..self.entries.len() {
            if self.entries[index].live {
                // Failures are recorded in the slot
                let _ = self.constant_value(index, None);
            }
        }
    }

    /// Value of the constant at `index`, evaluating it on first use.
    ///
    /// `use_site` is the referencing identifier, used to report cycles.
    fn constant_value(&mut self, index: usize, use_site: Option<(usize, Span)>) -> Eval<ConstInfo> {
        match &self.slots[index] {
            Slot::Done(info) => return Ok(info.clone()),
            Slot::Failed(problem) => return Err(EvalError::Failed(*problem)),
            Slot::Evaluating => {
                let entry = &self.entries[index];
                let (file, span) = use_site.unwrap_or((entry.file, entry.name.span()));
                let diagnostic = Diagnostic::error(format!(
                    "initialization cycle: `{}` refers to itself",
                    entry.name
                ))
                .with_code(ErrorCode::E205)
                .with_label(span, "cycle closes here");
                return Err(EvalError::Failed(self.problem(file, diagnostic)));
            }
            Slot::Pending => {}
        }

        self.slots[index] = Slot::Evaluating;
        let result = self.evaluate_entry(index);

        match result {
            Ok(info) => {
                trace!(
                    name = self.entries[index].name.to_string(),
                    ty = info.ty.to_string(),
                    value = info.value.to_string();
                    "Evaluated constant"
                );
                self.slots[index] = Slot::Done(info.clone());
                Ok(info)
            }
            Err(err) => {
                let entry = &self.entries[index];
                let (file, name) = (entry.file, entry.name.to_string());
                let problem = match err {
                    EvalError::Failed(problem) => problem,
                    EvalError::New(diagnostic) => self.problem(file, diagnostic),
                };
                debug!(name = name, problem = problem; "Constant failed");
                self.slots[index] = Slot::Failed(problem);
                Err(EvalError::Failed(problem))
            }
        }
    }

    fn evaluate_entry(&mut self, index: usize) -> Eval<ConstInfo> {
        let entry = &self.entries[index];
        let (file, iota, name_span) = (entry.file, entry.iota, entry.name.span());
        let (ty, expr) = (entry.ty, entry.expr);

        let Some(expr) = expr else {
            return Err(Diagnostic::error(format!("missing init expression for `{}`", entry.name))
                .with_code(ErrorCode::E206)
                .with_label(name_span, "constant has no value")
                .into());
        };

        let info = self.eval(expr, file, iota)?;
        match ty {
            None => Ok(info),
            Some(ty) => {
                let target = self.const_type(ty, name_span)?;
                self.assign(info, target, expr.span())
            }
        }
    }

    /// Type of a constant declaration's explicit type.
    fn const_type(&self, ty: &TypeExpr, span: Span) -> Eval<ConstType> {
        match ty {
            TypeExpr::Paren(inner) => self.const_type(inner, span),
            TypeExpr::Qualified { package, name } => Ok(ConstType::Qualified {
                package: *package,
                name: *name,
            }),
            TypeExpr::Name(name) => match self.scope.get(name).map(|declaration| declaration.kind) {
                Some(Declared::Type(_)) => match self.types.get(name).copied().flatten() {
                    Some(_) => Ok(ConstType::Named(*name)),
                    None => Err(invalid_constant_type(name, span).into()),
                },
                Some(_) => Err(Diagnostic::error(format!("`{name}` is not a type"))
                    .with_code(ErrorCode::E204)
                    .with_label(span, "used as a constant type")
                    .into()),
                None if builtin_types::is_builtin_scalar(&name.to_string()) && *name != "any" => {
                    Ok(ConstType::Basic(*name))
                }
                None if builtin_types::is_predeclared(&name.to_string()) || *name == "any" => {
                    Err(invalid_constant_type(name, span).into())
                }
                None => Err(undefined(name, span).into()),
            },
            _ => Err(Diagnostic::error("invalid constant type")
                .with_code(ErrorCode::E204)
                .with_label(span, "constants must have a basic type")
                .into()),
        }
    }

    /// The predeclared scalar behind a constant type.
    fn basic_of(&self, ty: &ConstType) -> Option<Id> {
        match ty {
            ConstType::Basic(name) => Some(*name),
            ConstType::Named(name) => self.types.get(name).copied().flatten(),
            _ => None,
        }
    }

    /// Give an operand the type `target`, as in an assignment or a typed
    /// declaration.
    fn assign(&self, info: ConstInfo, target: ConstType, span: Span) -> Eval<ConstInfo> {
        if info.value.is_opaque() || info.ty == target {
            return Ok(ConstInfo { ty: target, ..info });
        }

        if info.ty.untyped_kind().is_none() && info.ty != ConstType::Unknown {
            return Err(Diagnostic::error(format!(
                "cannot use {} (constant of type {}) as {target} value",
                info.value, info.ty
            ))
            .with_code(ErrorCode::E204)
            .with_label(span, "mismatched type")
            .into());
        }

        let Some(basic) = self.basic_of(&target) else {
            return Ok(ConstInfo { ty: target, ..info });
        };
        let basic = basic.to_string();

        let compatible = match &info.value {
            ConstValue::Str(_) => basic == "string",
            ConstValue::Bool(_) => basic == "bool",
            _ => basic != "string" && basic != "bool",
        };
        if !compatible {
            return Err(Diagnostic::error(format!(
                "cannot use {} (untyped {} constant) as {target} value",
                info.value,
                info.ty.untyped_kind().map(|kind| kind.to_string()).unwrap_or_default()
            ))
            .with_code(ErrorCode::E204)
            .with_label(span, "mismatched type")
            .into());
        }

        let value = constant::convert(info.value, &basic).map_err(|err| const_error(err, span))?;
        Ok(ConstInfo { ty: target, value })
    }

    /// Check that a typed result is representable, normalizing its value.
    fn represent(&self, info: ConstInfo, span: Span) -> Eval<ConstInfo> {
        match self.basic_of(&info.ty) {
            Some(basic) if !info.value.is_opaque() => {
                let value = constant::convert(info.value, &basic.to_string())
                    .map_err(|err| const_error(err, span))?;
                Ok(ConstInfo { value, ..info })
            }
            _ => Ok(info),
        }
    }

    fn eval(&mut self, expr: &Spanned<Expr>, file: usize, iota: usize) -> Eval<ConstInfo> {
        let span = expr.span();
        match expr.inner() {
            Expr::Literal { kind, text } => literal(*kind, text, span),
            Expr::Paren(inner) => self.eval(inner, file, iota),
            Expr::Ident(name) => self.eval_ident(*name, file, iota, span),
            Expr::Qualified { .. } => Ok(opaque(expr, ConstType::Unknown)),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, file, iota)?;
                self.eval_unary(*op, operand, expr)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, file, iota)?;
                let rhs = self.eval(rhs, file, iota)?;
                self.eval_binary(*op, lhs, rhs, expr)
            }
            Expr::Call { func, args } => self.eval_call(func, args, expr, file, iota),
        }
    }

    fn eval_ident(&mut self, name: Id, file: usize, iota: usize, span: Span) -> Eval<ConstInfo> {
        match self.scope.get(&name).map(|declaration| declaration.kind) {
            Some(Declared::Const(Some(index))) => self.constant_value(index, Some((file, span))),
            Some(_) => Err(Diagnostic::error(format!("`{name}` is not constant"))
                .with_code(ErrorCode::E204)
                .with_label(span, "not a constant value")
                .into()),
            None if name == "true" || name == "false" => Ok(ConstInfo {
                ty: ConstType::Untyped(ConstKind::Bool),
                value: ConstValue::Bool(name == "true"),
            }),
            None if name == "iota" => Ok(ConstInfo {
                ty: ConstType::Untyped(ConstKind::Int),
                value: ConstValue::Int(BigInt::from(iota)),
            }),
            None if name == "nil" || builtin_types::is_predeclared(&name.to_string()) => {
                Err(Diagnostic::error(format!("`{name}` is not constant"))
                    .with_code(ErrorCode::E204)
                    .with_label(span, "not a constant value")
                    .into())
            }
            None => Err(undefined(&name, span).into()),
        }
    }

    fn eval_unary(&self, op: UnaryOp, operand: ConstInfo, expr: &Spanned<Expr>) -> Eval<ConstInfo> {
        let span = expr.span();
        if operand.value.is_opaque() {
            let ty = if op == UnaryOp::Not {
                ConstType::Untyped(ConstKind::Bool)
            } else {
                operand.ty
            };
            return Ok(opaque(expr, ty));
        }

        let mut value = constant::unary(op, operand.value).map_err(|err| const_error(err, span))?;

        // Complement of an unsigned value stays within its width
        if op == UnaryOp::Complement {
            let bounds = self
                .basic_of(&operand.ty)
                .and_then(|basic| constant::int_range(&basic.to_string()));
            let masked = match (bounds, &value) {
                (Some((min, max)), ConstValue::Int(v)) if min.is_zero() => Some(ConstValue::Int(v & &max)),
                _ => None,
            };
            if let Some(masked) = masked {
                value = masked;
            }
        }

        self.represent(
            ConstInfo {
                ty: operand.ty,
                value,
            },
            span,
        )
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: ConstInfo,
        rhs: ConstInfo,
        expr: &Spanned<Expr>,
    ) -> Eval<ConstInfo> {
        let span = expr.span();

        let ty = if op.is_shift() {
            lhs.ty.clone()
        } else {
            self.unify(&lhs.ty, &rhs.ty, op, span)?
        };
        let result_ty = if op.is_comparison() {
            ConstType::Untyped(ConstKind::Bool)
        } else {
            ty
        };

        if lhs.value.is_opaque() || rhs.value.is_opaque() {
            return Ok(opaque(expr, result_ty));
        }

        let value = constant::binary(op, lhs.value, rhs.value).map_err(|err| const_error(err, span))?;
        self.represent(
            ConstInfo {
                ty: result_ty,
                value,
            },
            span,
        )
    }

    /// Common type of two operands.
    fn unify(&self, lhs: &ConstType, rhs: &ConstType, op: BinaryOp, span: Span) -> Eval<ConstType> {
        let mismatched = || -> EvalError {
            Diagnostic::error(format!(
                "invalid operation: operator {op} on mismatched types {lhs} and {rhs}"
            ))
            .with_code(ErrorCode::E204)
            .with_label(span, "mismatched types")
            .into()
        };

        match (lhs, rhs) {
            (ConstType::Unknown, other) | (other, ConstType::Unknown) => Ok(other.clone()),
            (ConstType::Untyped(l), ConstType::Untyped(r)) => {
                if l == r {
                    Ok(lhs.clone())
                } else if l.is_numeric() && r.is_numeric() {
                    Ok(ConstType::Untyped((*l).max(*r)))
                } else {
                    Err(mismatched())
                }
            }
            (ConstType::Untyped(_), typed) | (typed, ConstType::Untyped(_)) => Ok(typed.clone()),
            (l, r) if l == r => Ok(l.clone()),
            _ => Err(mismatched()),
        }
    }

    fn eval_call(
        &mut self,
        func: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        expr: &Spanned<Expr>,
        file: usize,
        iota: usize,
    ) -> Eval<ConstInfo> {
        let span = expr.span();
        match func.inner() {
            Expr::Paren(inner) => self.eval_call(inner, args, expr, file, iota),
            Expr::Qualified { package, .. } if *package == "unsafe" => {
                Ok(opaque(expr, ConstType::Basic(Id::new("uintptr"))))
            }
            Expr::Qualified { package, name } => {
                let [arg] = args else {
                    return Ok(opaque(expr, ConstType::Unknown));
                };
                let operand = self.eval(arg, file, iota)?;
                Ok(ConstInfo {
                    ty: ConstType::Qualified {
                        package: *package,
                        name: *name,
                    },
                    value: operand.value,
                })
            }
            Expr::Ident(name) => {
                let declared = self.scope.get(name).map(|declaration| declaration.kind);
                match declared {
                    Some(Declared::Type(_)) => {
                        let target = ConstType::Named(*name);
                        if self.basic_of(&target).is_none() {
                            return Err(invalid_constant_type(name, span).into());
                        }
                        self.conversion(args, target, expr, file, iota)
                    }
                    Some(_) => Err(Diagnostic::error(format!("`{expr}` is not constant"))
                        .with_code(ErrorCode::E204)
                        .with_label(span, "function calls are not constant")
                        .into()),
                    None if builtin_types::is_builtin_scalar(&name.to_string()) && *name != "any" => {
                        self.conversion(args, ConstType::Basic(*name), expr, file, iota)
                    }
                    None if *name == "len" => self.builtin_len(args, expr, file, iota),
                    None if *name == "min" || *name == "max" => {
                        self.builtin_min_max(*name == "min", args, expr, file, iota)
                    }
                    None => Ok(opaque(expr, ConstType::Unknown)),
                }
            }
            _ => Ok(opaque(expr, ConstType::Unknown)),
        }
    }

    fn conversion(
        &mut self,
        args: &[Spanned<Expr>],
        target: ConstType,
        expr: &Spanned<Expr>,
        file: usize,
        iota: usize,
    ) -> Eval<ConstInfo> {
        let span = expr.span();
        let [arg] = args else {
            return Err(Diagnostic::error(format!("conversion to {target} takes one argument"))
                .with_code(ErrorCode::E204)
                .with_label(span, "wrong number of arguments")
                .into());
        };

        let operand = self.eval(arg, file, iota)?;
        if operand.value.is_opaque() {
            return Ok(opaque(expr, target));
        }

        let basic = self.basic_of(&target).map(|basic| basic.to_string()).unwrap_or_default();
        let value = constant::convert(operand.value, &basic).map_err(|err| const_error(err, span))?;
        Ok(ConstInfo { ty: target, value })
    }

    fn builtin_len(
        &mut self,
        args: &[Spanned<Expr>],
        expr: &Spanned<Expr>,
        file: usize,
        iota: usize,
    ) -> Eval<ConstInfo> {
        let [arg] = args else {
            return Ok(opaque(expr, ConstType::Basic(Id::new("int"))));
        };

        // `len` of anything but a constant string is not constant
        let operand = match arg.inner() {
            Expr::Ident(name) if self.declares_non_constant(*name) => {
                return Ok(opaque(expr, ConstType::Basic(Id::new("int"))));
            }
            Expr::Ident(_) | Expr::Literal { .. } | Expr::Paren(_) | Expr::Binary { .. } => {
                self.eval(arg, file, iota)?
            }
            _ => return Ok(opaque(expr, ConstType::Basic(Id::new("int")))),
        };

        match operand.value {
            ConstValue::Str(text) => Ok(ConstInfo {
                ty: ConstType::Basic(Id::new("int")),
                value: ConstValue::Int(BigInt::from(text.len())),
            }),
            _ => Ok(opaque(expr, ConstType::Basic(Id::new("int")))),
        }
    }

    /// Whether `name` is declared in the package as something other than a
    /// constant.
    fn declares_non_constant(&self, name: Id) -> bool {
        self.scope
            .get(&name)
            .is_some_and(|declaration| !matches!(declaration.kind, Declared::Const(_)))
    }

    fn builtin_min_max(
        &mut self,
        is_min: bool,
        args: &[Spanned<Expr>],
        expr: &Spanned<Expr>,
        file: usize,
        iota: usize,
    ) -> Eval<ConstInfo> {
        let span = expr.span();
        let mut best: Option<ConstInfo> = None;

        for arg in args {
            let operand = self.eval(arg, file, iota)?;
            best = Some(match best {
                None => operand,
                Some(current) => {
                    let ty = self.unify(&current.ty, &operand.ty, BinaryOp::Lt, span)?;
                    if current.value.is_opaque() || operand.value.is_opaque() {
                        return Ok(opaque(expr, ty));
                    }
                    let op = if is_min { BinaryOp::Lt } else { BinaryOp::Gt };
                    let keep = constant::binary(op, current.value.clone(), operand.value.clone())
                        .map_err(|err| const_error(err, span))?;
                    let value = if keep == ConstValue::Bool(true) {
                        current.value
                    } else {
                        operand.value
                    };
                    ConstInfo { ty, value }
                }
            });
        }

        match best {
            Some(info) => self.represent(info, span),
            None => Err(Diagnostic::error("not enough arguments")
                .with_code(ErrorCode::E204)
                .with_label(span, "expects at least one argument")
                .into()),
        }
    }

    fn finish(self, name: Id) -> PackageInfo {
        let mut info = PackageInfo::empty(name);
        for (entry, slot) in self.entries.iter().zip(self.slots) {
            if !entry.live {
                continue;
            }
            match slot {
                Slot::Done(value) if !entry.name.is_blank() => {
                    info.constants.insert(*entry.name.inner(), value);
                }
                Slot::Failed(problem) => info.failures.push(Failure {
                    group: entry.group,
                    file: entry.file,
                    problem,
                }),
                _ => {}
            }
        }

        debug!(
            package = name.to_string(),
            constants = info.constants.len(),
            failed = info.failures.len(),
            warnings = self.warnings.len();
            "Package checked"
        );
        info.types = self.types;
        info.problems = self.problems;
        info.warnings = self.warnings;
        info
    }
}

/// Type a constant is declared with: its explicit type, or the target of a
/// conversion that makes up its whole value.
fn declared_group(ty: Option<&TypeExpr>, value: Option<&Spanned<Expr>>) -> Option<Id> {
    match ty {
        Some(TypeExpr::Paren(inner)) => declared_group(Some(inner.as_ref()), value),
        Some(TypeExpr::Name(name) | TypeExpr::Qualified { name, .. }) => Some(*name),
        Some(_) => None,
        None => match value.map(|value| value.inner()) {
            Some(Expr::Call { func, args }) if args.len() == 1 => match func.inner() {
                Expr::Ident(name) | Expr::Qualified { name, .. } => Some(*name),
                _ => None,
            },
            _ => None,
        },
    }
}

fn literal(kind: LitKind, text: &str, span: Span) -> Eval<ConstInfo> {
    let to_eval = |err| const_error(err, span);
    let (kind, value) = match kind {
        LitKind::Int => (ConstKind::Int, ConstValue::Int(constant::parse_int(text).map_err(to_eval)?)),
        LitKind::Float => (
            ConstKind::Float,
            ConstValue::Float(constant::parse_float(text).map_err(to_eval)?),
        ),
        LitKind::Imaginary => {
            let body = text.strip_suffix('i').unwrap_or(text);
            let im = constant::parse_float(body).map_err(to_eval)?;
            (ConstKind::Complex, ConstValue::Complex(BigRational::zero(), im))
        }
        LitKind::Rune => {
            let rune = constant::parse_rune(text).map_err(to_eval)?;
            (ConstKind::Rune, ConstValue::Int(BigInt::from(rune)))
        }
        LitKind::String => (
            ConstKind::String,
            ConstValue::Str(constant::parse_string(text).map_err(to_eval)?),
        ),
    };
    Ok(ConstInfo {
        ty: ConstType::Untyped(kind),
        value,
    })
}

fn opaque(expr: &Spanned<Expr>, ty: ConstType) -> ConstInfo {
    ConstInfo {
        ty,
        value: ConstValue::Opaque(expr.to_string()),
    }
}

fn undefined(name: &Id, span: Span) -> Diagnostic {
    Diagnostic::error(format!("undefined: `{name}`"))
        .with_code(ErrorCode::E200)
        .with_label(span, "not declared in this package")
}

fn invalid_constant_type(name: &Id, span: Span) -> Diagnostic {
    Diagnostic::error(format!("invalid constant type `{name}`"))
        .with_code(ErrorCode::E204)
        .with_label(span, "constants must have a basic underlying type")
}

fn const_error(err: ConstError, span: Span) -> EvalError {
    let code = match err {
        ConstError::DivisionByZero => ErrorCode::E202,
        ConstError::Overflow | ConstError::NotRepresentable { .. } => ErrorCode::E203,
        ConstError::Truncated(_)
        | ConstError::InvalidShift(_)
        | ConstError::UndefinedOperator { .. }
        | ConstError::InvalidConversion { .. }
        | ConstError::MalformedLiteral(_) => ErrorCode::E204,
    };
    Diagnostic::error(err.to_string())
        .with_code(code)
        .with_label(span, code.description())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_file;

    fn check(sources: &[&str]) -> PackageInfo {
        let files: Vec<SourceFile> = sources
            .iter()
            .map(|src| parse_file(src).expect("source should parse"))
            .collect();
        let refs: Vec<&SourceFile> = files.iter().collect();
        check_package(&refs)
    }

    fn value_of(info: &PackageInfo, name: &str) -> String {
        info.constant(name)
            .map(|c| c.value.to_string())
            .unwrap_or_else(|| panic!("constant {name} missing"))
    }

    fn failure_code(info: &PackageInfo, group: &str) -> Option<ErrorCode> {
        let err = info.group_error(group, None)?;
        err.diagnostics().first().and_then(Diagnostic::code)
    }

    #[test]
    fn test_iota_and_implicit_repetition() {
        let info = check(&[r#"package colors

type Color int

const (
	Red Color = iota
	Green
	Blue
)

const (
	KB = 1 << (10 * (iota + 1))
	MB
	GB
)
"#]);

        assert_eq!(value_of(&info, "Red"), "0");
        assert_eq!(value_of(&info, "Blue"), "2");
        assert_eq!(info.constant("Green").unwrap().ty, ConstType::Named(Id::new("Color")));
        assert_eq!(value_of(&info, "MB"), "1048576");
        assert_eq!(info.constant("GB").unwrap().ty, ConstType::Untyped(ConstKind::Int));
    }

    #[test]
    fn test_literal_kinds_and_values() {
        let info = check(&[r#"package p

const (
	Name    = "gloss"
	Quoted  = "say \"hi\""
	Letter  = 'A'
	Ratio   = 3 / 2.0
	Half    = 1 / 2
	Enabled = !false
	Hex     = 0xFF
)
"#]);

        assert_eq!(value_of(&info, "Name"), "\"gloss\"");
        assert_eq!(value_of(&info, "Quoted"), r#""say \"hi\"""#);
        assert_eq!(value_of(&info, "Letter"), "65");
        assert_eq!(info.constant("Letter").unwrap().ty.to_string(), "untyped rune");
        assert_eq!(value_of(&info, "Ratio"), "1.5");
        assert_eq!(value_of(&info, "Half"), "0");
        assert_eq!(value_of(&info, "Enabled"), "true");
        assert_eq!(value_of(&info, "Hex"), "255");
    }

    #[test]
    fn test_typed_constants_and_conversions() {
        let info = check(&[r#"package p

type Level uint8

const Max Level = 200
const Mask = ^Level(0)
const Size int64 = 1 << 40
const Label = string(rune(71))
"#]);

        assert_eq!(value_of(&info, "Max"), "200");
        assert_eq!(value_of(&info, "Mask"), "255");
        assert_eq!(info.constant("Mask").unwrap().ty, ConstType::Named(Id::new("Level")));
        assert_eq!(value_of(&info, "Size"), "1099511627776");
        assert_eq!(value_of(&info, "Label"), "\"G\"");
        assert_eq!(info.underlying_scalar("Level"), Some(Id::new("uint8")));
    }

    #[test]
    fn test_references_across_files() {
        let info = check(&[
            "package p\n\nconst A = B * 2\n",
            "package p\n\nconst B = 21\n",
        ]);

        assert_eq!(value_of(&info, "A"), "42");
        assert_eq!(info.name(), "p");
    }

    #[test]
    fn test_foreign_values_kept_as_text() {
        let info = check(&[r#"package p

import "time"

const Timeout = 5 * time.Second
const Wait time.Duration = 3
const Ptr = unsafe.Sizeof(0)
"#]);

        assert_eq!(value_of(&info, "Timeout"), "5 * time.Second");
        assert_eq!(value_of(&info, "Wait"), "3");
        assert_eq!(info.constant("Wait").unwrap().ty.group_key(), "Duration");
        assert_eq!(info.constant("Ptr").unwrap().ty.to_string(), "uintptr");
    }

    #[test]
    fn test_builtins() {
        let info = check(&[r#"package p

const Greeting = "hello"
const N = len(Greeting)
const Low = min(3, 1, 2)
const High = max(1.5, 2)
"#]);

        assert_eq!(value_of(&info, "N"), "5");
        assert_eq!(value_of(&info, "Low"), "1");
        assert_eq!(value_of(&info, "High"), "2");
    }

    #[test]
    fn test_blank_constants_skipped() {
        let info = check(&["package p\n\nconst (\n\t_ = iota\n\tOne\n)\n"]);
        assert_eq!(value_of(&info, "One"), "1");
        assert!(info.constant("_").is_none());
    }

    #[test]
    fn test_exact_arithmetic() {
        let info = check(&[r#"package p

const (
	Huge  = 1 << 200
	Ten   = 1e400 / 1e399
	Sum   = 0.1 + 0.2
	Third = 1 / 3.0
	Back  = Huge >> 199
)

const Tenth float64 = 0.1
"#]);

        assert_eq!(
            value_of(&info, "Huge"),
            "1606938044258990275541962092341162602522202993782792835301376"
        );
        assert_eq!(value_of(&info, "Ten"), "10");
        assert_eq!(value_of(&info, "Sum"), "0.3");
        assert_eq!(value_of(&info, "Third"), "1/3");
        assert_eq!(value_of(&info, "Back"), "2");
        assert_eq!(value_of(&info, "Tenth"), "0.1");
    }

    #[test]
    fn test_len_of_variable_is_not_constant() {
        let info = check(&[r#"package p

var table [4]int

const N = len(table)
"#]);

        assert_eq!(value_of(&info, "N"), "len(table)");
        assert_eq!(info.constant("N").unwrap().ty, ConstType::Basic(Id::new("int")));
    }

    #[test]
    fn test_undefined_identifier() {
        let info = check(&["package p\n\ntype Code int\n\nconst A Code = Missing + 1\n"]);
        assert_eq!(failure_code(&info, "Code"), Some(ErrorCode::E200));
        assert!(info.constant("A").is_none());
    }

    #[test]
    fn test_division_by_zero() {
        let info = check(&["package p\n\ntype Code int\n\nconst A Code = 1 / 0\n"]);
        assert_eq!(failure_code(&info, "Code"), Some(ErrorCode::E202));
    }

    #[test]
    fn test_overflow() {
        let info = check(&["package p\n\nconst A uint8 = 256\nconst B = 1 << 600\n"]);
        assert_eq!(failure_code(&info, "uint8"), Some(ErrorCode::E203));
        assert!(info.constant("B").is_none());
    }

    #[test]
    fn test_mismatched_types() {
        let info = check(&[r#"package p

type A int
type B int

const X A = 1
const Y B = 2
const Z A = X + Y
"#]);
        assert_eq!(failure_code(&info, "A"), Some(ErrorCode::E204));
        assert_eq!(value_of(&info, "X"), "1");
        assert!(info.group_error("B", None).is_none());
    }

    #[test]
    fn test_cycle_reported_once() {
        let info = check(&["package p\n\ntype Code int\n\nconst (\n\tA Code = B\n\tB Code = A\n)\n"]);
        let err = info.group_error("Code", None).unwrap();
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E205));
    }

    #[test]
    fn test_missing_init_expression() {
        let info = check(&["package p\n\ntype Code int\n\nconst (\n\tA, B Code = 1\n)\n"]);
        assert_eq!(value_of(&info, "A"), "1");
        assert!(info.constant("B").is_none());
        assert_eq!(failure_code(&info, "Code"), Some(ErrorCode::E206));
    }

    #[test]
    fn test_failure_does_not_affect_other_groups() {
        let info = check(&[r#"package p

type Color int

const (
	Red Color = iota
	Green
)

const Broken = 1 << 5000
const Wrapped = Color(Broken)
"#]);

        assert_eq!(value_of(&info, "Green"), "1");
        assert!(info.constant("Broken").is_none());
        // The conversion names the group, so the failure is reported for it
        assert_eq!(failure_code(&info, "Color"), Some(ErrorCode::E204));
    }

    #[test]
    fn test_group_error_scoped_to_file() {
        let info = check(&[
            "package p\n\ntype Level uint8\n\nconst Low Level = 1\n",
            "package p\n\nconst High Level = 300\n",
        ]);

        assert!(info.group_error("Level", Some(0)).is_none());
        let err = info.group_error("Level", Some(1)).unwrap();
        assert_eq!(err.file_index(), 1);
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E203));
    }

    #[test]
    fn test_group_error_points_at_cause() {
        let info = check(&[
            "package p\n\ntype Color int\n\nconst Red Color = Base + 1\n",
            "package p\n\nconst Base = 1 / 0\n",
        ]);

        let err = info.group_error("Color", Some(0)).unwrap();
        assert_eq!(err.file_index(), 1);
        assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E202));
    }

    #[test]
    fn test_redeclaration_keeps_first() {
        let info = check(&["package p\n\ntype A int\n", "package p\n\nconst A = 1\nconst B A = 2\n"]);

        assert!(info.constant("A").is_none());
        assert_eq!(value_of(&info, "B"), "2");
        let warnings: Vec<_> = info.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, 1);
        assert_eq!(warnings[0].1.code(), Some(ErrorCode::E201));
        assert!(warnings[0].1.severity().is_warning());
    }

    #[test]
    fn test_redeclaration_same_file_has_secondary_label() {
        let info = check(&["package p\n\nconst A = 1\nconst A = 1 / 0\n"]);

        assert_eq!(value_of(&info, "A"), "1");
        assert!(info.group_error("int", None).is_none());
        let (_, diagnostic) = info.warnings().next().unwrap();
        assert_eq!(diagnostic.labels().len(), 2);
    }

    #[test]
    fn test_group_keys() {
        assert_eq!(ConstType::Untyped(ConstKind::Int).group_key(), "untyped int");
        assert_eq!(ConstType::Basic(Id::new("int")).group_key(), "int");
        assert_eq!(ConstType::Named(Id::new("Color")).group_key(), "Color");
        assert_eq!(
            ConstType::Qualified {
                package: Id::new("time"),
                name: Id::new("Duration")
            }
            .group_key(),
            "Duration"
        );
    }
}
