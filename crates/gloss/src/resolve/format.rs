//! Canonical type signatures.
//!
//! [`Formatter`] renders a [`TypeExpr`] the way it reads in Go source and
//! records every named, non-predeclared type it meets as a [`Reference`].

use indexmap::IndexSet;

use gloss_core::{identifier::Id, reference::Reference};
use gloss_parser::{
    ast::{ChanDir, FieldGroup, FuncType, TypeExpr},
    builtin_types,
};

/// One formatting session.
///
/// References are collected across every call to [`Formatter::format`] and
/// de-duplicated in first-seen order.
#[derive(Debug, Default)]
pub struct Formatter {
    /// Type parameters of the enclosing declaration.
    bound: Vec<Id>,
    references: IndexSet<Reference>,
}

impl Formatter {
    /// A formatter that treats `params` as bound names, not references.
    pub fn with_type_params(params: impl IntoIterator<Item = Id>) -> Self {
        Self {
            bound: params.into_iter().collect(),
            references: IndexSet::new(),
        }
    }

    /// Render `ty`, recording the references it contains.
    pub fn format(&mut self, ty: &TypeExpr) -> String {
        match ty {
            TypeExpr::Name(name) => {
                let text = name.to_string();
                if !builtin_types::is_predeclared(&text) && !self.bound.contains(name) {
                    self.references.insert(Reference::Local(*name));
                }
                text
            }
            TypeExpr::Qualified { package, name } => {
                self.references.insert(Reference::Qualified {
                    alias: *package,
                    symbol: *name,
                });
                format!("{package}.{name}")
            }
            TypeExpr::Pointer(elem) => format!("*{}", self.format(elem)),
            TypeExpr::Slice(elem) => format!("[]{}", self.format(elem)),
            TypeExpr::Array { len, elem } => {
                let len = len.as_ref().map_or_else(|| "...".to_string(), |len| len.to_string());
                format!("[{len}]{}", self.format(elem))
            }
            TypeExpr::Ellipsis(elem) => format!("...{}", self.format(elem)),
            TypeExpr::Map { key, value } => {
                let key = self.format(key);
                format!("map[{key}]{}", self.format(value))
            }
            TypeExpr::Chan { dir, elem } => {
                let marker = match dir {
                    ChanDir::Both => "chan",
                    ChanDir::Send => "chan<-",
                    ChanDir::Recv => "<-chan",
                };
                format!("{marker} {}", self.format(elem))
            }
            TypeExpr::Func(signature) => self.format_func(signature),
            TypeExpr::Interface => "interface{}".to_string(),
            TypeExpr::Struct(_) => "struct{...}".to_string(),
            TypeExpr::Generic { base, args } => {
                let base = self.format(base);
                let args: Vec<String> = args.iter().map(|arg| self.format(arg)).collect();
                format!("{base}[{}]", args.join(", "))
            }
            TypeExpr::Paren(inner) => self.format(inner),
            TypeExpr::Union(terms) => terms
                .iter()
                .map(|term| {
                    let ty = self.format(&term.ty);
                    if term.tilde { format!("~{ty}") } else { ty }
                })
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn format_func(&mut self, signature: &FuncType) -> String {
        let params = self.format_groups(&signature.params);
        let results = self.format_groups(&signature.results);

        let named_results = signature.results.iter().any(|group| !group.names.is_empty());
        let results = match results.len() {
            0 => String::new(),
            1 if !named_results => format!(" {}", results[0]),
            _ => format!(" ({})", results.join(", ")),
        };
        format!("func({}){results}", params.join(", "))
    }

    /// Render parameter groups name-then-type: `a, b int`.
    fn format_groups(&mut self, groups: &[FieldGroup]) -> Vec<String> {
        groups
            .iter()
            .map(|group| {
                let ty = self.format(&group.ty);
                if group.names.is_empty() {
                    ty
                } else {
                    let names: Vec<String> = group.names.iter().map(Id::to_string).collect();
                    format!("{} {ty}", names.join(", "))
                }
            })
            .collect()
    }

    /// References recorded so far, in first-seen order.
    pub fn into_references(self) -> Vec<Reference> {
        self.references.into_iter().collect()
    }
}
