//! Single type declarations.

use gloss_core::{document::Document, reference::Reference};
use gloss_parser::{SourceFile, ast::TypeExpr, builtin_types};

use super::{flatten::flatten, format::Formatter};

/// A resolved type declaration, not yet placed in the output.
#[derive(Debug)]
pub struct Declaration {
    /// Named after the bare symbol, index zero.
    pub document: Document,
    /// References found in the declaration, in first-seen order.
    pub references: Vec<Reference>,
    /// The built-in scalar the type is declared as, if any.
    pub scalar: Option<String>,
}

/// Resolve the type declaration of `name` in `file`.
///
/// Returns `None` when `file` does not declare `name` or declares it as
/// something other than a type.
pub fn resolve(name: &str, file: &SourceFile) -> Option<Declaration> {
    let spec = file.lookup_type(name)?;
    let mut formatter = Formatter::with_type_params(spec.type_param_names());

    let (document, scalar) = match &spec.ty {
        TypeExpr::Struct(members) => {
            let fields = flatten(members, file, &mut formatter);
            (Document::new_struct(name, fields, 0), None)
        }
        underlying => {
            let label = formatter.format(underlying);
            let scalar = builtin_types::is_builtin_scalar(&label).then(|| label.clone());
            (Document::new_named(name, label, 0), scalar)
        }
    };

    Some(Declaration {
        document,
        references: formatter.into_references(),
        scalar,
    })
}
