//! The resolved document model.
//!
//! A [`Document`] describes one named type, struct, or constant group. It is
//! created exactly once per run, at the first resolution of its qualified
//! name, and never changes afterwards.

use serde::{Deserialize, Serialize};

/// What kind of declaration a [`Document`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A struct type; fields are the flattened struct members.
    Struct,
    /// Any other named type; the underlying label carries its signature.
    Named,
    /// Constants sharing one named type; fields carry the literal values.
    Constants,
}

/// One renderable unit of documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    name: String,
    kind: DocumentKind,
    #[serde(rename = "type")]
    underlying: String,
    fields: Vec<Field>,
    index: usize,
}

impl Document {
    /// Creates a struct document from its flattened fields.
    pub fn new_struct(name: impl Into<String>, fields: Vec<Field>, index: usize) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::Struct,
            underlying: String::new(),
            fields,
            index,
        }
    }

    /// Creates a document for a non-struct named type.
    pub fn new_named(name: impl Into<String>, underlying: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::Named,
            underlying: underlying.into(),
            fields: Vec::new(),
            index,
        }
    }

    /// Creates a constant-group document.
    pub fn new_constants(
        name: impl Into<String>,
        underlying: impl Into<String>,
        fields: Vec<Field>,
        index: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::Constants,
            underlying: underlying.into(),
            fields,
            index,
        }
    }

    /// Returns this document renamed and re-indexed.
    ///
    /// Constant groups are collected before the resolver decides under which
    /// qualified name and at which position they enter the output.
    pub fn placed(mut self, name: impl Into<String>, index: usize) -> Self {
        self.name = name.into();
        self.index = index;
        self
    }

    /// Qualified name: directory prefix and bare symbol joined by `/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bare symbol name, without the directory prefix.
    pub fn symbol(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map_or(self.name.as_str(), |(_, symbol)| symbol)
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Underlying-type label; empty for structs.
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Discovery-order index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` when this document lists constant values.
    pub fn is_constant_group(&self) -> bool {
        self.kind == DocumentKind::Constants
    }

    /// Appends a field during construction, assigning its declaration index.
    pub fn push_field(&mut self, mut field: Field) {
        field.index = self.fields.len();
        self.fields.push(field);
    }
}

/// One entry of a [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    signature: String,
    tag: String,
    comment: String,
    value: String,
    index: usize,
}

impl Field {
    /// Creates a struct member field.
    pub fn member(
        name: impl Into<String>,
        signature: impl Into<String>,
        tag: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            tag: tag.into(),
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// Creates a constant field carrying its literal value.
    pub fn constant(
        name: impl Into<String>,
        signature: impl Into<String>,
        value: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            value: value.into(),
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// Returns the field with its declaration-order index set.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical type signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Raw tag text without its quotes.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Literal value; empty for struct members.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_strips_prefix() {
        let doc = Document::new_named("internal/models/Status", "int", 0);
        assert_eq!(doc.symbol(), "Status");
        assert_eq!(doc.name(), "internal/models/Status");

        let local = Document::new_named("Status", "int", 0);
        assert_eq!(local.symbol(), "Status");
    }

    #[test]
    fn test_push_field_assigns_index() {
        let mut doc = Document::new_struct("User", Vec::new(), 0);
        doc.push_field(Field::member("ID", "int64", "", ""));
        doc.push_field(Field::member("Name", "string", "", ""));

        assert_eq!(doc.fields()[0].index(), 0);
        assert_eq!(doc.fields()[1].index(), 1);
        assert_eq!(doc.kind(), DocumentKind::Struct);
        assert!(doc.underlying().is_empty());
    }

    #[test]
    fn test_placed_keeps_fields() {
        let doc = Document::new_constants(
            "Color",
            "int",
            vec![Field::constant("Red", "Color", "0", "").with_index(0)],
            0,
        )
        .placed("pkg/Color", 4);

        assert_eq!(doc.name(), "pkg/Color");
        assert_eq!(doc.index(), 4);
        assert_eq!(doc.fields().len(), 1);
        assert!(doc.is_constant_group());
    }

    #[test]
    fn test_serialized_field_names() {
        let doc = Document::new_struct(
            "User",
            vec![Field::member("ID", "int64", "json:\"id\"", "primary key")],
            2,
        );
        let value = serde_json::to_value(&doc).expect("document serializes");

        assert_eq!(value["name"], "User");
        assert_eq!(value["kind"], "struct");
        assert_eq!(value["type"], "");
        assert_eq!(value["index"], 2);
        assert_eq!(value["fields"][0]["type"], "int64");
        assert_eq!(value["fields"][0]["tag"], "json:\"id\"");
    }
}
