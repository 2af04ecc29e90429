//! Whole-file parsing tests.

use gloss_core::identifier::Id;

use crate::{
    ast::{Decl, ObjectKind, StructField, TypeExpr, TypeSpec},
    error::ErrorCode,
    parse_file,
};

const MODELS: &str = r#"// Package models holds the domain types.
package models

import (
	"time"

	shared "example.com/app/internal/shared"
	_ "embed"
)

// User is an account holder.
type User struct {
	// ID is the primary key.
	ID   int64  `json:"id"` // never zero
	Name string `json:"name"`
	Tags []string
	Meta struct {
		Created time.Time
		Owner   *shared.Owner
	}
	shared.Audited
}

type (
	// Status of an account.
	Status int

	Handler func(ctx Context, args ...string) (int, error)

	Page[T any] struct {
		Items []T
		Next  *Page[T]
	}
)

const (
	Active Status = iota // currently usable
	Suspended
)

var defaultUser = User{Name: "guest"}

func (u *User) Rename(name string) {
	if name == "" {
		return
	}
	u.Name = name
}

func init() {}

func NewUser(name string) *User { return &User{Name: name} }
"#;

fn type_spec<'a>(file: &'a crate::SourceFile, name: &str) -> &'a TypeSpec {
    file.lookup_type(name)
        .unwrap_or_else(|| panic!("type {name} should be declared"))
}

fn fields(spec: &TypeSpec) -> &[StructField] {
    match &spec.ty {
        TypeExpr::Struct(fields) => fields,
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn test_parse_package_and_imports() {
    let file = parse_file(MODELS).expect("file should parse");

    assert_eq!(*file.package.inner(), "models");
    assert_eq!(file.imports.len(), 3);
    assert_eq!(file.imports[0].path.inner(), "time");
    assert!(file.imports[0].name.is_none());
    assert_eq!(
        file.imports[1].name.as_ref().map(|name| *name.inner()),
        Some(Id::new("shared"))
    );
    assert_eq!(file.imports[1].path.inner(), "example.com/app/internal/shared");
    assert_eq!(file.imports[2].name.as_ref().map(|name| *name.inner()), Some(Id::new("_")));
}

#[test]
fn test_file_scope() {
    let file = parse_file(MODELS).expect("file should parse");

    assert_eq!(file.lookup("User").map(|o| o.kind), Some(ObjectKind::Type));
    assert_eq!(file.lookup("Active").map(|o| o.kind), Some(ObjectKind::Const));
    assert_eq!(file.lookup("defaultUser").map(|o| o.kind), Some(ObjectKind::Var));
    assert_eq!(file.lookup("NewUser").map(|o| o.kind), Some(ObjectKind::Func));
    // Methods and init functions are not package-level names
    assert!(file.lookup("Rename").is_none());
    assert!(file.lookup("init").is_none());
    assert!(file.lookup_type("Active").is_none());
}

#[test]
fn test_struct_fields_and_comments() {
    let file = parse_file(MODELS).expect("file should parse");
    let user = type_spec(&file, "User");
    let fields = fields(user);

    assert_eq!(fields.len(), 5);

    let id = &fields[0];
    assert_eq!(*id.names[0].inner(), "ID");
    assert_eq!(id.ty, TypeExpr::Name(Id::new("int64")));
    assert_eq!(id.tag.as_deref(), Some("`json:\"id\"`"));
    assert_eq!(id.doc.map(|c| file.comment_text(c)).as_deref(), Some("ID is the primary key."));
    assert_eq!(id.comment.map(|c| file.comment_text(c)).as_deref(), Some("never zero"));

    let tags = &fields[2];
    assert_eq!(tags.ty, TypeExpr::Slice(Box::new(TypeExpr::Name(Id::new("string")))));
    assert!(tags.tag.is_none());

    let meta = &fields[3];
    let TypeExpr::Struct(nested) = &meta.ty else {
        panic!("Meta should be an anonymous struct");
    };
    assert_eq!(nested.len(), 2);
    assert_eq!(
        nested[1].ty,
        TypeExpr::Pointer(Box::new(TypeExpr::Qualified {
            package: Id::new("shared"),
            name: Id::new("Owner"),
        }))
    );

    let embedded = &fields[4];
    assert!(embedded.is_embedded());
}

#[test]
fn test_grouped_type_declarations() {
    let file = parse_file(MODELS).expect("file should parse");

    let status = type_spec(&file, "Status");
    assert_eq!(status.ty, TypeExpr::Name(Id::new("int")));

    let handler = type_spec(&file, "Handler");
    let TypeExpr::Func(signature) = &handler.ty else {
        panic!("Handler should be a function type");
    };
    assert_eq!(signature.params.len(), 2);
    assert_eq!(signature.results.len(), 2);

    let page = type_spec(&file, "Page");
    assert_eq!(page.type_param_names().collect::<Vec<_>>(), vec![Id::new("T")]);
    assert_eq!(
        fields(page)[1].ty,
        TypeExpr::Pointer(Box::new(TypeExpr::Generic {
            base: Box::new(TypeExpr::Name(Id::new("Page"))),
            args: vec![TypeExpr::Name(Id::new("T"))],
        }))
    );
}

#[test]
fn test_const_block_comments() {
    let file = parse_file(MODELS).expect("file should parse");
    let block = file.const_blocks().next().expect("one const block");

    assert_eq!(block.len(), 2);
    assert_eq!(*block[0].names[0].inner(), "Active");
    assert_eq!(
        block[0].comment.map(|c| file.comment_text(c)).as_deref(),
        Some("currently usable")
    );
    assert!(block[1].values.is_empty());
    assert!(block[1].ty.is_none());
}

#[test]
fn test_alias_declaration() {
    let file = parse_file("package p\n\ntype Name = string\n").expect("file should parse");
    let spec = type_spec(&file, "Name");
    assert!(spec.alias);
    assert_eq!(spec.ty, TypeExpr::Name(Id::new("string")));
}

#[test]
fn test_interface_body_skipped() {
    let src = r#"package p

type Store interface {
	Get(id string) (User, error)
	Put(u User) error
}

type Next struct{}
"#;
    let file = parse_file(src).expect("file should parse");
    assert_eq!(type_spec(&file, "Store").ty, TypeExpr::Interface);
    assert_eq!(type_spec(&file, "Next").ty, TypeExpr::Struct(Vec::new()));
}

#[test]
fn test_ungrouped_const_takes_keyword_doc() {
    let src = "package p\n\n// Limit caps requests.\nconst Limit = 10\n";
    let file = parse_file(src).expect("file should parse");
    let block = file.const_blocks().next().expect("one const block");
    assert_eq!(
        block[0].doc.map(|c| file.comment_text(c)).as_deref(),
        Some("Limit caps requests.")
    );
}

#[test]
fn test_decl_order_preserved() {
    let file = parse_file(MODELS).expect("file should parse");
    let kinds: Vec<&str> = file
        .decls
        .iter()
        .map(|decl| match decl {
            Decl::Type(_) => "type",
            Decl::Const(_) => "const",
            Decl::Var(_) => "var",
            Decl::Func(_) => "func",
        })
        .collect();
    assert_eq!(kinds, vec!["type", "type", "const", "var", "func", "func", "func"]);
}

#[test]
fn test_missing_package_clause() {
    let err = parse_file("type A int\n").unwrap_err();
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E102));
}

#[test]
fn test_unexpected_token() {
    let err = parse_file("package p\n\ntype A struct {\n\tName string\n\t+\n}\n").unwrap_err();
    let diagnostic = &err.diagnostics()[0];
    assert_eq!(diagnostic.code(), Some(ErrorCode::E100));
}

#[test]
fn test_unexpected_end_of_file() {
    let err = parse_file("package p\n\ntype A struct {\n\tName string\n").unwrap_err();
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E101));
}

#[test]
fn test_lexer_errors_reported_before_parsing() {
    let err = parse_file("package p\n\nconst S = \"open\n").unwrap_err();
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E001));
}
