//! Integration tests for closure resolution through the DocBuilder API.

use std::fs;

use tempfile::tempdir;

use gloss::{
    ConfigError, DocBuilder, GlossError,
    config::{AppConfig, BuildTarget, ConstScope, OutputConfig, OutputFormat, ResolveConfig},
    document::{Document, DocumentKind},
    source::{FsTree, MemoryTree},
};

const GO_MOD: &str = "module example.com/shop\n\ngo 1.22\n";

fn names(documents: &[Document]) -> Vec<&str> {
    documents.iter().map(Document::name).collect()
}

fn field_names(document: &Document) -> Vec<&str> {
    document.fields().iter().map(|field| field.name()).collect()
}

fn shop() -> MemoryTree {
    MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file(
            "api/order.go",
            r#"package api

import (
	"time"

	"example.com/shop/internal/models"
)

// Order is a placed order.
type Order struct {
	ID       string `json:"id"`
	Customer models.Customer // who ordered
	Created  time.Time
	Meta     struct {
		Created time.Time
		Source  string
	}
}
"#,
        )
        .with_file(
            "internal/models/a_address.go",
            "package models\n\ntype Address struct {\n\tCity string\n}\n",
        )
        .with_file(
            "internal/models/customer.go",
            r#"package models

type Customer struct {
	Name    string
	Address Address
	Tier    Tier
}
"#,
        )
        .with_file(
            "internal/models/tier.go",
            r#"package models

// Tier is a subscription level.
type Tier uint8

const (
	Free Tier = iota // no charge
	Pro
)
"#,
        )
}

#[test]
fn test_cross_package_closure() {
    let documents = DocBuilder::default()
        .resolve(&shop(), "api/order.go", "Order")
        .expect("Failed to resolve");

    assert_eq!(
        names(&documents),
        vec![
            "Order",
            "internal/models/Customer",
            "internal/models/Address",
            "internal/models/Tier",
        ]
    );

    let indices: Vec<usize> = documents.iter().map(Document::index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_flattening_and_external_drop() {
    let documents = DocBuilder::default()
        .resolve(&shop(), "api/order.go", "Order")
        .expect("Failed to resolve");
    let order = &documents[0];

    assert_eq!(order.kind(), DocumentKind::Struct);
    assert_eq!(
        field_names(order),
        vec!["ID", "Customer", "Created", "Meta.Created", "Meta.Source"]
    );
    assert_eq!(order.fields()[0].tag(), r#"json:"id""#);
    assert_eq!(order.fields()[1].signature(), "models.Customer");
    assert_eq!(order.fields()[1].comment(), "who ordered");
    assert_eq!(order.fields()[3].signature(), "time.Time");
    assert!(documents.iter().all(|document| document.symbol() != "Time"));
}

#[test]
fn test_scalar_type_becomes_constant_group() {
    let documents = DocBuilder::default()
        .resolve(&shop(), "api/order.go", "Order")
        .expect("Failed to resolve");
    let tier = &documents[3];

    assert!(tier.is_constant_group());
    assert_eq!(tier.underlying(), "uint8");
    let values: Vec<(&str, &str, &str)> = tier
        .fields()
        .iter()
        .map(|field| (field.name(), field.value(), field.comment()))
        .collect();
    assert_eq!(values, vec![("Free", "0", "no charge"), ("Pro", "1", "")]);
}

#[test]
fn test_resolution_is_idempotent() {
    let tree = shop();
    let builder = DocBuilder::default();

    let first = builder.resolve(&tree, "api/order.go", "Order").unwrap();
    let second = builder.resolve(&tree, "api/order.go", "Order").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_discovery_order() {
    let tree = MemoryTree::new().with_file("go.mod", GO_MOD).with_file(
        "graph.go",
        r#"package shop

type A struct {
	B B
	C C
}

type B struct {
	D D
}

type C struct {
	Value int
}

type D struct {
	Value int
}
"#,
    );

    let documents = DocBuilder::default().resolve(&tree, "graph.go", "A").unwrap();
    assert_eq!(names(&documents), vec!["A", "B", "D", "C"]);
}

#[test]
fn test_recursive_types_terminate() {
    let tree = MemoryTree::new().with_file("go.mod", GO_MOD).with_file(
        "tree.go",
        r#"package shop

type Node struct {
	Next     *Node
	Children []*Node
}

type Tree struct {
	Root *Branch
}

type Branch struct {
	Tree   *Tree
	Leaves map[string]Leaf
}

type Leaf struct {
	Value string
}
"#,
    );
    let builder = DocBuilder::default();

    let node = builder.resolve(&tree, "tree.go", "Node").unwrap();
    assert_eq!(names(&node), vec!["Node"]);

    let forest = builder.resolve(&tree, "tree.go", "Tree").unwrap();
    assert_eq!(names(&forest), vec!["Tree", "Branch", "Leaf"]);
}

#[test]
fn test_constants_grouped_across_blocks() {
    let tree = MemoryTree::new().with_file("go.mod", GO_MOD).with_file(
        "task.go",
        r#"package shop

type Task struct {
	Name     string
	Priority Priority
}

type Priority int

const (
	Low Priority = iota
	Medium
	High
)

const Retries = 3

const Urgent Priority = 10
"#,
    );

    let documents = DocBuilder::default().resolve(&tree, "task.go", "Task").unwrap();
    assert_eq!(names(&documents), vec!["Task", "Priority"]);

    let priority = &documents[1];
    assert_eq!(priority.kind(), DocumentKind::Constants);
    assert_eq!(priority.underlying(), "int");
    assert_eq!(field_names(priority), vec!["Low", "Medium", "High", "Urgent"]);
    assert_eq!(priority.fields()[3].value(), "10");
    assert_eq!(priority.fields()[3].index(), 3);
}

#[test]
fn test_const_scope() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("level.go", "package shop\n\ntype Level uint8\n")
        .with_file(
            "level_values.go",
            "package shop\n\nconst (\n\tDebug Level = iota\n\tInfo\n)\n",
        );

    let file_scope = DocBuilder::default().resolve(&tree, "level.go", "Level").unwrap();
    assert_eq!(file_scope[0].kind(), DocumentKind::Named);
    assert_eq!(file_scope[0].underlying(), "uint8");

    let config = AppConfig::new(
        ResolveConfig::new(ConstScope::Package),
        OutputConfig::default(),
    );
    let package_scope = DocBuilder::new(config).resolve(&tree, "level.go", "Level").unwrap();
    assert_eq!(package_scope[0].kind(), DocumentKind::Constants);
    assert_eq!(field_names(&package_scope[0]), vec!["Debug", "Info"]);
}

#[test]
fn test_sibling_file_lookup_and_embedded_fields() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file(
            "admin.go",
            r#"package shop

import m "example.com/shop/internal/models"

type Admin struct {
	m.Address
	User
	Level int
}
"#,
        )
        .with_file("user.go", "package shop\n\ntype User struct {\n\tEmail string\n}\n")
        .with_file(
            "internal/models/address.go",
            "package models\n\ntype Address struct {\n\tCity string\n}\n",
        );

    let documents = DocBuilder::default().resolve(&tree, "admin.go", "Admin").unwrap();
    assert_eq!(names(&documents), vec!["Admin", "internal/models/Address", "User"]);
    assert_eq!(field_names(&documents[0]), vec!["Level"]);
}

#[test]
fn test_unparsable_candidate_is_skipped() {
    let tree = shop().with_file("internal/models/broken.go", "package models\n\ntype Broken struct {\n");

    let documents = DocBuilder::default()
        .resolve(&tree, "api/order.go", "Order")
        .expect("Unparsable sibling should be skipped");
    assert_eq!(documents.len(), 4);
}

#[test]
fn test_unknown_root_is_empty() {
    let builder = DocBuilder::default();
    assert!(builder.resolve(&shop(), "api/order.go", "Missing").unwrap().is_empty());

    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("limits.go", "package shop\n\nconst Max = 10\n");
    assert!(builder.resolve(&tree, "limits.go", "Max").unwrap().is_empty());
}

#[test]
fn test_root_parse_error_is_fatal() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("bad.go", "package shop\n\ntype Bad struct {\n\tName string\n");

    let err = DocBuilder::default().resolve(&tree, "bad.go", "Bad").unwrap_err();
    match err {
        GlossError::Parse { path, src, .. } => {
            assert_eq!(path.to_str(), Some("bad.go"));
            assert!(src.contains("type Bad"));
        }
        other => panic!("Expected parse error, got {other:?}"),
    }
}

#[test]
fn test_type_check_error_is_fatal() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("kind.go", "package shop\n\ntype Kind int\n\nconst First Kind = Unknown + 1\n");

    let err = DocBuilder::default().resolve(&tree, "kind.go", "Kind").unwrap_err();
    assert!(matches!(err, GlossError::TypeCheck { .. }), "got {err:?}");
}

#[test]
fn test_type_check_error_names_failing_file() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("kind.go", "package shop\n\ntype Kind int\n\nconst First Kind = base + 1\n")
        .with_file("limits.go", "package shop\n\nconst base = 1 / 0\n");

    let err = DocBuilder::default().resolve(&tree, "kind.go", "Kind").unwrap_err();
    match err {
        GlossError::TypeCheck { path, src, .. } => {
            assert_eq!(path.to_str(), Some("limits.go"));
            assert!(src.contains("1 / 0"));
        }
        other => panic!("Expected type check error, got {other:?}"),
    }
}

#[test]
fn test_unrelated_constant_failure_is_not_fatal() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file(
            "user.go",
            "package shop\n\ntype User struct {\n\tName string\n\tRole Role\n}\n\nconst Broken = 1 << 600\n",
        )
        .with_file("role.go", "package shop\n\ntype Role int\n\nconst Admin Role = 1\n")
        .with_file("quota.go", "package shop\n\ntype Quota uint8\n\nconst Max Quota = 300\n");

    let documents = DocBuilder::default().resolve(&tree, "user.go", "User").unwrap();
    assert_eq!(names(&documents), vec!["User", "Role"]);
    assert_eq!(field_names(&documents[1]), vec!["Admin"]);
}

fn platform_tree() -> MemoryTree {
    MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("sep.go", "package shop\n\n// Separator splits path elements.\ntype Separator rune\n")
        .with_file("sep_unix.go", "//go:build unix\n\npackage shop\n\nconst sep Separator = '/'\n")
        .with_file("sep_windows.go", "package shop\n\nconst sep Separator = '\\\\'\n")
        .with_file(
            "gen.go",
            "//go:build ignore\n\npackage main\n\ntype Separator string\n\nfunc main() {}\n",
        )
}

#[test]
fn test_build_constrained_files() {
    let tree = platform_tree();

    let linux = AppConfig::new(
        ResolveConfig::new(ConstScope::Package),
        OutputConfig::default(),
    );
    let documents = DocBuilder::new(linux).resolve(&tree, "sep.go", "Separator").unwrap();
    assert_eq!(documents[0].kind(), DocumentKind::Constants);
    assert_eq!(documents[0].underlying(), "rune");
    assert_eq!(documents[0].fields()[0].value(), "47");

    let windows = AppConfig::new(
        ResolveConfig::new(ConstScope::Package).with_target(BuildTarget::new("windows", "amd64", Vec::new())),
        OutputConfig::default(),
    );
    let documents = DocBuilder::new(windows).resolve(&tree, "sep.go", "Separator").unwrap();
    assert_eq!(documents[0].fields()[0].value(), "92");
}

#[test]
fn test_ignored_file_of_other_package() {
    let tree = platform_tree().with_file(
        "path.go",
        "package shop\n\ntype Path struct {\n\tSep Separator\n}\n",
    );

    let documents = DocBuilder::default().resolve(&tree, "path.go", "Path").unwrap();
    assert_eq!(names(&documents), vec!["Path", "Separator"]);
    assert_eq!(documents[1].underlying(), "rune");
}

#[test]
fn test_external_test_package_root() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("user.go", "package shop\n\ntype User struct {\n\tName string\n}\n")
        .with_file(
            "user_test.go",
            r#"package shop_test

import "example.com/shop"

type Fixture struct {
	User  shop.User
	Count Count
}

type Count int

const One Count = 1
"#,
        );

    let documents = DocBuilder::default().resolve(&tree, "user_test.go", "Fixture").unwrap();
    assert_eq!(names(&documents), vec!["Fixture", "User", "Count"]);
    assert_eq!(field_names(&documents[1]), vec!["Name"]);
    assert_eq!(field_names(&documents[2]), vec!["One"]);
}

#[test]
fn test_duplicate_declaration_first_match_wins() {
    let tree = MemoryTree::new()
        .with_file("go.mod", GO_MOD)
        .with_file("a_item.go", "package shop\n\ntype Item struct {\n\tTag Tag\n}\n")
        .with_file("b_tag.go", "package shop\n\ntype Tag string\n")
        .with_file("c_tag.go", "package shop\n\ntype Tag int\n\nconst Zero Tag = 0\n");

    let documents = DocBuilder::default().resolve(&tree, "a_item.go", "Item").unwrap();
    assert_eq!(names(&documents), vec!["Item", "Tag"]);
    assert_eq!(documents[1].kind(), DocumentKind::Named);
    assert_eq!(documents[1].underlying(), "string");
}

#[test]
fn test_missing_descriptor() {
    let tree = MemoryTree::new().with_file("main.go", "package main\n\ntype App struct{}\n");

    let err = DocBuilder::default().resolve(&tree, "main.go", "App").unwrap_err();
    assert!(matches!(err, GlossError::Config(ConfigError::MissingDescriptor(_))));
}

#[test]
fn test_render_formats() {
    let builder = DocBuilder::default();
    let documents = builder.resolve(&shop(), "api/order.go", "Order").unwrap();

    let markdown = builder.render(&documents, "Order").unwrap();
    assert!(markdown.starts_with("# Order\n## Order\n| Name | Type | Tag | Comment |\n"));
    assert!(markdown.contains("| Customer | models\\.Customer |  | who ordered |\n"));
    assert!(markdown.contains("## internal/models/Tier\nType: uint8\n\n| Name | Value | Comment |\n"));

    let config = AppConfig::new(
        ResolveConfig::default(),
        OutputConfig::new(OutputFormat::Json, Some("Shop API".to_string())),
    );
    let json = DocBuilder::new(config).render(&documents, "Order").unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["title"], "Shop API");
    assert_eq!(value["documents"].as_array().map(Vec::len), Some(4));
    assert_eq!(value["documents"][3]["kind"], "constants");
}

#[test]
fn test_resolve_from_disk() {
    let dir = tempdir().expect("Failed to create temp directory");
    fs::write(dir.path().join("go.mod"), GO_MOD).unwrap();
    fs::create_dir_all(dir.path().join("billing")).unwrap();
    fs::write(
        dir.path().join("billing/invoice.go"),
        "package billing\n\ntype Invoice struct {\n\tLines []Line\n}\n\ntype Line struct {\n\tAmount int64\n}\n",
    )
    .unwrap();
    fs::write(dir.path().join("billing/invoice_test.go"), "package billing\n\ntype Line struct{}\n").unwrap();

    let documents = DocBuilder::default()
        .resolve(&FsTree::new(dir.path()), "billing/invoice.go", "Invoice")
        .unwrap();
    assert_eq!(names(&documents), vec!["Invoice", "Line"]);
    assert_eq!(documents[0].fields()[0].signature(), "[]Line");
}
