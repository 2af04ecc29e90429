//! Gloss - Documentation for Go types and everything they reference.
//!
//! Starting from one type declaration in a Go module, gloss follows every
//! type reference across files and packages of the module, collects the
//! constants that enumerate scalar types, and renders the resulting ordered
//! document list as Markdown or JSON.

pub mod config;
pub mod module;
pub mod source;

mod error;
mod export;
mod resolve;

pub use gloss_core::{document, identifier, reference};

pub use error::{ConfigError, GlossError};

use std::path::Path;

use log::{debug, info, trace};

use config::AppConfig;
use document::Document;
use module::Module;
use resolve::Resolver;
use source::SourceTree;

/// Builder for resolving and rendering Go type documentation.
///
/// # Examples
///
/// ```rust
/// use gloss::{DocBuilder, source::MemoryTree};
///
/// let tree = MemoryTree::new()
///     .with_file("go.mod", "module example.com/app\n")
///     .with_file(
///         "models/user.go",
///         "package models\n\ntype User struct {\n\tName string\n\tRole Role\n}\n\ntype Role string\n",
///     );
///
/// let builder = DocBuilder::default();
/// let documents = builder
///     .resolve(&tree, "models/user.go", "User")
///     .expect("Failed to resolve");
/// assert_eq!(documents.len(), 2);
///
/// let markdown = builder.render(&documents, "User").expect("Failed to render");
/// assert!(markdown.starts_with("# User\n## User\n"));
/// ```
#[derive(Debug, Default)]
pub struct DocBuilder {
    config: AppConfig,
}

impl DocBuilder {
    /// Create a new builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve `name`, declared in `root_file`, and everything it references.
    ///
    /// `root_file` is relative to the root of `tree`, which must hold the
    /// module's `go.mod`. Each call is an independent run.
    ///
    /// # Errors
    ///
    /// Returns `GlossError` when the module descriptor is missing or
    /// malformed, when the root file cannot be read or parsed, or when the
    /// constants of a resolved scalar type cannot be evaluated.
    pub fn resolve(
        &self,
        tree: &dyn SourceTree,
        root_file: impl AsRef<Path>,
        name: &str,
    ) -> Result<Vec<Document>, GlossError> {
        let root_file = root_file.as_ref();
        info!(file = root_file.display().to_string(), name = name; "Resolving documentation");

        let module = Module::open(tree)?.with_target(self.config.resolve().target().clone());
        let documents = Resolver::new(&module, self.config.resolve()).resolve(root_file, name)?;

        debug!(documents = documents.len(); "Documentation resolved");
        trace!(documents:?; "Resolved documents");
        Ok(documents)
    }

    /// Render documents in the configured output format.
    ///
    /// The configured title takes precedence over `default_title`.
    ///
    /// # Errors
    ///
    /// Returns `GlossError::Export` when rendering fails.
    pub fn render(&self, documents: &[Document], default_title: &str) -> Result<String, GlossError> {
        let output = self.config.output();
        let title = output.title().unwrap_or(default_title);
        info!(format = output.format().to_string(), title = title; "Rendering documentation");

        let rendered = export::exporter(output.format()).export(title, documents)?;
        Ok(rendered)
    }
}
