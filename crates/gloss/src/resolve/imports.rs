//! Per-file import tables.

use indexmap::IndexMap;
use log::debug;

use gloss_core::identifier::Id;
use gloss_parser::{SourceFile, parse_file};

use crate::module::{ImportTarget, Module, default_alias};

/// Import aliases of one file, mapped to where they lead.
#[derive(Debug, Default)]
pub struct ImportTable {
    entries: IndexMap<Id, ImportTarget>,
}

impl ImportTable {
    /// Build the table for `file`.
    ///
    /// An explicit import name wins. Otherwise an import inside the module
    /// is known by the package clause of its first parsable file, and any
    /// other import by [`default_alias`]. Blank and dot imports bind no
    /// alias. When two imports bind the same alias the first one is kept.
    pub fn build(file: &SourceFile, module: &Module<'_>) -> Self {
        let mut entries = IndexMap::new();

        for import in &file.imports {
            let target = module.resolve_import(import.path.inner());

            let alias = match &import.name {
                Some(name) if name.is_blank() => continue,
                Some(name) if **name == "." => {
                    debug!(path = import.path.inner(); "Dot import is not followed");
                    continue;
                }
                Some(name) => *name.inner(),
                None => match &target {
                    ImportTarget::Files(files) => package_name(files, module)
                        .unwrap_or_else(|| Id::new(default_alias(import.path.inner()))),
                    ImportTarget::External => Id::new(default_alias(import.path.inner())),
                },
            };

            entries.entry(alias).or_insert(target);
        }

        Self { entries }
    }

    pub fn get(&self, alias: Id) -> Option<&ImportTarget> {
        self.entries.get(&alias)
    }
}

/// Package clause of the first file in `files` that parses.
fn package_name(files: &[std::path::PathBuf], module: &Module<'_>) -> Option<Id> {
    files.iter().find_map(|path| {
        let source = module.read(path).ok()?;
        match parse_file(&source) {
            Ok(parsed) => Some(*parsed.package.inner()),
            Err(err) => {
                debug!(path = path.display().to_string(), err = err.to_string(); "Skipping unparsable import candidate");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::source::MemoryTree;

    #[test]
    fn test_aliases() {
        let tree = MemoryTree::new()
            .with_file("go.mod", "module example.com/app\n")
            .with_file("internal/store/db.go", "package storage\n")
            .with_file("pkg/v2/api.go", "package api\n");
        let module = Module::open(&tree).unwrap();

        let file = parse_file(
            r#"package main

import (
	"time"
	"example.com/app/internal/store"
	web "example.com/app/pkg/v2"
	_ "example.com/app/pkg/v2"
	. "strings"
	yaml "gopkg.in/yaml.v3"
)
"#,
        )
        .unwrap();
        let table = ImportTable::build(&file, &module);

        assert_eq!(table.get(Id::new("time")), Some(&ImportTarget::External));
        assert_eq!(
            table.get(Id::new("storage")),
            Some(&ImportTarget::Files(vec![PathBuf::from("internal/store/db.go")]))
        );
        assert!(table.get(Id::new("store")).is_none());
        assert_eq!(
            table.get(Id::new("web")),
            Some(&ImportTarget::Files(vec![PathBuf::from("pkg/v2/api.go")]))
        );
        assert_eq!(table.get(Id::new("yaml")), Some(&ImportTarget::External));
        assert!(table.get(Id::new("strings")).is_none());
        assert!(table.get(Id::new("_")).is_none());
    }

    #[test]
    fn test_unparsable_package_falls_back_to_path() {
        let tree = MemoryTree::new()
            .with_file("go.mod", "module example.com/app\n")
            .with_file("models/broken.go", "type X struct {\n");
        let module = Module::open(&tree).unwrap();
        let file = parse_file("package main\n\nimport \"example.com/app/models\"\n").unwrap();

        let table = ImportTable::build(&file, &module);
        assert!(matches!(table.get(Id::new("models")), Some(ImportTarget::Files(_))));
    }
}
