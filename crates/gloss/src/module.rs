//! The Go module being documented.
//!
//! A [`Module`] reads `go.mod` once when it is opened and then answers two
//! questions for the resolver: which files of a package directory belong to
//! the configured build, and where an import path points to.

mod build;

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use gloss_parser::build_constraint::file_constraint;

use crate::{
    config::BuildTarget,
    error::{ConfigError, GlossError},
    source::SourceTree,
};

/// File name of the module descriptor.
pub const DESCRIPTOR: &str = "go.mod";

/// Where an import path leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A package inside the module: its non-test files in the build, sorted.
    Files(Vec<PathBuf>),
    /// Anything outside the module; never followed.
    External,
}

/// An opened Go module.
pub struct Module<'t> {
    tree: &'t dyn SourceTree,
    path: String,
    target: BuildTarget,
}

impl<'t> Module<'t> {
    /// Open the module served by `tree`, reading its `go.mod`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDescriptor`] when there is no `go.mod`
    /// and [`ConfigError::MalformedDescriptor`] when it has no usable
    /// `module` directive.
    pub fn open(tree: &'t dyn SourceTree) -> Result<Self, GlossError> {
        let descriptor = Path::new(DESCRIPTOR);
        let content = tree.read(descriptor).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => GlossError::from(ConfigError::MissingDescriptor(descriptor.to_path_buf())),
            _ => GlossError::Io(err),
        })?;

        let path = parse_descriptor(&content, descriptor)?;
        info!(module = path; "Opened module");
        Ok(Self {
            tree,
            path,
            target: BuildTarget::default(),
        })
    }

    /// Select package files for `target` instead of `linux/amd64`.
    pub fn with_target(mut self, target: BuildTarget) -> Self {
        self.target = target;
        self
    }

    /// The module path declared in `go.mod`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read a module-relative file.
    pub fn read(&self, path: &Path) -> Result<String, GlossError> {
        Ok(self.tree.read(path)?)
    }

    /// Non-test `.go` files directly inside `dir` that belong to the
    /// build, sorted by path.
    ///
    /// A file is left out when its name carries a `_GOOS`/`_GOARCH` suffix
    /// for another platform, or when the build constraint above its package
    /// clause does not hold. A directory that cannot be listed has no files.
    pub fn package_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = match self.tree.list(dir) {
            Ok(files) => files,
            Err(err) => {
                debug!(dir = dir.display().to_string(), err = err.to_string(); "Cannot list directory");
                return Vec::new();
            }
        };

        files.retain(|path| is_package_file(path) && self.in_build(path));
        files.sort();
        files
    }

    fn in_build(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        if !build::name_allows(&self.target, name) {
            debug!(path = path.display().to_string(), goos = self.target.goos(), goarch = self.target.goarch(); "Excluded by file name");
            return false;
        }

        // Unreadable files stay in; reading them later reports the error
        let Ok(source) = self.tree.read(path) else {
            return true;
        };
        match file_constraint(&source) {
            Ok(None) => true,
            Ok(Some(constraint)) => {
                let holds = build::constraint_allows(&self.target, &constraint);
                if !holds {
                    debug!(path = path.display().to_string(), constraint = constraint.to_string(); "Excluded by build constraint");
                }
                holds
            }
            Err(diagnostic) => {
                warn!(path = path.display().to_string(), err = diagnostic.to_string(); "Skipping file with malformed build constraint");
                false
            }
        }
    }

    /// Map an import path to the files it names.
    ///
    /// The module path itself and every path below it stay inside the
    /// module; everything else is external.
    pub fn resolve_import(&self, import_path: &str) -> ImportTarget {
        match self.import_dir(import_path) {
            Some(dir) => ImportTarget::Files(self.package_files(&dir)),
            None => ImportTarget::External,
        }
    }

    /// Module-relative directory of an import path inside the module.
    pub fn import_dir(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(PathBuf::new());
        }
        import_path
            .strip_prefix(self.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map(PathBuf::from)
    }
}

/// `.go` files the go tool reads: not tests, and not hidden by a leading
/// `_` or `.`.
fn is_package_file(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()).is_some_and(|name| {
        name.ends_with(".go") && !name.ends_with("_test.go") && !name.starts_with(['_', '.'])
    })
}

/// Extract the module path from `go.mod` content.
///
/// Accepts `module path`, a quoted path, and the parenthesized block form.
pub fn parse_descriptor(content: &str, path: &Path) -> Result<String, ConfigError> {
    let malformed = |line: usize, message: &str| ConfigError::MalformedDescriptor {
        path: path.to_path_buf(),
        line,
        message: message.to_string(),
    };

    let mut in_block = false;
    for (number, raw) in content.lines().enumerate() {
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let argument = if in_block {
            if line == ")" {
                return Err(malformed(number + 1, "empty module block"));
            }
            line
        } else if let Some(rest) = line.strip_prefix("module") {
            if !rest.is_empty() && !rest.starts_with([' ', '\t', '(']) {
                continue;
            }
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
                continue;
            }
            rest
        } else {
            continue;
        };

        let module = argument.trim_matches(|c| c == '"' || c == '`');
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(malformed(number + 1, "invalid module path"));
        }
        return Ok(module.to_string());
    }

    Err(malformed(content.lines().count().max(1), "no module directive"))
}

/// Package name assumed for an import without an explicit name when the
/// package's own files are not available.
///
/// This is the last path element, skipping a `/vN` major-version element and
/// dropping a `.vN` suffix (`gopkg.in/yaml.v3` gives `yaml`).
pub fn default_alias(import_path: &str) -> &str {
    let mut elements = import_path.rsplit('/');
    let mut last = elements.next().unwrap_or(import_path);

    if is_major_version(last) {
        if let Some(previous) = elements.next() {
            last = previous;
        }
    }

    match last.rsplit_once('.') {
        Some((head, version)) if !head.is_empty() && is_major_version(version) => head,
        _ => last,
    }
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTree;

    #[test]
    fn test_parse_descriptor_forms() {
        let path = Path::new("go.mod");
        assert_eq!(
            parse_descriptor("module example.com/app\n\ngo 1.22\n", path).unwrap(),
            "example.com/app"
        );
        assert_eq!(
            parse_descriptor("// comment\nmodule \"example.com/quoted\" // trailing\n", path).unwrap(),
            "example.com/quoted"
        );
        assert_eq!(
            parse_descriptor("module (\n\texample.com/block\n)\n", path).unwrap(),
            "example.com/block"
        );
    }

    #[test]
    fn test_parse_descriptor_errors() {
        let path = Path::new("go.mod");
        assert!(matches!(
            parse_descriptor("go 1.22\n", path),
            Err(ConfigError::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            parse_descriptor("module\n", path),
            Err(ConfigError::MalformedDescriptor { line: 1, .. })
        ));
        // `modules` is not the module directive
        assert!(parse_descriptor("modules x\n", path).is_err());
    }

    #[test]
    fn test_default_alias() {
        assert_eq!(default_alias("time"), "time");
        assert_eq!(default_alias("encoding/json"), "json");
        assert_eq!(default_alias("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(default_alias("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(default_alias("example.com/v2"), "example.com");
    }

    #[test]
    fn test_open_missing_descriptor() {
        let tree = MemoryTree::new();
        let err = Module::open(&tree).err().unwrap();
        assert!(matches!(err, GlossError::Config(ConfigError::MissingDescriptor(_))));
    }

    #[test]
    fn test_resolve_import() {
        let tree = MemoryTree::new()
            .with_file("go.mod", "module example.com/app\n")
            .with_file("main.go", "package main\n")
            .with_file("internal/models/user.go", "package models\n")
            .with_file("internal/models/account.go", "package models\n")
            .with_file("internal/models/user_test.go", "package models\n")
            .with_file("internal/models/README.md", "docs\n");
        let module = Module::open(&tree).unwrap();

        assert_eq!(
            module.resolve_import("example.com/app/internal/models"),
            ImportTarget::Files(vec![
                PathBuf::from("internal/models/account.go"),
                PathBuf::from("internal/models/user.go"),
            ])
        );
        assert_eq!(
            module.resolve_import("example.com/app"),
            ImportTarget::Files(vec![PathBuf::from("main.go")])
        );
        assert_eq!(module.resolve_import("example.com/application"), ImportTarget::External);
        assert_eq!(module.resolve_import("time"), ImportTarget::External);
    }

    fn platform_tree() -> MemoryTree {
        MemoryTree::new()
            .with_file("go.mod", "module example.com/app\n")
            .with_file("fs/fs.go", "package fs\n")
            .with_file("fs/path_unix.go", "//go:build unix\n\npackage fs\n\nconst sep = '/'\n")
            .with_file("fs/path_windows.go", "package fs\n\nconst sep = '\\\\'\n")
            .with_file("fs/gen.go", "//go:build ignore\n\npackage main\n")
            .with_file("fs/legacy.go", "// +build linux,cgo\n\npackage fs\n")
            .with_file("fs/broken.go", "//go:build linux &&\n\npackage fs\n")
            .with_file("fs/_scratch.go", "package fs\n")
    }

    #[test]
    fn test_package_files_follow_build_constraints() {
        let tree = platform_tree();
        let module = Module::open(&tree).unwrap();
        assert_eq!(
            module.package_files(Path::new("fs")),
            vec![PathBuf::from("fs/fs.go"), PathBuf::from("fs/path_unix.go")]
        );

        let windows = BuildTarget::new("windows", "amd64", vec!["cgo".to_string()]);
        let module = Module::open(&tree).unwrap().with_target(windows);
        assert_eq!(
            module.package_files(Path::new("fs")),
            vec![PathBuf::from("fs/fs.go"), PathBuf::from("fs/path_windows.go")]
        );

        let cgo = BuildTarget::new("linux", "arm64", vec!["cgo".to_string()]);
        let module = Module::open(&tree).unwrap().with_target(cgo);
        assert_eq!(
            module.package_files(Path::new("fs")),
            vec![
                PathBuf::from("fs/fs.go"),
                PathBuf::from("fs/legacy.go"),
                PathBuf::from("fs/path_unix.go"),
            ]
        );
    }
}
