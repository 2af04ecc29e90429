//! Access to the files of a Go module.
//!
//! All paths handed to a [`SourceTree`] are relative to the module root and
//! use `/` separators. The resolver never touches the filesystem directly,
//! so a module can be served from disk ([`FsTree`]) or from memory
//! ([`MemoryTree`]).

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

/// Read-only view of a module's files.
pub trait SourceTree {
    /// Read one file.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// List the regular files directly inside `dir`, as module-relative
    /// paths. Order is unspecified.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// A module on disk.
#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceTree for FsTree {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.root.join(path))
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.root.join(dir))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(dir.join(entry.file_name()));
            }
        }
        Ok(files)
    }
}

/// A module held in memory, keyed by module-relative path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use gloss::source::{MemoryTree, SourceTree};
///
/// let tree = MemoryTree::new()
///     .with_file("go.mod", "module example.com/app\n")
///     .with_file("models/user.go", "package models\n");
///
/// let files = tree.list(Path::new("models")).unwrap();
/// assert_eq!(files, vec![Path::new("models/user.go").to_path_buf()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl SourceTree for MemoryTree {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
