//! Closure resolution.
//!
//! A [`Resolver`] starts from one type declaration and follows every type
//! reference it contains, across files and packages of the module, until
//! the closure of referenced declarations is documented.
//!
//! Expansion is depth-first and iterative: each [`Frame`] holds the file a
//! document was found in and the references still to follow from it. A
//! document is recorded, and receives its discovery index, before any of its
//! references are followed, so recursive types terminate.

mod constants;
mod declaration;
mod flatten;
mod format;
mod imports;

use std::{
    cell::OnceCell,
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    rc::Rc,
};

use indexmap::IndexMap;
use log::{debug, info, trace, warn};

use gloss_core::{document::Document, identifier::Id, reference::Reference};
use gloss_parser::{PackageInfo, SourceFile, check_package, parse_file};

use crate::{
    config::{ConstScope, ResolveConfig},
    error::GlossError,
    module::{ImportTarget, Module},
};

use imports::ImportTable;

/// State of one qualified name.
#[derive(Debug)]
enum Slot {
    /// Recorded, whether or not its references have been followed yet.
    Present(Document),
    /// Looked up and not found.
    Absent,
}

impl Slot {
    fn into_document(self) -> Option<Document> {
        match self {
            Self::Present(document) => Some(document),
            Self::Absent => None,
        }
    }
}

/// One parsed file of a package.
struct PackageFile {
    path: PathBuf,
    text: String,
    syntax: SourceFile,
    imports: OnceCell<ImportTable>,
}

impl PackageFile {
    fn new(path: PathBuf, text: String, syntax: SourceFile) -> Self {
        Self {
            path,
            text,
            syntax,
            imports: OnceCell::new(),
        }
    }
}

/// The parsable files of one package in a directory.
struct Package {
    /// Qualified-name prefix of the package's documents.
    prefix: String,
    /// Files sharing one package clause, sorted by path.
    files: Vec<PackageFile>,
    info: OnceCell<PackageInfo>,
}

impl Package {
    fn file_index(&self, path: &Path) -> Option<usize> {
        self.files.iter().position(|file| file.path == path)
    }

    /// Checked package facts, computed on first use.
    fn info(&self) -> &PackageInfo {
        self.info.get_or_init(|| {
            let sources: Vec<&SourceFile> = self.files.iter().map(|file| &file.syntax).collect();
            let info = check_package(&sources);
            for (file, warning) in info.warnings() {
                warn!(path = self.files[file].path.display().to_string(), warning = warning.to_string(); "Package check warning");
            }
            info
        })
    }

    /// Fail when constants of group `symbol` could not be evaluated.
    ///
    /// `file` limits the group to the constants of one file.
    fn check_group(&self, symbol: &str, file: Option<usize>) -> Result<(), GlossError> {
        match self.info().group_error(symbol, file) {
            Some(err) => {
                let failing = &self.files[err.file_index()];
                Err(GlossError::new_type_check_error(err, &failing.path, failing.text.as_str()))
            }
            None => Ok(()),
        }
    }
}

/// A document whose references are being followed.
struct Frame {
    package: Rc<Package>,
    file: usize,
    pending: VecDeque<Reference>,
}

/// Resolves the documentation closure of one root declaration.
///
/// A resolver is consumed by [`Resolver::resolve`]; every run starts from
/// an empty visited set.
pub struct Resolver<'a> {
    module: &'a Module<'a>,
    config: &'a ResolveConfig,
    root_dir: PathBuf,
    visited: IndexMap<String, Slot>,
    next_index: usize,
    /// Keyed by directory and, for the root's package, its package clause.
    packages: HashMap<(PathBuf, Option<Id>), Rc<Package>>,
}

impl<'a> Resolver<'a> {
    pub fn new(module: &'a Module<'a>, config: &'a ResolveConfig) -> Self {
        Self {
            module,
            config,
            root_dir: PathBuf::new(),
            visited: IndexMap::new(),
            next_index: 0,
            packages: HashMap::new(),
        }
    }

    /// Resolve `name` declared in `root_file` and everything it references.
    ///
    /// Documents are returned in discovery order. A root name that the file
    /// does not declare as a type gives an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`GlossError::Parse`] when the root file does not parse and
    /// [`GlossError::TypeCheck`] when the constants of a documented scalar
    /// type cannot be evaluated.
    pub fn resolve(mut self, root_file: &Path, name: &str) -> Result<Vec<Document>, GlossError> {
        let text = self.module.read(root_file)?;
        let syntax = parse_file(&text)
            .map_err(|err| GlossError::new_parse_error(err, root_file, text.as_str()))?;

        if syntax.lookup(name).is_none() {
            info!(file = root_file.display().to_string(), name = name; "Root name is not declared");
            return Ok(Vec::new());
        }

        self.root_dir = parent_dir(root_file);
        let root_dir = self.root_dir.clone();
        let root = PackageFile::new(root_file.to_path_buf(), text, syntax);
        let package = self.load_package(&root_dir, Some(root))?;
        let Some(file) = package.file_index(root_file) else {
            return Ok(Vec::new());
        };

        let mut stack = Vec::new();
        if let Some(frame) = self.enter(package, file, name)? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(reference) = frame.pending.pop_front() else {
                stack.pop();
                continue;
            };

            let package = Rc::clone(&frame.package);
            let file = frame.file;
            let next = match reference {
                Reference::Local(symbol) => self.follow_local(package, file, symbol)?,
                Reference::Qualified { alias, symbol } => {
                    self.follow_qualified(&package, file, alias, symbol)?
                }
            };
            if let Some(next) = next {
                stack.push(next);
            }
        }

        let mut documents: Vec<Document> = self
            .visited
            .into_values()
            .filter_map(Slot::into_document)
            .collect();
        documents.sort_by_key(Document::index);

        info!(root = name, documents = documents.len(); "Resolved closure");
        Ok(documents)
    }

    /// Follow an unqualified reference: the current file first, then the
    /// other files of its package in path order.
    fn follow_local(
        &mut self,
        package: Rc<Package>,
        file: usize,
        symbol: Id,
    ) -> Result<Option<Frame>, GlossError> {
        let symbol = symbol.to_string();
        let key = qualify(&package.prefix, &symbol);
        if self.visited.contains_key(&key) {
            return Ok(None);
        }

        let found = std::iter::once(file)
            .chain((0..package.files.len()).filter(|&other| other != file))
            .find(|&candidate| package.files[candidate].syntax.lookup(&symbol).is_some());

        match found {
            Some(found) => self.enter(package, found, &symbol),
            None => {
                debug!(name = key; "Lookup miss");
                self.visited.insert(key, Slot::Absent);
                Ok(None)
            }
        }
    }

    /// Follow an `alias.Name` reference through the import table of `file`.
    ///
    /// External packages and unknown aliases are dropped.
    fn follow_qualified(
        &mut self,
        package: &Package,
        file: usize,
        alias: Id,
        symbol: Id,
    ) -> Result<Option<Frame>, GlossError> {
        let module = self.module;
        let origin = &package.files[file];
        let imports = origin
            .imports
            .get_or_init(|| ImportTable::build(&origin.syntax, module));

        let candidates = match imports.get(alias) {
            Some(ImportTarget::Files(candidates)) => candidates.clone(),
            Some(ImportTarget::External) => {
                debug!(alias = alias.to_string(), name = symbol.to_string(); "Dropping external reference");
                return Ok(None);
            }
            None => {
                debug!(alias = alias.to_string(), file = origin.path.display().to_string(); "Unknown import alias");
                return Ok(None);
            }
        };
        let Some(dir) = candidates.first().map(|path| parent_dir(path)) else {
            debug!(alias = alias.to_string(); "Imported package has no files");
            return Ok(None);
        };

        let target = self.load_package(&dir, None)?;
        let symbol = symbol.to_string();
        let key = qualify(&target.prefix, &symbol);
        if self.visited.contains_key(&key) {
            return Ok(None);
        }

        let found = candidates.iter().find_map(|path| {
            target
                .file_index(path)
                .filter(|&index| target.files[index].syntax.lookup(&symbol).is_some())
        });

        match found {
            Some(found) => self.enter(target, found, &symbol),
            None => {
                debug!(name = key; "Lookup miss");
                self.visited.insert(key, Slot::Absent);
                Ok(None)
            }
        }
    }

    /// Record the document for `symbol` declared in `file` and return the
    /// frame that follows its references.
    fn enter(
        &mut self,
        package: Rc<Package>,
        file: usize,
        symbol: &str,
    ) -> Result<Option<Frame>, GlossError> {
        let key = qualify(&package.prefix, symbol);
        let origin = &package.files[file];

        let Some(declaration) = declaration::resolve(symbol, &origin.syntax) else {
            debug!(name = key, file = origin.path.display().to_string(); "Not a type declaration");
            self.visited.insert(key, Slot::Absent);
            return Ok(None);
        };

        let document = match &declaration.scalar {
            Some(scalar) => {
                let (sources, scope): (Vec<&SourceFile>, _) = match self.config.const_scope() {
                    ConstScope::File => (vec![&origin.syntax], Some(file)),
                    ConstScope::Package => (package.files.iter().map(|file| &file.syntax).collect(), None),
                };
                package.check_group(symbol, scope)?;
                let mut groups = constants::extract(&sources, package.info());
                match groups.swap_remove(symbol) {
                    Some(group) => {
                        debug!(name = key, scalar = scalar.as_str(), constants = group.fields().len(); "Using constant group");
                        group
                    }
                    None => declaration.document,
                }
            }
            None => declaration.document,
        };

        let index = self.next_index;
        self.next_index += 1;
        let document = document.placed(key.as_str(), index);

        debug!(name = key, index = index, file = origin.path.display().to_string(); "Resolved declaration");
        trace!(document:? = document; "Document");

        self.visited.insert(key, Slot::Present(document));
        Ok(Some(Frame {
            package,
            file,
            pending: declaration.references.into(),
        }))
    }

    /// Parse the files of one package in `dir` once per run.
    ///
    /// Files that fail to parse are skipped. `root` is the already parsed
    /// root file, which joins its package even when it is a test file; its
    /// package clause selects the package. Without a root the directory's
    /// first package clause that is not an external test package wins.
    /// Files declaring another package are left out.
    fn load_package(&mut self, dir: &Path, root: Option<PackageFile>) -> Result<Rc<Package>, GlossError> {
        let root_clause = root.as_ref().map(|root| *root.syntax.package.inner());
        let cache_key = (dir.to_path_buf(), root_clause);
        if let Some(package) = self.packages.get(&cache_key) {
            return Ok(Rc::clone(package));
        }

        let mut paths = self.module.package_files(dir);
        let mut files = Vec::with_capacity(paths.len() + 1);
        if let Some(root) = root {
            paths.retain(|path| *path != root.path);
            files.push(root);
        }

        for path in paths {
            let text = self.module.read(&path)?;
            match parse_file(&text) {
                Ok(syntax) => files.push(PackageFile::new(path, text, syntax)),
                Err(err) => {
                    let phase = err
                        .diagnostics()
                        .first()
                        .and_then(|diagnostic| diagnostic.code())
                        .map_or("parser", |code| code.phase());
                    warn!(path = path.display().to_string(), phase = phase, err = err.to_string(); "Skipping file that does not parse");
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        if let Some(clause) = root_clause.or_else(|| package_clause(&files)) {
            files.retain(|file| {
                let same = *file.syntax.package.inner() == clause;
                if !same {
                    debug!(
                        path = file.path.display().to_string(),
                        package = file.syntax.package.to_string(),
                        expected = clause.to_string();
                        "Leaving out file of another package"
                    );
                }
                same
            });
        }

        let prefix = self.prefix(dir);
        debug!(dir = dir.display().to_string(), prefix = prefix.as_str(), files = files.len(); "Loaded package");

        let package = Rc::new(Package {
            prefix,
            files,
            info: OnceCell::new(),
        });
        self.packages.insert(cache_key, Rc::clone(&package));
        Ok(package)
    }

    /// Module-relative directory with `/` separators; empty for the root
    /// file's own directory.
    fn prefix(&self, dir: &Path) -> String {
        if dir == self.root_dir {
            return String::new();
        }
        dir.iter()
            .map(|component| component.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The package a directory documents when no root file selects one: the
/// first clause that is not an external test package.
fn package_clause(files: &[PackageFile]) -> Option<Id> {
    let clauses = || files.iter().map(|file| *file.syntax.package.inner());
    clauses()
        .find(|clause| !clause.to_string().ends_with("_test"))
        .or_else(|| clauses().next())
}

fn qualify(prefix: &str, symbol: &str) -> String {
    if prefix.is_empty() {
        symbol.to_string()
    } else {
        format!("{prefix}/{symbol}")
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
