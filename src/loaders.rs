//! Grammar loading
//!
//! The loader reads an entry grammar and splices every `<include>` it finds
//! with the children of the referenced grammar's `<grammar>` element. Includes
//! are expanded depth-first, so an included grammar's own includes are
//! resolved before its content lands in the includer.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::grammar::tree::{GrammarTree, NodeId};
use crate::limits::Limits;
use crate::locations::{lookup, Location};

/// Read access to grammar files
pub trait FileSystem {
    /// Read a whole file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Check whether a file exists
    fn exists(&self, path: &Path) -> bool;
}

/// The real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory file system, keyed by normalized relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, String>,
}

impl MemoryFileSystem {
    /// Create an empty file system
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), content.into());
    }

    /// Builder-style variant of [`MemoryFileSystem::insert`]
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

// `./lib/a.rng`, `lib/a.rng` and `/lib/a.rng` name the same file, and so do
// `lib/../a.rng` and `a.rng`.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(_) => parts.push(component),
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            }
            _ => {}
        }
    }
    parts.iter().collect()
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| Error::Resolution(format!("file does not exist: {}", path.display())))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }
}

/// Resource loader for grammars
#[derive(Debug)]
pub struct Loader<F: FileSystem = OsFileSystem> {
    fs: F,
    search_dirs: Vec<PathBuf>,
    limits: Limits,
}

impl Loader<OsFileSystem> {
    /// Create a loader over the real file system
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self::with_file_system(OsFileSystem, search_dirs)
    }
}

impl<F: FileSystem> Loader<F> {
    /// Create a loader over a custom file system
    pub fn with_file_system(fs: F, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            fs,
            search_dirs,
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Locate the entry grammar and load it with all includes expanded
    pub fn load_entry(&self, entry: impl AsRef<Path>) -> Result<GrammarTree> {
        let entry = entry.as_ref();
        let href = entry.to_string_lossy();
        let path = lookup(&self.fs, &href, None, &self.search_dirs)
            .ok_or_else(|| Error::Resolution(format!("could not find grammar '{}'", href)))?;
        self.load(&Location::Path(path))
    }

    /// Load a grammar from a location with all includes expanded
    pub fn load(&self, location: &Location) -> Result<GrammarTree> {
        self.load_at_depth(location, 0)
    }

    fn load_at_depth(&self, location: &Location, depth: usize) -> Result<GrammarTree> {
        self.limits.check_include_depth(depth)?;

        let text = match location {
            Location::Path(path) => self.fs.read_to_string(path)?,
            Location::String(s) => s.clone(),
        };
        self.limits.check_grammar_size(text.len())?;

        let mut tree = GrammarTree::parse(&text).map_err(|e| match e {
            Error::Parse(pe) => Error::Parse(pe.with_location(location.as_str())),
            other => other,
        })?;
        let grammar = tree.find_grammar().ok_or_else(|| {
            Error::Resolution(format!("no <grammar> element found in {}", location.as_str()))
        })?;

        self.expand_includes(&mut tree, grammar, location, depth)?;
        Ok(tree)
    }

    fn expand_includes(
        &self,
        tree: &mut GrammarTree,
        grammar: NodeId,
        location: &Location,
        depth: usize,
    ) -> Result<()> {
        let current_dir = location.base_dir();

        for include in tree.find_all(grammar, "include") {
            let href = tree.attr(include, "href").map(str::to_string).ok_or_else(|| {
                Error::Resolution(format!("<include> without href in {}", location.as_str()))
            })?;
            let href = href.as_str();
            let path = lookup(&self.fs, href, Some(&current_dir), &self.search_dirs)
                .ok_or_else(|| {
                    Error::Resolution(format!(
                        "could not find '{}' included from {}",
                        href,
                        location.as_str()
                    ))
                })?;
            debug!(href, path = %path.display(), "resolved include");

            let included = self.load_at_depth(&Location::Path(path), depth + 1)?;
            let included_grammar = included
                .find_grammar()
                .ok_or_else(|| Error::Resolution(format!("no <grammar> element found in {}", href)))?;

            let Some(parent) = tree.parent(include) else {
                continue;
            };
            for &child in included.children(included_grammar) {
                let copy = tree.import(&included, child);
                tree.insert_before(parent, copy, include);
            }
            tree.detach(include);
        }
        Ok(())
    }
}
