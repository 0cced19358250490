//! Grammar location resolution
//!
//! A referenced grammar path is tried, in order:
//! 1. verbatim,
//! 2. relative to the directory of the including grammar,
//! 3. relative to each configured search directory.
//!
//! The first candidate that exists wins.

use std::path::{Path, PathBuf};

use crate::loaders::FileSystem;

/// Where a grammar comes from
#[derive(Debug, Clone)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// Inline grammar text (no file behind it)
    String(String),
}

impl Location {
    /// Get the location as a string for diagnostics
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::String(_) => "<inline grammar>".to_string(),
        }
    }

    /// Directory against which relative includes are resolved
    pub fn base_dir(&self) -> PathBuf {
        match self {
            Location::Path(p) => p
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            Location::String(_) => PathBuf::from("."),
        }
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Find the first existing candidate path for `href`
pub fn lookup<F: FileSystem + ?Sized>(
    fs: &F,
    href: &str,
    current_dir: Option<&Path>,
    search_dirs: &[PathBuf],
) -> Option<PathBuf> {
    let direct = PathBuf::from(href);
    if fs.exists(&direct) {
        return Some(direct);
    }

    if let Some(dir) = current_dir {
        let candidate = dir.join(href);
        if fs.exists(&candidate) {
            return Some(candidate);
        }
    }

    search_dirs
        .iter()
        .map(|dir| dir.join(href))
        .find(|candidate| fs.exists(candidate))
}
