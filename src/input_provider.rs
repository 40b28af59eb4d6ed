//! # Input providers
//!
//! Abstracts where `.jr` source text comes from so the import driver never
//! touches the filesystem directly. Two implementations are provided: one
//! rooted at a directory on disk, and one backed by an in-memory map for
//! tests and embedded callers.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::CompileError;

/// Resolves an `import "name";` reference to source text.
pub trait InputProvider {
    /// Returns the full source text for `name`, or an error if it cannot be
    /// located.
    fn read(&self, name: &str) -> Result<String, CompileError>;
}

/// Resolves imports against files under a root directory, appending `.jr`
/// if `name` doesn't already carry an extension.
pub struct FileSystemInputProvider {
    root: PathBuf,
}

impl FileSystemInputProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSystemInputProvider { root: root.into() }
    }

    fn resolve_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.join(name);
        if path.extension().is_none() {
            path.set_extension("jr");
        }
        path
    }
}

impl InputProvider for FileSystemInputProvider {
    fn read(&self, name: &str) -> Result<String, CompileError> {
        let path = self.resolve_path(name);
        fs::read_to_string(&path).map_err(|_| CompileError::ImportNotFound(name.to_string()))
    }
}

/// Resolves imports against an in-memory name-to-source map. Useful for
/// tests and for callers that already have every file's content loaded.
#[derive(Debug, Clone, Default)]
pub struct MapInputProvider {
    files: HashMap<String, String>,
}

impl MapInputProvider {
    pub fn new() -> Self {
        MapInputProvider::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.insert(name.into(), source.into());
        self
    }
}

impl InputProvider for MapInputProvider {
    fn read(&self, name: &str) -> Result<String, CompileError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::ImportNotFound(name.to_string()))
    }
}
