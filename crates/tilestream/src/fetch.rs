//! The transport boundary.
//!
//! The scheduler only ever asks for "the bytes at this path"; every
//! transport (filesystem, HTTP, archive, in-memory test data)
//! implements [`Fetcher`] and the core never learns which one it got.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Byte-level access to tile data, keyed by relative path.
pub trait Fetcher: Send + Sync {
    /// Fetch the full contents at `path`.
    ///
    /// A missing or unreadable path is an [`Error::Resource`]; the
    /// scheduler recovers from it at tile granularity.
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Reads tile data from a base directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    /// Create a fetcher rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.base.join(path);
        std::fs::read(&full).map_err(|e| Error::Resource {
            path: full.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Serves tile data from an in-memory map.
///
/// Used by tests and by hosts that already hold the container bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `path`.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| Error::Resource {
            path: path.to_string(),
            message: "not found".to_string(),
        })
    }
}

/// Join a directory and a relative path with forward slashes.
#[must_use]
pub(crate) fn join_path(dir: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches(['/', '\\']);
    if dir.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{rel}", dir.trim_end_matches('/'))
    }
}

/// Directory part of a path, empty when there is none.
#[must_use]
pub(crate) fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}
