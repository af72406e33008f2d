//! File content providers.
//!
//! The scanner never touches the filesystem directly. Every `#include`, forced
//! include and macro file goes through a [`FileContentProvider`], so callers
//! can serve editor buffers or test fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Source of file contents for the scanner.
pub trait FileContentProvider: Send + Sync {
    /// Contents of `path`, or `None` when it cannot be read.
    fn read(&self, path: &Path) -> Option<Arc<str>>;

    /// Whether `path` names a readable file.
    fn exists(&self, path: &Path) -> bool {
        self.read(path).is_some()
    }
}

/// Reads from disk, caching every lookup (including misses) for the life of
/// the provider.
#[derive(Default)]
pub struct FsContentProvider {
    cache: Mutex<FxHashMap<PathBuf, Option<Arc<str>>>>,
}

impl FsContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached entry, e.g. after files changed on disk.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }
}

impl FileContentProvider for FsContentProvider {
    fn read(&self, path: &Path) -> Option<Arc<str>> {
        if let Some(cached) = self.cache.lock().get(path) {
            return cached.clone();
        }
        // Read outside the lock; a racing reader just repeats the work.
        let contents = match std::fs::read(path) {
            Ok(bytes) => Some(Arc::from(String::from_utf8_lossy(&bytes).as_ref())),
            Err(err) => {
                tracing::trace!(path = %path.display(), %err, "unreadable file");
                None
            }
        };
        self.cache
            .lock()
            .insert(path.to_path_buf(), contents.clone());
        contents
    }

    fn exists(&self, path: &Path) -> bool {
        if let Some(cached) = self.cache.lock().get(path) {
            return cached.is_some();
        }
        path.is_file()
    }
}

/// In-memory file system for tests and unsaved editor buffers.
#[derive(Default, Clone)]
pub struct InMemoryProvider {
    files: FxHashMap<PathBuf, Arc<str>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, contents: &str) -> &mut Self {
        self.files.insert(path.into(), Arc::from(contents));
        self
    }

    pub fn with(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.add(path, contents);
        self
    }
}

impl FileContentProvider for InMemoryProvider {
    fn read(&self, path: &Path) -> Option<Arc<str>> {
        self.files.get(path).cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
