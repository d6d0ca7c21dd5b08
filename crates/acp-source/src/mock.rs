//! Mock source reader for testing.
//!
//! Provides [`MockSource`] for unit testing without filesystem access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::SourceReader;
use crate::error::SourceError;

/// In-memory source reader for testing.
///
/// Stores documents in memory and counts reads per path, so tests can assert
/// how often a document was fetched.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use acp_source::{MockSource, SourceReader};
///
/// let source = MockSource::new()
///     .with_document("docs/setup.adoc", "= Setup Guide\n");
///
/// let text = source.read(Path::new("docs/setup.adoc")).unwrap();
/// assert_eq!(source.read_count(Path::new("docs/setup.adoc")), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    documents: RwLock<HashMap<PathBuf, String>>,
    reads: RwLock<HashMap<PathBuf, usize>>,
}

impl MockSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with the given path and content.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_document(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(path.into(), content.into());
        self
    }

    /// Number of times `path` has been read.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn read_count(&self, path: &Path) -> usize {
        self.reads.read().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl SourceReader for MockSource {
    fn read(&self, path: &Path) -> Result<String, SourceError> {
        *self
            .reads
            .write()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;
        self.documents
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::not_found(path))
    }
}
