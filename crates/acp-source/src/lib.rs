//! Source document access for ACP.
//!
//! This crate provides a [`SourceReader`] trait for reading AsciiDoc documents
//! from the page tree. Conversion only ever reads; nothing here writes.
//!
//! - [`FsSource`] reads from the filesystem and decodes with a configurable
//!   text encoding
//! - [`MockSource`] serves documents from memory (behind the `mock` feature)
//! - [`scan_documents`] lists the `.adoc` files under a root directory
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use acp_source::{FsSource, SourceReader};
//!
//! let source = FsSource::new("utf-8")?;
//! let text = source.read(Path::new("docs/intro.adoc"))?;
//! ```

mod error;
mod fs;
#[cfg(feature = "mock")]
mod mock;
mod scanner;

pub use error::{SourceError, SourceErrorKind};
pub use fs::FsSource;
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use scanner::{SOURCE_EXTENSION, scan_documents};

use std::path::Path;

/// Read access to source documents.
///
/// Implementations must be safe to share between conversion threads.
pub trait SourceReader: Send + Sync {
    /// Read the full text of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] with [`SourceErrorKind::NotFound`] if the
    /// document does not exist, or another kind if it can't be read or decoded.
    fn read(&self, path: &Path) -> Result<String, SourceError>;
}
