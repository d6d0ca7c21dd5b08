//! Filesystem source reader.

use std::path::Path;

use encoding_rs::Encoding;

use crate::SourceReader;
use crate::error::{SourceError, SourceErrorKind};

/// Reads source documents from the filesystem.
///
/// Bytes are decoded with the configured encoding. A byte order mark takes
/// precedence over the configured encoding. Malformed input is an error rather
/// than being replaced, so a wrong encoding setting never leaks replacement
/// characters into published pages.
#[derive(Debug, Clone, Copy)]
pub struct FsSource {
    encoding: &'static Encoding,
}

impl Default for FsSource {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl FsSource {
    /// Create a reader for the given encoding label (e.g. `utf-8`, `windows-1252`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceErrorKind::InvalidEncoding`] if the label is unknown.
    pub fn new(encoding_label: &str) -> Result<Self, SourceError> {
        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).ok_or_else(|| {
            SourceError::new(SourceErrorKind::InvalidEncoding)
                .with_message(format!("unknown encoding '{encoding_label}'"))
        })?;
        Ok(Self { encoding })
    }

    /// Name of the configured encoding.
    #[must_use]
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

impl SourceReader for FsSource {
    fn read(&self, path: &Path) -> Result<String, SourceError> {
        let bytes = std::fs::read(path).map_err(|e| SourceError::io(e, path))?;
        let (text, used, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            return Err(SourceError::new(SourceErrorKind::InvalidEncoding)
                .with_message(format!("malformed {} input", used.name()))
                .with_path(path));
        }
        Ok(text.into_owned())
    }
}
