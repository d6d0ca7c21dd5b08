//! Page conversion workflow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use acp_renderer::{RenderEngine, RenderOptions, extract_title};
use acp_source::SourceReader;
use serde::{Deserialize, Serialize};

use crate::images::collect_images;
use crate::xref::rewrite_references;
use crate::{ConversionError, ConversionErrorKind};

/// A source document read from the page tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path of the document within the page tree.
    pub path: PathBuf,
    /// Raw markup text.
    pub content: String,
}

impl SourceDocument {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Result of converting one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedPage {
    /// Display title of the page.
    pub title: String,
    /// Page body in Confluence storage format, with cross-references resolved.
    pub body: String,
    /// Embedded image targets in document order.
    pub images: Vec<String>,
}

/// Converts AsciiDoc documents into Confluence pages.
///
/// The converter holds no per-call state and can be shared between threads.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use acp_confluence::{PageConverter, SourceDocument};
/// use acp_renderer::{AsciidocEngine, RenderOptions};
/// use acp_source::FsSource;
///
/// let converter = PageConverter::new(
///     Arc::new(AsciidocEngine::new()),
///     Arc::new(FsSource::new("utf-8")?),
///     RenderOptions::new(),
/// )?;
/// let page = converter.convert_path(Path::new("docs/intro.adoc"))?;
/// println!("{}: {} images", page.title, page.images.len());
/// ```
pub struct PageConverter {
    engine: Arc<dyn RenderEngine>,
    reader: Arc<dyn SourceReader>,
    options: RenderOptions,
}

impl PageConverter {
    /// Create a converter.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionErrorKind::InvalidConfig`] if `options` are unusable,
    /// e.g. the template directory does not exist.
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        reader: Arc<dyn SourceReader>,
        options: RenderOptions,
    ) -> Result<Self, ConversionErrorKind> {
        options.validate()?;
        Ok(Self {
            engine,
            reader,
            options,
        })
    }

    /// Render options used for every conversion.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Convert one document.
    ///
    /// Steps run in order: title extraction, rendering, cross-reference
    /// rewriting, image collection. The first failure aborts the conversion.
    pub fn convert(&self, document: &SourceDocument) -> Result<ConvertedPage, ConversionError> {
        self.convert_inner(document)
            .map_err(|kind| ConversionError::new(&document.path, kind))
    }

    /// Read the document at `path` through the source reader and convert it.
    pub fn convert_path(&self, path: &Path) -> Result<ConvertedPage, ConversionError> {
        let content = self
            .reader
            .read(path)
            .map_err(|err| ConversionError::new(path, err.into()))?;
        self.convert(&SourceDocument::new(path, content))
    }

    fn convert_inner(&self, document: &SourceDocument) -> Result<ConvertedPage, ConversionErrorKind> {
        let title = extract_title(&document.content)
            .map_err(|_| ConversionErrorKind::MissingTitle { path: None })?;

        let rendered = self.engine.render(&document.content, &self.options)?;
        let body = rewrite_references(&rendered, &document.path, self.reader.as_ref())?;
        let images = collect_images(&body)?;

        tracing::info!(
            path = %document.path.display(),
            title = %title,
            images = images.len(),
            "Converted page"
        );

        Ok(ConvertedPage {
            title,
            body,
            images,
        })
    }
}
