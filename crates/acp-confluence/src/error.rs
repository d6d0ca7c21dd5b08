//! Error types for page conversion.

use std::path::{Path, PathBuf};

use acp_renderer::RenderError;
use acp_source::SourceError;

/// What went wrong while converting a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConversionErrorKind {
    /// A document declares no title.
    ///
    /// `path` names the referenced document; it is `None` when the document
    /// being converted is the one without a title.
    #[error("top-level heading or title meta information must be set{}", in_document(.path))]
    MissingTitle { path: Option<PathBuf> },

    /// Render options are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rendering engine failed.
    #[error("rendering failed: {0}")]
    RenderFailure(#[source] RenderError),

    /// A cross-referenced document does not exist.
    #[error("unable to find cross-referenced page '{}'", .target_path.display())]
    UnresolvableReference { target_path: PathBuf },

    /// The rendered body is not well-formed storage format.
    #[error("malformed rendered output: {0}")]
    MalformedOutput(String),

    /// Reading a document failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[allow(clippy::ref_option)]
fn in_document(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl From<RenderError> for ConversionErrorKind {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidConfig(message) => Self::InvalidConfig(message),
            other => Self::RenderFailure(other),
        }
    }
}

/// Conversion failure of one document.
#[derive(Debug, thiserror::Error)]
#[error("failed to convert {}: {kind}", .document_path.display())]
pub struct ConversionError {
    /// Document whose conversion failed.
    pub document_path: PathBuf,
    pub kind: ConversionErrorKind,
}

impl ConversionError {
    #[must_use]
    pub fn new(document_path: impl Into<PathBuf>, kind: ConversionErrorKind) -> Self {
        Self {
            document_path: document_path.into(),
            kind,
        }
    }

    /// Document whose conversion failed.
    #[must_use]
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }
}
