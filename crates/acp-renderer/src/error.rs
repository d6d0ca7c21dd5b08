//! Error types for rendering.

use std::io;
use std::path::PathBuf;

/// Errors raised while rendering a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Render options are unusable (for example a missing template directory).
    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    /// A template override could not be read.
    #[error("failed to read template {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document structure could not be parsed.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}
