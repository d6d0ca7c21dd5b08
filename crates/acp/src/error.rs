//! CLI error types.

use acp_config::ConfigError;
use acp_confluence::{ConversionError, ConversionErrorKind};
use acp_source::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Setup(#[from] ConversionErrorKind),

    #[error("{0}")]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
