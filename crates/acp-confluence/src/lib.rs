//! Confluence page conversion for ACP.
//!
//! This crate turns AsciiDoc source documents into Confluence pages:
//! - [`PageConverter`]: the conversion workflow (title, body, references, images)
//! - [`rewrite_references`]: replaces inter-page link targets with page titles
//! - [`collect_images`]: lists embedded image targets
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use acp_confluence::PageConverter;
//! use acp_renderer::{AsciidocEngine, RenderOptions};
//! use acp_source::FsSource;
//!
//! let converter = PageConverter::new(
//!     Arc::new(AsciidocEngine::new()),
//!     Arc::new(FsSource::new("utf-8")?),
//!     RenderOptions::new().with_attribute("product", "ACP"),
//! )?;
//!
//! let page = converter.convert_path(Path::new("docs/intro.adoc"))?;
//! println!("{}", serde_json::to_string_pretty(&page)?);
//! ```

mod converter;
mod error;
mod images;
mod xml;
mod xref;

pub use converter::{ConvertedPage, PageConverter, SourceDocument};
pub use error::{ConversionError, ConversionErrorKind};
pub use images::collect_images;
pub use xref::rewrite_references;
