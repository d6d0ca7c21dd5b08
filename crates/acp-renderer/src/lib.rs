//! AsciiDoc rendering to Confluence storage format.
//!
//! This crate provides:
//! - [`extract_title`]: reads the display title from a document header
//! - [`RenderEngine`]: the injectable rendering abstraction
//! - [`AsciidocEngine`]: the built-in engine for the commonly used AsciiDoc subset
//!
//! Inter-page cross-references (`<<other.adoc#,Label>>`, `xref:other.adoc[]`)
//! are rendered as `<ri:page ri:content-title="other.adoc"/>` links carrying
//! the raw file name; resolving them to page titles is left to the caller.
//!
//! # Example
//!
//! ```
//! use acp_renderer::{AsciidocEngine, RenderEngine, RenderOptions, extract_title};
//!
//! let source = "= Setup Guide\n\nNOTE: Requires Java 21.";
//! assert_eq!(extract_title(source).unwrap(), "Setup Guide");
//!
//! let body = AsciidocEngine::new().render(source, &RenderOptions::new()).unwrap();
//! assert!(body.starts_with(r#"<ac:structured-macro ac:name="info">"#));
//! ```

mod ast;
mod attributes;
mod attrlist;
mod backend;
mod engine;
mod error;
mod escape;
mod header;
mod inline;
mod options;
mod parser;
mod preprocess;
mod templates;

pub use engine::{AsciidocEngine, RenderEngine};
pub use error::RenderError;
pub use escape::escape_xml;
pub use header::{MissingTitle, extract_title};
pub use options::RenderOptions;
