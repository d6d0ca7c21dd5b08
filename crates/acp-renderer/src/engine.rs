//! Rendering engine abstraction and the built-in AsciiDoc engine.

use crate::attributes::Attributes;
use crate::backend::StorageBackend;
use crate::header::parse_header;
use crate::preprocess::{Line, preprocess};
use crate::templates::TemplateSet;
use crate::{RenderError, RenderOptions, parser};

/// Converts document markup into Confluence storage format.
///
/// Implementations are shared between threads and must not keep per-call
/// state.
pub trait RenderEngine: Send + Sync {
    /// Render `source` into a storage-format body.
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, RenderError>;
}

/// Built-in engine for the commonly used AsciiDoc subset.
///
/// # Example
///
/// ```
/// use acp_renderer::{AsciidocEngine, RenderEngine, RenderOptions};
///
/// let body = AsciidocEngine::new()
///     .render("= Guide\n\nHello *world*.", &RenderOptions::new())
///     .unwrap();
/// assert_eq!(body, "<p>Hello <strong>world</strong>.</p>");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciidocEngine;

impl AsciidocEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for AsciidocEngine {
    fn render(&self, source: &str, options: &RenderOptions) -> Result<String, RenderError> {
        options.validate()?;
        let templates = TemplateSet::load(options.template_dir.as_deref())?;

        let mut attributes = Attributes::from_bindings(&options.attributes);
        let header = parse_header(source);
        for entry in &header.entries {
            attributes.apply(entry);
        }
        if let Some(title) = header.title() {
            attributes.set_default("doctitle", title);
        }
        if let Some(author) = &header.author {
            attributes.set_default("author", author);
        }

        let lines = source
            .lines()
            .enumerate()
            .skip(header.body_start)
            .map(|(index, text)| Line {
                number: index + 1,
                text,
            });
        let lines = preprocess(lines, &attributes)?;
        let blocks = parser::parse(&lines, &mut attributes)?;
        tracing::debug!(blocks = blocks.len(), "Parsed document");

        Ok(StorageBackend::new(&templates).render_document(header.title(), &blocks))
    }
}
