//! Template overrides loaded from a template directory.
//!
//! Each `<node>.xml` file replaces the built-in output for one node kind.
//! Templates use `{{ name }}` placeholders; unknown placeholders render as
//! empty strings. Recognized node kinds and their variables:
//!
//! | Node | Variables |
//! |---|---|
//! | `document` | `title`, `content` |
//! | `section` | `level`, `title`, `id` |
//! | `paragraph` | `title`, `content` |
//! | `listing` | `title`, `language`, `content` (raw, for CDATA) |
//! | `literal` | `title`, `content` |
//! | `admonition` | `name`, `title`, `content` |
//! | `quote` | `title`, `attribution`, `citetitle`, `content` |
//! | `example`, `sidebar` | `title`, `content` |
//! | `ulist`, `olist` | `title`, `content` |
//! | `list_item` | `content` |
//! | `table` | `title`, `content` |
//! | `image`, `inline_image` | `target`, `alt`, `width`, `height`, `title` |
//! | `xref` | `page`, `anchor`, `label` |
//! | `anchor_link` | `anchor`, `label` |
//! | `link` | `href`, `label` |
//! | `thematic_break` | |

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::RenderError;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w-]+)\s*\}\}").unwrap());

const NODE_NAMES: &[&str] = &[
    "document",
    "section",
    "paragraph",
    "listing",
    "literal",
    "admonition",
    "quote",
    "example",
    "sidebar",
    "ulist",
    "olist",
    "list_item",
    "table",
    "image",
    "inline_image",
    "xref",
    "anchor_link",
    "link",
    "thematic_break",
];

/// Loaded template overrides, keyed by node name.
#[derive(Debug, Clone, Default)]
pub(crate) struct TemplateSet {
    templates: HashMap<String, String>,
}

impl TemplateSet {
    /// Load every `*.xml` file from `dir`. `None` yields an empty set.
    pub(crate) fn load(dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut templates = HashMap::new();
        let Some(dir) = dir else {
            return Ok(Self { templates });
        };

        let entries = std::fs::read_dir(dir).map_err(|source| RenderError::Template {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !NODE_NAMES.contains(&name) {
                tracing::debug!(template = %path.display(), "Ignoring template for unknown node");
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|source| RenderError::Template {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(node = name, "Loaded template override");
            templates.insert(name.to_owned(), content);
        }

        Ok(Self { templates })
    }

    /// Render the override for `node`, if one was loaded.
    pub(crate) fn render(&self, node: &str, vars: &[(&str, &str)]) -> Option<String> {
        let template = self.templates.get(node)?;
        let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
            vars.iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(String::new, |(_, value)| (*value).to_owned())
        });
        Some(rendered.trim_end_matches(['\n', '\r']).to_owned())
    }

    #[cfg(test)]
    pub(crate) fn with_template(mut self, node: &str, template: &str) -> Self {
        self.templates.insert(node.to_owned(), template.to_owned());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_no_dir_is_empty() {
        let set = TemplateSet::load(None).unwrap();
        assert_eq!(set.render("paragraph", &[]), None);
    }

    #[test]
    fn test_load_and_render() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("paragraph.xml"), "<p class=\"x\">{{ content }}</p>\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let set = TemplateSet::load(Some(temp.path())).unwrap();

        assert_eq!(
            set.render("paragraph", &[("content", "Hello")]).as_deref(),
            Some("<p class=\"x\">Hello</p>")
        );
        assert_eq!(set.render("listing", &[]), None);
    }

    #[test]
    fn test_unknown_placeholder_is_empty() {
        let set = TemplateSet::default().with_template("link", "<a href=\"{{href}}\">{{ missing }}</a>");
        assert_eq!(
            set.render("link", &[("href", "https://example.com")]).as_deref(),
            Some("<a href=\"https://example.com\"></a>")
        );
    }

    #[test]
    fn test_unknown_node_ignored() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("carousel.xml"), "<x/>").unwrap();

        let set = TemplateSet::load(Some(temp.path())).unwrap();
        assert_eq!(set.render("carousel", &[]), None);
    }

    #[test]
    fn test_missing_dir_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = TemplateSet::load(Some(&temp.path().join("gone"))).unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
    }
}
