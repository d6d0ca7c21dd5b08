//! Confluence storage format backend.
//!
//! Turns parsed blocks into storage-format XHTML. Each node kind consults the
//! template set first and falls back to the built-in markup.

use std::fmt::Write;

use crate::ast::{Block, BlockKind, ListItem};
use crate::escape::{cdata, escape_xml};
use crate::inline::{InlineRenderer, anchor_macro, as_pairs, image_element, image_vars};
use crate::templates::TemplateSet;

pub(crate) struct StorageBackend<'t> {
    templates: &'t TemplateSet,
    inline: InlineRenderer<'t>,
}

impl<'t> StorageBackend<'t> {
    pub(crate) fn new(templates: &'t TemplateSet) -> Self {
        Self {
            templates,
            inline: InlineRenderer::new(templates),
        }
    }

    /// Render the document body. The header title is not part of the body
    /// unless a `document` template places it there.
    pub(crate) fn render_document(&self, title: Option<&str>, blocks: &[Block]) -> String {
        let content = self.render_blocks(blocks);
        let title = title.map(escape_xml).unwrap_or_default();
        if let Some(out) = self
            .templates
            .render("document", &[("title", &*title), ("content", content.as_str())])
        {
            return out;
        }
        content
    }

    fn render_blocks(&self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|b| self.render_block(b))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_block(&self, block: &Block) -> String {
        let title = block.title.as_deref();

        let body = match &block.kind {
            BlockKind::Section { level, text } => {
                return self.section(*level, text, block.id.as_deref());
            }
            BlockKind::Paragraph(text) => self.paragraph(text, title),
            BlockKind::Listing {
                language,
                content,
                linenums,
            } => self.listing(language.as_deref(), content, *linenums, title),
            BlockKind::Literal(content) => self.literal(content, title),
            BlockKind::Passthrough(content) => content.clone(),
            BlockKind::Admonition { kind, blocks } => {
                self.rich_macro("admonition", kind.macro_name(), blocks, title)
            }
            BlockKind::Quote {
                blocks,
                attribution,
                citetitle,
            } => self.quote(blocks, attribution.as_deref(), citetitle.as_deref(), title),
            BlockKind::Example(blocks) => self.rich_macro("example", "expand", blocks, title),
            BlockKind::Sidebar(blocks) => self.rich_macro("sidebar", "panel", blocks, title),
            BlockKind::Open(blocks) => self.with_title(title, self.render_blocks(blocks)),
            BlockKind::List { ordered, items } => self.list(*ordered, items, title),
            BlockKind::Table { rows, header } => self.table(rows, *header, title),
            BlockKind::Image {
                target,
                alt,
                width,
                height,
            } => self.image(target, alt.as_deref(), width.as_deref(), height.as_deref(), title),
            BlockKind::ThematicBreak => self
                .templates
                .render("thematic_break", &[])
                .unwrap_or_else(|| "<hr />".to_owned()),
        };

        match block.id.as_deref() {
            Some(id) => format!("{}\n{body}", anchor_macro(id)),
            None => body,
        }
    }

    /// Prefix `content` with a bold title paragraph.
    fn with_title(&self, title: Option<&str>, content: String) -> String {
        match title {
            Some(title) => format!("<p><strong>{}</strong></p>\n{content}", self.inline.render(title)),
            None => content,
        }
    }

    fn title_var(&self, title: Option<&str>) -> String {
        title.map(|t| self.inline.render(t)).unwrap_or_default()
    }

    fn section(&self, level: u8, text: &str, id: Option<&str>) -> String {
        let level = level.clamp(1, 6);
        let title = self.inline.render(text);
        if let Some(out) = self.templates.render(
            "section",
            &[
                ("level", level.to_string().as_str()),
                ("title", title.as_str()),
                ("id", &*id.map(escape_xml).unwrap_or_default()),
            ],
        ) {
            return out;
        }
        let anchor = id.map(anchor_macro).unwrap_or_default();
        format!("<h{level}>{anchor}{title}</h{level}>")
    }

    fn paragraph(&self, text: &str, title: Option<&str>) -> String {
        let content = self.inline.render(text);
        if let Some(out) = self.templates.render(
            "paragraph",
            &[("title", self.title_var(title).as_str()), ("content", content.as_str())],
        ) {
            return out;
        }
        self.with_title(title, format!("<p>{content}</p>"))
    }

    fn listing(&self, language: Option<&str>, content: &str, linenums: bool, title: Option<&str>) -> String {
        if let Some(out) = self.templates.render(
            "listing",
            &[
                ("title", &*title.map(escape_xml).unwrap_or_default()),
                ("language", &*language.map(escape_xml).unwrap_or_default()),
                ("content", content),
            ],
        ) {
            return out;
        }

        let mut out = String::from(r#"<ac:structured-macro ac:name="code">"#);
        if let Some(title) = title {
            let _ = write!(out, r#"<ac:parameter ac:name="title">{}</ac:parameter>"#, escape_xml(title));
        }
        if let Some(language) = language {
            let _ = write!(out, r#"<ac:parameter ac:name="language">{}</ac:parameter>"#, escape_xml(language));
        }
        if linenums {
            out.push_str(r#"<ac:parameter ac:name="linenumbers">true</ac:parameter>"#);
        }
        let _ = write!(
            out,
            "<ac:plain-text-body>{}</ac:plain-text-body></ac:structured-macro>",
            cdata(content)
        );
        out
    }

    fn literal(&self, content: &str, title: Option<&str>) -> String {
        let content = escape_xml(content);
        if let Some(out) = self.templates.render(
            "literal",
            &[("title", self.title_var(title).as_str()), ("content", &*content)],
        ) {
            return out;
        }
        self.with_title(title, format!("<pre>{content}</pre>"))
    }

    /// A macro with a rich-text body and optional title parameter.
    fn rich_macro(&self, node: &str, name: &str, blocks: &[Block], title: Option<&str>) -> String {
        let content = self.render_blocks(blocks);
        let title_attr = title.map(escape_xml).unwrap_or_default();
        if let Some(out) = self.templates.render(
            node,
            &[("name", name), ("title", &*title_attr), ("content", content.as_str())],
        ) {
            return out;
        }

        let mut out = format!(r#"<ac:structured-macro ac:name="{name}">"#);
        if title.is_some() {
            let _ = write!(out, r#"<ac:parameter ac:name="title">{title_attr}</ac:parameter>"#);
        }
        let _ = write!(
            out,
            "<ac:rich-text-body>{content}</ac:rich-text-body></ac:structured-macro>"
        );
        out
    }

    fn quote(
        &self,
        blocks: &[Block],
        attribution: Option<&str>,
        citetitle: Option<&str>,
        title: Option<&str>,
    ) -> String {
        let content = self.render_blocks(blocks);
        let attribution = attribution.map(|a| self.inline.render(a));
        let citetitle = citetitle.map(|c| self.inline.render(c));
        if let Some(out) = self.templates.render(
            "quote",
            &[
                ("title", self.title_var(title).as_str()),
                ("attribution", attribution.as_deref().unwrap_or_default()),
                ("citetitle", citetitle.as_deref().unwrap_or_default()),
                ("content", content.as_str()),
            ],
        ) {
            return out;
        }

        let mut out = format!("<blockquote>{content}");
        match (attribution, citetitle) {
            (Some(a), Some(c)) => {
                let _ = write!(out, "\n<p>\u{2014} {a}, <cite>{c}</cite></p>");
            }
            (Some(a), None) => {
                let _ = write!(out, "\n<p>\u{2014} {a}</p>");
            }
            (None, Some(c)) => {
                let _ = write!(out, "\n<p>\u{2014} <cite>{c}</cite></p>");
            }
            (None, None) => {}
        }
        out.push_str("</blockquote>");
        self.with_title(title, out)
    }

    fn list(&self, ordered: bool, items: &[ListItem], title: Option<&str>) -> String {
        let content = items
            .iter()
            .map(|item| self.list_item(item))
            .collect::<String>();
        let (node, tag) = if ordered { ("olist", "ol") } else { ("ulist", "ul") };
        if let Some(out) = self.templates.render(
            node,
            &[("title", self.title_var(title).as_str()), ("content", content.as_str())],
        ) {
            return out;
        }
        self.with_title(title, format!("<{tag}>{content}</{tag}>"))
    }

    fn list_item(&self, item: &ListItem) -> String {
        let mut content = self.inline.render(&item.text);
        for block in &item.blocks {
            content.push_str(&self.render_block(block));
        }
        self.templates
            .render("list_item", &[("content", content.as_str())])
            .unwrap_or_else(|| format!("<li>{content}</li>"))
    }

    fn table(&self, rows: &[Vec<String>], header: bool, title: Option<&str>) -> String {
        let mut content = String::new();
        for (index, row) in rows.iter().enumerate() {
            let tag = if header && index == 0 { "th" } else { "td" };
            content.push_str("<tr>");
            for cell in row {
                let _ = write!(content, "<{tag}>{}</{tag}>", self.inline.render(cell));
            }
            content.push_str("</tr>");
        }
        if let Some(out) = self.templates.render(
            "table",
            &[("title", self.title_var(title).as_str()), ("content", content.as_str())],
        ) {
            return out;
        }
        self.with_title(title, format!("<table><tbody>{content}</tbody></table>"))
    }

    fn image(
        &self,
        target: &str,
        alt: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
        title: Option<&str>,
    ) -> String {
        let vars = image_vars(target, alt, width, height, title);
        if let Some(out) = self.templates.render("image", &as_pairs(&vars)) {
            return out;
        }
        self.with_title(title, image_element(target, alt, width, height))
    }
}
