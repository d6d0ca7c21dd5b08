//! Block parser for the document body.
//!
//! Consumes preprocessed lines and builds a flat sequence of [`Block`]s.
//! Compound delimited blocks (example, sidebar, quote, open) are parsed
//! recursively from the lines between their delimiters.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::RenderError;
use crate::ast::{AdmonitionKind, Block, BlockKind, ListItem};
use crate::attributes::{Attributes, parse_entry};
use crate::attrlist::AttrList;
use crate::preprocess::Line;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\[([A-Za-z_:][\w:.-]*)(?:,[^\]]*)?\]\]$").unwrap());

static ATTR_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[(|[#.%\w"'].*)\]$"#).unwrap());

static BLOCK_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.([^.\s].*)$").unwrap());

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(={1,6}|#{1,6})[ \t]+(\S.*?)(?:[ \t]+=+)?[ \t]*$").unwrap()
});

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(\*{1,5}|-|\.{1,5}|\d+\.)[ \t]+(\S.*)$").unwrap());

static ADMONITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(NOTE|TIP|IMPORTANT|WARNING|CAUTION):[ \t]+(.*)$").unwrap()
});

static BLOCK_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image::([^\s\[]+)\[(.*)\]$").unwrap());

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```([\w+#.-]*)[ \t]*$").unwrap());

/// Kinds of delimited blocks, keyed by their delimiter line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimited {
    Comment,
    Listing,
    Literal,
    Pass,
    Quote,
    Example,
    Sidebar,
    Open,
    Table,
}

impl Delimited {
    fn name(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Listing => "listing",
            Self::Literal => "literal",
            Self::Pass => "passthrough",
            Self::Quote => "quote",
            Self::Example => "example",
            Self::Sidebar => "sidebar",
            Self::Open => "open",
            Self::Table => "table",
        }
    }
}

fn delimiter(text: &str) -> Option<Delimited> {
    if text == "--" {
        return Some(Delimited::Open);
    }
    if text.len() < 4 {
        return None;
    }
    if let Some(rest) = text.strip_prefix('|') {
        return rest.chars().all(|c| c == '=').then_some(Delimited::Table);
    }
    let first = text.chars().next()?;
    if !text.chars().all(|c| c == first) {
        return None;
    }
    match first {
        '/' => Some(Delimited::Comment),
        '-' => Some(Delimited::Listing),
        '.' => Some(Delimited::Literal),
        '+' => Some(Delimited::Pass),
        '_' => Some(Delimited::Quote),
        '=' => Some(Delimited::Example),
        '*' => Some(Delimited::Sidebar),
        _ => None,
    }
}

/// Returns the normalized marker and item text of a list item line.
fn list_marker(text: &str) -> Option<(String, &str)> {
    let caps = LIST_RE.captures(text)?;
    let marker = caps.get(1)?.as_str();
    let marker = if marker.ends_with('.') && marker.starts_with(|c: char| c.is_ascii_digit()) {
        "1."
    } else {
        marker
    };
    Some((marker.to_owned(), caps.get(2)?.as_str()))
}

fn is_ordered(marker: &str) -> bool {
    marker.starts_with(|c: char| c == '.' || c.is_ascii_digit())
}

fn is_line_comment(text: &str) -> bool {
    text.starts_with("//") && delimiter(text) != Some(Delimited::Comment)
}

/// Block metadata collected from the lines preceding a block.
#[derive(Debug, Default)]
struct Metadata {
    id: Option<String>,
    title: Option<String>,
    attrs: Option<AttrList>,
}

impl Metadata {
    fn style(&self) -> Option<&str> {
        self.attrs.as_ref().and_then(AttrList::style)
    }

    fn positional(&self, index: usize) -> Option<String> {
        self.attrs
            .as_ref()
            .and_then(|a| a.positional(index))
            .map(str::to_owned)
    }

    fn admonition(&self) -> Option<AdmonitionKind> {
        self.style().and_then(AdmonitionKind::from_label)
    }
}

/// Parse body lines into blocks, applying attribute entries as they occur.
pub(crate) fn parse(lines: &[Line<'_>], attributes: &mut Attributes) -> Result<Vec<Block>, RenderError> {
    Parser {
        lines,
        pos: 0,
        attributes,
        list_markers: Vec::new(),
    }
    .parse_blocks()
}

struct Parser<'p, 'a> {
    lines: &'p [Line<'a>],
    pos: usize,
    attributes: &'p mut Attributes,
    /// Markers of the lists currently open, outermost first.
    list_markers: Vec<String>,
}

impl<'a> Parser<'_, 'a> {
    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn subst(&self, text: &str) -> String {
        self.attributes.substitute(text).into_owned()
    }

    fn parse_blocks(&mut self) -> Result<Vec<Block>, RenderError> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block()? {
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn next_block(&mut self) -> Result<Option<Block>, RenderError> {
        let mut meta = Metadata::default();

        while let Some(line) = self.peek() {
            let text = line.text;

            if text.trim().is_empty() {
                self.pos += 1;
            } else if delimiter(text) == Some(Delimited::Comment) {
                self.take_delimited(Delimited::Comment)?;
            } else if text.starts_with("//") {
                self.pos += 1;
            } else if let Some(entry) = parse_entry(text) {
                self.attributes.apply(&entry);
                self.pos += 1;
            } else if let Some(caps) = ANCHOR_RE.captures(text) {
                meta.id = Some(caps[1].to_owned());
                self.pos += 1;
            } else if let Some(caps) = ATTR_LINE_RE.captures(text) {
                let attrs = AttrList::parse(&self.subst(&caps[1]), true);
                if let Some(id) = attrs.id() {
                    meta.id = Some(id.to_owned());
                }
                meta.attrs = Some(attrs);
                self.pos += 1;
            } else if let Some(caps) = BLOCK_TITLE_RE.captures(text) {
                meta.title = Some(self.subst(&caps[1]));
                self.pos += 1;
            } else {
                let kind = self.parse_kind(&meta)?;
                return Ok(Some(Block {
                    id: meta.id,
                    title: meta.title,
                    kind,
                }));
            }
        }

        Ok(None)
    }

    fn parse_kind(&mut self, meta: &Metadata) -> Result<BlockKind, RenderError> {
        let line = self.lines[self.pos];
        let text = line.text;

        if let Some(caps) = SECTION_RE.captures(text) {
            self.pos += 1;
            let level = u8::try_from(caps[1].len() - 1).unwrap_or(5);
            return Ok(BlockKind::Section {
                level,
                text: self.subst(&caps[2]),
            });
        }

        if text == "'''" {
            self.pos += 1;
            return Ok(BlockKind::ThematicBreak);
        }

        if let Some(kind) = delimiter(text) {
            return self.parse_delimited(kind, meta);
        }

        if let Some(caps) = FENCE_RE.captures(text) {
            return self.parse_fenced(&caps[1], meta);
        }

        if let Some(caps) = BLOCK_IMAGE_RE.captures(text) {
            self.pos += 1;
            return Ok(self.image(&caps));
        }

        if let Some((marker, _)) = list_marker(text) {
            return self.parse_list(&marker);
        }

        self.parse_paragraph(meta)
    }

    /// Consume a delimited block and return the range of its content lines.
    fn take_delimited(&mut self, kind: Delimited) -> Result<(usize, usize), RenderError> {
        let open = self.lines[self.pos];
        let start = self.pos + 1;
        let Some(offset) = self.lines[start..].iter().position(|l| l.text == open.text) else {
            return Err(RenderError::Syntax {
                line: open.number,
                message: format!("unterminated {} block", kind.name()),
            });
        };
        let end = start + offset;
        self.pos = end + 1;
        Ok((start, end))
    }

    fn verbatim(&self, start: usize, end: usize) -> String {
        self.lines[start..end]
            .iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse_nested(&mut self, start: usize, end: usize) -> Result<Vec<Block>, RenderError> {
        let lines = self.lines;
        Parser {
            lines: &lines[start..end],
            pos: 0,
            attributes: &mut *self.attributes,
            list_markers: Vec::new(),
        }
        .parse_blocks()
    }

    fn parse_delimited(&mut self, kind: Delimited, meta: &Metadata) -> Result<BlockKind, RenderError> {
        let (start, end) = self.take_delimited(kind)?;

        Ok(match kind {
            Delimited::Listing => BlockKind::Listing {
                language: self.listing_language(meta),
                content: self.verbatim(start, end),
                linenums: meta.attrs.as_ref().is_some_and(|a| a.has_option("linenums")),
            },
            Delimited::Literal => BlockKind::Literal(self.verbatim(start, end)),
            Delimited::Pass | Delimited::Comment => BlockKind::Passthrough(self.verbatim(start, end)),
            Delimited::Quote if meta.style() == Some("verse") => {
                let text = self.subst(&self.verbatim(start, end).replace('\n', " +\n"));
                BlockKind::Quote {
                    blocks: vec![Block::new(BlockKind::Paragraph(text))],
                    attribution: meta.positional(1),
                    citetitle: meta.positional(2),
                }
            }
            Delimited::Quote => BlockKind::Quote {
                blocks: self.parse_nested(start, end)?,
                attribution: meta.positional(1),
                citetitle: meta.positional(2),
            },
            Delimited::Example | Delimited::Open if meta.admonition().is_some() => {
                BlockKind::Admonition {
                    kind: meta.admonition().unwrap_or(AdmonitionKind::Note),
                    blocks: self.parse_nested(start, end)?,
                }
            }
            Delimited::Example => BlockKind::Example(self.parse_nested(start, end)?),
            Delimited::Sidebar => BlockKind::Sidebar(self.parse_nested(start, end)?),
            Delimited::Open => BlockKind::Open(self.parse_nested(start, end)?),
            Delimited::Table => self.parse_table(start, end, meta),
        })
    }

    fn listing_language(&self, meta: &Metadata) -> Option<String> {
        meta.positional(1).or_else(|| {
            if meta.style() == Some("source") {
                self.attributes.get("source-language").map(str::to_owned)
            } else {
                None
            }
        })
    }

    fn parse_fenced(&mut self, language: &str, meta: &Metadata) -> Result<BlockKind, RenderError> {
        let open = self.lines[self.pos];
        let start = self.pos + 1;
        let Some(offset) = self.lines[start..].iter().position(|l| l.text.trim_end() == "```") else {
            return Err(RenderError::Syntax {
                line: open.number,
                message: "unterminated fenced code block".to_owned(),
            });
        };
        let end = start + offset;
        self.pos = end + 1;

        let language = Some(language)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .or_else(|| self.listing_language(meta));
        Ok(BlockKind::Listing {
            language,
            content: self.verbatim(start, end),
            linenums: false,
        })
    }

    fn image(&self, caps: &Captures<'_>) -> BlockKind {
        let attrs = AttrList::parse(&self.subst(&caps[2]), false);
        let pick = |index: usize, name: &str| {
            attrs
                .positional(index)
                .or_else(|| attrs.named(name))
                .map(str::to_owned)
        };
        BlockKind::Image {
            target: self.subst(&caps[1]),
            alt: pick(0, "alt"),
            width: pick(1, "width"),
            height: pick(2, "height"),
        }
    }

    fn parse_list(&mut self, marker: &str) -> Result<BlockKind, RenderError> {
        self.list_markers.push(marker.to_owned());
        let mut items = Vec::new();

        while let Some(line) = self.peek() {
            let Some((found, first)) = list_marker(line.text) else {
                break;
            };
            if found != marker {
                break;
            }
            self.pos += 1;
            let mut item = ListItem {
                text: self.item_text(first),
                blocks: Vec::new(),
            };
            self.parse_item_attachments(&mut item)?;
            items.push(item);
        }

        self.list_markers.pop();
        Ok(BlockKind::List {
            ordered: is_ordered(marker),
            items,
        })
    }

    fn item_text(&mut self, first: &str) -> String {
        let mut text = first.trim_end().to_owned();
        while let Some(line) = self.peek() {
            let t = line.text;
            if t.trim().is_empty() || t == "+" || list_marker(t).is_some() || delimiter(t).is_some() {
                break;
            }
            self.pos += 1;
            if is_line_comment(t) {
                continue;
            }
            text.push('\n');
            text.push_str(t.trim());
        }
        self.subst(&text)
    }

    fn parse_item_attachments(&mut self, item: &mut ListItem) -> Result<(), RenderError> {
        while let Some(line) = self.peek() {
            if line.text == "+" {
                self.pos += 1;
                if let Some(block) = self.next_block()? {
                    item.blocks.push(block);
                }
                continue;
            }

            if let Some((found, _)) = list_marker(line.text) {
                if self.list_markers.contains(&found) {
                    break;
                }
                let nested = self.parse_list(&found)?;
                item.blocks.push(Block::new(nested));
                continue;
            }

            if line.text.trim().is_empty() {
                let next = self.lines[self.pos..]
                    .iter()
                    .position(|l| !l.text.trim().is_empty());
                if let Some(offset) = next
                    && list_marker(self.lines[self.pos + offset].text).is_some()
                {
                    self.pos += offset;
                    continue;
                }
            }

            break;
        }
        Ok(())
    }

    fn paragraph_lines(&mut self) -> Vec<&'a str> {
        let mut lines = Vec::new();
        while let Some(line) = self.peek() {
            let t = line.text;
            if t.trim().is_empty() {
                break;
            }
            if !lines.is_empty() && self.interrupts_paragraph(t) {
                break;
            }
            self.pos += 1;
            if is_line_comment(t) {
                continue;
            }
            lines.push(t);
        }
        lines
    }

    fn interrupts_paragraph(&self, text: &str) -> bool {
        delimiter(text).is_some()
            || (!self.list_markers.is_empty() && (text == "+" || list_marker(text).is_some()))
    }

    fn parse_paragraph(&mut self, meta: &Metadata) -> Result<BlockKind, RenderError> {
        let lines = self.paragraph_lines();
        let verbatim = lines.join("\n");

        if meta.style().is_none()
            && let Some(caps) = ADMONITION_RE.captures(&verbatim)
        {
            let kind = AdmonitionKind::from_label(&caps[1]).unwrap_or(AdmonitionKind::Note);
            let paragraph = BlockKind::Paragraph(self.subst(&caps[2]));
            return Ok(BlockKind::Admonition {
                kind,
                blocks: vec![Block::new(paragraph)],
            });
        }

        let kind = match meta.style() {
            Some("source" | "listing") => BlockKind::Listing {
                language: self.listing_language(meta),
                content: verbatim,
                linenums: meta.attrs.as_ref().is_some_and(|a| a.has_option("linenums")),
            },
            Some("literal") => BlockKind::Literal(verbatim),
            Some("pass") => BlockKind::Passthrough(verbatim),
            Some("quote") => BlockKind::Quote {
                blocks: vec![Block::new(BlockKind::Paragraph(self.subst(&verbatim)))],
                attribution: meta.positional(1),
                citetitle: meta.positional(2),
            },
            Some("verse") => BlockKind::Quote {
                blocks: vec![Block::new(BlockKind::Paragraph(
                    self.subst(&verbatim.replace('\n', " +\n")),
                ))],
                attribution: meta.positional(1),
                citetitle: meta.positional(2),
            },
            _ if meta.admonition().is_some() => BlockKind::Admonition {
                kind: meta.admonition().unwrap_or(AdmonitionKind::Note),
                blocks: vec![Block::new(BlockKind::Paragraph(self.subst(&verbatim)))],
            },
            _ if lines.first().is_some_and(|l| l.starts_with([' ', '\t'])) => {
                BlockKind::Literal(dedent(&lines))
            }
            _ => BlockKind::Paragraph(self.subst(&verbatim)),
        };
        Ok(kind)
    }

    fn parse_table(&self, start: usize, end: usize, meta: &Metadata) -> BlockKind {
        let lines: Vec<&str> = self.lines[start..end].iter().map(|l| l.text).collect();
        let attrs = meta.attrs.as_ref();

        let first = lines.iter().position(|l| !l.trim().is_empty());
        let implicit_header = first.is_some_and(|i| {
            lines.get(i + 1).is_some_and(|l| l.trim().is_empty())
                && lines[i + 1..].iter().any(|l| !l.trim().is_empty())
        });
        let header = attrs.is_some_and(|a| a.has_option("header"))
            || (implicit_header && !attrs.is_some_and(|a| a.has_option("noheader")));

        let columns = attrs
            .and_then(|a| a.named("cols"))
            .map(column_count)
            .or_else(|| first.map(|i| split_cells(lines[i]).len()))
            .unwrap_or(0);

        let cells: Vec<String> = split_cells(&lines.join("\n"))
            .into_iter()
            .map(|c| self.subst(&c))
            .collect();

        let rows = if columns == 0 {
            Vec::new()
        } else {
            cells.chunks(columns).map(<[String]>::to_vec).collect()
        };

        BlockKind::Table { rows, header }
    }
}

/// Number of columns declared by a `cols` attribute (`"1,2,3"` or `"3*"`).
fn column_count(cols: &str) -> usize {
    if let Some((count, _)) = cols.split_once('*')
        && let Ok(count) = count.trim().parse()
    {
        return count;
    }
    cols.split(',').filter(|c| !c.trim().is_empty()).count()
}

/// Split table text into trimmed cells on unescaped `|`.
///
/// Text before the first separator is ignored.
fn split_cells(text: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                if let Some(cell) = current.as_mut() {
                    cell.push('|');
                }
            }
            '|' => {
                if let Some(cell) = current.take() {
                    cells.push(cell.trim().to_owned());
                }
                current = Some(String::new());
            }
            _ => {
                if let Some(cell) = current.as_mut() {
                    cell.push(c);
                }
            }
        }
    }
    if let Some(cell) = current {
        cells.push(cell.trim().to_owned());
    }
    cells
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
