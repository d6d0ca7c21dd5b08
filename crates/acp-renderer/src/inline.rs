//! Inline markup: formatting, links, cross-references and inline images.
//!
//! Macros and literal spans are rendered first and parked behind
//! placeholders, so that escaping and quote substitution never touch
//! their output. The remaining text is escaped, formatted and finally the
//! placeholders are restored.

use std::fmt::Write;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::escape::{cdata, escape_xml};
use crate::templates::TemplateSet;

static STASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}(\d+)\x{E001}").unwrap());
static PASS_TRIPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\+\+\+(.+?)\+\+\+").unwrap());
static PASS_MACRO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)pass:\[(.*?)\]").unwrap());
static DOUBLE_MONO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"``(.+?)``").unwrap());
static INLINE_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([A-Za-z_:][\w:.-]*)\]\]").unwrap());
static XREF_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<([^<>,\s][^<>,]*?)(?:,\s*([^>]*?))?>>").unwrap());
static XREF_MACRO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xref:([^\s\[]+)\[(.*?)\]").unwrap());
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"image:([^\s\[:][^\s\[]*)\[(.*?)\]").unwrap());
static LINK_MACRO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(link|mailto):([^\s\[]+)\[(.*?)\]").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[^\w/"'=])((?:https?|ftp|irc)://[^\s\[\]<>"]+)(?:\[(.*?)\])?"#).unwrap()
});
static STRONG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*").unwrap());
static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)__(.+?)__").unwrap());
static SUPERSCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\^(\S+?)\^").unwrap());
static SUBSCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~(\S+?)~").unwrap());
static HARD_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \+(\n|$)").unwrap());

const ASCIIDOC_EXTENSIONS: &[&str] = &["adoc", "asciidoc", "asc", "ad"];

/// Rendered fragments waiting to be restored.
#[derive(Default)]
struct Stash(Vec<String>);

impl Stash {
    fn put(&mut self, html: String) -> String {
        let index = self.0.len();
        self.0.push(html);
        format!("\u{E000}{index}\u{E001}")
    }

    /// Restore placeholders; stashed fragments may themselves hold placeholders.
    fn restore(&self, text: &str) -> String {
        let mut text = text.to_owned();
        while STASH_RE.is_match(&text) {
            text = STASH_RE
                .replace_all(&text, |caps: &Captures<'_>| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| self.0.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned();
        }
        text
    }
}

fn replace(re: &Regex, text: &str, mut f: impl FnMut(&Captures<'_>) -> String) -> String {
    re.replace_all(text, |caps: &Captures<'_>| f(caps)).into_owned()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Renders inline markup to Confluence storage format.
pub(crate) struct InlineRenderer<'t> {
    templates: &'t TemplateSet,
}

impl<'t> InlineRenderer<'t> {
    pub(crate) fn new(templates: &'t TemplateSet) -> Self {
        Self { templates }
    }

    pub(crate) fn render(&self, text: &str) -> String {
        let mut stash = Stash::default();
        let text = self.render_into(text, &mut stash);
        stash.restore(&text)
    }

    fn render_into(&self, text: &str, stash: &mut Stash) -> String {
        let text = replace(&PASS_TRIPLE_RE, text, |c| stash.put(c[1].to_owned()));
        let text = replace(&PASS_MACRO_RE, &text, |c| stash.put(c[1].to_owned()));
        let text = replace(&DOUBLE_MONO_RE, &text, |c| {
            stash.put(format!("<code>{}</code>", escape_xml(&c[1])))
        });
        let text = constrained(&text, '`', |inner| {
            stash.put(format!("<code>{}</code>", escape_xml(inner)))
        });
        let text = constrained(&text, '+', |inner| stash.put(escape_xml(inner).into_owned()));
        let text = replace(&INLINE_ANCHOR_RE, &text, |c| stash.put(anchor_macro(&c[1])));
        let text = replace(&XREF_SHORT_RE, &text, |c| {
            stash.put(self.xref(c[1].trim(), non_empty(c.get(2).map(|m| m.as_str()))))
        });
        let text = replace(&XREF_MACRO_RE, &text, |c| {
            stash.put(self.xref(&c[1], non_empty(Some(&c[2]))))
        });
        let text = replace(&IMAGE_RE, &text, |c| stash.put(self.inline_image(&c[1], &c[2])));
        let text = replace(&LINK_MACRO_RE, &text, |c| {
            let href = if &c[1] == "mailto" {
                format!("mailto:{}", &c[2])
            } else {
                c[2].to_owned()
            };
            let link = self.link(&href, non_empty(Some(&c[3])), stash);
            stash.put(link)
        });
        let text = replace(&URL_RE, &text, |c| {
            let (url, trailing) = match c.get(3) {
                Some(_) => (&c[2], ""),
                None => split_trailing_punctuation(&c[2]),
            };
            let link = self.link(url, non_empty(c.get(3).map(|m| m.as_str())), stash);
            format!("{}{}{}", &c[1], stash.put(link), trailing)
        });

        let text = escape_xml(&text);
        let text = STRONG_RE.replace_all(&text, "<strong>$1</strong>");
        let text = EMPHASIS_RE.replace_all(&text, "<em>$1</em>");
        let text = constrained(&text, '*', |inner| format!("<strong>{inner}</strong>"));
        let text = constrained(&text, '_', |inner| format!("<em>{inner}</em>"));
        let text = SUPERSCRIPT_RE.replace_all(&text, "<sup>$1</sup>");
        let text = SUBSCRIPT_RE.replace_all(&text, "<sub>$1</sub>");
        let text = HARD_BREAK_RE.replace_all(&text, "<br />");
        text.replace('\n', " ")
    }

    fn xref(&self, target: &str, label: Option<&str>) -> String {
        let (path, fragment) = match target.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (target, None),
        };
        let has_doc_extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| ASCIIDOC_EXTENSIONS.contains(&e));

        if !path.is_empty() && (fragment.is_some() || has_doc_extension) {
            let page = if has_doc_extension {
                path.to_owned()
            } else {
                format!("{path}.adoc")
            };
            self.page_link(&page, non_empty(fragment), label)
        } else {
            self.anchor_link(fragment.unwrap_or(path), label)
        }
    }

    fn page_link(&self, page: &str, anchor: Option<&str>, label: Option<&str>) -> String {
        let page_attr = escape_xml(page);
        let anchor_attr = anchor.map(escape_xml).unwrap_or_default();
        let label_text = label.map(escape_xml).unwrap_or_default();
        if let Some(out) = self.templates.render(
            "xref",
            &[("page", &*page_attr), ("anchor", &*anchor_attr), ("label", &*label_text)],
        ) {
            return out;
        }

        let mut out = String::from("<ac:link");
        if anchor.is_some() {
            let _ = write!(out, r#" ac:anchor="{anchor_attr}""#);
        }
        let _ = write!(out, r#"><ri:page ri:content-title="{page_attr}"/>"#);
        if let Some(label) = label {
            let _ = write!(
                out,
                "<ac:plain-text-link-body>{}</ac:plain-text-link-body>",
                cdata(label)
            );
        }
        out.push_str("</ac:link>");
        out
    }

    fn anchor_link(&self, anchor: &str, label: Option<&str>) -> String {
        let anchor_attr = escape_xml(anchor);
        let label = label.unwrap_or(anchor);
        if let Some(out) = self.templates.render(
            "anchor_link",
            &[("anchor", &*anchor_attr), ("label", &*escape_xml(label))],
        ) {
            return out;
        }
        format!(
            r#"<ac:link ac:anchor="{anchor_attr}"><ac:plain-text-link-body>{}</ac:plain-text-link-body></ac:link>"#,
            cdata(label)
        )
    }

    fn link(&self, href: &str, label: Option<&str>, stash: &mut Stash) -> String {
        let href_attr = escape_xml(href);
        let label_html = match label {
            Some(label) => self.render_into(label, stash),
            None => href_attr.clone().into_owned(),
        };
        if let Some(out) = self
            .templates
            .render("link", &[("href", &*href_attr), ("label", label_html.as_str())])
        {
            return out;
        }
        format!(r#"<a href="{href_attr}">{label_html}</a>"#)
    }

    fn inline_image(&self, target: &str, attrs: &str) -> String {
        let attrs = crate::attrlist::AttrList::parse(attrs, false);
        let alt = attrs.positional(0).or_else(|| attrs.named("alt"));
        let width = attrs.positional(1).or_else(|| attrs.named("width"));
        let height = attrs.positional(2).or_else(|| attrs.named("height"));

        let vars = image_vars(target, alt, width, height, None);
        if let Some(out) = self.templates.render("inline_image", &as_pairs(&vars)) {
            return out;
        }
        image_element(target, alt, width, height)
    }
}

/// Template variables for an image node.
pub(crate) fn image_vars(
    target: &str,
    alt: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
    title: Option<&str>,
) -> [(&'static str, String); 5] {
    let esc = |v: Option<&str>| v.map(|v| escape_xml(v).into_owned()).unwrap_or_default();
    [
        ("target", escape_xml(target).into_owned()),
        ("alt", esc(alt)),
        ("width", esc(width)),
        ("height", esc(height)),
        ("title", esc(title)),
    ]
}

pub(crate) fn as_pairs<'v>(vars: &'v [(&'static str, String)]) -> Vec<(&'static str, &'v str)> {
    vars.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

/// Confluence image element for an attachment or URL target.
pub(crate) fn image_element(
    target: &str,
    alt: Option<&str>,
    width: Option<&str>,
    height: Option<&str>,
) -> String {
    let mut out = String::from("<ac:image");
    for (name, value) in [("ac:alt", alt), ("ac:width", width), ("ac:height", height)] {
        if let Some(value) = value {
            let _ = write!(out, r#" {name}="{}""#, escape_xml(value));
        }
    }
    if target.contains("://") {
        let _ = write!(out, r#"><ri:url ri:value="{}"/></ac:image>"#, escape_xml(target));
    } else {
        let _ = write!(
            out,
            r#"><ri:attachment ri:filename="{}"/></ac:image>"#,
            escape_xml(target)
        );
    }
    out
}

/// Anchor macro marking a link target.
pub(crate) fn anchor_macro(id: &str) -> String {
    format!(
        r#"<ac:structured-macro ac:name="anchor"><ac:parameter ac:name="">{}</ac:parameter></ac:structured-macro>"#,
        escape_xml(id)
    )
}

fn split_trailing_punctuation(url: &str) -> (&str, &str) {
    let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
    url.split_at(trimmed.len())
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric()
}

/// Replace constrained pairs of `mark` (`*bold*`, `` `code` ``).
///
/// An opening mark must not follow a word character and must be followed by
/// non-whitespace; a closing mark must follow non-whitespace and must not be
/// followed by a word character.
fn constrained(text: &str, mark: char, mut wrap: impl FnMut(&str) -> String) -> String {
    if !text.contains(mark) {
        return text.to_owned();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == mark
            && can_open(&chars, i, mark)
            && let Some(end) = find_close(&chars, i + 1, mark)
        {
            let inner: String = chars[i + 1..end].iter().collect();
            out.push_str(&wrap(&inner));
            i = end + 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn can_open(chars: &[char], i: usize, mark: char) -> bool {
    let before_ok = i == 0 || (!is_word(chars[i - 1]) && chars[i - 1] != mark);
    let after_ok = chars
        .get(i + 1)
        .is_some_and(|c| !c.is_whitespace() && *c != mark);
    before_ok && after_ok
}

fn find_close(chars: &[char], start: usize, mark: char) -> Option<usize> {
    (start + 1..chars.len()).find(|&j| {
        chars[j] == mark
            && !chars[j - 1].is_whitespace()
            && chars.get(j + 1).is_none_or(|c| !is_word(*c) && *c != mark)
    })
}
