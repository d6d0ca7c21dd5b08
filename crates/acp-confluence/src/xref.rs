//! Cross-reference rewriting.
//!
//! Inter-page links leave the renderer as
//! `<ri:page ri:content-title="setup.adoc"/>`, naming the target file. The
//! rewriter resolves each file relative to the referencing document, reads
//! its title and replaces the attribute value in place.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use acp_renderer::{escape_xml, extract_title};
use acp_source::{SOURCE_EXTENSION, SourceReader};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::ConversionErrorKind;
use crate::xml;

const PAGE_ELEMENT: &[u8] = b"ri:page";
const TITLE_ATTRIBUTE: &str = "ri:content-title";

/// One `name="value"` or `name='value'` pair. Matching left to right over a
/// tag consumes whole attributes, so quoted values are never searched.
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/<>"']+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// An inter-page link found in a rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReferenceTarget {
    /// Attribute value as written (unescaped).
    pub raw_target: String,
    /// Byte range of the attribute value in the body.
    pub span: Range<usize>,
}

/// Find every `ri:page` reference in document order.
pub(crate) fn find_references(body: &str) -> Result<Vec<ReferenceTarget>, ConversionErrorKind> {
    let wrapped = xml::wrap(body);
    let mut reader = xml::reader(&wrapped);
    let mut references = Vec::new();

    loop {
        let before = xml::position(&reader)?;
        let event = reader
            .read_event()
            .map_err(|err| xml::malformed(&reader, &err))?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == PAGE_ELEMENT => {
                let after = xml::position(&reader)?;
                references.push(reference_at(&wrapped, before..after, &e)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(references)
}

fn reference_at(
    wrapped: &str,
    event_range: Range<usize>,
    e: &BytesStart<'_>,
) -> Result<ReferenceTarget, ConversionErrorKind> {
    let Some(raw_target) = xml::attribute(e, TITLE_ATTRIBUTE)? else {
        return Err(ConversionErrorKind::MalformedOutput(format!(
            "<ri:page> element without {TITLE_ATTRIBUTE} attribute"
        )));
    };

    let event_text = wrapped.get(event_range.clone()).unwrap_or_default();
    let tag_start = event_range.start + event_text.find('<').unwrap_or_default();
    let tag = &wrapped[tag_start..event_range.end];

    let value = ATTRIBUTE_RE
        .captures_iter(tag)
        .find(|caps| &caps[1] == TITLE_ATTRIBUTE)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .ok_or_else(|| {
            ConversionErrorKind::MalformedOutput(format!("unable to locate {TITLE_ATTRIBUTE} in {tag}"))
        })?;

    let located = unescape(value.as_str())
        .map_err(|err| ConversionErrorKind::MalformedOutput(err.to_string()))?;
    if *located != *raw_target {
        return Err(ConversionErrorKind::MalformedOutput(format!(
            "{TITLE_ATTRIBUTE} in {tag} does not match parsed value '{raw_target}'"
        )));
    }

    let start = tag_start + value.start() - xml::ROOT_OPEN.len();
    Ok(ReferenceTarget {
        raw_target,
        span: start..start + value.len(),
    })
}

/// Path of the document a reference points to.
///
/// The final extension of the raw target is replaced with `.adoc` and the
/// result is resolved against the referencing document's directory.
pub(crate) fn resolve_target(document_path: &Path, raw_target: &str) -> PathBuf {
    let base = document_path.parent().unwrap_or_else(|| Path::new(""));
    let target = Path::new(raw_target);
    let file = match target.file_stem() {
        Some(stem) if target.extension().is_some() => {
            let mut name = stem.to_os_string();
            name.push(".");
            name.push(SOURCE_EXTENSION);
            target.with_file_name(name)
        }
        _ => {
            let mut name = target.as_os_str().to_os_string();
            name.push(".");
            name.push(SOURCE_EXTENSION);
            PathBuf::from(name)
        }
    };
    normalize(&base.join(file))
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn resolve_title(target_path: &Path, reader: &dyn SourceReader) -> Result<String, ConversionErrorKind> {
    let content = reader.read(target_path).map_err(|err| {
        if err.is_not_found() {
            ConversionErrorKind::UnresolvableReference {
                target_path: target_path.to_path_buf(),
            }
        } else {
            ConversionErrorKind::Source(err)
        }
    })?;

    extract_title(&content).map_err(|_| ConversionErrorKind::MissingTitle {
        path: Some(target_path.to_path_buf()),
    })
}

/// Replace every inter-page reference target in `body` with the title of
/// the referenced document.
///
/// References are resolved relative to `document_path`'s directory and read
/// through `reader`. Each distinct target is read once per call. A body
/// without references is returned unchanged.
///
/// # Errors
///
/// - [`ConversionErrorKind::UnresolvableReference`] if a target does not exist
/// - [`ConversionErrorKind::MissingTitle`] if a target declares no title
/// - [`ConversionErrorKind::MalformedOutput`] if the body is not well-formed
///   or a `ri:page` lacks its title attribute
pub fn rewrite_references(
    body: &str,
    document_path: &Path,
    reader: &dyn SourceReader,
) -> Result<String, ConversionErrorKind> {
    let references = find_references(body)?;
    if references.is_empty() {
        return Ok(body.to_owned());
    }

    let mut titles: HashMap<PathBuf, String> = HashMap::new();
    let mut out = String::with_capacity(body.len());
    let mut copied = 0;

    for reference in &references {
        let target_path = resolve_target(document_path, &reference.raw_target);
        let title = match titles.entry(target_path) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let title = resolve_title(entry.key(), reader)?;
                tracing::debug!(
                    document = %document_path.display(),
                    path = %entry.key().display(),
                    title = %title,
                    "Resolved cross-reference"
                );
                entry.insert(title)
            }
        };

        out.push_str(&body[copied..reference.span.start]);
        let escaped = escape_xml(title);
        if body[..reference.span.start].ends_with('\'') {
            out.push_str(&escaped.replace('\'', "&apos;"));
        } else {
            out.push_str(&escaped);
        }
        copied = reference.span.end;
    }
    out.push_str(&body[copied..]);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use acp_source::MockSource;
    use pretty_assertions::assert_eq;

    use super::*;

    fn page(target: &str) -> String {
        format!(r#"<ac:link><ri:page ri:content-title="{target}"/></ac:link>"#)
    }

    #[test]
    fn test_find_references_spans() {
        let body = format!("<p>See {}</p>", page("setup.adoc"));
        let references = find_references(&body).unwrap();

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].raw_target, "setup.adoc");
        assert_eq!(&body[references[0].span.clone()], "setup.adoc");
    }

    #[test]
    fn test_find_references_start_tag_and_single_quotes() {
        let body = "<ac:link><ri:page ri:space-key='DOC' ri:content-title='a &amp; b.adoc'></ri:page></ac:link>";
        let references = find_references(body).unwrap();

        assert_eq!(references[0].raw_target, "a & b.adoc");
        assert_eq!(&body[references[0].span.clone()], "a &amp; b.adoc");
    }

    #[test]
    fn test_title_text_inside_other_attribute_ignored() {
        let body = r#"<ri:page ri:space-key=" ri:content-title='zzz'" ri:content-title="a.adoc"/>"#;
        let references = find_references(body).unwrap();

        assert_eq!(references[0].raw_target, "a.adoc");
        assert_eq!(&body[references[0].span.clone()], "a.adoc");
    }

    #[test]
    fn test_rewrite_ignores_title_text_in_other_attribute() {
        let source = MockSource::new().with_document("a.adoc", "= Alpha\n");
        let body = r#"<ri:page ri:space-key=" ri:content-title='zzz'" ri:content-title="a.adoc"/>"#;

        let out = rewrite_references(body, Path::new("index.adoc"), &source).unwrap();
        assert_eq!(
            out,
            r#"<ri:page ri:space-key=" ri:content-title='zzz'" ri:content-title="Alpha"/>"#
        );
    }

    #[test]
    fn test_find_references_ignores_cdata() {
        let body = r#"<ac:plain-text-body><![CDATA[<ri:page ri:content-title="x.adoc"/>]]></ac:plain-text-body>"#;
        assert!(find_references(body).unwrap().is_empty());
    }

    #[test]
    fn test_missing_title_attribute_is_malformed() {
        let err = find_references(r#"<ri:page ri:space-key="DOC"/>"#).unwrap_err();
        assert!(matches!(err, ConversionErrorKind::MalformedOutput(_)));
    }

    #[test]
    fn test_unbalanced_body_is_malformed() {
        let err = find_references("<p>open").unwrap_err();
        assert!(matches!(err, ConversionErrorKind::MalformedOutput(_)));
    }

    #[test]
    fn test_resolve_target() {
        let doc = Path::new("docs/guide/intro.adoc");
        assert_eq!(resolve_target(doc, "setup.adoc"), PathBuf::from("docs/guide/setup.adoc"));
        assert_eq!(resolve_target(doc, "setup.html"), PathBuf::from("docs/guide/setup.adoc"));
        assert_eq!(resolve_target(doc, "setup"), PathBuf::from("docs/guide/setup.adoc"));
        assert_eq!(resolve_target(doc, "../index.adoc"), PathBuf::from("docs/index.adoc"));
        assert_eq!(resolve_target(doc, "./api/v1.adoc"), PathBuf::from("docs/guide/api/v1.adoc"));
        assert_eq!(resolve_target(Path::new("top.adoc"), "other.adoc"), PathBuf::from("other.adoc"));
    }

    #[test]
    fn test_zero_references_unchanged() {
        let source = MockSource::new();
        let body = "<p>No links here, only setup.adoc in text.</p>";

        let out = rewrite_references(body, Path::new("docs/intro.adoc"), &source).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_rewrites_only_attribute_value() {
        let source = MockSource::new().with_document("docs/setup.adoc", "= Setup Guide\n\nText.");
        let body = format!("<p>Read setup.adoc: {}</p>", page("setup.adoc"));

        let out = rewrite_references(&body, Path::new("docs/intro.adoc"), &source).unwrap();

        assert_eq!(
            out,
            r#"<p>Read setup.adoc: <ac:link><ri:page ri:content-title="Setup Guide"/></ac:link></p>"#
        );
    }

    #[test]
    fn test_title_is_escaped() {
        let source = MockSource::new().with_document("faq.adoc", "= Q & A: \"Why?\"\n");
        let out = rewrite_references(&page("faq.adoc"), Path::new("index.adoc"), &source).unwrap();

        assert_eq!(out, page("Q &amp; A: &quot;Why?&quot;"));
    }

    #[test]
    fn test_apostrophe_in_single_quoted_attribute() {
        let source = MockSource::new().with_document("faq.adoc", "= Users' Guide\n");
        let body = "<ri:page ri:content-title='faq.adoc'/>";

        let out = rewrite_references(body, Path::new("index.adoc"), &source).unwrap();
        assert_eq!(out, "<ri:page ri:content-title='Users&apos; Guide'/>");
    }

    #[test]
    fn test_each_target_read_once() {
        let source = MockSource::new().with_document("docs/setup.adoc", "= Setup Guide\n");
        let body = format!("{}{}{}", page("setup.adoc"), page("setup.adoc"), page("./setup.adoc"));

        let out = rewrite_references(&body, Path::new("docs/intro.adoc"), &source).unwrap();

        assert_eq!(out.matches("Setup Guide").count(), 3);
        assert_eq!(source.read_count(Path::new("docs/setup.adoc")), 1);
    }

    #[test]
    fn test_missing_target_is_unresolvable() {
        let source = MockSource::new();
        let err = rewrite_references(&page("gone.adoc"), Path::new("docs/intro.adoc"), &source).unwrap_err();

        assert!(matches!(
            err,
            ConversionErrorKind::UnresolvableReference { target_path } if target_path == Path::new("docs/gone.adoc")
        ));
    }

    #[test]
    fn test_target_without_title() {
        let source = MockSource::new().with_document("docs/notes.adoc", "Just text.\n");
        let err = rewrite_references(&page("notes.adoc"), Path::new("docs/intro.adoc"), &source).unwrap_err();

        assert!(matches!(
            err,
            ConversionErrorKind::MissingTitle { path: Some(path) } if path == Path::new("docs/notes.adoc")
        ));
    }

    #[test]
    fn test_multibyte_text_around_references() {
        let source = MockSource::new().with_document("b.adoc", "= Zweite Seite\n");
        let body = format!("<p>Grüße → {} ✓</p>", page("b.adoc"));

        let out = rewrite_references(&body, Path::new("a.adoc"), &source).unwrap();
        assert_eq!(out, format!("<p>Grüße → {} ✓</p>", page("Zweite Seite")));
    }
}
