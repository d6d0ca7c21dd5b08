//! Line preprocessing: conditional inclusion.
//!
//! Evaluates `ifdef::`, `ifndef::` and `endif::` directives against the
//! attributes known at each point of the document. Attribute entries are
//! tracked on a private copy so that later directives see them; the entry
//! lines themselves are passed through for the parser to apply.

use std::sync::LazyLock;

use regex::Regex;

use crate::RenderError;
use crate::attributes::{Attributes, parse_entry};

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ifdef|ifndef|endif)::([^\[\s]*)\[(.*)\]$").unwrap());

/// A source line with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

struct Frame {
    directive: String,
    line: usize,
    active: bool,
}

/// Apply conditional directives to `lines`.
pub(crate) fn preprocess<'a>(
    lines: impl IntoIterator<Item = Line<'a>>,
    attributes: &Attributes,
) -> Result<Vec<Line<'a>>, RenderError> {
    let mut attributes = attributes.clone();
    let mut stack: Vec<Frame> = Vec::new();
    let mut out = Vec::new();

    for line in lines {
        let active = stack.last().is_none_or(|f| f.active);

        if let Some(caps) = DIRECTIVE_RE.captures(line.text) {
            let kind = &caps[1];
            let names = &caps[2];
            let content = caps.get(3).map_or("", |m| m.as_str());

            if kind == "endif" {
                if stack.pop().is_none() {
                    return Err(RenderError::Syntax {
                        line: line.number,
                        message: "endif::[] without matching ifdef or ifndef".to_owned(),
                    });
                }
                continue;
            }

            let matched = evaluate(names, &attributes);
            let include = if kind == "ifdef" { matched } else { !matched };

            if content.is_empty() {
                stack.push(Frame {
                    directive: format!("{kind}::{names}[]"),
                    line: line.number,
                    active: active && include,
                });
            } else if active && include {
                out.push(Line {
                    number: line.number,
                    text: content,
                });
            }
            continue;
        }

        if !active {
            continue;
        }

        if line.text.starts_with("include::") {
            tracing::warn!(line = line.number, directive = line.text, "Include directives are not supported");
            continue;
        }

        if let Some(entry) = parse_entry(line.text) {
            attributes.apply(&entry);
        }
        out.push(line);
    }

    if let Some(frame) = stack.pop() {
        return Err(RenderError::Syntax {
            line: frame.line,
            message: format!("unterminated conditional {}", frame.directive),
        });
    }

    Ok(out)
}

/// `a,b` matches when any attribute is set, `a+b` when all are.
fn evaluate(names: &str, attributes: &Attributes) -> bool {
    if names.contains('+') {
        names.split('+').all(|n| attributes.is_set(&n.to_lowercase()))
    } else {
        names.split(',').any(|n| attributes.is_set(&n.to_lowercase()))
    }
}
