//! Document header parsing and title extraction.
//!
//! The header is the leading part of a document: blank lines, comments,
//! attribute entries, the level-0 title and the author/revision lines that
//! follow it. Body content is never inspected.

use std::sync::LazyLock;

use regex::Regex;

use crate::attributes::{AttributeEntry, parse_entry};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[=#][ \t]+(.*)$").unwrap());

static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/{4,}$").unwrap());

/// The document declares no title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("top-level heading or title meta information must be set")]
pub struct MissingTitle;

/// Parsed document header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Header {
    /// Text of the level-0 heading, trimmed and non-empty.
    pub heading: Option<String>,
    /// Author line following the heading.
    pub author: Option<String>,
    /// Attribute entries in declaration order.
    pub entries: Vec<AttributeEntry>,
    /// Index of the first body line.
    pub body_start: usize,
}

impl Header {
    /// Display title: the level-0 heading, else the last `doctitle`/`title` entry.
    pub(crate) fn title(&self) -> Option<&str> {
        if let Some(heading) = &self.heading {
            return Some(heading);
        }
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == "doctitle" || e.name == "title")
            .and_then(|e| e.value.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Extract the display title declared in the document header.
///
/// # Examples
///
/// ```
/// use acp_renderer::extract_title;
///
/// assert_eq!(extract_title("= Setup Guide\n\nBody text.").unwrap(), "Setup Guide");
/// assert_eq!(extract_title(":doctitle: Release Notes\n").unwrap(), "Release Notes");
/// assert!(extract_title("Just a paragraph.").is_err());
/// ```
pub fn extract_title(raw: &str) -> Result<String, MissingTitle> {
    parse_header(raw)
        .title()
        .map(str::to_owned)
        .ok_or(MissingTitle)
}

pub(crate) fn parse_header(raw: &str) -> Header {
    let lines: Vec<&str> = raw.lines().collect();
    let mut header = Header::default();
    let mut i = 0;
    let mut seen_content = false;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            if seen_content {
                break;
            }
            i += 1;
            continue;
        }

        if BLOCK_COMMENT_RE.is_match(line) {
            match skip_block_comment(&lines, i) {
                Some(next) => i = next,
                None => break,
            }
            continue;
        }

        if line.starts_with("//") {
            i += 1;
            continue;
        }

        if let Some(entry) = parse_entry(line) {
            header.entries.push(entry);
            seen_content = true;
            i += 1;
            continue;
        }

        // Attribute entries and comments may precede the title line.
        if header.heading.is_none()
            && let Some(caps) = TITLE_RE.captures(line)
        {
            let text = caps[1].trim();
            if !text.is_empty() {
                header.heading = Some(text.to_owned());
            }
            seen_content = true;
            i = skip_author_lines(&lines, i + 1, &mut header);
            continue;
        }

        break;
    }

    header.body_start = i;
    header
}

/// Return the index after the closing delimiter, or `None` if unterminated.
fn skip_block_comment(lines: &[&str], open: usize) -> Option<usize> {
    let delimiter = lines[open];
    lines[open + 1..]
        .iter()
        .position(|l| *l == delimiter)
        .map(|offset| open + offset + 2)
}

/// Consume the author and revision lines directly after the heading.
fn skip_author_lines(lines: &[&str], start: usize, header: &mut Header) -> usize {
    let mut i = start;
    for slot in 0..2 {
        let Some(line) = lines.get(i) else { break };
        if line.trim().is_empty() || line.starts_with("//") || line.starts_with(':') {
            break;
        }
        if slot == 0 {
            let name = line.split('<').next().unwrap_or(line).trim();
            header.author = Some(name.to_owned());
        }
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_heading() {
        assert_eq!(extract_title("= Introduction\n\nWelcome.").unwrap(), "Introduction");
    }

    #[test]
    fn test_markdown_heading() {
        assert_eq!(extract_title("# Introduction\n").unwrap(), "Introduction");
    }

    #[test]
    fn test_title_is_trimmed_not_altered() {
        assert_eq!(
            extract_title("=   Guide: Part {n}   \n").unwrap(),
            "Guide: Part {n}"
        );
    }

    #[test]
    fn test_leading_blank_and_comments() {
        let raw = "\n// leading comment\n////\nblock\ncomment\n////\n= Title\n";
        assert_eq!(extract_title(raw).unwrap(), "Title");
    }

    #[test]
    fn test_entries_before_heading() {
        let raw = ":experimental:\n= Title\n:toc:\n";
        let header = parse_header(raw);
        assert_eq!(header.title(), Some("Title"));
        assert_eq!(header.entries.len(), 2);
    }

    #[test]
    fn test_extract_title_after_attribute_entry() {
        assert_eq!(extract_title(":experimental:\n= Title\n:toc:\n").unwrap(), "Title");
    }

    #[test]
    fn test_blank_line_after_entries_ends_header() {
        assert!(extract_title(":experimental:\n\n= Not A Title\n").is_err());
    }

    #[test]
    fn test_doctitle_attribute() {
        assert_eq!(extract_title(":doctitle: Release Notes\n\nBody").unwrap(), "Release Notes");
    }

    #[test]
    fn test_title_attribute() {
        assert_eq!(extract_title(":title: Release Notes\n").unwrap(), "Release Notes");
    }

    #[test]
    fn test_heading_wins_over_doctitle() {
        let raw = "= Heading\n:doctitle: Attribute\n";
        assert_eq!(extract_title(raw).unwrap(), "Heading");
    }

    #[test]
    fn test_missing_title() {
        assert_eq!(extract_title("Some paragraph.\n\n== Section"), Err(MissingTitle));
        assert_eq!(extract_title(""), Err(MissingTitle));
    }

    #[test]
    fn test_section_is_not_title() {
        assert_eq!(extract_title("== Section\n"), Err(MissingTitle));
    }

    #[test]
    fn test_empty_heading_is_missing() {
        assert_eq!(extract_title("=   \n"), Err(MissingTitle));
        assert_eq!(extract_title(":doctitle:\n"), Err(MissingTitle));
    }

    #[test]
    fn test_heading_after_body_is_ignored() {
        assert_eq!(extract_title("Intro text.\n\n= Late Title\n"), Err(MissingTitle));
    }

    #[test]
    fn test_doctitle_after_blank_is_body() {
        let raw = ":toc:\n\n:doctitle: Body Entry\n";
        assert_eq!(extract_title(raw), Err(MissingTitle));
    }

    #[test]
    fn test_author_and_revision_lines() {
        let raw = "= Title\nJane Doe <jane@example.com>\nv1.0, 2024-01-01\n:toc:\n\nBody";
        let header = parse_header(raw);

        assert_eq!(header.author.as_deref(), Some("Jane Doe"));
        assert_eq!(header.entries.len(), 1);
        assert_eq!(header.body_start, 4);
    }

    #[test]
    fn test_body_start_without_header() {
        let header = parse_header("\n\nParagraph\n");
        assert_eq!(header.heading, None);
        assert_eq!(header.body_start, 2);
    }

    #[test]
    fn test_body_start_after_heading() {
        let header = parse_header("= Title\n\nBody\n");
        assert_eq!(header.body_start, 1);
    }
}
