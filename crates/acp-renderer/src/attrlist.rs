//! Parsing of bracketed attribute lists.
//!
//! Handles both block attribute lines (`[source,rust]`, `[NOTE]`,
//! `[cols="1,2",options="header"]`) and macro attribute lists
//! (`image::a.png[Alt text,200]`).

use std::collections::{HashMap, HashSet};

/// Parsed attribute list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AttrList {
    positional: Vec<String>,
    named: HashMap<String, String>,
    options: HashSet<String>,
    id: Option<String>,
}

impl AttrList {
    /// Parse the text between the brackets.
    ///
    /// With `shorthand` enabled, the first positional attribute may carry
    /// `#id`, `.role` and `%option` shorthands (`[source%linenums]`, `[#intro]`).
    /// Macro attribute lists disable it, since their first positional
    /// attribute is free text such as alt text.
    pub(crate) fn parse(text: &str, shorthand: bool) -> Self {
        let mut list = Self::default();

        for (index, item) in split_items(text).into_iter().enumerate() {
            if let Some((key, value)) = named_item(&item) {
                if key == "options" || key == "opts" {
                    list.options
                        .extend(value.split(',').map(|o| o.trim().to_owned()));
                } else if key == "id" {
                    list.id = Some(value);
                } else {
                    list.named.insert(key, value);
                }
                continue;
            }

            let value = unquote(item.trim());
            if index == 0 && shorthand {
                list.apply_shorthand(&value);
            } else {
                list.positional.push(value);
            }
        }

        list
    }

    fn apply_shorthand(&mut self, value: &str) {
        let split = value.find(['#', '.', '%']).unwrap_or(value.len());
        let (style, rest) = value.split_at(split);
        self.positional.push(style.to_owned());

        let mut marker = None;
        let mut current = String::new();
        for c in rest.chars().chain(std::iter::once('\0')) {
            if matches!(c, '#' | '.' | '%' | '\0') {
                match marker {
                    Some('#') if !current.is_empty() => self.id = Some(current.clone()),
                    Some('%') if !current.is_empty() => {
                        self.options.insert(current.clone());
                    }
                    _ => {}
                }
                marker = Some(c);
                current.clear();
            } else {
                current.push(c);
            }
        }
    }

    /// Block style (first positional attribute), if non-empty.
    pub(crate) fn style(&self) -> Option<&str> {
        self.positional
            .first()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Positional attribute at `index` (0-based), if non-empty.
    pub(crate) fn positional(&self, index: usize) -> Option<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Named attribute value.
    pub(crate) fn named(&self, key: &str) -> Option<&str> {
        self.named.get(key).map(String::as_str)
    }

    /// Whether the option is set (via `%opt` or `options="opt"`).
    pub(crate) fn has_option(&self, option: &str) -> bool {
        self.options.contains(option) || self.named.contains_key(&format!("{option}-option"))
    }

    /// Element id set via `#id` shorthand or `id=` attribute.
    pub(crate) fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Split on commas that are not inside double quotes.
fn split_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !items.is_empty() {
        items.push(current);
    }
    items
}

/// Parse `key=value` where key is a valid attribute name.
fn named_item(item: &str) -> Option<(String, String)> {
    let (key, value) = item.split_once('=')?;
    let key = key.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| (key.to_owned(), unquote(value.trim())))
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_owned()
}
