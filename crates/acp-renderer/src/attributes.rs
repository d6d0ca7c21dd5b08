//! Document attributes: entries, bindings and `{name}` references.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(!?)(\w[\w-]*)(!?):(?:[ \t]+(.*?))?[ \t]*$").unwrap());

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?\{(\w[\w-]*)\}").unwrap());

/// An attribute entry line such as `:product: ACP` or `:toc!:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeEntry {
    pub name: String,
    /// `None` when the entry unsets the attribute.
    pub value: Option<String>,
}

/// Parse an attribute entry line.
pub(crate) fn parse_entry(line: &str) -> Option<AttributeEntry> {
    let caps = ENTRY_RE.captures(line)?;
    let unset = !caps[1].is_empty() || !caps[3].is_empty();
    let name = caps[2].to_lowercase();
    let value = if unset {
        None
    } else {
        Some(caps.get(4).map_or("", |m| m.as_str()).to_owned())
    };
    Some(AttributeEntry { name, value })
}

/// Values of the built-in character replacement attributes.
fn builtin(name: &str) -> Option<&'static str> {
    Some(match name {
        "empty" => "",
        "sp" => " ",
        "nbsp" => "\u{a0}",
        "zwsp" => "\u{200b}",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "startsb" => "[",
        "endsb" => "]",
        "vbar" => "|",
        "plus" => "+",
        "asterisk" => "*",
        "backtick" => "`",
        "caret" => "^",
        "tilde" => "~",
        _ => return None,
    })
}

/// Attribute table for one rendering pass.
///
/// Bindings passed in render options are locked: document entries cannot
/// change them. Bindings whose value ends in `@` are soft defaults and can
/// be overridden by the document.
#[derive(Debug, Clone, Default)]
pub(crate) struct Attributes {
    values: HashMap<String, String>,
    locked: HashSet<String>,
}

impl Attributes {
    pub(crate) fn from_bindings(bindings: &BTreeMap<String, String>) -> Self {
        let mut attributes = Self::default();
        for (name, value) in bindings {
            let name = name.to_lowercase();
            if let Some(soft) = value.strip_suffix('@') {
                attributes.values.insert(name, soft.to_owned());
            } else {
                attributes.values.insert(name.clone(), value.clone());
                attributes.locked.insert(name);
            }
        }
        attributes
    }

    /// Apply an attribute entry declared in the document.
    ///
    /// The value is substituted against the attributes defined so far.
    pub(crate) fn apply(&mut self, entry: &AttributeEntry) {
        if self.locked.contains(&entry.name) {
            tracing::debug!(attribute = %entry.name, "Ignoring entry for locked attribute");
            return;
        }
        match &entry.value {
            Some(value) => {
                let value = self.substitute(value).into_owned();
                self.values.insert(entry.name.clone(), value);
            }
            None => {
                self.values.remove(&entry.name);
            }
        }
    }

    /// Set an attribute unless it is already defined.
    pub(crate) fn set_default(&mut self, name: &str, value: &str) {
        self.values
            .entry(name.to_owned())
            .or_insert_with(|| value.to_owned());
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub(crate) fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Replace `{name}` references.
    ///
    /// Unknown references are left untouched; `\{name}` yields the literal
    /// reference without the backslash.
    pub(crate) fn substitute<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains('{') {
            return Cow::Borrowed(text);
        }
        REFERENCE_RE.replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            if let Some(escaped) = whole.strip_prefix('\\') {
                return escaped.to_owned();
            }
            let name = caps[1].to_lowercase();
            self.get(&name)
                .or_else(|| builtin(&name))
                .map_or_else(|| whole.to_owned(), str::to_owned)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_parse_entry_with_value() {
        let entry = parse_entry(":product: ACP Suite").unwrap();
        assert_eq!(entry.name, "product");
        assert_eq!(entry.value.as_deref(), Some("ACP Suite"));
    }

    #[test]
    fn test_parse_entry_flag() {
        let entry = parse_entry(":toc:").unwrap();
        assert_eq!(entry.value.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_entry_unset() {
        assert_eq!(parse_entry(":toc!:").unwrap().value, None);
        assert_eq!(parse_entry(":!toc:").unwrap().value, None);
    }

    #[test]
    fn test_parse_entry_rejects_text() {
        assert!(parse_entry("Just a line").is_none());
        assert!(parse_entry(": not an entry").is_none());
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let mut attrs = Attributes::default();
        attrs.apply(&parse_entry(":product: ACP").unwrap());

        assert_eq!(attrs.substitute("Use {product} or {other}"), "Use ACP or {other}");
    }

    #[test]
    fn test_substitute_escaped() {
        let mut attrs = Attributes::default();
        attrs.apply(&parse_entry(":product: ACP").unwrap());

        assert_eq!(attrs.substitute(r"\{product}"), "{product}");
    }

    #[test]
    fn test_substitute_builtins() {
        let attrs = Attributes::default();
        assert_eq!(attrs.substitute("a{sp}b{vbar}c"), "a b|c");
    }

    #[test]
    fn test_entry_value_is_substituted() {
        let mut attrs = Attributes::default();
        attrs.apply(&parse_entry(":base: https://example.com").unwrap());
        attrs.apply(&parse_entry(":docs: {base}/docs").unwrap());

        assert_eq!(attrs.get("docs"), Some("https://example.com/docs"));
    }

    #[test]
    fn test_hard_binding_wins() {
        let mut attrs = Attributes::from_bindings(&bindings(&[("product", "CLI")]));
        attrs.apply(&parse_entry(":product: Document").unwrap());

        assert_eq!(attrs.get("product"), Some("CLI"));
    }

    #[test]
    fn test_soft_binding_yields() {
        let mut attrs = Attributes::from_bindings(&bindings(&[("product", "CLI@")]));
        assert_eq!(attrs.get("product"), Some("CLI"));

        attrs.apply(&parse_entry(":product: Document").unwrap());
        assert_eq!(attrs.get("product"), Some("Document"));
    }

    #[test]
    fn test_unset() {
        let mut attrs = Attributes::default();
        attrs.apply(&parse_entry(":draft:").unwrap());
        assert!(attrs.is_set("draft"));

        attrs.apply(&parse_entry(":draft!:").unwrap());
        assert!(!attrs.is_set("draft"));
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut attrs = Attributes::default();
        attrs.apply(&parse_entry(":doctitle: Declared").unwrap());
        attrs.set_default("doctitle", "Heading");

        assert_eq!(attrs.get("doctitle"), Some("Declared"));
    }
}
