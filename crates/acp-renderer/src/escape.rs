//! XML escaping helpers for Confluence storage format.

use std::borrow::Cow;

/// Escape text for use in XML element content or attribute values.
///
/// Escapes `&`, `<`, `>` and `"`. Returns the input unchanged (borrowed)
/// when nothing needs escaping.
///
/// # Examples
///
/// ```
/// use acp_renderer::escape_xml;
///
/// assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
/// assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
/// assert_eq!(escape_xml("plain"), "plain");
/// ```
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Wrap text in a CDATA section, splitting any embedded `]]>` terminator.
pub(crate) fn cdata(s: &str) -> String {
    format!("<![CDATA[{}]]>", s.replace("]]>", "]]]]><![CDATA[>"))
}
