//! Shared helpers for scanning storage-format bodies with quick-xml.
//!
//! Bodies are fragments, so they are wrapped in a synthetic root element
//! before parsing. Byte offsets reported by the reader are relative to the
//! wrapped string; subtract [`ROOT_OPEN`]'s length to map them back.

use quick_xml::Reader;
use quick_xml::events::BytesStart;

use crate::ConversionErrorKind;

pub(crate) const ROOT_OPEN: &str = "<root>";

pub(crate) fn wrap(body: &str) -> String {
    format!("{ROOT_OPEN}{body}</root>")
}

pub(crate) fn reader(wrapped: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(wrapped);
    reader.config_mut().trim_text(false);
    reader
}

/// Current byte offset of the reader in the wrapped string.
pub(crate) fn position(reader: &Reader<&[u8]>) -> Result<usize, ConversionErrorKind> {
    usize::try_from(reader.buffer_position())
        .map_err(|_| ConversionErrorKind::MalformedOutput("body too large".to_owned()))
}

pub(crate) fn malformed(reader: &Reader<&[u8]>, err: &quick_xml::Error) -> ConversionErrorKind {
    let offset = usize::try_from(reader.error_position())
        .unwrap_or_default()
        .saturating_sub(ROOT_OPEN.len());
    ConversionErrorKind::MalformedOutput(format!("{err} (at byte {offset})"))
}

/// Unescaped value of attribute `name`, if present.
pub(crate) fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, ConversionErrorKind> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConversionErrorKind::MalformedOutput(err.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| ConversionErrorKind::MalformedOutput(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
