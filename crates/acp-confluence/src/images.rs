//! Image reference collection.

use quick_xml::events::Event;

use crate::ConversionErrorKind;
use crate::xml;

/// List the image targets referenced by `ac:image` elements in `body`.
///
/// For each image the first `ri:attachment` (its `ri:filename`) or `ri:url`
/// (its `ri:value`) child is taken. Targets keep document order and
/// duplicates.
///
/// # Errors
///
/// Returns [`ConversionErrorKind::MalformedOutput`] if the body is not
/// well-formed or an image resource lacks its target attribute.
pub fn collect_images(body: &str) -> Result<Vec<String>, ConversionErrorKind> {
    let wrapped = xml::wrap(body);
    let mut reader = xml::reader(&wrapped);
    let mut images = Vec::new();
    let mut in_image = false;
    let mut found = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| xml::malformed(&reader, &err))?;
        match event {
            Event::Start(e) if e.name().as_ref() == b"ac:image" => {
                in_image = true;
                found = false;
            }
            Event::End(e) if e.name().as_ref() == b"ac:image" => {
                in_image = false;
            }
            Event::Start(e) | Event::Empty(e) if in_image && !found => {
                let attribute = match e.name().as_ref() {
                    b"ri:attachment" => "ri:filename",
                    b"ri:url" => "ri:value",
                    _ => continue,
                };
                let Some(target) = xml::attribute(&e, attribute)? else {
                    return Err(ConversionErrorKind::MalformedOutput(format!(
                        "image resource without {attribute} attribute"
                    )));
                };
                images.push(target);
                found = true;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(images)
}
