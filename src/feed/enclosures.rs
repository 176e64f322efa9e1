//! Raw enclosure scan over XML feed documents.
//!
//! feed-rs normalizes media objects: it parses `type` into a MIME value
//! (dropping anything that is not a valid MIME type), moves `<media:group>`
//! content ahead of ungrouped content, and keeps Atom enclosure links apart
//! from media. Media resolution needs each item's enclosures exactly as
//! written, so this pass reads them straight from the XML.

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use super::parser::RawEnclosure;

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const MEDIA_RSS_NS: &[u8] = b"http://search.yahoo.com/mrss";

/// Namespace an element belongs to, as far as enclosures are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocabulary {
    /// No namespace (RSS 2.0)
    Plain,
    Atom,
    MediaRss,
    Other,
}

impl Vocabulary {
    fn of(ns: &ResolveResult<'_>) -> Self {
        match ns {
            ResolveResult::Unbound => Vocabulary::Plain,
            ResolveResult::Bound(Namespace(uri)) if *uri == ATOM_NS => Vocabulary::Atom,
            ResolveResult::Bound(Namespace(uri)) if uri.starts_with(MEDIA_RSS_NS) => {
                Vocabulary::MediaRss
            }
            // Feeds that use the `media:` prefix without declaring it
            ResolveResult::Unknown(prefix) if prefix.as_slice() == b"media" => Vocabulary::MediaRss,
            _ => Vocabulary::Other,
        }
    }
}

fn is_item(e: &BytesStart<'_>, vocabulary: Vocabulary) -> bool {
    match e.local_name().as_ref() {
        b"item" => vocabulary != Vocabulary::MediaRss,
        b"entry" => matches!(vocabulary, Vocabulary::Atom | Vocabulary::Plain),
        _ => false,
    }
}

/// Reads one enclosure-bearing element: RSS `<enclosure>`, `<media:content>`
/// or Atom `<link rel="enclosure">`. Elements without a URL are ignored.
fn read_enclosure(
    e: &BytesStart<'_>,
    vocabulary: Vocabulary,
    decoder: Decoder,
) -> Option<RawEnclosure> {
    let url_key: &[u8] = match (vocabulary, e.local_name().as_ref()) {
        (Vocabulary::Plain, b"enclosure") | (Vocabulary::MediaRss, b"content") => b"url",
        (Vocabulary::Atom, b"link") => b"href",
        _ => return None,
    };

    let mut url = None;
    let mut media_type = String::new();
    let mut rel = None;

    for attr in e.attributes().flatten() {
        let value = attr
            .decode_and_unescape_value(decoder)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        match attr.key.as_ref() {
            key if key == url_key => url = Some(value),
            b"type" => media_type = value,
            b"rel" => rel = Some(value),
            _ => {}
        }
    }

    if vocabulary == Vocabulary::Atom && rel.as_deref() != Some("enclosure") {
        return None;
    }

    Some(RawEnclosure {
        media_type,
        url: url?,
    })
}

/// Collects the enclosures of every item (RSS) or entry (Atom), in document
/// order, with media types kept verbatim.
///
/// Returns `None` when the document is not well-formed XML; callers fall
/// back to the parsed feed model in that case.
pub(crate) fn scan_enclosures(bytes: &[u8]) -> Option<Vec<Vec<RawEnclosure>>> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut items = Vec::new();
    // Nesting depth below the open item, and what it has collected so far
    let mut current: Option<(usize, Vec<RawEnclosure>)> = None;

    loop {
        let (vocabulary, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, event)) => (Vocabulary::of(&ns), event),
            Err(e) => {
                tracing::debug!(error = %e, "Enclosure scan stopped on invalid XML");
                return None;
            }
        };

        match event {
            Event::Start(e) => match current.as_mut() {
                Some((depth, found)) => {
                    *depth += 1;
                    found.extend(read_enclosure(&e, vocabulary, reader.decoder()));
                }
                None if is_item(&e, vocabulary) => current = Some((0, Vec::new())),
                None => {}
            },
            Event::Empty(e) => match current.as_mut() {
                Some((_, found)) => found.extend(read_enclosure(&e, vocabulary, reader.decoder())),
                None if is_item(&e, vocabulary) => items.push(Vec::new()),
                None => {}
            },
            Event::End(_) => match current.take() {
                Some((0, found)) => items.push(found),
                Some((depth, found)) => current = Some((depth - 1, found)),
                None => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Some(items)
}
