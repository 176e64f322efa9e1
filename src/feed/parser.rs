use chrono::NaiveDateTime;
use feed_rs::{model, parser};

use super::enclosures::scan_enclosures;
use super::fetcher::FeedError;

/// Channel-level view of a fetched feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChannel {
    pub title: String,
    pub summary: String,
    /// Items in document order
    pub entries: Vec<RawEntry>,
}

/// One item of a feed, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    /// Calendar fields of the entry's update time, as published (UTC)
    pub updated: Option<NaiveDateTime>,
    /// Media enclosures in document order, including those inside
    /// `<media:group>`
    pub enclosures: Vec<RawEnclosure>,
}

/// A media enclosure attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnclosure {
    /// Media type exactly as the feed declares it; empty when omitted
    pub media_type: String,
    pub url: String,
}

impl RawEnclosure {
    pub fn new(media_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            url: url.into(),
        }
    }
}

/// Parses RSS, Atom or JSON Feed bytes into a [`RawChannel`].
///
/// The channel must carry both a title and a summary (RSS `description`,
/// Atom `subtitle`); either missing yields [`FeedError::MissingChannelField`].
pub fn parse_channel(bytes: &[u8]) -> Result<RawChannel, FeedError> {
    let feed = parse_document(bytes)?;

    let title = feed
        .title
        .map(|t| t.content)
        .ok_or(FeedError::MissingChannelField("title"))?;
    let summary = feed
        .description
        .map(|d| d.content)
        .ok_or(FeedError::MissingChannelField("summary"))?;

    Ok(RawChannel {
        title,
        summary,
        entries: collect_entries(bytes, feed.entries),
    })
}

/// Parses only the entries of a feed document.
///
/// Channel metadata is not inspected, so a document that has lost its title
/// or summary still yields its entries.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, FeedError> {
    let feed = parse_document(bytes)?;
    Ok(collect_entries(bytes, feed.entries))
}

fn parse_document(bytes: &[u8]) -> Result<model::Feed, FeedError> {
    parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))
}

fn collect_entries(bytes: &[u8], entries: Vec<model::Entry>) -> Vec<RawEntry> {
    // Enclosures come from the raw XML when it lines up item for item with
    // the parsed entries; JSON Feed and odd documents use the parsed model.
    let mut scanned = scan_enclosures(bytes)
        .filter(|items| items.len() == entries.len())
        .map(Vec::into_iter);
    if scanned.is_none() && !entries.is_empty() {
        tracing::debug!(
            entries = entries.len(),
            "Raw enclosure scan unusable, reading enclosures from parsed feed"
        );
    }

    entries
        .into_iter()
        .map(|entry| {
            let enclosures = scanned
                .as_mut()
                .and_then(Iterator::next)
                .unwrap_or_else(|| model_enclosures(&entry));

            // RSS pubDate lands in `published`; Atom carries `updated`
            let updated = entry.updated.or(entry.published).map(|dt| dt.naive_utc());

            RawEntry {
                title: entry.title.map(|t| t.content),
                updated,
                enclosures,
            }
        })
        .collect()
}

/// Enclosures as seen by feed-rs: media content followed by Atom enclosure links.
fn model_enclosures(entry: &model::Entry) -> Vec<RawEnclosure> {
    let media = entry
        .media
        .iter()
        .flat_map(|media| &media.content)
        .filter_map(|content| {
            let url = content.url.as_ref()?;
            Some(RawEnclosure {
                media_type: content
                    .content_type
                    .as_ref()
                    .map(|mime| mime.to_string())
                    .unwrap_or_default(),
                url: url.to_string(),
            })
        });

    let links = entry
        .links
        .iter()
        .filter(|link| link.rel.as_deref() == Some("enclosure"))
        .map(|link| RawEnclosure {
            media_type: link.media_type.clone().unwrap_or_default(),
            url: link.href.clone(),
        });

    media.chain(links).collect()
}
