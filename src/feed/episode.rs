//! Episode normalization: one raw feed entry in, one playable episode out.

use chrono::{Local, LocalResult, NaiveDateTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fetcher::FeedError;
use super::parser::{RawEnclosure, RawEntry};
use super::podcast::Feed;

/// Media-type prefix that marks an enclosure as playable audio.
const AUDIO_PREFIX: &str = "audio";

/// A normalized episode, not yet persisted.
///
/// `feed_url` refers back to the owning [`Feed`] by key; the episode does not
/// keep the feed alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    pub title: String,
    pub media_url: String,
    pub pub_date: NaiveDateTime,
    pub feed_url: String,
}

/// Why a single entry could not become an [`Episode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntryDefect {
    #[error("entry has no media enclosures")]
    NoEnclosures,
    #[error("entry has no usable update time")]
    MissingTimestamp,
    #[error("entry has no title")]
    MissingTitle,
}

/// What to do with a batch when one of its entries is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum EntryPolicy {
    /// Fail the whole extraction with [`FeedError::MalformedEntry`]
    #[default]
    #[serde(rename = "abort")]
    AbortBatch,
    /// Drop the entry and keep going
    #[serde(rename = "skip")]
    SkipEntry,
}

/// Picks the single playable URL among an entry's enclosures.
///
/// The last enclosure whose media type starts with `"audio"` wins. When no
/// enclosure is audio, the first enclosure is used whatever its type.
pub fn resolve_media_url(enclosures: &[RawEnclosure]) -> Result<&str, EntryDefect> {
    let mut selected: Option<&RawEnclosure> = None;

    // Later audio enclosures overwrite earlier ones; do not stop at the first match.
    for enclosure in enclosures {
        if enclosure.media_type.starts_with(AUDIO_PREFIX) {
            selected = Some(enclosure);
        }
    }

    selected
        .or_else(|| enclosures.first())
        .map(|enclosure| enclosure.url.as_str())
        .ok_or(EntryDefect::NoEnclosures)
}

/// Converts an entry's calendar fields into a local point in time.
///
/// The fields are read as local wall-clock time, not UTC. Times skipped by a
/// daylight-saving jump are pushed forward past the gap; repeated times take
/// the earlier instant.
pub fn to_local_timestamp(fields: NaiveDateTime) -> NaiveDateTime {
    let instant = match Local.from_local_datetime(&fields) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => Local
            .from_local_datetime(&(fields + TimeDelta::hours(1)))
            .earliest(),
    };

    instant.map(|dt| dt.naive_local()).unwrap_or(fields)
}

/// Normalizes one raw entry into an [`Episode`] owned by `feed`.
pub fn normalize_entry(entry: &RawEntry, feed: &Feed) -> Result<Episode, EntryDefect> {
    let title = entry.title.clone().ok_or(EntryDefect::MissingTitle)?;
    let updated = entry.updated.ok_or(EntryDefect::MissingTimestamp)?;
    let media_url = resolve_media_url(&entry.enclosures)?;

    Ok(Episode {
        title,
        media_url: media_url.to_owned(),
        pub_date: to_local_timestamp(updated),
        feed_url: feed.url().to_owned(),
    })
}

/// Normalizes a batch of entries in order, applying `policy` to bad entries.
pub fn normalize_entries(
    entries: &[RawEntry],
    feed: &Feed,
    policy: EntryPolicy,
) -> Result<Vec<Episode>, FeedError> {
    let mut episodes = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match normalize_entry(entry, feed) {
            Ok(episode) => episodes.push(episode),
            Err(defect) => match policy {
                EntryPolicy::AbortBatch => {
                    return Err(FeedError::MalformedEntry { index, defect });
                }
                EntryPolicy::SkipEntry => {
                    tracing::warn!(
                        feed = %feed.url(),
                        index = index,
                        defect = %defect,
                        "Skipping malformed entry"
                    );
                }
            },
        }
    }

    Ok(episodes)
}
