use serde::Serialize;

use super::episode::{normalize_entries, Episode, EntryPolicy};
use super::fetcher::{FeedError, FeedFetcher};
use super::parser::RawChannel;

/// A podcast feed, identified by its URL.
///
/// `title` and `summary` are captured once, when the feed is constructed, and
/// have no setters. Episodes are not cached here; see [`Feed::get_entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    url: String,
    title: String,
    summary: String,
}

impl Feed {
    /// Fetches `url` and builds a feed from its channel metadata.
    ///
    /// # Errors
    ///
    /// Any [`FeedError`] from the fetch; no `Feed` is produced on failure.
    pub async fn fetch(fetcher: &FeedFetcher, url: &str) -> Result<Self, FeedError> {
        let channel = fetcher.fetch(url).await?;
        Ok(Self::from_channel(url, &channel))
    }

    /// Builds a feed from an already fetched channel.
    pub fn from_channel(url: &str, channel: &RawChannel) -> Self {
        Self {
            url: url.to_owned(),
            title: channel.title.clone(),
            summary: channel.summary.clone(),
        }
    }

    /// Rebuilds a feed from previously stored attributes.
    pub fn restore(
        url: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            summary: summary.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Re-fetches the feed and derives a fresh batch of episodes.
    ///
    /// Every call hits the source again and returns new, unpersisted records;
    /// the feed itself is left untouched (its title and summary are not
    /// refreshed, nor required to still be present). Persisting or
    /// de-duplicating the batch is up to the caller.
    pub async fn get_entries(
        &self,
        fetcher: &FeedFetcher,
        policy: EntryPolicy,
    ) -> Result<Vec<Episode>, FeedError> {
        let entries = fetcher.fetch_entries(&self.url).await?;
        normalize_entries(&entries, self, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parser::RawEntry;

    #[test]
    fn test_from_channel_copies_metadata() {
        let channel = RawChannel {
            title: "  Padded Title ".to_string(),
            summary: "Summary with <b>markup</b>".to_string(),
            entries: vec![RawEntry::default()],
        };
        let feed = Feed::from_channel("https://example.com/rss", &channel);
        assert_eq!(feed.url(), "https://example.com/rss");
        assert_eq!(feed.title(), "  Padded Title ");
        assert_eq!(feed.summary(), "Summary with <b>markup</b>");
    }
}
