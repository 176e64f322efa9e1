//! Feed ingestion: fetching podcast feeds and normalizing their episodes.
//!
//! - [`parser`] - `feed-rs` based parsing into raw channel/entry/enclosure values
//! - `enclosures` - `quick-xml` scan that reads enclosures as written
//! - [`fetcher`] - retrieval over HTTP or from local files, and the error taxonomy
//! - [`episode`] - per-entry normalization and media URL resolution
//! - [`podcast`] - the [`Feed`] type tying the two together
//!
//! # Example
//!
//! ```ignore
//! use podbo::feed::{EntryPolicy, Feed, FeedFetcher};
//!
//! let fetcher = FeedFetcher::new(reqwest::Client::new());
//! let feed = Feed::fetch(&fetcher, "https://example.com/podcast.xml").await?;
//! let episodes = feed.get_entries(&fetcher, EntryPolicy::AbortBatch).await?;
//! ```

mod enclosures;
pub mod episode;
pub mod fetcher;
pub mod parser;
pub mod podcast;

pub use episode::{
    normalize_entries, normalize_entry, resolve_media_url, to_local_timestamp, EntryDefect,
    EntryPolicy, Episode,
};
pub use fetcher::{FeedError, FeedErrorKind, FeedFetcher, DEFAULT_MAX_FEED_SIZE};
pub use parser::{parse_channel, parse_entries, RawChannel, RawEnclosure, RawEntry};
pub use podcast::Feed;
