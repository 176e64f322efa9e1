//! Integration tests for the subscribe flow: fetch a feed, store it, derive and
//! store its episodes.
//!
//! Feeds are served from local files; each test uses its own in-memory database.

use podbo::feed::{EntryPolicy, Feed, FeedFetcher};
use podbo::storage::{Database, DatabaseError};
use std::path::PathBuf;

const PODCAST_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Local Cast</title>
    <description>Served from disk</description>
    <item>
      <title>Older</title>
      <pubDate>Wed, 10 Jan 2024 12:00:00 GMT</pubDate>
      <enclosure url="https://example.com/older.mp3" length="1" type="audio/mpeg"/>
    </item>
    <item>
      <title>Newer</title>
      <pubDate>Fri, 12 Jan 2024 12:00:00 GMT</pubDate>
      <enclosure url="https://example.com/newer.m4a" length="1" type="audio/x-m4a"/>
    </item>
  </channel>
</rss>"#;

fn write_feed(test_name: &str) -> (PathBuf, String) {
    let dir = std::env::temp_dir().join(format!("podbo_lifecycle_{test_name}"));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("feed.xml");
    std::fs::write(&file, PODCAST_RSS).unwrap();
    let url = url::Url::from_file_path(&file).unwrap().to_string();
    (dir, url)
}

async fn subscribe(db: &Database, fetcher: &FeedFetcher, url: &str) -> (i64, usize) {
    let feed = Feed::fetch(fetcher, url).await.unwrap();
    let episodes = feed
        .get_entries(fetcher, EntryPolicy::AbortBatch)
        .await
        .unwrap();
    db.subscribe(&feed, &episodes).await.unwrap()
}

#[tokio::test]
async fn test_subscribe_stores_feed_and_episodes() {
    let (dir, url) = write_feed("subscribe");
    let db = Database::open(":memory:").await.unwrap();
    let fetcher = FeedFetcher::new(reqwest::Client::new());

    let (feed_id, stored) = subscribe(&db, &fetcher, &url).await;
    assert_eq!(stored, 2);

    let feeds = db.get_feeds().await.unwrap();
    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].title, "Local Cast");
    assert_eq!(feeds[0].summary, "Served from disk");
    assert_eq!(feeds[0].episode_count, 2);

    let episodes = db.get_episodes_for_feed(feed_id).await.unwrap();
    let urls: Vec<_> = episodes.iter().map(|e| e.media_url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://example.com/newer.m4a", "https://example.com/older.mp3"]
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_subscribing_twice_is_rejected() {
    let (dir, url) = write_feed("twice");
    let db = Database::open(":memory:").await.unwrap();
    let fetcher = FeedFetcher::new(reqwest::Client::new());

    subscribe(&db, &fetcher, &url).await;

    let again = Feed::fetch(&fetcher, &url).await.unwrap();
    let err = db.insert_feed(&again).await.unwrap_err();
    assert!(matches!(err, DatabaseError::FeedExists(_)));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_stored_feed_rederives_episodes() {
    let (dir, url) = write_feed("rederive");
    let db = Database::open(":memory:").await.unwrap();
    let fetcher = FeedFetcher::new(reqwest::Client::new());

    let (feed_id, _) = subscribe(&db, &fetcher, &url).await;

    let stored = db.get_feed_by_url(&url).await.unwrap().unwrap();
    assert_eq!(stored.id, feed_id);

    let fresh = stored
        .to_feed()
        .get_entries(&fetcher, EntryPolicy::AbortBatch)
        .await
        .unwrap();
    db.insert_episodes(feed_id, &fresh).await.unwrap();

    // No de-duplication: the second batch is appended
    let episodes = db.get_episodes_for_feed(feed_id).await.unwrap();
    assert_eq!(episodes.len(), 4);

    std::fs::remove_dir_all(&dir).ok();
}
