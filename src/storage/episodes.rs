use sqlx::{QueryBuilder, SqliteConnection};

use super::schema::Database;
use super::types::{DatabaseError, StoredEpisode};
use crate::feed::Episode;

/// Maximum number of episodes returned by a single query (OOM protection)
const MAX_EPISODES: i64 = 5000;

impl Database {
    // ========================================================================
    // Episode Operations
    // ========================================================================

    /// Store a batch of episodes for a feed, returning the number inserted.
    ///
    /// Episodes are appended as given; an episode that is already stored is
    /// stored again.
    pub async fn insert_episodes(
        &self,
        feed_id: i64,
        episodes: &[Episode],
    ) -> Result<usize, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_episode_rows(&mut tx, feed_id, episodes).await?;
        tx.commit().await?;

        tracing::debug!(feed_id = feed_id, inserted = inserted, "Stored episodes");
        Ok(inserted)
    }

    /// Get a feed's stored episodes, newest first
    pub async fn get_episodes_for_feed(
        &self,
        feed_id: i64,
    ) -> Result<Vec<StoredEpisode>, DatabaseError> {
        let episodes = sqlx::query_as::<_, StoredEpisode>(
            r#"
                SELECT id, feed_id, title, media_url, pub_date
                FROM episodes
                WHERE feed_id = ?
                ORDER BY pub_date DESC, id ASC
                LIMIT ?
            "#,
        )
        .bind(feed_id)
        .bind(MAX_EPISODES)
        .fetch_all(&self.pool)
        .await?;

        Ok(episodes)
    }
}

/// Appends `episodes` to a feed on an open connection or transaction.
///
/// Batches of 100 keep well under SQLite's bind limit.
pub(super) async fn insert_episode_rows(
    conn: &mut SqliteConnection,
    feed_id: i64,
    episodes: &[Episode],
) -> Result<usize, DatabaseError> {
    const BATCH_SIZE: usize = 100;
    let mut inserted: u64 = 0;

    for chunk in episodes.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("INSERT INTO episodes (feed_id, title, media_url, pub_date) ");

        builder.push_values(chunk, |mut b, episode| {
            b.push_bind(feed_id)
                .push_bind(&episode.title)
                .push_bind(&episode.media_url)
                .push_bind(episode.pub_date);
        });

        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Feed;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn episode(title: &str, day: u32) -> Episode {
        Episode {
            title: title.to_string(),
            media_url: format!("https://example.com/{title}.mp3"),
            pub_date: at(day),
            feed_url: "https://example.com/feed.xml".to_string(),
        }
    }

    async fn db_with_feed() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let feed_id = db
            .insert_feed(&Feed::restore("https://example.com/feed.xml", "Cast", "Summary"))
            .await
            .unwrap();
        (db, feed_id)
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (db, feed_id) = db_with_feed().await;
        let count = db
            .insert_episodes(feed_id, &[episode("one", 1), episode("three", 3)])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let stored = db.get_episodes_for_feed(feed_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title, "three");
        assert_eq!(stored[0].media_url, "https://example.com/three.mp3");
        assert_eq!(stored[0].pub_date, at(3));
        assert_eq!(stored[1].title, "one");
    }

    #[tokio::test]
    async fn test_repeated_batches_are_not_deduplicated() {
        let (db, feed_id) = db_with_feed().await;
        let batch = vec![episode("one", 1)];
        db.insert_episodes(feed_id, &batch).await.unwrap();
        db.insert_episodes(feed_id, &batch).await.unwrap();

        let stored = db.get_episodes_for_feed(feed_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (db, feed_id) = db_with_feed().await;
        assert_eq!(db.insert_episodes(feed_id, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_large_batch_spans_chunks() {
        let (db, feed_id) = db_with_feed().await;
        let batch: Vec<_> = (0..250).map(|i| episode(&format!("ep{i}"), 1)).collect();
        assert_eq!(db.insert_episodes(feed_id, &batch).await.unwrap(), 250);

        let feeds = db.get_feeds().await.unwrap();
        assert_eq!(feeds[0].episode_count, 250);
    }

    #[tokio::test]
    async fn test_unknown_feed_id_rejected() {
        let (db, _) = db_with_feed().await;
        let result = db.insert_episodes(9999, &[episode("orphan", 1)]).await;
        assert!(result.is_err());
    }
}
