use sqlx::SqliteConnection;

use super::episodes::insert_episode_rows;
use super::schema::Database;
use super::types::{DatabaseError, FeedRow, StoredFeed};
use crate::feed::{Episode, Feed};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Store a newly subscribed feed, returning its database ID.
    ///
    /// A feed's title and summary are never overwritten: storing a URL that is
    /// already present fails with [`DatabaseError::FeedExists`].
    pub async fn insert_feed(&self, feed: &Feed) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        insert_feed_row(&mut conn, feed).await
    }

    /// Store a new feed together with its first batch of episodes.
    ///
    /// Both writes share one transaction: if the episodes cannot be stored the
    /// feed is not stored either, so the subscription can simply be retried.
    /// Returns the feed ID and the number of episodes inserted.
    pub async fn subscribe(
        &self,
        feed: &Feed,
        episodes: &[Episode],
    ) -> Result<(i64, usize), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let feed_id = insert_feed_row(&mut tx, feed).await?;
        let inserted = insert_episode_rows(&mut tx, feed_id, episodes).await?;
        tx.commit().await?;

        tracing::info!(feed_id = feed_id, episodes = inserted, "Subscribed to feed");
        Ok((feed_id, inserted))
    }

    /// Get all feeds with their episode counts, ordered by title
    pub async fn get_feeds(&self) -> Result<Vec<StoredFeed>, DatabaseError> {
        let rows: Vec<FeedRow> = sqlx::query_as(
            r#"
                SELECT f.id, f.url, f.title, f.summary, COUNT(e.id) AS episode_count
                FROM feeds f
                LEFT JOIN episodes e ON f.id = e.feed_id
                GROUP BY f.id
                ORDER BY f.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredFeed::from_row).collect())
    }

    /// Look up a stored feed by its URL
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<StoredFeed>, DatabaseError> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
                SELECT f.id, f.url, f.title, f.summary, COUNT(e.id) AS episode_count
                FROM feeds f
                LEFT JOIN episodes e ON f.id = e.feed_id
                WHERE f.url = ?
                GROUP BY f.id
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredFeed::from_row))
    }
}

async fn insert_feed_row(conn: &mut SqliteConnection, feed: &Feed) -> Result<i64, DatabaseError> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO feeds (url, title, summary) VALUES (?, ?, ?)
         ON CONFLICT(url) DO NOTHING
         RETURNING id",
    )
    .bind(feed.url())
    .bind(feed.title())
    .bind(feed.summary())
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some((id,)) => {
            tracing::info!(feed_id = id, url = %feed.url(), "Stored feed");
            Ok(id)
        }
        None => Err(DatabaseError::FeedExists(feed.url().to_owned())),
    }
}
