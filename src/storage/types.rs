use chrono::NaiveDateTime;
use thiserror::Error;

use crate::feed::Feed;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database
    #[error("The database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A feed with this URL is already stored
    #[error("Feed already subscribed: {0}")]
    FeedExists(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Helper Types
// ============================================================================

/// Row type for feed query with episode count
pub(crate) type FeedRow = (i64, String, String, String, i64);

// ============================================================================
// Data Structures
// ============================================================================

/// Feed data from database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFeed {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub episode_count: i64,
}

impl StoredFeed {
    pub(crate) fn from_row((id, url, title, summary, episode_count): FeedRow) -> Self {
        Self {
            id,
            url,
            title,
            summary,
            episode_count,
        }
    }

    /// The feed as the ingestion layer sees it, without its database identity.
    pub fn to_feed(&self) -> Feed {
        Feed::restore(&self.url, &self.title, &self.summary)
    }
}

/// Episode data from database
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredEpisode {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub media_url: String,
    pub pub_date: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("(code: 14) unable to open database file"));
        assert!(!is_lock_message("no such table: feeds"));
    }

    #[test]
    fn test_stored_feed_to_feed() {
        let stored = StoredFeed::from_row((
            7,
            "https://example.com/rss".to_string(),
            "Title".to_string(),
            "Summary".to_string(),
            3,
        ));
        let feed = stored.to_feed();
        assert_eq!(feed.url(), "https://example.com/rss");
        assert_eq!(feed.title(), "Title");
        assert_eq!(feed.summary(), "Summary");
    }
}
