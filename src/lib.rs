//! podbo: podcast subscriptions backed by feed ingestion.
//!
//! The [`feed`] module fetches feeds and resolves one playable media URL per
//! episode; [`storage`] keeps feeds and episodes in SQLite; [`config`] reads the
//! optional user configuration.

pub mod config;
pub mod feed;
pub mod storage;
