//! Storage module for persisting crawl state
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Seed article status persistence and atomic claiming
//! - Crawled page persistence, the cross-run dedup key

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, PageStore, StorageError, StorageResult};

use crate::state::ArticleStatus;
use crate::SpiderError;

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SpiderError> {
    SqliteStorage::new(path)
}

/// Formats a claim time so that string order matches time order
pub fn claim_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A seed article in the database
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub status: ArticleStatus,
    pub priority: i32,
    pub retries: u32,
    pub last_crawled_at: Option<String>,
}

/// A crawled page as persisted; the page text is never stored
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub parent_article_id: i64,
    pub title: Option<String>,
    pub content_hash: String,
    pub last_crawled_at: String,
}

/// A page fetched during a traversal, on its way to the store and the index
///
/// `content` is only carried to the indexer; `PageStore::save_page` ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledPage {
    pub url: String,
    pub parent_article_id: i64,
    pub title: Option<String>,
    pub content_hash: String,
    pub content: String,
    pub last_crawled_at: String,
}
