//! Storage traits and error types
//!
//! The orchestrator depends only on these two narrow capabilities, so any
//! backend that can look up and save articles and pages can stand in for
//! SQLite.

use crate::state::ArticleStatus;
use crate::storage::{ArticleRecord, CrawledPage, PageRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Invalid status in database: {0}")]
    InvalidStatus(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lookup and persistence of seed articles
pub trait ArticleStore {
    /// Inserts a seed article or returns the ID of the existing one with the same URL
    ///
    /// An existing row is never modified.
    fn insert_article(
        &mut self,
        url: &str,
        title: &str,
        author: Option<&str>,
        priority: i32,
    ) -> StorageResult<i64>;

    /// Gets an article by ID
    fn get_article(&self, id: i64) -> StorageResult<ArticleRecord>;

    /// Gets an article by URL
    fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Returns seeds that are pending, or failed with `retries < max_retries`
    ///
    /// Ordered by priority (highest first), then by ID.
    fn get_eligible(&self, max_retries: u32) -> StorageResult<Vec<ArticleRecord>>;

    /// Atomically moves an eligible seed to in-progress
    ///
    /// Returns false when the seed is no longer eligible, e.g. because a
    /// concurrent cycle claimed it first.
    fn claim_article(&mut self, id: i64, max_retries: u32) -> StorageResult<bool>;

    /// Fails in-progress seeds claimed before `claimed_before`
    ///
    /// Each matching seed becomes failed with one more retry and
    /// `last_crawled_at = failed_at`. Seeds claimed at or after the cutoff
    /// are left to the runner that holds them. Timestamps compare as
    /// strings, so both must come from `claim_timestamp`. Returns the
    /// updated records.
    fn fail_stale_claims(
        &mut self,
        claimed_before: &str,
        failed_at: &str,
    ) -> StorageResult<Vec<ArticleRecord>>;

    /// Persists status, retries and last-crawled time of an article
    fn save_article(&mut self, article: &ArticleRecord) -> StorageResult<()>;

    /// Counts articles in a given status
    fn count_articles_by_status(&self, status: ArticleStatus) -> StorageResult<u64>;
}

/// Lookup and persistence of crawled pages, keyed by URL
pub trait PageStore {
    /// Gets a page by URL
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Persists a newly crawled page
    ///
    /// Returns the new page ID, or `None` when a page with the same URL
    /// already exists (the existing row is left untouched).
    fn save_page(&mut self, page: &CrawledPage) -> StorageResult<Option<i64>>;

    /// Gets all pages owned by an article, in insertion order
    fn get_pages_for_article(&self, article_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;
}
