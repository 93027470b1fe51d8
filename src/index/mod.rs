//! Full-text index of crawled pages
//!
//! Every page a traversal saves for the first time is handed to an
//! [`Indexer`]. The index keeps the page text, which the page store never
//! persists, and answers keyword queries over titles and content.
//!
//! The production backend is [`SqliteIndex`], an FTS5 virtual table living in
//! its own database file.

mod error;
mod fts;

pub use error::{IndexError, IndexResult};
pub use fts::SqliteIndex;

use crate::storage::CrawledPage;

/// Accepts newly discovered pages for indexing
pub trait Indexer {
    /// Indexes one page, replacing any previous document for the same URL
    fn index_page(&mut self, page: &CrawledPage) -> IndexResult<()>;
}

/// One result of a keyword search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub content_hash: String,
    pub crawled_at: String,
}
