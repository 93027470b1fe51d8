//! FTS5-backed index

use crate::index::{IndexResult, Indexer, SearchHit};
use crate::storage::CrawledPage;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS page_index USING fts5(
    url UNINDEXED,
    title,
    content,
    content_hash UNINDEXED,
    crawled_at UNINDEXED
);
";

/// Full-text index stored in an SQLite FTS5 table
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    /// Opens or creates the index database at `path`
    pub fn new(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory index
    pub fn new_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Runs an FTS5 query over titles and content, best matches first
    ///
    /// `query` uses FTS5 query syntax, so a bare word matches documents
    /// containing that token and `"two words"` matches the phrase.
    pub fn search(&self, query: &str, limit: usize) -> IndexResult<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, content_hash, crawled_at
             FROM page_index
             WHERE page_index MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let hits = stmt
            .query_map(params![query, limit], |row| {
                Ok(SearchHit {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    content_hash: row.get(2)?,
                    crawled_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    /// Number of indexed documents
    pub fn count(&self) -> IndexResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM page_index", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Indexer for SqliteIndex {
    fn index_page(&mut self, page: &CrawledPage) -> IndexResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM page_index WHERE url = ?1", params![page.url])?;
        tx.execute(
            "INSERT INTO page_index (url, title, content, content_hash, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                page.url,
                page.title,
                page.content,
                page.content_hash,
                page.last_crawled_at
            ],
        )?;
        tx.commit()?;

        tracing::trace!("Indexed {}", page.url);
        Ok(())
    }
}
