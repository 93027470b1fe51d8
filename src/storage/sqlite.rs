//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the `ArticleStore`
//! and `PageStore` traits.

use crate::state::ArticleStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, PageStore, StorageError, StorageResult};
use crate::storage::{claim_timestamp, ArticleRecord, CrawledPage, PageRecord};
use crate::SpiderError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ARTICLE_COLUMNS: &str =
    "id, url, title, author, status, priority, retries, last_crawled_at";

const PAGE_COLUMNS: &str = "id, url, parent_id, title, content_hash, last_crawled_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> Result<Self, SpiderError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SpiderError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
    let status: String = row.get(4)?;
    let status = ArticleStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            Box::new(StorageError::InvalidStatus(status.clone())),
        )
    })?;

    Ok(ArticleRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        author: row.get(3)?,
        status,
        priority: row.get(5)?,
        retries: row.get(6)?,
        last_crawled_at: row.get(7)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        parent_article_id: row.get(2)?,
        title: row.get(3)?,
        content_hash: row.get(4)?,
        last_crawled_at: row.get(5)?,
    })
}

impl ArticleStore for SqliteStorage {
    fn insert_article(
        &mut self,
        url: &str,
        title: &str,
        author: Option<&str>,
        priority: i32,
    ) -> StorageResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row("SELECT id FROM articles WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO articles (url, title, author, status, priority, retries)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                url,
                title,
                author,
                ArticleStatus::Pending.to_db_string(),
                priority
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_article(&self, id: i64) -> StorageResult<ArticleRecord> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
        self.conn
            .query_row(&sql, params![id], article_from_row)
            .optional()?
            .ok_or_else(|| StorageError::ArticleNotFound(format!("Article ID {}", id)))
    }

    fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        let sql = format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS);
        let article = self
            .conn
            .query_row(&sql, params![url], article_from_row)
            .optional()?;
        Ok(article)
    }

    fn get_eligible(&self, max_retries: u32) -> StorageResult<Vec<ArticleRecord>> {
        let sql = format!(
            "SELECT {} FROM articles
             WHERE status = ?1 OR (status = ?2 AND retries < ?3)
             ORDER BY priority DESC, id ASC",
            ARTICLE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let articles = stmt
            .query_map(
                params![
                    ArticleStatus::Pending.to_db_string(),
                    ArticleStatus::Failed.to_db_string(),
                    max_retries
                ],
                article_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn claim_article(&mut self, id: i64, max_retries: u32) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE articles SET status = ?1, claimed_at = ?2
             WHERE id = ?3 AND (status = ?4 OR (status = ?5 AND retries < ?6))",
            params![
                ArticleStatus::InProgress.to_db_string(),
                claim_timestamp(Utc::now()),
                id,
                ArticleStatus::Pending.to_db_string(),
                ArticleStatus::Failed.to_db_string(),
                max_retries
            ],
        )?;
        Ok(changed == 1)
    }

    fn fail_stale_claims(
        &mut self,
        claimed_before: &str,
        failed_at: &str,
    ) -> StorageResult<Vec<ArticleRecord>> {
        let tx = self.conn.transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM articles
                 WHERE status = ?1 AND (claimed_at IS NULL OR claimed_at < ?2)
                 ORDER BY id",
            )?;
            let ids = stmt
                .query_map(
                    params![ArticleStatus::InProgress.to_db_string(), claimed_before],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let sql = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
        let mut recovered = Vec::with_capacity(ids.len());
        for id in ids {
            // Re-check the lease so a claim renewed since the SELECT is left alone
            let changed = tx.execute(
                "UPDATE articles
                 SET status = ?1, retries = retries + 1, last_crawled_at = ?2, claimed_at = NULL
                 WHERE id = ?3 AND status = ?4 AND (claimed_at IS NULL OR claimed_at < ?5)",
                params![
                    ArticleStatus::Failed.to_db_string(),
                    failed_at,
                    id,
                    ArticleStatus::InProgress.to_db_string(),
                    claimed_before
                ],
            )?;
            if changed == 1 {
                recovered.push(tx.query_row(&sql, params![id], article_from_row)?);
            }
        }

        tx.commit()?;
        Ok(recovered)
    }

    fn save_article(&mut self, article: &ArticleRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles SET status = ?1, retries = ?2, last_crawled_at = ?3, claimed_at = NULL
             WHERE id = ?4",
            params![
                article.status.to_db_string(),
                article.retries,
                article.last_crawled_at,
                article.id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::ArticleNotFound(format!(
                "Article ID {}",
                article.id
            )));
        }
        Ok(())
    }

    fn count_articles_by_status(&self, status: ArticleStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl PageStore for SqliteStorage {
    fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!("SELECT {} FROM crawled_pages WHERE url = ?1", PAGE_COLUMNS);
        let page = self
            .conn
            .query_row(&sql, params![url], page_from_row)
            .optional()?;
        Ok(page)
    }

    fn save_page(&mut self, page: &CrawledPage) -> StorageResult<Option<i64>> {
        let changed = self.conn.execute(
            "INSERT INTO crawled_pages (url, parent_id, title, status, content_hash, last_crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(url) DO NOTHING",
            params![
                page.url,
                page.parent_article_id,
                page.title,
                ArticleStatus::Crawled.to_db_string(),
                page.content_hash,
                page.last_crawled_at
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn get_pages_for_article(&self, article_id: i64) -> StorageResult<Vec<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM crawled_pages WHERE parent_id = ?1 ORDER BY id",
            PAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let pages = stmt
            .query_map(params![article_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crawled_pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
