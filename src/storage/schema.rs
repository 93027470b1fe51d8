//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Spider-Index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Seed articles and their crawl status
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    author TEXT,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    retries INTEGER NOT NULL DEFAULT 0,
    last_crawled_at TEXT,
    claimed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);

-- Every page ever fetched; url uniqueness is the cross-run dedup key
CREATE TABLE IF NOT EXISTS crawled_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    parent_id INTEGER NOT NULL REFERENCES articles(id),
    title TEXT,
    status TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_parent ON crawled_pages(parent_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
