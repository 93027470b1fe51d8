//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer and the full-text index.

use crate::index::SqliteIndex;
use crate::state::ArticleStatus;
use crate::storage::{ArticleStore, PageStore};
use crate::SpiderError;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of seed articles
    pub total_articles: u64,

    /// Count of seed articles by status
    pub articles_by_status: HashMap<ArticleStatus, u64>,

    /// Total number of crawled pages
    pub total_pages: u64,

    /// Documents in the full-text index, if the index was opened
    pub indexed_documents: Option<u64>,
}

/// Loads statistics from storage and, optionally, the index
pub fn load_statistics<S>(
    storage: &S,
    index: Option<&SqliteIndex>,
) -> Result<CrawlStatistics, SpiderError>
where
    S: ArticleStore + PageStore,
{
    let mut articles_by_status = HashMap::new();
    for status in ArticleStatus::all_statuses() {
        let count = storage.count_articles_by_status(status)?;
        if count > 0 {
            articles_by_status.insert(status, count);
        }
    }

    let indexed_documents = match index {
        Some(index) => Some(index.count()?),
        None => None,
    };

    Ok(CrawlStatistics {
        total_articles: articles_by_status.values().sum(),
        articles_by_status,
        total_pages: storage.count_pages()?,
        indexed_documents,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed articles: {}", stats.total_articles);
    println!("  Crawled pages: {}", stats.total_pages);
    match stats.indexed_documents {
        Some(count) => println!("  Indexed documents: {}", count),
        None => println!("  Indexed documents: (index not found)"),
    }
    println!();

    println!("Articles by Status:");
    for status in ArticleStatus::all_statuses() {
        let count = stats.articles_by_status.get(&status).copied().unwrap_or(0);
        let percentage = if stats.total_articles > 0 {
            (count as f64 / stats.total_articles as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let crawled = stats
        .articles_by_status
        .get(&ArticleStatus::Crawled)
        .copied()
        .unwrap_or(0);
    if stats.total_articles > 0 {
        println!(
            "Pages per crawled seed: {:.1}",
            stats.total_pages as f64 / crawled.max(1) as f64
        );
    }
}
