//! Console rendering of cycle reports and search hits

use crate::crawler::{CrawlOutcome, CycleReport};
use crate::index::SearchHit;
use crate::storage::ArticleRecord;

/// Prints the outcome of a crawl cycle
pub fn print_cycle_report(report: &CycleReport) {
    if report.is_empty() {
        println!("No eligible seed articles.");
        return;
    }

    println!("=== Crawl Cycle ===\n");
    for outcome in &report.outcomes {
        let status = match &outcome.crawl {
            CrawlOutcome::Crawled => "crawled".to_string(),
            CrawlOutcome::Failed { reason } => format!("failed: {}", reason),
            CrawlOutcome::Skipped => "skipped".to_string(),
        };
        println!(
            "  [{}] {} ({} new pages)",
            status, outcome.article.url, outcome.pages_saved
        );
        for failure in &outcome.index_failures {
            println!("      not indexed: {} ({})", failure.url, failure.error);
        }
    }
    println!();

    println!(
        "Seeds: {} crawled, {} failed, {} skipped",
        report.crawled(),
        report.failed(),
        report.skipped()
    );
    println!(
        "Pages: {} saved, {} index failures",
        report.pages_saved(),
        report.index_failures()
    );
}

/// Prints the seeds a cycle would crawl
pub fn print_eligible(articles: &[ArticleRecord], max_retries: u32) {
    if articles.is_empty() {
        println!("No eligible seed articles.");
        return;
    }

    println!("Eligible seed articles ({}):", articles.len());
    for article in articles {
        println!(
            "  [{}] {} \"{}\" (priority {}, retries {}/{})",
            article.status, article.url, article.title, article.priority, article.retries,
            max_retries
        );
    }
}

/// Prints full-text search results
pub fn print_search_hits(query: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results for \"{}\".", query);
        return;
    }

    println!("Results for \"{}\" ({}):", query, hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} - {}",
            rank + 1,
            hit.title.as_deref().unwrap_or("(untitled)"),
            hit.url
        );
    }
}
