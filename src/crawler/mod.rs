//! Crawler module for seed traversal and page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with timeouts
//! - HTML parsing into title, text and links
//! - Content fingerprinting
//! - Seed claiming, depth-first traversal and status bookkeeping

mod fetcher;
mod hasher;
mod orchestrator;
mod parser;

pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use hasher::{ContentHasher, Sha256Hasher};
pub use orchestrator::{
    ArticleOutcome, CrawlOrchestrator, CrawlOutcome, CycleReport, IndexFailure,
};
pub use parser::{parse_html, ParsedPage};
