//! Output module for console reports
//!
//! This module handles:
//! - Printing the result of a crawl cycle
//! - Listing eligible seeds for dry runs
//! - Loading and printing crawl statistics
//! - Printing full-text search results

mod report;
pub mod stats;

pub use report::{print_cycle_report, print_eligible, print_search_hits};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
