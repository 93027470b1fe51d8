//! State module for tracking seed crawl progress
//!
//! # Components
//!
//! - `ArticleStatus`: lifecycle of a seed article (pending, in progress, crawled, failed)

mod article_status;

pub use article_status::ArticleStatus;
