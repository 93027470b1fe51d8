/// Crawl status definitions for seed articles
///
/// This module defines the lifecycle a seed article moves through while the
/// orchestrator crawls it.
use std::fmt;

/// Represents the crawl status of a seed article
///
/// ```text
/// Pending ──┐
///           ├──> InProgress ──> Crawled
/// Failed ───┘                └─> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleStatus {
    /// Seeded and never crawled
    Pending,

    /// Claimed by a crawl cycle; the traversal has not finished yet
    InProgress,

    /// The last traversal completed
    Crawled,

    /// The last traversal failed; eligible again while retries remain
    Failed,
}

impl ArticleStatus {
    /// Returns true if a status write from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: ArticleStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Failed, Self::InProgress)
                | (Self::InProgress, Self::Crawled)
                | (Self::InProgress, Self::Failed)
        )
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Crawled => "crawled",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "crawled" => Some(Self::Crawled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Crawled, Self::Failed]
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
