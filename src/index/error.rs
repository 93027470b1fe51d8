//! Index error types

use thiserror::Error;

/// Error type for full-text index operations
#[derive(Debug, Error)]
pub enum IndexError {
    /// SQLite / FTS5 error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A writer panicked while holding the index lock
    #[error("Index lock poisoned")]
    LockPoisoned,
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
