pub mod memory;
pub mod sqlite;

pub use memory::MemoryScoreStore;
pub use sqlite::SqliteScoreStore;

use crate::score::{ScoreEntry, StoredScore};
use thiserror::Error;

/// Failures from the score table. The message is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Busy, locked or unreachable storage; retrying later may succeed
    #[error("{0}")]
    Unavailable(String),
    /// Bad statement, constraint violation or undecodable row
    #[error("{0}")]
    Query(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("score table lock poisoned".to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let transient = matches!(
            err.sqlite_error_code(),
            Some(
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            )
        );

        if transient {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Query(err.to_string())
        }
    }
}

/// Row table of submitted scores
pub trait ScoreStore: Send + Sync {
    fn insert(&self, entry: &ScoreEntry) -> Result<StoredScore, StoreError>;

    /// Returns the number of rows removed
    fn delete_user(&self, username: &str) -> Result<usize, StoreError>;

    /// Returns the number of rows removed
    fn clear(&self) -> Result<usize, StoreError>;

    /// Every row in insertion order
    fn scan(&self) -> Result<Vec<StoredScore>, StoreError>;

    /// Drop the user's earlier rows and insert `entry`. Returns the new row and
    /// how many rows were replaced. Not atomic unless the implementation says so.
    fn replace(&self, entry: &ScoreEntry) -> Result<(StoredScore, usize), StoreError> {
        let removed = self.delete_user(&entry.username)?;
        let stored = self.insert(entry)?;
        Ok((stored, removed))
    }
}

/// Strip store metadata for aggregation
pub fn entries(rows: &[StoredScore]) -> impl Iterator<Item = &ScoreEntry> {
    rows.iter().map(|r| &r.entry)
}
