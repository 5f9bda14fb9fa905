use super::{ScoreStore, StoreError};
use crate::app_dirs::AppDirs;
use crate::score::{ScoreEntry, StoredScore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        college TEXT NOT NULL DEFAULT 'Unknown',
        wpm REAL NOT NULL,
        accuracy REAL NOT NULL,
        duration_seconds INTEGER NOT NULL DEFAULT 60,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_scores_username ON scores(username);
"#;

const INSERT: &str = r#"
    INSERT INTO scores (username, college, wpm, accuracy, duration_seconds, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

/// SQLite-backed score table
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
}

impl SqliteScoreStore {
    /// Open (or create) the database file and make sure the table exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    pub fn default_path() -> PathBuf {
        AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typeboard_scores.db"))
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::poisoned())
    }
}

fn insert_row(conn: &Connection, entry: &ScoreEntry) -> Result<StoredScore, StoreError> {
    let created_at = Utc::now();
    conn.execute(
        INSERT,
        params![
            entry.username,
            entry.college,
            entry.wpm,
            entry.accuracy,
            entry.duration_seconds,
            created_at.to_rfc3339(),
        ],
    )?;

    Ok(StoredScore {
        id: conn.last_insert_rowid(),
        created_at,
        entry: entry.clone(),
    })
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredScore> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                6,
                "created_at".to_string(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Utc);

    Ok(StoredScore {
        id: row.get(0)?,
        created_at,
        entry: ScoreEntry {
            username: row.get(1)?,
            college: row.get(2)?,
            wpm: row.get(3)?,
            accuracy: row.get(4)?,
            duration_seconds: row.get(5)?,
        },
    })
}

impl ScoreStore for SqliteScoreStore {
    fn insert(&self, entry: &ScoreEntry) -> Result<StoredScore, StoreError> {
        let conn = self.conn()?;
        insert_row(&conn, entry)
    }

    fn delete_user(&self, username: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM scores WHERE username = ?1", [username])?)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM scores", [])?)
    }

    fn scan(&self) -> Result<Vec<StoredScore>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, username, college, wpm, accuracy, duration_seconds, created_at
            FROM scores
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete and insert run in one transaction
    fn replace(&self, entry: &ScoreEntry) -> Result<(StoredScore, usize), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute("DELETE FROM scores WHERE username = ?1", [&entry.username])?;
        let stored = insert_row(&tx, entry)?;

        tx.commit()?;
        Ok((stored, removed))
    }
}
