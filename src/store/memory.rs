use super::{ScoreStore, StoreError};
use crate::score::{ScoreEntry, StoredScore};
use chrono::Utc;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: Vec<StoredScore>,
}

/// Process-local score table, used for tests and `serve --in-memory`
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    table: Mutex<Table>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a, I>(entries: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = &'a ScoreEntry>,
    {
        let store = Self::new();
        for entry in entries {
            store.insert(entry)?;
        }
        Ok(store)
    }
}

impl ScoreStore for MemoryScoreStore {
    fn insert(&self, entry: &ScoreEntry) -> Result<StoredScore, StoreError> {
        let mut table = self.table.lock().map_err(|_| StoreError::poisoned())?;
        table.next_id += 1;
        let stored = StoredScore {
            id: table.next_id,
            created_at: Utc::now(),
            entry: entry.clone(),
        };
        table.rows.push(stored.clone());
        Ok(stored)
    }

    fn delete_user(&self, username: &str) -> Result<usize, StoreError> {
        let mut table = self.table.lock().map_err(|_| StoreError::poisoned())?;
        let before = table.rows.len();
        table.rows.retain(|r| r.entry.username != username);
        Ok(before - table.rows.len())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut table = self.table.lock().map_err(|_| StoreError::poisoned())?;
        let removed = table.rows.len();
        table.rows.clear();
        Ok(removed)
    }

    fn scan(&self) -> Result<Vec<StoredScore>, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::poisoned())?;
        Ok(table.rows.clone())
    }

    // Single lock for both steps, so readers never see the user missing
    fn replace(&self, entry: &ScoreEntry) -> Result<(StoredScore, usize), StoreError> {
        let mut table = self.table.lock().map_err(|_| StoreError::poisoned())?;
        let before = table.rows.len();
        table.rows.retain(|r| r.entry.username != entry.username);
        let removed = before - table.rows.len();

        table.next_id += 1;
        let stored = StoredScore {
            id: table.next_id,
            created_at: Utc::now(),
            entry: entry.clone(),
        };
        table.rows.push(stored.clone());
        Ok((stored, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_scan_keeps_order() {
        let store = MemoryScoreStore::new();
        let a = store.insert(&ScoreEntry::new("a", 10.0, 90.0)).unwrap();
        let b = store.insert(&ScoreEntry::new("b", 20.0, 90.0)).unwrap();
        assert!(b.id > a.id);

        let names: Vec<String> = store
            .scan()
            .unwrap()
            .into_iter()
            .map(|r| r.entry.username)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn delete_user_only_removes_that_user() {
        let store = MemoryScoreStore::with_entries(&[
            ScoreEntry::new("a", 10.0, 90.0),
            ScoreEntry::new("b", 20.0, 90.0),
            ScoreEntry::new("a", 30.0, 90.0),
        ])
        .unwrap();

        assert_eq!(store.delete_user("a").unwrap(), 2);
        assert_eq!(store.delete_user("a").unwrap(), 0);
        assert_eq!(store.scan().unwrap().len(), 1);
    }

    #[test]
    fn clear_reports_removed_rows() {
        let store = MemoryScoreStore::with_entries(&[
            ScoreEntry::new("a", 10.0, 90.0),
            ScoreEntry::new("b", 20.0, 90.0),
        ])
        .unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn replace_leaves_single_row_per_user() {
        let store = MemoryScoreStore::new();
        store.insert(&ScoreEntry::new("a", 10.0, 90.0)).unwrap();
        store.insert(&ScoreEntry::new("a", 12.0, 90.0)).unwrap();

        let (stored, removed) = store.replace(&ScoreEntry::new("a", 50.0, 80.0)).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(stored.entry.wpm, 50.0);

        let rows = store.scan().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry.wpm, 50.0);
    }
}
