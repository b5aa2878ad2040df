//! Ordered byte-store backends for [`crate::History`].

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{HistoryError, storage};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("history");

/// Ordered string-keyed byte store.
///
/// Ranges are half-open `[start, end)` over the byte order of the keys.
pub trait Backend: Send + Sync {
    /// Insert `value` under `key` unless the key already exists.
    /// Returns whether the value was written.
    fn insert_new(&self, key: &str, value: &[u8]) -> Result<bool, HistoryError>;

    /// All entries in the range, ascending.
    fn range(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>, HistoryError>;

    /// The last `limit` entries in the range, descending.
    fn range_rev(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, HistoryError>;

    /// Delete every entry in the range and return how many were removed.
    fn delete_range(&self, start: &str, end: &str) -> Result<usize, HistoryError>;

    /// Write a consistent copy of every entry into a new redb file at
    /// `dest`. Returns the number of entries copied.
    fn snapshot_to(&self, dest: &Path) -> Result<usize, HistoryError>;
}

/// redb file backend.
pub struct RedbBackend {
    db: Database,
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create the database, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(storage)?;
        let tx = db.begin_write().map_err(storage)?;
        {
            tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for RedbBackend {
    fn insert_new(&self, key: &str, value: &[u8]) -> Result<bool, HistoryError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let inserted = {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            let exists = table.get(key).map_err(storage)?.is_some();
            if !exists {
                table.insert(key, value).map_err(storage)?;
            }
            !exists
        };
        tx.commit().map_err(storage)?;
        Ok(inserted)
    }

    fn range(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>, HistoryError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let mut out = Vec::new();
        for item in table.range::<&str>(start..end).map_err(storage)? {
            let (k, v) = item.map_err(storage)?;
            out.push((k.value().to_string(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn range_rev(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, HistoryError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let mut out = Vec::new();
        for item in table.range::<&str>(start..end).map_err(storage)?.rev().take(limit) {
            let (k, v) = item.map_err(storage)?;
            out.push((k.value().to_string(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn delete_range(&self, start: &str, end: &str) -> Result<usize, HistoryError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            let mut keys = Vec::new();
            for item in table.range::<&str>(start..end).map_err(storage)? {
                let (k, _) = item.map_err(storage)?;
                keys.push(k.value().to_string());
            }
            for key in &keys {
                table.remove(key.as_str()).map_err(storage)?;
            }
            keys.len()
        };
        tx.commit().map_err(storage)?;
        Ok(removed)
    }

    fn snapshot_to(&self, dest: &Path) -> Result<usize, HistoryError> {
        // One read transaction gives a point-in-time view.
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        let mut entries = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (k, v) = item.map_err(storage)?;
            entries.push((k.value().to_string(), v.value().to_vec()));
        }
        write_snapshot(dest, &entries)
    }
}

/// In-memory backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn bounds<'a>(start: &'a str, end: &'a str) -> (Bound<&'a str>, Bound<&'a str>) {
        (Bound::Included(start), Bound::Excluded(end))
    }
}

impl Backend for MemoryBackend {
    fn insert_new(&self, key: &str, value: &[u8]) -> Result<bool, HistoryError> {
        let mut data = self.data.lock();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn range(&self, start: &str, end: &str) -> Result<Vec<(String, Vec<u8>)>, HistoryError> {
        let data = self.data.lock();
        Ok(data
            .range::<str, _>(Self::bounds(start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn range_rev(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, HistoryError> {
        let data = self.data.lock();
        Ok(data
            .range::<str, _>(Self::bounds(start, end))
            .rev()
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn delete_range(&self, start: &str, end: &str) -> Result<usize, HistoryError> {
        let mut data = self.data.lock();
        let keys: Vec<String> = data
            .range::<str, _>(Self::bounds(start, end))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            data.remove(key);
        }
        Ok(keys.len())
    }

    fn snapshot_to(&self, dest: &Path) -> Result<usize, HistoryError> {
        let entries: Vec<(String, Vec<u8>)> = self
            .data
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        write_snapshot(dest, &entries)
    }
}

fn write_snapshot(dest: &Path, entries: &[(String, Vec<u8>)]) -> Result<usize, HistoryError> {
    let db = Database::create(dest).map_err(storage)?;
    let tx = db.begin_write().map_err(storage)?;
    {
        let mut table = tx.open_table(TABLE).map_err(storage)?;
        for (k, v) in entries {
            table.insert(k.as_str(), v.as_slice()).map_err(storage)?;
        }
    }
    tx.commit().map_err(storage)?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exercise(b: &dyn Backend) {
        assert!(b.insert_new("k:1", b"one").unwrap());
        assert!(b.insert_new("k:2", b"two").unwrap());
        assert!(b.insert_new("k:3", b"three").unwrap());
        assert!(b.insert_new("other", b"x").unwrap());
        assert!(!b.insert_new("k:2", b"dup").unwrap());

        let all = b.range("k:", "k;").unwrap();
        assert_eq!(
            all.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            vec!["k:1", "k:2", "k:3"]
        );
        assert_eq!(all[1].1, b"two".to_vec());

        let last = b.range_rev("k:", "k;", 2).unwrap();
        assert_eq!(
            last.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            vec!["k:3", "k:2"]
        );

        assert_eq!(b.delete_range("k:", "k;").unwrap(), 3);
        assert!(b.range("k:", "k;").unwrap().is_empty());
        assert_eq!(b.range("other", "otheS").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_backend() {
        exercise(&MemoryBackend::new());
    }

    #[test]
    fn test_redb_backend() {
        let dir = tempdir().unwrap();
        let b = RedbBackend::open(dir.path().join("nested").join("h.redb")).unwrap();
        exercise(&b);
    }

    #[test]
    fn test_redb_reopen_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.redb");
        {
            let b = RedbBackend::open(&path).unwrap();
            b.insert_new("k:1", b"v").unwrap();
        }
        let b = RedbBackend::open(&path).unwrap();
        assert_eq!(b.range("k:", "k;").unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_is_readable() {
        let dir = tempdir().unwrap();
        let src = MemoryBackend::new();
        src.insert_new("k:1", b"a").unwrap();
        src.insert_new("k:2", b"b").unwrap();

        let dest = dir.path().join("snap.redb");
        assert_eq!(src.snapshot_to(&dest).unwrap(), 2);

        let copy = RedbBackend::open(&dest).unwrap();
        assert_eq!(copy.range("k:", "k;").unwrap().len(), 2);

        let again = dir.path().join("snap2.redb");
        assert_eq!(copy.snapshot_to(&again).unwrap(), 2);
    }
}
