//! A single-file, multi-bucket embedded key-value store.
//!
//! `spec.md` describes the prefix index and summary store in terms of a
//! generic "single-writer, multi-reader embedded B+tree key-value store"
//! with `open-read-only`, `open-read-write-create-if-absent`, `view`,
//! `update`, `put`, `get`, `for-each`. This crate implements that contract on
//! top of `rusqlite` — the embedded, page-oriented, crash-safe (WAL) store
//! nefaxer already depends on for its own metadata index
//! (`engine/db_ops.rs`) — rather than inventing a bespoke page format. Each
//! named "bucket" is one SQLite table `(key BLOB PRIMARY KEY, value BLOB NOT
//! NULL)`; keys are raw bytes, compared byte-wise, matching the ordering
//! `spec.md` §5 requires for iteration.
//!
//! `spec.md` §5 requires the read path to be "safe under concurrent
//! callers" (a request-handling server holds one `ReaderSet` and serves many
//! threads from it). A bare `rusqlite::Connection` is `Send` but not `Sync`,
//! so it cannot be shared behind `&self` across threads; this store wraps it
//! in a `Mutex` so `KvStore`, and everything built on it (`ScanIndex`,
//! `ReaderSet`, `SummaryStore`), is `Sync` and can sit behind an `Arc` in a
//! multi-threaded caller. Concurrent queries serialize on the mutex rather
//! than running truly in parallel, which is what a single SQLite connection
//! allows anyway; a caller wanting parallel I/O opens several `ReaderSet`s.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Transaction};

use crate::error::CoreError;

/// Whether a probed on-disk store location is empty, already holds data, or
/// doesn't exist yet (`spec.md`'s supplemented `ScanIndexState`, SPEC_FULL.md §2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    Absent,
    Empty,
    Present,
}

fn probe_file(path: &Path) -> StoreState {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => StoreState::Present,
        Ok(_) => StoreState::Empty,
        Err(_) => StoreState::Absent,
    }
}

pub struct KvStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl KvStore {
    /// Create a new store at `path`. Fails with `DbExists` if a non-empty
    /// file is already there (`spec.md` §4.2 "Opening for creation fails if
    /// either file exists with non-zero size").
    pub fn create(path: &Path, buckets: &[&str]) -> Result<Self, CoreError> {
        if probe_file(path) == StoreState::Present {
            return Err(CoreError::DbExists(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        for bucket in buckets {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {bucket} (key BLOB PRIMARY KEY, value BLOB NOT NULL);"
            ))?;
        }
        Ok(KvStore {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store read-only. Fails with `DbMissing` if the file
    /// is absent or zero-size.
    pub fn open_read_only(path: &Path, buckets: &[&str]) -> Result<Self, CoreError> {
        if probe_file(path) != StoreState::Present {
            return Err(CoreError::DbMissing(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // Ensure every requested bucket exists so callers get a typed "empty"
        // result instead of a SQL error for optional buckets.
        for bucket in buckets {
            let exists: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [bucket],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(CoreError::DbMissing(path.to_path_buf()));
            }
        }
        Ok(KvStore {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open for read-write, creating the file and buckets if absent.
    pub fn open_read_write_create(path: &Path, buckets: &[&str]) -> Result<Self, CoreError> {
        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        for bucket in buckets {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {bucket} (key BLOB PRIMARY KEY, value BLOB NOT NULL);"
            ))?;
        }
        Ok(KvStore {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    fn apply_pragmas(conn: &Connection) -> Result<(), CoreError> {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only transaction. Safe to call from several threads at
    /// once; they serialize on the connection mutex.
    pub fn view<F, R>(&self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&Connection) -> Result<R, CoreError>,
    {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }

    /// Run a read-write transaction; committed on `Ok`, rolled back on `Err`
    /// (by `Transaction`'s drop, matching "release its transaction on all
    /// exit paths, including error" from `spec.md` §9).
    pub fn update<F, R>(&mut self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&Transaction) -> Result<R, CoreError>,
    {
        let mut conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), CoreError> {
        self.update(|tx| {
            tx.execute(
                &format!("INSERT OR REPLACE INTO {bucket} (key, value) VALUES (?1, ?2)"),
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        self.view(|conn| {
            let v = conn
                .query_row(
                    &format!("SELECT value FROM {bucket} WHERE key = ?1"),
                    [key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(v)
        })
    }

    /// Iterate all entries in a bucket in byte-lexicographic key order.
    pub fn for_each<F>(&self, bucket: &str, mut f: F) -> Result<(), CoreError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), CoreError>,
    {
        self.view(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT key, value FROM {bucket} ORDER BY key"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let key: Vec<u8> = row.get(0)?;
                let value: Vec<u8> = row.get(1)?;
                f(&key, &value)?;
            }
            Ok(())
        })
    }

    pub fn count(&self, bucket: &str) -> Result<u64, CoreError> {
        self.view(|conn| {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {bucket}"), [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}
