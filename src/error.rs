//! Structured error kinds shared by every component.
//!
//! Query components need to match on *kind* (a renderer decides how to word
//! `DirNotFound` differently than `NoHistory`), so the core returns this enum
//! rather than an opaque `anyhow::Error`. The CLI glue at the edge is still
//! free to wrap it in `anyhow` the way a leaf binary normally does.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed tuple line, quota/owner CSV row, or descent-rule TSV row.
    #[error("parse error in {source_name}{}: {detail}", line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Parse {
        source_name: String,
        line: Option<u64>,
        detail: String,
    },

    /// Directory not present in any open scan's prefix index.
    #[error("directory not found: {0}")]
    DirNotFound(PathBuf),

    /// Creating a prefix index / summary store where non-empty files already exist.
    #[error("database already exists at {0}")]
    DbExists(PathBuf),

    /// Opening a prefix index / summary store whose files are absent or zero-size.
    #[error("database missing or empty at {0}")]
    DbMissing(PathBuf),

    /// `history(gid, path)` called with a path not under any mount-point.
    #[error("path is not under any known mount point: {0}")]
    InvalidBasePath(PathBuf),

    /// `history` called for a (gid, mount) combination not present in the store.
    #[error("no history recorded for owner {owner} at {mount}")]
    NoHistory { owner: u32, mount: PathBuf },

    /// Underlying filesystem / database failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying embedded-database failure (rusqlite).
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// A binary-encoded record was truncated or had an invalid tag.
    #[error("corrupt encoding: {0}")]
    Codec(String),
}

impl CoreError {
    pub fn parse(source_name: impl Into<String>, line: Option<u64>, detail: impl Into<String>) -> Self {
        CoreError::Parse {
            source_name: source_name.into(),
            line,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
