//! dirsum: an offline disk-usage analytics engine over scanned filesystem
//! metadata (`spec.md` OVERVIEW).
//!
//! A scan producer (external to this crate) walks a filesystem and emits a
//! tuple stream per directory; [`prefix_index::ScanIndex`] turns that stream
//! into a queryable on-disk prefix index (C2). [`tree`] aggregates those
//! tuples into per-owner directory summaries (C3). [`summary`] persists the
//! aggregation as a queryable store with quota and historical-trend fields
//! (C4), and [`trend`] extrapolates "runs out of space/inodes" dates from
//! history samples (C5). [`codec`] is the wire format the tuple stream and
//! prefix index both speak (C1).

pub mod cli;
pub mod codec;
pub mod error;
pub mod mount;
pub mod namecache;
pub mod owners;
pub mod prefix_index;
pub mod quotas;
pub mod store;
pub mod summary;
pub mod tree;
pub mod trend;
pub mod types;
pub mod utils;

pub use error::{CoreError, Result};
pub use types::{
    AgeBucket, DescentConfig, DescentRule, DirRecord, DirSummary, FileType, Filter, HistoryPoint,
    HistorySample, StoreInfo, SubdirRow, Tuple, UsageRow,
};
