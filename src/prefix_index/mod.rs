//! C2: the prefix index. A single scan's paired on-disk databases
//! (`scan::ScanIndex`) and the merged view over several scans
//! (`reader_set::ReaderSet`) that the tree aggregator (C3) queries.

pub mod reader_set;
pub mod scan;

pub use reader_set::ReaderSet;
pub use scan::{posix_parent, probe, ScanIndex};
