//! C4: the summary store. On-disk persistence (`store`), the build
//! operation (`build`), and merging two summary-store files (`merge`).

pub mod build;
pub mod merge;
pub mod store;

pub use build::create_database;
pub use merge::merge_dbs;
pub use store::SummaryStore;
