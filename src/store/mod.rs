//! Generic embedded key-value store shared by the prefix index (C2) and the
//! summary store (C4).

pub mod kv;

pub use kv::{KvStore, StoreState};
