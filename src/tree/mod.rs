//! C3: the tree aggregator. Recursive directory aggregation (`aggregate`),
//! the `Filter`/`temp`-overlay predicate (`filter`), and base-directory
//! descent (`descent`).

pub mod aggregate;
pub mod descent;
pub mod filter;

pub use aggregate::{children_of, dir_info, own_dir_info, type_breakdown};
pub use descent::{post_filter, where_};
