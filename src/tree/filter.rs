//! The `Filter` predicate and the `temp`-overlay rule (`spec.md` §4.3).

use crate::types::{FileType, Filter, Tuple};

/// Whether `t` is selected by `filter` at all (governs membership in the
/// result's `uids`/`gids`/`file_types` label sets).
pub fn matches_filter(t: &Tuple, filter: &Filter) -> bool {
    if let Some(gids) = &filter.gids {
        if !gids.contains(&t.gid) {
            return false;
        }
    }
    if let Some(uids) = &filter.uids {
        if !uids.contains(&t.uid) {
            return false;
        }
    }
    if let Some(types) = &filter.file_types {
        if t.file_type == FileType::Temp {
            if !types.contains(&FileType::Temp) {
                return false;
            }
        } else if !types.contains(&t.file_type) {
            return false;
        }
    }
    true
}

/// Whether a tuple that already passed `matches_filter` also contributes to
/// the numeric sums (count, size, atime, mtime, histograms). `temp` is an
/// overlay type: it only contributes when it was explicitly requested on its
/// own, never alongside other types and never when `file_types` is absent.
pub fn contributes_to_sum(t: &Tuple, filter: &Filter) -> bool {
    if t.file_type != FileType::Temp {
        return true;
    }
    match &filter.file_types {
        None => false,
        Some(types) => types.len() == 1 && types.contains(&FileType::Temp),
    }
}
