//! `dir_info` and `children_of`: recursive subtree aggregation over the
//! prefix index (`spec.md` §4.3).

use std::path::Path;

use crate::error::CoreError;
use crate::prefix_index::ReaderSet;
use crate::types::{AgeBucket, DirSummary, Filter, Tuple};

use super::filter::{contributes_to_sum, matches_filter};

/// Aggregate of `tuples` recorded directly at one directory (no descendants),
/// for the given filter and age projection.
fn summarize_own(dir: &Path, tuples: &[Tuple], filter: &Filter, age: AgeBucket) -> DirSummary {
    let mut summary = DirSummary {
        dir: dir.to_path_buf(),
        ..Default::default()
    };
    let mut access_hist = [0u64; 8];
    let mut modify_hist = [0u64; 8];

    for t in tuples {
        if !matches_filter(t, filter) {
            continue;
        }
        summary.gids.insert(t.gid);
        summary.uids.insert(t.uid);
        summary.file_types.insert(t.file_type);

        if !contributes_to_sum(t, filter) {
            continue;
        }

        if let Some(slot) = t.age_bucket.histogram_slot() {
            if t.age_bucket.is_access() {
                access_hist[slot] += t.size;
            } else {
                modify_hist[slot] += t.size;
            }
        }

        if t.age_bucket == age {
            summary.count += t.count;
            summary.size += t.size;
            summary.atime = min_nonzero(summary.atime, t.atime);
            summary.mtime = summary.mtime.max(t.mtime);
        }
    }

    summary.size_by_access_age = non_zero(access_hist);
    summary.size_by_modify_age = non_zero(modify_hist);
    summary
}

fn non_zero(hist: [u64; 8]) -> Option<[u64; 8]> {
    if hist.iter().any(|&x| x != 0) {
        Some(hist)
    } else {
        None
    }
}

fn min_nonzero(a: i64, b: i64) -> i64 {
    match (a, b) {
        (0, x) => x,
        (x, 0) => x,
        (x, y) => x.min(y),
    }
}

fn merge_into(acc: &mut DirSummary, other: DirSummary) {
    acc.count += other.count;
    acc.size += other.size;
    acc.atime = min_nonzero(acc.atime, other.atime);
    acc.mtime = acc.mtime.max(other.mtime);
    acc.uids.extend(other.uids);
    acc.gids.extend(other.gids);
    acc.file_types.extend(other.file_types);

    let a = acc.size_by_access_age.unwrap_or([0; 8]);
    let b = other.size_by_access_age.unwrap_or([0; 8]);
    let mut access = [0u64; 8];
    for i in 0..8 {
        access[i] = a[i] + b[i];
    }
    acc.size_by_access_age = non_zero(access);

    let a = acc.size_by_modify_age.unwrap_or([0; 8]);
    let b = other.size_by_modify_age.unwrap_or([0; 8]);
    let mut modify = [0u64; 8];
    for i in 0..8 {
        modify[i] = a[i] + b[i];
    }
    acc.size_by_modify_age = non_zero(modify);
}

/// The total, filtered, age-projected aggregate of everything nested beneath
/// `dir` (`dir` itself included). `DirNotFound` if `dir` is absent from every
/// open scan. A child directory known only via a `children.db` edge but
/// missing its own `tuples.db` record (possible when scans are merged
/// inconsistently) is treated as contributing nothing rather than as an
/// error.
pub fn dir_info(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    age: AgeBucket,
) -> Result<DirSummary, CoreError> {
    let own_tuples = reader.get_tuples(dir)?;
    let mut summary = summarize_own(dir, &own_tuples, filter, age);

    for child in reader.get_children(dir)? {
        match dir_info(reader, &child, filter, age) {
            Ok(child_summary) => merge_into(&mut summary, child_summary),
            Err(CoreError::DirNotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    summary.dir = dir.to_path_buf();
    Ok(summary)
}

/// Immediate children of `dir` whose (recursive) aggregate has non-zero
/// count, under `filter`/`age`.
pub fn children_of(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    age: AgeBucket,
) -> Result<Vec<DirSummary>, CoreError> {
    let mut out = Vec::new();
    for child in reader.get_children(dir)? {
        match dir_info(reader, &child, filter, age) {
            Ok(summary) => {
                if summary.count > 0 {
                    out.push(summary);
                }
            }
            Err(CoreError::DirNotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// The aggregate of tuples recorded directly at `dir`, not its descendants
/// (used for the subdirectory breakdown's `"."` entry, `spec.md` §4.4).
pub fn own_dir_info(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    age: AgeBucket,
) -> Result<DirSummary, CoreError> {
    let own_tuples = reader.get_tuples(dir)?;
    Ok(summarize_own(dir, &own_tuples, filter, age))
}

/// Per-file-type size breakdown over everything nested beneath `dir`
/// (`dir` included), for the subdirectory breakdown's `per_type_size_map`
/// (`spec.md` §3, §4.4).
pub fn type_breakdown(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    age: AgeBucket,
) -> Result<Vec<(crate::types::FileType, u64)>, CoreError> {
    let mut totals = std::collections::BTreeMap::new();
    accumulate_types(reader, dir, filter, age, &mut totals)?;
    Ok(totals.into_iter().collect())
}

fn accumulate_types(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    age: AgeBucket,
    totals: &mut std::collections::BTreeMap<crate::types::FileType, u64>,
) -> Result<(), CoreError> {
    let own_tuples = reader.get_tuples(dir)?;
    for t in &own_tuples {
        if t.age_bucket != age || !matches_filter(t, filter) || !contributes_to_sum(t, filter) {
            continue;
        }
        *totals.entry(t.file_type).or_insert(0) += t.size;
    }
    for child in reader.get_children(dir)? {
        match accumulate_types(reader, &child, filter, age, totals) {
            Ok(()) => {}
            Err(CoreError::DirNotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
