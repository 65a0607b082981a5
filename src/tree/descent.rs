//! Base-directory descent (`spec.md` §4.3) and the owner-summary post-filter
//! (`spec.md` §4.4) applied on top of it.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::prefix_index::ReaderSet;
use crate::types::{AgeBucket, DescentConfig, DirSummary, Filter};

use super::aggregate::{children_of, dir_info};

/// Collapse single-child chains: while `dir` has exactly one non-empty child
/// and that child's aggregate count equals `dir`'s own, descend into it.
fn descend(reader: &ReaderSet, start: &Path, filter: &Filter) -> Result<PathBuf, CoreError> {
    let mut current = start.to_path_buf();
    loop {
        let current_summary = dir_info(reader, &current, filter, AgeBucket::All)?;
        let kids = children_of(reader, &current, filter, AgeBucket::All)?;
        if kids.len() == 1 && kids[0].count == current_summary.count {
            current = kids[0].dir.clone();
        } else {
            break;
        }
    }
    Ok(current)
}

/// Branch recursively, collapsing single-child chains at every branch point,
/// down to `remaining_depth` levels of branching. A node is only collected
/// as a result once it has no further non-empty children, or the depth
/// budget runs out.
fn collect(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    remaining_depth: usize,
    out: &mut Vec<DirSummary>,
) -> Result<(), CoreError> {
    let based = descend(reader, dir, filter)?;
    let kids = children_of(reader, &based, filter, AgeBucket::All)?;
    if kids.is_empty() || remaining_depth == 0 {
        let summary = dir_info(reader, &based, filter, AgeBucket::All)?;
        if summary.count > 0 {
            out.push(summary);
        }
        return Ok(());
    }
    for child in kids {
        collect(reader, &child.dir, filter, remaining_depth - 1, out)?;
    }
    Ok(())
}

/// `where(dir, filter, descent)`: the base-directory descent algorithm.
/// `DirNotFound` if `dir` is unknown to every open scan.
pub fn where_(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
    descent: &DescentConfig,
) -> Result<Vec<DirSummary>, CoreError> {
    let based = descend(reader, dir, filter)?;
    let depth = descent.matching_rule(&based.to_string_lossy()).splits as usize;
    let mut results = Vec::new();
    collect(reader, &based, filter, depth, &mut results)?;
    results.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.dir.cmp(&b.dir)));
    Ok(results)
}

/// The owner-summary post-filter: drop results below `min_dirs`, then drop
/// any result nested under a previously accepted one (`spec.md` §4.3).
pub fn post_filter(results: Vec<DirSummary>, descent: &DescentConfig) -> Vec<DirSummary> {
    let mut candidates: Vec<DirSummary> = results
        .into_iter()
        .filter(|r| {
            let path = r.dir.to_string_lossy();
            let min_dirs = descent.matching_rule(&path).min_dirs;
            component_count(&path) >= min_dirs
        })
        .collect();

    candidates.sort_by(|a, b| a.dir.cmp(&b.dir));

    let mut accepted: Vec<DirSummary> = Vec::new();
    for candidate in candidates {
        let nested = accepted
            .iter()
            .any(|prev| is_path_prefix(&prev.dir, &candidate.dir));
        if !nested {
            accepted.push(candidate);
        }
    }
    accepted
}

fn component_count(path: &str) -> u32 {
    path.matches('/').count() as u32
}

fn is_path_prefix(prev: &Path, candidate: &Path) -> bool {
    let prev_s = prev.to_string_lossy();
    let cand_s = candidate.to_string_lossy();
    if prev_s == cand_s {
        return true;
    }
    let with_sep = if prev_s.ends_with('/') {
        prev_s.to_string()
    } else {
        format!("{prev_s}/")
    };
    cand_s.starts_with(&with_sep)
}
