//! `create_database`: the summary-store build operation (`spec.md` §4.4).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CoreError;
use crate::mount::MountTable;
use crate::namecache::NameCache;
use crate::owners::OwnersTable;
use crate::prefix_index::ReaderSet;
use crate::quotas::QuotaTable;
use crate::tree;
use crate::trend;
use crate::types::{AgeBucket, DescentConfig, Filter, HistoryPoint, HistorySample, SubdirRow, UsageRow};

use super::store::SummaryStore;

/// Build a fresh summary-store file at `out_path` from the tree aggregator's
/// base-directory descent over every `gid` then every `uid` present in the
/// scan. `scan_mtime` is the upstream scan output's modification time, used
/// as the history sample date; `now` gates `date_no_space`/`date_no_files`.
#[allow(clippy::too_many_arguments)]
pub fn create_database(
    reader: &ReaderSet,
    descent: &DescentConfig,
    quotas: &QuotaTable,
    mounts: &MountTable,
    owners: &OwnersTable,
    names: &NameCache,
    gids: &[u32],
    uids: &[u32],
    scan_mtime: i64,
    now: i64,
    out_path: &Path,
) -> Result<SummaryStore, CoreError> {
    let mut store = SummaryStore::create(out_path)?;

    for &gid in gids {
        build_owner(
            &mut store, reader, descent, quotas, mounts, owners, names, gid, true, scan_mtime, now,
        )?;
    }
    for &uid in uids {
        build_owner(
            &mut store, reader, descent, quotas, mounts, owners, names, uid, false, scan_mtime, now,
        )?;
    }

    Ok(store)
}

#[allow(clippy::too_many_arguments)]
fn build_owner(
    store: &mut SummaryStore,
    reader: &ReaderSet,
    descent: &DescentConfig,
    quotas: &QuotaTable,
    mounts: &MountTable,
    owners: &OwnersTable,
    names: &NameCache,
    id: u32,
    is_group: bool,
    scan_mtime: i64,
    now: i64,
) -> Result<(), CoreError> {
    let filter = if is_group {
        Filter::for_gid(id)
    } else {
        Filter::for_uid(id)
    };

    let raw = tree::where_(reader, Path::new("/"), &filter, descent)?;
    let base_dirs = tree::post_filter(raw, descent);

    // Several base_dirs can share the same mount (S2: three base_dirs for one
    // group, all under `/lustre/`). History is keyed by `(gid, mount)`
    // (`spec.md` §4.4 step 3), so the group's total usage on that mount must
    // be accumulated across its base_dirs *before* the sample is appended;
    // appending one sample per base_dir would have each later append replace
    // the previous one at the same `scan_mtime` minute (`store.rs`'s
    // dedup-by-minute), leaving history with only the last base_dir's size.
    if is_group {
        let mut mount_totals: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for summary in &base_dirs {
            let base_dir_str = summary.dir.to_string_lossy().to_string();
            if let Some(mount) = mounts.prefix_of(&base_dir_str) {
                let totals = mount_totals.entry(mount.to_string()).or_insert((0, 0));
                totals.0 += summary.size;
                totals.1 += summary.count;
            }
        }
        for (mount, (used_size, used_inodes)) in &mount_totals {
            let (quota_size, quota_inodes) = quotas.get(id, mount);
            let sample = HistorySample {
                date_secs: scan_mtime,
                used_size: *used_size,
                quota_size,
                used_inodes: *used_inodes,
                quota_inodes,
            };
            store.append_history(id, mount, sample)?;
        }
    }

    for summary in &base_dirs {
        let base_dir_str = summary.dir.to_string_lossy().to_string();

        let (quota_size, quota_inodes) = if is_group {
            quotas.get(id, &base_dir_str)
        } else {
            (0, 0)
        };

        let mut row = UsageRow {
            id,
            base_dir: summary.dir.clone(),
            used_size: summary.size,
            quota_size,
            used_inodes: summary.count,
            quota_inodes,
            mtime: summary.mtime,
            uid_set: summary.uids.clone(),
            gid_set: summary.gids.clone(),
            owner_name: Some(if is_group {
                names.group_name(id)
            } else {
                names.user_name(id)
            }),
            owner_label: if is_group {
                owners.get(id).map(str::to_string)
            } else {
                None
            },
            date_no_space: None,
            date_no_files: None,
            size_by_access_age: summary.size_by_access_age,
            size_by_modify_age: summary.size_by_modify_age,
        };

        if is_group {
            if let Ok(history) = store.history(id, &base_dir_str, mounts) {
                let size_points: Vec<HistoryPoint> = history.iter().map(|s| s.size_point()).collect();
                let inode_points: Vec<HistoryPoint> = history.iter().map(|s| s.inode_point()).collect();

                let date_full_size = trend::extrapolate(&size_points);
                let date_full_inodes = trend::extrapolate(&inode_points);

                if trend::is_imminent(date_full_size, now) {
                    row.date_no_space = Some(date_full_size);
                }
                if trend::is_imminent(date_full_inodes, now) {
                    row.date_no_files = Some(date_full_inodes);
                }
            }
        }

        if is_group {
            store.put_group_usage(&row)?;
        } else {
            store.put_user_usage(&row)?;
        }

        let subdir_rows = build_subdir_rows(reader, &summary.dir, &filter)?;
        if is_group {
            store.put_group_subdirs(id, &base_dir_str, &subdir_rows)?;
        } else {
            store.put_user_subdirs(id, &base_dir_str, &subdir_rows)?;
        }
    }

    Ok(())
}

/// Per-subdirectory breakdown under `base_dir`: one row per immediate child
/// directory (recursive aggregate beneath it) plus a `"."` row for files
/// directly in `base_dir` (`spec.md` §4.4).
fn build_subdir_rows(reader: &ReaderSet, base_dir: &Path, filter: &Filter) -> Result<Vec<SubdirRow>, CoreError> {
    let mut rows = Vec::new();

    let own = tree::own_dir_info(reader, base_dir, filter, AgeBucket::All)?;
    if own.count > 0 {
        rows.push(SubdirRow {
            subdir_relative_path: ".".to_string(),
            num_files: own.count,
            size_files: own.size,
            last_modified: own.mtime,
            per_type_size: own_type_breakdown(reader, base_dir, filter)?,
        });
    }

    for child in tree::children_of(reader, base_dir, filter, AgeBucket::All)? {
        let relative = relative_path(base_dir, &child.dir);
        let per_type = tree::type_breakdown(reader, &child.dir, filter, AgeBucket::All)?;
        rows.push(SubdirRow {
            subdir_relative_path: relative,
            num_files: child.count,
            size_files: child.size,
            last_modified: child.mtime,
            per_type_size: per_type,
        });
    }

    Ok(rows)
}

fn own_type_breakdown(
    reader: &ReaderSet,
    dir: &Path,
    filter: &Filter,
) -> Result<Vec<(crate::types::FileType, u64)>, CoreError> {
    use crate::tree::filter::{contributes_to_sum, matches_filter};
    use std::collections::BTreeMap;

    let mut totals = BTreeMap::new();
    for t in reader.get_tuples(dir)? {
        if t.age_bucket != AgeBucket::All || !matches_filter(&t, filter) || !contributes_to_sum(&t, filter) {
            continue;
        }
        *totals.entry(t.file_type).or_insert(0u64) += t.size;
    }
    Ok(totals.into_iter().collect())
}

fn relative_path(base: &Path, child: &Path) -> String {
    let base_s = base.to_string_lossy();
    let child_s = child.to_string_lossy();
    let with_sep = if base_s.ends_with('/') {
        base_s.to_string()
    } else {
        format!("{base_s}/")
    };
    child_s
        .strip_prefix(&with_sep)
        .unwrap_or(&child_s)
        .to_string()
}
