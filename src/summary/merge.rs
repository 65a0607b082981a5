//! `merge_dbs`: combine two summary-store files into a new one
//! (`spec.md` §4.4). `a` is the older file; at equal keys, `b` wins, except
//! `group_history` entries, whose sample lists are concatenated and
//! de-duplicated by date.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CoreError;
use crate::types::HistorySample;

use super::store::{SummaryStore, GROUP_HISTORY, GROUP_SUBDIRS, GROUP_USAGE, USER_SUBDIRS, USER_USAGE};

pub fn merge_dbs(a: &Path, b: &Path, out: &Path) -> Result<SummaryStore, CoreError> {
    let store_a = SummaryStore::open_read_only(a)?;
    let store_b = SummaryStore::open_read_only(b)?;
    let mut merged = SummaryStore::create(out)?;

    for bucket in [GROUP_USAGE, USER_USAGE, GROUP_SUBDIRS, USER_SUBDIRS] {
        let mut rows: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        store_a.kv().for_each(bucket, |k, v| {
            rows.insert(k.to_vec(), v.to_vec());
            Ok(())
        })?;
        store_b.kv().for_each(bucket, |k, v| {
            rows.insert(k.to_vec(), v.to_vec()); // b wins at equal keys
            Ok(())
        })?;
        for (key, value) in rows {
            merged.kv_mut().put(bucket, &key, &value)?;
        }
    }

    let mut history: BTreeMap<Vec<u8>, Vec<HistorySample>> = BTreeMap::new();
    store_a.kv().for_each(GROUP_HISTORY, |k, v| {
        let samples: Vec<HistorySample> = serde_json::from_slice(v).map_err(|e| CoreError::Codec(e.to_string()))?;
        history.insert(k.to_vec(), samples);
        Ok(())
    })?;
    store_b.kv().for_each(GROUP_HISTORY, |k, v| {
        let samples: Vec<HistorySample> = serde_json::from_slice(v).map_err(|e| CoreError::Codec(e.to_string()))?;
        history
            .entry(k.to_vec())
            .and_modify(|existing| {
                existing.extend(samples.clone());
                existing.sort_by_key(|s| s.date_secs);
                existing.dedup_by_key(|s| s.date_secs);
            })
            .or_insert(samples);
        Ok(())
    })?;
    for (key, samples) in history {
        let bytes = serde_json::to_vec(&samples).map_err(|e| CoreError::Codec(e.to_string()))?;
        merged.kv_mut().put(GROUP_HISTORY, &key, &bytes)?;
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageRow;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn row(id: u32, base_dir: &str, used_size: u64) -> UsageRow {
        UsageRow {
            id,
            base_dir: PathBuf::from(base_dir),
            used_size,
            quota_size: 0,
            used_inodes: 0,
            quota_inodes: 0,
            mtime: 0,
            uid_set: Default::default(),
            gid_set: Default::default(),
            owner_name: None,
            owner_label: None,
            date_no_space: None,
            date_no_files: None,
            size_by_access_age: None,
            size_by_modify_age: None,
        }
    }

    #[test]
    fn newer_db_wins_on_conflicting_usage_rows() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.db");
        let b_path = dir.path().join("b.db");
        let out_path = dir.path().join("out.db");

        let mut a = SummaryStore::create(&a_path).unwrap();
        a.put_group_usage(&row(1, "/x", 10)).unwrap();
        let mut b = SummaryStore::create(&b_path).unwrap();
        b.put_group_usage(&row(1, "/x", 20)).unwrap();
        b.put_group_usage(&row(2, "/y", 5)).unwrap();

        let merged = merge_dbs(&a_path, &b_path, &out_path).unwrap();
        assert_eq!(merged.group_usage_row(1, "/x").unwrap().unwrap().used_size, 20);
        assert_eq!(merged.group_usage_row(2, "/y").unwrap().unwrap().used_size, 5);
    }

    #[test]
    fn history_samples_concatenate_and_dedupe() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.db");
        let b_path = dir.path().join("b.db");
        let out_path = dir.path().join("out.db");

        let mut a = SummaryStore::create(&a_path).unwrap();
        a.append_history(
            1,
            "/lustre/",
            HistorySample {
                date_secs: 100,
                used_size: 1,
                quota_size: 10,
                used_inodes: 1,
                quota_inodes: 10,
            },
        )
        .unwrap();
        let mut b = SummaryStore::create(&b_path).unwrap();
        b.append_history(
            1,
            "/lustre/",
            HistorySample {
                date_secs: 100,
                used_size: 1,
                quota_size: 10,
                used_inodes: 1,
                quota_inodes: 10,
            },
        )
        .unwrap();
        b.append_history(
            1,
            "/lustre/",
            HistorySample {
                date_secs: 200,
                used_size: 2,
                quota_size: 10,
                used_inodes: 1,
                quota_inodes: 10,
            },
        )
        .unwrap();

        let merged = merge_dbs(&a_path, &b_path, &out_path).unwrap();
        let mounts = crate::mount::MountTable::new(["/lustre"]);
        let samples = merged.history(1, "/lustre/base", &mounts).unwrap();
        assert_eq!(samples.len(), 2);
    }
}
