//! C4: the summary store. One embedded database per instance, five named
//! buckets (`spec.md` §4.4).

use std::path::Path;

use crate::error::CoreError;
use crate::mount::MountTable;
use crate::store::kv::KvStore;
use crate::types::{AgeBucket, HistorySample, StoreInfo, SubdirRow, UsageRow};
use crate::utils::config::HISTORY_DEDUP_GRANULARITY_SECS;

pub const GROUP_USAGE: &str = "group_usage";
pub const GROUP_HISTORY: &str = "group_history";
pub const GROUP_SUBDIRS: &str = "group_subdirs";
pub const USER_USAGE: &str = "user_usage";
pub const USER_SUBDIRS: &str = "user_subdirs";

const BUCKETS: [&str; 5] = [
    GROUP_USAGE,
    GROUP_HISTORY,
    GROUP_SUBDIRS,
    USER_USAGE,
    USER_SUBDIRS,
];

/// Key convention: `decimal-owner-id | "-" | path` (`spec.md` §4.4).
pub fn owner_key(id: u32, path: &str) -> Vec<u8> {
    format!("{id}-{path}").into_bytes()
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec(value).map_err(|e| CoreError::Codec(e.to_string()))
}

fn decode<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> Result<T, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::Codec(e.to_string()))
}

pub struct SummaryStore {
    kv: KvStore,
}

impl SummaryStore {
    pub fn create(path: &Path) -> Result<Self, CoreError> {
        Ok(SummaryStore {
            kv: KvStore::create(path, &BUCKETS)?,
        })
    }

    pub fn open_read_only(path: &Path) -> Result<Self, CoreError> {
        Ok(SummaryStore {
            kv: KvStore::open_read_only(path, &BUCKETS)?,
        })
    }

    pub fn open_read_write_create(path: &Path) -> Result<Self, CoreError> {
        Ok(SummaryStore {
            kv: KvStore::open_read_write_create(path, &BUCKETS)?,
        })
    }

    pub fn put_group_usage(&mut self, row: &UsageRow) -> Result<(), CoreError> {
        let key = owner_key(row.id, &row.base_dir.to_string_lossy());
        self.kv.put(GROUP_USAGE, &key, &encode(row)?)
    }

    pub fn put_user_usage(&mut self, row: &UsageRow) -> Result<(), CoreError> {
        let key = owner_key(row.id, &row.base_dir.to_string_lossy());
        self.kv.put(USER_USAGE, &key, &encode(row)?)
    }

    pub fn group_usage_row(&self, gid: u32, base_dir: &str) -> Result<Option<UsageRow>, CoreError> {
        get_row(&self.kv, GROUP_USAGE, gid, base_dir)
    }

    pub fn user_usage_row(&self, uid: u32, base_dir: &str) -> Result<Option<UsageRow>, CoreError> {
        get_row(&self.kv, USER_USAGE, uid, base_dir)
    }

    /// All rows in `group_usage`, unprojected (the row's stored `all`-bucket
    /// totals).
    pub fn all_group_usage(&self) -> Result<Vec<UsageRow>, CoreError> {
        all_rows(&self.kv, GROUP_USAGE)
    }

    pub fn all_user_usage(&self) -> Result<Vec<UsageRow>, CoreError> {
        all_rows(&self.kv, USER_USAGE)
    }

    /// `group_usage(age)` (`spec.md` §4.4): every group row with `used_size`
    /// projected onto `age` via `UsageRow::size_for_age`. `count` and `mtime`
    /// have no stored per-age projection — only size is tracked per age
    /// bucket — so they are always the row's `all`-bucket totals regardless
    /// of `age`.
    pub fn group_usage(&self, age: AgeBucket) -> Result<Vec<UsageRow>, CoreError> {
        Ok(self
            .all_group_usage()?
            .into_iter()
            .map(|row| project_for_age(row, age))
            .collect())
    }

    /// `user_usage(age)`, see `group_usage`.
    pub fn user_usage(&self, age: AgeBucket) -> Result<Vec<UsageRow>, CoreError> {
        Ok(self
            .all_user_usage()?
            .into_iter()
            .map(|row| project_for_age(row, age))
            .collect())
    }

    pub fn put_group_subdirs(&mut self, gid: u32, base_dir: &str, rows: &[SubdirRow]) -> Result<(), CoreError> {
        let key = owner_key(gid, base_dir);
        self.kv.put(GROUP_SUBDIRS, &key, &encode(&rows.to_vec())?)
    }

    pub fn put_user_subdirs(&mut self, uid: u32, base_dir: &str, rows: &[SubdirRow]) -> Result<(), CoreError> {
        let key = owner_key(uid, base_dir);
        self.kv.put(USER_SUBDIRS, &key, &encode(&rows.to_vec())?)
    }

    pub fn group_sub_dirs(&self, gid: u32, base_dir: &str) -> Result<Option<Vec<SubdirRow>>, CoreError> {
        get_rows(&self.kv, GROUP_SUBDIRS, gid, base_dir)
    }

    pub fn user_sub_dirs(&self, uid: u32, base_dir: &str) -> Result<Option<Vec<SubdirRow>>, CoreError> {
        get_rows(&self.kv, USER_SUBDIRS, uid, base_dir)
    }

    /// Append a history sample, replacing an existing sample at the same
    /// (gid, mount) whose date falls in the same minute rather than
    /// duplicating it (`spec.md` §3 "Lifecycles", §8 "History idempotence").
    pub fn append_history(&mut self, gid: u32, mount: &str, sample: HistorySample) -> Result<(), CoreError> {
        let key = owner_key(gid, mount);
        let mut samples: Vec<HistorySample> = match self.kv.get(GROUP_HISTORY, &key)? {
            Some(bytes) => decode(&bytes)?,
            None => Vec::new(),
        };
        let minute = minute_key(sample.date_secs);
        samples.retain(|s| minute_key(s.date_secs) != minute);
        samples.push(sample);
        samples.sort_by_key(|s| s.date_secs);
        self.kv.put(GROUP_HISTORY, &key, &encode(&samples)?)
    }

    /// `history(gid, path)`: resolve `path`'s mount-point prefix, then
    /// point-lookup (`spec.md` §4.4).
    pub fn history(&self, gid: u32, path: &str, mounts: &MountTable) -> Result<Vec<HistorySample>, CoreError> {
        let mount = mounts
            .prefix_of(path)
            .ok_or_else(|| CoreError::InvalidBasePath(path.into()))?;
        let key = owner_key(gid, mount);
        match self.kv.get(GROUP_HISTORY, &key)? {
            Some(bytes) => decode(&bytes),
            None => Err(CoreError::NoHistory {
                owner: gid,
                mount: mount.into(),
            }),
        }
    }

    pub fn info(&self) -> Result<StoreInfo, CoreError> {
        let mut history_samples = 0u64;
        let history_keys = self.kv.count(GROUP_HISTORY)?;
        self.kv.for_each(GROUP_HISTORY, |_, value| {
            let samples: Vec<HistorySample> = decode(value)?;
            history_samples += samples.len() as u64;
            Ok(())
        })?;

        let mut group_subdirs = 0u64;
        let group_subdir_keys = self.kv.count(GROUP_SUBDIRS)?;
        self.kv.for_each(GROUP_SUBDIRS, |_, value| {
            let rows: Vec<SubdirRow> = decode(value)?;
            group_subdirs += rows.len() as u64;
            Ok(())
        })?;

        let mut user_subdirs = 0u64;
        let user_subdir_keys = self.kv.count(USER_SUBDIRS)?;
        self.kv.for_each(USER_SUBDIRS, |_, value| {
            let rows: Vec<SubdirRow> = decode(value)?;
            user_subdirs += rows.len() as u64;
            Ok(())
        })?;

        Ok(StoreInfo {
            group_usage_rows: self.kv.count(GROUP_USAGE)?,
            user_usage_rows: self.kv.count(USER_USAGE)?,
            history_keys,
            history_samples,
            group_subdir_keys,
            group_subdirs,
            user_subdir_keys,
            user_subdirs,
        })
    }

    pub fn path(&self) -> &Path {
        self.kv.path()
    }

    pub(crate) fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub(crate) fn kv_mut(&mut self) -> &mut KvStore {
        &mut self.kv
    }
}

/// Project `row.used_size` onto `age` (`spec.md` §4.4); leaves it untouched
/// when the row carries no histogram for that bucket (`AgeBucket::All`, or
/// the "histogram absent" case, `spec.md` §9).
fn project_for_age(mut row: UsageRow, age: AgeBucket) -> UsageRow {
    if let Some(projected) = row.size_for_age(age) {
        row.used_size = projected;
    }
    row
}

fn minute_key(date_secs: i64) -> i64 {
    date_secs - date_secs.rem_euclid(HISTORY_DEDUP_GRANULARITY_SECS)
}

fn get_row(kv: &KvStore, bucket: &str, id: u32, base_dir: &str) -> Result<Option<UsageRow>, CoreError> {
    let key = owner_key(id, base_dir);
    match kv.get(bucket, &key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn get_rows(kv: &KvStore, bucket: &str, id: u32, base_dir: &str) -> Result<Option<Vec<SubdirRow>>, CoreError> {
    let key = owner_key(id, base_dir);
    match kv.get(bucket, &key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn all_rows(kv: &KvStore, bucket: &str) -> Result<Vec<UsageRow>, CoreError> {
    let mut out = Vec::new();
    kv.for_each(bucket, |_, value| {
        out.push(decode(value)?);
        Ok(())
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn usage_row(id: u32, base_dir: &str, used_size: u64) -> UsageRow {
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
    fn put_and_get_group_usage_row() {
        let dir = tempdir().unwrap();
        let mut store = SummaryStore::create(&dir.path().join("summary.db")).unwrap();
        store.put_group_usage(&usage_row(1, "/a/b", 100)).unwrap();
        let row = store.group_usage_row(1, "/a/b").unwrap().unwrap();
        assert_eq!(row.used_size, 100);
        assert!(store.group_usage_row(1, "/missing").unwrap().is_none());
    }

    #[test]
    fn group_usage_projects_size_onto_requested_age() {
        let dir = tempdir().unwrap();
        let mut store = SummaryStore::create(&dir.path().join("summary.db")).unwrap();
        let mut row = usage_row(1, "/a/b", 100);
        row.size_by_access_age = Some([10, 20, 30, 0, 0, 0, 0, 0]);
        store.put_group_usage(&row).unwrap();

        let all = store.group_usage(AgeBucket::All).unwrap();
        assert_eq!(all[0].used_size, 100);

        let projected = store.group_usage(AgeBucket::A6M).unwrap();
        assert_eq!(projected[0].used_size, 30);

        // No modify-age histogram on this row: projection leaves the
        // all-bucket total untouched rather than zeroing it out.
        let unprojectable = store.group_usage(AgeBucket::M1M).unwrap();
        assert_eq!(unprojectable[0].used_size, 100);
    }

    #[test]
    fn user_usage_projects_size_onto_requested_age() {
        let dir = tempdir().unwrap();
        let mut store = SummaryStore::create(&dir.path().join("summary.db")).unwrap();
        let mut row = usage_row(7, "/a/b", 200);
        row.size_by_modify_age = Some([1, 2, 3, 4, 5, 6, 7, 8]);
        store.put_user_usage(&row).unwrap();

        let projected = store.user_usage(AgeBucket::M2Y).unwrap();
        assert_eq!(projected[0].used_size, 5);
    }

    #[test]
    fn history_idempotence() {
        let dir = tempdir().unwrap();
        let mut store = SummaryStore::create(&dir.path().join("summary.db")).unwrap();
        let sample = HistorySample {
            date_secs: 1_000,
            used_size: 10,
            quota_size: 100,
            used_inodes: 1,
            quota_inodes: 10,
        };
        store.append_history(1, "/lustre/", sample).unwrap();
        store.append_history(1, "/lustre/", sample).unwrap();
        let mounts = MountTable::new(["/lustre"]);
        let samples = store.history(1, "/lustre/base", &mounts).unwrap();
        assert_eq!(samples.len(), 1);

        let sample2 = HistorySample {
            date_secs: 1_000 + 120,
            ..sample
        };
        store.append_history(1, "/lustre/", sample2).unwrap();
        let samples = store.history(1, "/lustre/base", &mounts).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn history_errors_outside_mount_and_when_absent() {
        let dir = tempdir().unwrap();
        let store = SummaryStore::create(&dir.path().join("summary.db")).unwrap();
        let mounts = MountTable::new(["/lustre"]);
        let err = store.history(1, "/nfs/x", &mounts).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBasePath(_)));
        let err = store.history(1, "/lustre/x", &mounts).unwrap_err();
        assert!(matches!(err, CoreError::NoHistory { .. }));
    }
}
