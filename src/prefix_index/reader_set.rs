//! A reader set holds several opened scan directories and presents them as
//! one merged prefix index (`spec.md` §4.2 "Merging across scans").

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::Tuple;

use super::scan::ScanIndex;

pub struct ReaderSet {
    scans: Vec<ScanIndex>,
}

impl ReaderSet {
    pub fn open<I>(scan_dirs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let scans = scan_dirs
            .into_iter()
            .map(|d| ScanIndex::open_read_only(&d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReaderSet { scans })
    }

    pub fn from_scans(scans: Vec<ScanIndex>) -> Self {
        ReaderSet { scans }
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Concatenate tuple lists from every scan that contains `dir`.
    /// `DirNotFound` if no scan contains it.
    pub fn get_tuples(&self, dir: &Path) -> Result<Vec<Tuple>, CoreError> {
        let mut out = Vec::new();
        let mut found = false;
        for scan in &self.scans {
            if let Some(mut tuples) = scan.get_tuples(dir)? {
                found = true;
                out.append(&mut tuples);
            }
        }
        if !found {
            return Err(CoreError::DirNotFound(dir.to_path_buf()));
        }
        Ok(out)
    }

    /// Union of child lists across scans, de-duplicated and sorted. Never an
    /// error; an absent directory simply yields an empty list.
    pub fn get_children(&self, dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
        let mut set = BTreeSet::new();
        for scan in &self.scans {
            for child in scan.get_children(dir)? {
                set.insert(child);
            }
        }
        Ok(set.into_iter().collect())
    }

    /// True if at least one scan has a record for `dir`.
    pub fn contains(&self, dir: &Path) -> Result<bool, CoreError> {
        for scan in &self.scans {
            if scan.get_tuples(dir)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The most recent scan's output mtime, used as the history sample date
    /// when several scans are open together for a summary build
    /// (`spec.md` §4.4).
    pub fn latest_scan_mtime(&self) -> Result<i64, CoreError> {
        self.scans
            .iter()
            .map(|s| s.scan_mtime())
            .collect::<Result<Vec<_>, _>>()
            .map(|v| v.into_iter().max().unwrap_or(0))
    }

    pub fn scans(&self) -> &[ScanIndex] {
        &self.scans
    }

    /// Every distinct `(gids, uids)` present across all open scans, used by
    /// `create_database` to know which owners to build base directories for
    /// (`spec.md` §4.4: "for each gid present in the scan... for each uid
    /// present"). A gid/uid present only under a non-`all` age bucket is
    /// still picked up, since the `all` tuple subsumes every bucket
    /// (`spec.md` §3 invariant) and therefore carries the same id.
    pub fn all_owners(&self) -> Result<(BTreeSet<u32>, BTreeSet<u32>), CoreError> {
        let mut gids = BTreeSet::new();
        let mut uids = BTreeSet::new();
        for scan in &self.scans {
            scan.for_each_dir(|_dir, tuples| {
                for t in tuples {
                    gids.insert(t.gid);
                    uids.insert(t.uid);
                }
                Ok(())
            })?;
        }
        Ok((gids, uids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgeBucket, DirRecord, FileType};
    use tempfile::tempdir;

    fn tuple(gid: u32) -> Tuple {
        Tuple {
            gid,
            uid: 1,
            file_type: FileType::Bam,
            age_bucket: AgeBucket::All,
            count: 1,
            size: 10,
            atime: 0,
            mtime: 0,
        }
    }

    #[test]
    fn merges_tuples_from_multiple_scans() {
        let base = tempdir().unwrap();
        let scan_a = base.path().join("a");
        let scan_b = base.path().join("b");

        ScanIndex::create(
            &scan_a,
            vec![Ok(DirRecord {
                dir: PathBuf::from("/d"),
                tuples: vec![tuple(1)],
            })],
            10,
        )
        .unwrap();
        ScanIndex::create(
            &scan_b,
            vec![Ok(DirRecord {
                dir: PathBuf::from("/d"),
                tuples: vec![tuple(2)],
            })],
            10,
        )
        .unwrap();

        let set = ReaderSet::open([scan_a, scan_b]).unwrap();
        let merged = set.get_tuples(Path::new("/d")).unwrap();
        assert_eq!(merged.len(), 2);

        let err = set.get_tuples(Path::new("/missing")).unwrap_err();
        assert!(matches!(err, CoreError::DirNotFound(_)));
    }

    #[test]
    fn unions_and_dedupes_children() {
        let base = tempdir().unwrap();
        let scan_a = base.path().join("a");
        let scan_b = base.path().join("b");

        ScanIndex::create(
            &scan_a,
            vec![Ok(DirRecord {
                dir: PathBuf::from("/p/x"),
                tuples: vec![tuple(1)],
            })],
            10,
        )
        .unwrap();
        ScanIndex::create(
            &scan_b,
            vec![
                Ok(DirRecord {
                    dir: PathBuf::from("/p/x"),
                    tuples: vec![tuple(2)],
                }),
                Ok(DirRecord {
                    dir: PathBuf::from("/p/y"),
                    tuples: vec![tuple(3)],
                }),
            ],
            10,
        )
        .unwrap();

        let set = ReaderSet::open([scan_a, scan_b]).unwrap();
        let children = set.get_children(Path::new("/p")).unwrap();
        assert_eq!(children, vec![PathBuf::from("/p/x"), PathBuf::from("/p/y")]);
    }

    #[test]
    fn all_owners_collects_distinct_ids_across_scans() {
        let base = tempdir().unwrap();
        let scan_a = base.path().join("a");
        let scan_b = base.path().join("b");

        ScanIndex::create(
            &scan_a,
            vec![Ok(DirRecord {
                dir: PathBuf::from("/p/x"),
                tuples: vec![tuple(1), tuple(2)],
            })],
            10,
        )
        .unwrap();
        ScanIndex::create(
            &scan_b,
            vec![Ok(DirRecord {
                dir: PathBuf::from("/p/y"),
                tuples: vec![tuple(2), tuple(3)],
            })],
            10,
        )
        .unwrap();

        let set = ReaderSet::open([scan_a, scan_b]).unwrap();
        let (gids, uids) = set.all_owners().unwrap();
        assert_eq!(gids, BTreeSet::from([1, 2, 3]));
        assert_eq!(uids, BTreeSet::from([1]));
    }
}
