//! Core data model shared across components: the tuple, its closed enums,
//! and the aggregate/summary types built on top of it.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fixed, closed set of file-type classifications. Numeric values are stable
/// across versions of this crate because they are persisted in the binary
/// tuple encoding (see `codec::binary`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FileType {
    Other = 0,
    Temp = 1,
    Vcf = 2,
    VcfGz = 3,
    Bcf = 4,
    Sam = 5,
    Bam = 6,
    Cram = 7,
    Fasta = 8,
    Fastq = 9,
    FastqGz = 10,
    PedBed = 11,
    Compressed = 12,
    Text = 13,
    Log = 14,
    Dir = 15,
}

impl FileType {
    pub const ALL: [FileType; 16] = [
        FileType::Other,
        FileType::Temp,
        FileType::Vcf,
        FileType::VcfGz,
        FileType::Bcf,
        FileType::Sam,
        FileType::Bam,
        FileType::Cram,
        FileType::Fasta,
        FileType::Fastq,
        FileType::FastqGz,
        FileType::PedBed,
        FileType::Compressed,
        FileType::Text,
        FileType::Log,
        FileType::Dir,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ft| *ft as u8 == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Other => "other",
            FileType::Temp => "temp",
            FileType::Vcf => "vcf",
            FileType::VcfGz => "vcf_gz",
            FileType::Bcf => "bcf",
            FileType::Sam => "sam",
            FileType::Bam => "bam",
            FileType::Cram => "cram",
            FileType::Fasta => "fasta",
            FileType::Fastq => "fastq",
            FileType::FastqGz => "fastq_gz",
            FileType::PedBed => "pedbed",
            FileType::Compressed => "compressed",
            FileType::Text => "text",
            FileType::Log => "log",
            FileType::Dir => "dir",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ft| ft.as_str() == s)
    }
}

/// One of the 17 age buckets: `All`, 8 access-time buckets, 8 modify-time buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AgeBucket {
    All = 0,
    A1M = 1,
    A2M = 2,
    A6M = 3,
    A1Y = 4,
    A2Y = 5,
    A3Y = 6,
    A5Y = 7,
    A7Y = 8,
    M1M = 9,
    M2M = 10,
    M6M = 11,
    M1Y = 12,
    M2Y = 13,
    M3Y = 14,
    M5Y = 15,
    M7Y = 16,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 17] = [
        AgeBucket::All,
        AgeBucket::A1M,
        AgeBucket::A2M,
        AgeBucket::A6M,
        AgeBucket::A1Y,
        AgeBucket::A2Y,
        AgeBucket::A3Y,
        AgeBucket::A5Y,
        AgeBucket::A7Y,
        AgeBucket::M1M,
        AgeBucket::M2M,
        AgeBucket::M6M,
        AgeBucket::M1Y,
        AgeBucket::M2Y,
        AgeBucket::M3Y,
        AgeBucket::M5Y,
        AgeBucket::M7Y,
    ];

    /// The 8 access-time buckets, in ascending order of age, matching the
    /// `size_by_access_age[8]` histogram slot order.
    pub const ACCESS: [AgeBucket; 8] = [
        AgeBucket::A1M,
        AgeBucket::A2M,
        AgeBucket::A6M,
        AgeBucket::A1Y,
        AgeBucket::A2Y,
        AgeBucket::A3Y,
        AgeBucket::A5Y,
        AgeBucket::A7Y,
    ];

    /// The 8 modify-time buckets, in ascending order of age, matching the
    /// `size_by_modify_age[8]` histogram slot order.
    pub const MODIFY: [AgeBucket; 8] = [
        AgeBucket::M1M,
        AgeBucket::M2M,
        AgeBucket::M6M,
        AgeBucket::M1Y,
        AgeBucket::M2Y,
        AgeBucket::M3Y,
        AgeBucket::M5Y,
        AgeBucket::M7Y,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| *b as u8 == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_access(self) -> bool {
        Self::ACCESS.contains(&self)
    }

    pub fn is_modify(self) -> bool {
        Self::MODIFY.contains(&self)
    }

    /// Index into the 8-slot histogram for this bucket, or `None` for `All`.
    pub fn histogram_slot(self) -> Option<usize> {
        Self::ACCESS
            .iter()
            .position(|b| *b == self)
            .or_else(|| Self::MODIFY.iter().position(|b| *b == self))
    }
}

/// One row of the per-directory, per-owner, per-filetype, per-age stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple {
    pub gid: u32,
    pub uid: u32,
    pub file_type: FileType,
    pub age_bucket: AgeBucket,
    pub count: u64,
    pub size: u64,
    pub atime: i64,
    pub mtime: i64,
}

/// A directory and the tuples the scanner emitted for it, as a contiguous block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirRecord {
    pub dir: PathBuf,
    pub tuples: Vec<Tuple>,
}

/// A predicate over users, groups, and file types. Each field is optional;
/// an absent field matches everything. See the temp-overlay rule in
/// `tree::filter` for how `file_types` interacts with the `Temp` type.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub gids: Option<BTreeSet<u32>>,
    pub uids: Option<BTreeSet<u32>>,
    pub file_types: Option<BTreeSet<FileType>>,
}

impl Filter {
    pub fn for_gid(gid: u32) -> Self {
        Filter {
            gids: Some(BTreeSet::from([gid])),
            ..Default::default()
        }
    }

    pub fn for_uid(uid: u32) -> Self {
        Filter {
            uids: Some(BTreeSet::from([uid])),
            ..Default::default()
        }
    }
}

/// The aggregate returned by `dir_info` and by child enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DirSummary {
    pub dir: PathBuf,
    pub count: u64,
    pub size: u64,
    /// Minimum access time over contributing tuples, 0 if none contributed.
    pub atime: i64,
    /// Maximum modify time over contributing tuples, 0 if none contributed.
    pub mtime: i64,
    pub uids: BTreeSet<u32>,
    pub gids: BTreeSet<u32>,
    pub file_types: BTreeSet<FileType>,
    /// Size histogram by access-time age bucket, youngest to oldest.
    /// `None` when the contributing tuples' histograms were all-zero on a
    /// tuple with non-zero count/size (see design note in SPEC_FULL.md: an
    /// all-zero histogram is "absent", not "no files").
    pub size_by_access_age: Option<[u64; 8]>,
    pub size_by_modify_age: Option<[u64; 8]>,
}

/// One rule in the base-directory descent configuration (`spec.md` §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescentRule {
    pub prefix: String,
    pub score: i64,
    pub splits: u32,
    pub min_dirs: u32,
}

/// Ordered descent configuration: rules are matched by longest-prefix, with a
/// default rule applied when nothing matches.
#[derive(Clone, Debug)]
pub struct DescentConfig {
    pub rules: Vec<DescentRule>,
    pub default: DescentRule,
}

impl DescentConfig {
    /// The rule whose `prefix` is the longest string-prefix of `path`,
    /// falling back to `default` when nothing matches.
    pub fn matching_rule(&self, path: &str) -> &DescentRule {
        self.rules
            .iter()
            .filter(|r| path.starts_with(r.prefix.as_str()))
            .max_by_key(|r| r.prefix.len())
            .unwrap_or(&self.default)
    }
}

/// One `(date, used, quota)` sample, by bytes or inodes (whichever axis).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HistoryPoint {
    pub date_secs: i64,
    pub used: u64,
    pub quota: u64,
}

/// A full history sample: both axes recorded together for one `(date)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    pub date_secs: i64,
    pub used_size: u64,
    pub quota_size: u64,
    pub used_inodes: u64,
    pub quota_inodes: u64,
}

impl HistorySample {
    pub fn size_point(&self) -> HistoryPoint {
        HistoryPoint {
            date_secs: self.date_secs,
            used: self.used_size,
            quota: self.quota_size,
        }
    }

    pub fn inode_point(&self) -> HistoryPoint {
        HistoryPoint {
            date_secs: self.date_secs,
            used: self.used_inodes,
            quota: self.quota_inodes,
        }
    }

    /// Truncate `date_secs` to the minute, for the history-idempotence rule.
    pub fn minute_key(&self) -> i64 {
        self.date_secs - self.date_secs.rem_euclid(60)
    }
}

/// A usage row materialized for one `(owner, base_directory)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRow {
    pub id: u32,
    pub base_dir: PathBuf,
    pub used_size: u64,
    pub quota_size: u64,
    pub used_inodes: u64,
    pub quota_inodes: u64,
    pub mtime: i64,
    pub uid_set: BTreeSet<u32>,
    pub gid_set: BTreeSet<u32>,
    pub owner_name: Option<String>,
    /// Group-rows only: the friendly name from the owners table, distinct
    /// from `owner_name` (the OS group name from the name cache).
    pub owner_label: Option<String>,
    pub date_no_space: Option<i64>,
    pub date_no_files: Option<i64>,
    /// Size by access/modify age, carried so `age`-projected queries
    /// (`spec.md` §4.4) can report this row's size for a specific bucket
    /// instead of the `all`-bucket total in `used_size`.
    pub size_by_access_age: Option<[u64; 8]>,
    pub size_by_modify_age: Option<[u64; 8]>,
}

impl UsageRow {
    /// `used_size` projected onto a specific age bucket, or the stored total
    /// for `AgeBucket::All`. `None` if the row carries no histogram for a
    /// non-`all` bucket (`spec.md` §9 "histogram absent" design note).
    pub fn size_for_age(&self, age: AgeBucket) -> Option<u64> {
        match age {
            AgeBucket::All => Some(self.used_size),
            _ if age.is_access() => self
                .size_by_access_age
                .and_then(|h| age.histogram_slot().map(|i| h[i])),
            _ => self
                .size_by_modify_age
                .and_then(|h| age.histogram_slot().map(|i| h[i])),
        }
    }
}

/// One subdirectory's breakdown under a base directory. `"."` denotes files
/// directly in the base directory itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdirRow {
    pub subdir_relative_path: String,
    pub num_files: u64,
    pub size_files: u64,
    pub last_modified: i64,
    pub per_type_size: Vec<(FileType, u64)>,
}

/// Per-bucket counts returned by `SummaryStore::info`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreInfo {
    pub group_usage_rows: u64,
    pub user_usage_rows: u64,
    pub history_keys: u64,
    pub history_samples: u64,
    pub group_subdir_keys: u64,
    pub group_subdirs: u64,
    pub user_subdir_keys: u64,
    pub user_subdirs: u64,
}
