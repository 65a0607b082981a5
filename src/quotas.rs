//! Quota CSV parsing and `(gid, path)` lookup (`spec.md` §6, §4.4).

use std::io::BufRead;

use crate::error::CoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
struct QuotaEntry {
    gid: u32,
    disk_prefix: String,
    quota_bytes: u64,
    quota_inodes: u64,
}

/// All quota entries, keyed loosely by gid; `get` scans and picks the
/// longest matching `disk_prefix` the caller's convention requires (first
/// match wins, per file order, not longest-prefix — see `spec.md` §6).
#[derive(Clone, Debug, Default)]
pub struct QuotaTable {
    entries: Vec<QuotaEntry>,
}

impl QuotaTable {
    /// Parse `gid,disk_prefix,quota_bytes,quota_inodes` lines; exactly four
    /// columns; non-integer gid/bytes/inodes is a `ParseError`.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, CoreError> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line_no = (idx + 1) as u64;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split(',').collect();
            if cols.len() != 4 {
                return Err(CoreError::parse(
                    "quota CSV",
                    Some(line_no),
                    format!("expected 4 comma-separated columns, got {}", cols.len()),
                ));
            }
            let gid: u32 = cols[0]
                .parse()
                .map_err(|_| CoreError::parse("quota CSV", Some(line_no), "non-integer gid"))?;
            let quota_bytes: u64 = cols[2]
                .parse()
                .map_err(|_| CoreError::parse("quota CSV", Some(line_no), "non-integer quota_bytes"))?;
            let quota_inodes: u64 = cols[3]
                .parse()
                .map_err(|_| CoreError::parse("quota CSV", Some(line_no), "non-integer quota_inodes"))?;
            entries.push(QuotaEntry {
                gid,
                disk_prefix: cols[1].to_string(),
                quota_bytes,
                quota_inodes,
            });
        }
        Ok(QuotaTable { entries })
    }

    /// `(quota_bytes, quota_inodes)` for the first entry of `gid` whose
    /// `disk_prefix` is a prefix of `path`; `(0, 0)` if none match
    /// (`spec.md` §6).
    pub fn get(&self, gid: u32, path: &str) -> (u64, u64) {
        self.entries
            .iter()
            .find(|e| e.gid == gid && path.starts_with(e.disk_prefix.as_str()))
            .map(|e| (e.quota_bytes, e.quota_inodes))
            .unwrap_or((0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn s3_quota_match_and_miss() {
        let table = QuotaTable::parse(Cursor::new("1,/lustre/s125,4000000000,20\n")).unwrap();
        assert_eq!(table.get(1, "/lustre/s125/p/A"), (4_000_000_000, 20));
        assert_eq!(table.get(1, "/other"), (0, 0));
    }

    #[test]
    fn rejects_wrong_column_count() {
        let err = QuotaTable::parse(Cursor::new("1,/lustre,100\n")).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn rejects_non_integer_gid() {
        let err = QuotaTable::parse(Cursor::new("x,/lustre,100,10\n")).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
