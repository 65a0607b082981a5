//! Owners CSV parsing (`spec.md` §6): `gid,owner_name` lines, exactly two
//! columns per line.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::CoreError;

#[derive(Clone, Debug, Default)]
pub struct OwnersTable {
    names: HashMap<u32, String>,
}

impl OwnersTable {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, CoreError> {
        let mut names = HashMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line_no = (idx + 1) as u64;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split(',').collect();
            if cols.len() != 2 {
                return Err(CoreError::parse(
                    "owners CSV",
                    Some(line_no),
                    format!("expected 2 comma-separated columns, got {}", cols.len()),
                ));
            }
            let gid: u32 = cols[0]
                .parse()
                .map_err(|_| CoreError::parse("owners CSV", Some(line_no), "non-integer gid"))?;
            names.insert(gid, cols[1].to_string());
        }
        Ok(OwnersTable { names })
    }

    pub fn get(&self, gid: u32) -> Option<&str> {
        self.names.get(&gid).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_owner_names() {
        let table = OwnersTable::parse(Cursor::new("1,alice\n2,bob\n")).unwrap();
        assert_eq!(table.get(1), Some("alice"));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn rejects_malformed_row() {
        let err = OwnersTable::parse(Cursor::new("1,alice,extra\n")).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
