//! Mount-point discovery (`spec.md` §6) and the descent-rule TSV parser
//! (`spec.md` §6, §3).

use std::io::BufRead;

use crate::error::CoreError;
use crate::types::{DescentConfig, DescentRule};
use crate::utils::config::{DEFAULT_DESCENT_MIN_DIRS, DEFAULT_DESCENT_SPLITS};

/// A caller-supplied list of mount-point prefixes, normalised to carry a
/// trailing `/` and sorted longest-first so `prefix_of` finds the most
/// specific match.
#[derive(Clone, Debug)]
pub struct MountTable {
    prefixes: Vec<String>,
}

impl MountTable {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .collect();
        prefixes.sort_by_key(|b| std::cmp::Reverse(b.len()));
        MountTable { prefixes }
    }

    /// The first (longest) matching mount-point prefix of `path`, or `None`.
    pub fn prefix_of(&self, path: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|p| path.starts_with(p.as_str()))
            .map(|p| p.as_str())
    }
}

fn normalize(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Parse a descent-rule TSV: `prefix TAB splits TAB min_dirs`, one rule per
/// line. Lines whose first column starts with `#` are comments. Malformed
/// numeric fields or a wrong column count is a `ParseError`.
pub fn parse_descent_rules<R: BufRead>(reader: R) -> Result<DescentConfig, CoreError> {
    let mut rules = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = (idx + 1) as u64;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if cols[0].starts_with('#') {
            continue;
        }
        if cols.len() != 3 {
            return Err(CoreError::parse(
                "descent-rules",
                Some(line_no),
                format!("expected 3 tab-separated columns, got {}", cols.len()),
            ));
        }
        let splits: u32 = cols[1]
            .parse()
            .map_err(|_| CoreError::parse("descent-rules", Some(line_no), "non-integer splits"))?;
        let min_dirs: u32 = cols[2].parse().map_err(|_| {
            CoreError::parse("descent-rules", Some(line_no), "non-integer min_dirs")
        })?;
        rules.push(DescentRule {
            prefix: cols[0].to_string(),
            score: cols[0].len() as i64,
            splits,
            min_dirs,
        });
    }
    Ok(DescentConfig {
        rules,
        default: DescentRule {
            prefix: String::new(),
            score: 0,
            splits: DEFAULT_DESCENT_SPLITS,
            min_dirs: DEFAULT_DESCENT_MIN_DIRS,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prefix_of_picks_longest_match() {
        let table = MountTable::new(["/lustre", "/lustre/scratch"]);
        assert_eq!(table.prefix_of("/lustre/scratch/x"), Some("/lustre/scratch/"));
        assert_eq!(table.prefix_of("/lustre/other"), Some("/lustre/"));
        assert_eq!(table.prefix_of("/nfs/home"), None);
    }

    #[test]
    fn parses_rules_skipping_comments_and_blanks() {
        let input = "# comment\n/lustre/s1\t4\t4\n\n/lustre/s2\t2\t1\n";
        let cfg = parse_descent_rules(Cursor::new(input)).unwrap();
        assert_eq!(cfg.rules.len(), 2);
        assert_eq!(cfg.rules[0].prefix, "/lustre/s1");
        assert_eq!(cfg.rules[0].splits, 4);
        assert_eq!(cfg.rules[1].min_dirs, 1);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let input = "/lustre/s1\t4\n";
        let err = parse_descent_rules(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn rejects_non_integer_field() {
        let input = "/lustre/s1\tfour\t4\n";
        let err = parse_descent_rules(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
