//! Streaming line-oriented parse: groups *consecutive* equal-directory lines
//! into one `(dir, [tuple])` record and emits each record to a callback as
//! soon as it closes.
//!
//! The tuple stream is assumed sorted so equal directories are contiguous
//! (`spec.md` §3, §9). This parser does not verify that assumption: if the
//! same directory reappears later, non-contiguously, it is emitted as a
//! *second*, independent record rather than merged with the first — callers
//! that write records into the prefix index (see `prefix_index::scan`) are
//! the ones who decide what happens when a key is written twice (last write
//! wins; see the §9 design note this crate resolves that way).

use std::io::BufRead;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::types::{DirRecord, Tuple};

use super::tuple::parse_line;

/// Parse `reader` line by line, invoking `on_record` once per contiguous run
/// of equal-directory lines. Blank lines are skipped. Any other malformed
/// line aborts with a `CoreError::Parse`.
pub fn parse_stream<R, F>(reader: R, mut on_record: F) -> Result<(), CoreError>
where
    R: BufRead,
    F: FnMut(DirRecord) -> Result<(), CoreError>,
{
    let mut current: Option<(PathBuf, Vec<Tuple>)> = None;
    let mut line_no: u64 = 0;

    for line_result in reader.lines() {
        line_no += 1;
        let line = line_result.map_err(CoreError::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        let (dir, tuple) = parse_line(&line, line_no)?;

        match current.as_mut() {
            Some((cur_dir, tuples)) if *cur_dir == dir => {
                tuples.push(tuple);
            }
            _ => {
                if let Some((dir, tuples)) = current.take() {
                    on_record(DirRecord { dir, tuples })?;
                }
                current = Some((dir, vec![tuple]));
            }
        }
    }

    if let Some((dir, tuples)) = current.take() {
        on_record(DirRecord { dir, tuples })?;
    }

    Ok(())
}

/// Convenience wrapper: parse the whole stream into a `Vec<DirRecord>`.
pub fn parse_stream_to_vec<R: BufRead>(reader: R) -> Result<Vec<DirRecord>, CoreError> {
    let mut out = Vec::new();
    parse_stream(reader, |rec| {
        out.push(rec);
        Ok(())
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tuple::format_line;
    use crate::types::{AgeBucket, FileType};
    use std::io::Cursor;

    fn tuple(gid: u32) -> Tuple {
        Tuple {
            gid,
            uid: 1,
            file_type: FileType::Bam,
            age_bucket: AgeBucket::All,
            count: 1,
            size: 10,
            atime: 1,
            mtime: 2,
        }
    }

    #[test]
    fn groups_contiguous_lines() {
        let a = PathBuf::from("/a");
        let b = PathBuf::from("/b");
        let mut body = String::new();
        body.push_str(&format_line(&a, &tuple(1)));
        body.push('\n');
        body.push_str(&format_line(&a, &tuple(2)));
        body.push('\n');
        body.push_str(&format_line(&b, &tuple(3)));
        body.push('\n');

        let records = parse_stream_to_vec(Cursor::new(body)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dir, a);
        assert_eq!(records[0].tuples.len(), 2);
        assert_eq!(records[1].dir, b);
        assert_eq!(records[1].tuples.len(), 1);
    }

    #[test]
    fn skips_blank_lines() {
        let a = PathBuf::from("/a");
        let body = format!("\n{}\n\n", format_line(&a, &tuple(1)));
        let records = parse_stream_to_vec(Cursor::new(body)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn non_contiguous_duplicate_dir_becomes_separate_record() {
        let a = PathBuf::from("/a");
        let b = PathBuf::from("/b");
        let mut body = String::new();
        body.push_str(&format_line(&a, &tuple(1)));
        body.push('\n');
        body.push_str(&format_line(&b, &tuple(2)));
        body.push('\n');
        body.push_str(&format_line(&a, &tuple(3)));
        body.push('\n');

        let records = parse_stream_to_vec(Cursor::new(body)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].dir, a);
        assert_eq!(records[2].dir, a);
        assert_eq!(records[0].tuples.len(), 1);
        assert_eq!(records[2].tuples.len(), 1);
    }

    #[test]
    fn malformed_line_aborts() {
        let body = "not-a-valid-tuple-line\n".to_string();
        let err = parse_stream_to_vec(Cursor::new(body)).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
