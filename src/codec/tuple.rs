//! Parsing and emitting the line-oriented tuple format (`spec.md` §4.1, §6).
//!
//! One line per tuple:
//! `<dir_b64>\t<gid>\t<uid>\t<file_type>\t<age_bucket>\t<count>\t<size>\t<atime>\t<mtime>`
//!
//! `dir_b64` is URL-safe base64 (padding accepted or absent) so tabs and
//! newlines embedded in a path survive transport. `file_type` and
//! `age_bucket` are the enums' stable numeric codes, decimal ASCII.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::types::{AgeBucket, FileType, Tuple};

const FIELD_COUNT: usize = 9;

fn parse_error(line_no: u64, detail: impl Into<String>) -> CoreError {
    CoreError::parse("tuple stream", Some(line_no), detail)
}

/// Decode a base64 directory path, accepting padded or unpadded URL-safe input.
pub fn decode_dir_b64(field: &str, line_no: u64) -> Result<PathBuf, CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(field.trim_end_matches('='))
        .map_err(|e| parse_error(line_no, format!("invalid base64 directory: {e}")))?;
    let s = String::from_utf8(bytes)
        .map_err(|e| parse_error(line_no, format!("directory is not valid utf-8: {e}")))?;
    Ok(PathBuf::from(s))
}

pub fn encode_dir_b64(dir: &std::path::Path) -> String {
    URL_SAFE_NO_PAD.encode(dir.to_string_lossy().as_bytes())
}

/// Parse one non-blank line into `(dir, Tuple)`. Blank lines must be filtered
/// out by the caller before calling this (see `stream::parse_stream`).
pub fn parse_line(line: &str, line_no: u64) -> Result<(PathBuf, Tuple), CoreError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(parse_error(
            line_no,
            format!("expected {FIELD_COUNT} tab-separated fields, found {}", fields.len()),
        ));
    }

    let dir = decode_dir_b64(fields[0], line_no)?;

    let parse_u32 = |s: &str, name: &str| -> Result<u32, CoreError> {
        s.parse::<u32>()
            .map_err(|_| parse_error(line_no, format!("invalid {name}: {s:?}")))
    };
    let parse_u64 = |s: &str, name: &str| -> Result<u64, CoreError> {
        s.parse::<u64>()
            .map_err(|_| parse_error(line_no, format!("invalid {name}: {s:?}")))
    };
    let parse_i64 = |s: &str, name: &str| -> Result<i64, CoreError> {
        s.parse::<i64>()
            .map_err(|_| parse_error(line_no, format!("invalid {name}: {s:?}")))
    };

    let gid = parse_u32(fields[1], "gid")?;
    let uid = parse_u32(fields[2], "uid")?;

    let ft_code: u8 = fields[3]
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid file_type code: {:?}", fields[3])))?;
    let file_type = FileType::from_code(ft_code)
        .ok_or_else(|| parse_error(line_no, format!("unknown file_type code: {ft_code}")))?;

    let age_code: u8 = fields[4]
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid age_bucket code: {:?}", fields[4])))?;
    let age_bucket = AgeBucket::from_code(age_code)
        .ok_or_else(|| parse_error(line_no, format!("unknown age_bucket code: {age_code}")))?;

    let count = parse_u64(fields[5], "count")?;
    if count == 0 {
        return Err(parse_error(line_no, "count must be non-zero"));
    }
    let size = parse_u64(fields[6], "size")?;
    let atime = parse_i64(fields[7], "atime")?;
    let mtime = parse_i64(fields[8], "mtime")?;

    Ok((
        dir,
        Tuple {
            gid,
            uid,
            file_type,
            age_bucket,
            count,
            size,
            atime,
            mtime,
        },
    ))
}

/// Emit one tuple as a line (without trailing newline).
pub fn format_line(dir: &std::path::Path, t: &Tuple) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        encode_dir_b64(dir),
        t.gid,
        t.uid,
        t.file_type.code(),
        t.age_bucket.code(),
        t.count,
        t.size,
        t.atime,
        t.mtime,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_round_trip() {
        let dir = PathBuf::from("/lustre/p/A");
        let t = Tuple {
            gid: 1,
            uid: 101,
            file_type: FileType::Bam,
            age_bucket: AgeBucket::All,
            count: 2,
            size: 21,
            atime: 50,
            mtime: 100,
        };
        let line = format_line(&dir, &t);
        let (parsed_dir, parsed_t) = parse_line(&line, 1).unwrap();
        assert_eq!(parsed_dir, dir);
        assert_eq!(parsed_t, t);
    }

    #[test]
    fn rejects_zero_count() {
        let dir = PathBuf::from("/a");
        let mut t = Tuple {
            gid: 1,
            uid: 1,
            file_type: FileType::Other,
            age_bucket: AgeBucket::All,
            count: 1,
            size: 0,
            atime: 0,
            mtime: 0,
        };
        t.count = 0;
        let line = format_line(&dir, &t);
        assert!(parse_line(&line, 1).is_err());
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_line("a\tb\tc", 1).is_err());
    }

    #[test]
    fn rejects_unknown_file_type_code() {
        let line = format!("{}\t1\t1\t250\t0\t1\t1\t0\t0", encode_dir_b64(std::path::Path::new("/x")));
        assert!(parse_line(&line, 1).is_err());
    }

    #[test]
    fn accepts_padded_base64() {
        let dir = PathBuf::from("/a/b");
        let padded = base64::engine::general_purpose::URL_SAFE.encode(dir.to_string_lossy().as_bytes());
        let line = format!("{padded}\t1\t1\t0\t0\t1\t1\t0\t0");
        let (parsed, _) = parse_line(&line, 1).unwrap();
        assert_eq!(parsed, dir);
    }
}
