//! Compact, deterministic binary encoding for tuple lists and child lists —
//! the value format stored in the prefix index's two embedded databases
//! (`spec.md` §4.1, §6). Decoding is a pure function of the bytes: no schema
//! or external state is consulted.

use std::path::{Path, PathBuf};

use super::varint::{read_bytes, read_ivarint, read_uvarint, write_bytes, write_ivarint, write_uvarint};
use crate::error::CoreError;
use crate::types::{AgeBucket, FileType, Tuple};

/// Encode an ordered tuple list: `[count][gid][uid][file_type][age_bucket][count][size][atime][mtime]...`.
pub fn encode_tuples(tuples: &[Tuple]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(tuples.len() * 16 + 4);
    write_uvarint(&mut buf, tuples.len() as u64);
    for t in tuples {
        write_uvarint(&mut buf, t.gid as u64);
        write_uvarint(&mut buf, t.uid as u64);
        buf.push(t.file_type.code());
        buf.push(t.age_bucket.code());
        write_uvarint(&mut buf, t.count);
        write_uvarint(&mut buf, t.size);
        write_ivarint(&mut buf, t.atime);
        write_ivarint(&mut buf, t.mtime);
    }
    buf
}

pub fn decode_tuples(bytes: &[u8]) -> Result<Vec<Tuple>, CoreError> {
    let mut pos = 0usize;
    let n = read_uvarint(bytes, &mut pos)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let gid = read_uvarint(bytes, &mut pos)? as u32;
        let uid = read_uvarint(bytes, &mut pos)? as u32;
        let ft_code = *bytes
            .get(pos)
            .ok_or_else(|| CoreError::Codec("truncated file_type".into()))?;
        pos += 1;
        let age_code = *bytes
            .get(pos)
            .ok_or_else(|| CoreError::Codec("truncated age_bucket".into()))?;
        pos += 1;
        let file_type = FileType::from_code(ft_code)
            .ok_or_else(|| CoreError::Codec(format!("unknown file_type code {ft_code}")))?;
        let age_bucket = AgeBucket::from_code(age_code)
            .ok_or_else(|| CoreError::Codec(format!("unknown age_bucket code {age_code}")))?;
        let count = read_uvarint(bytes, &mut pos)?;
        let size = read_uvarint(bytes, &mut pos)?;
        let atime = read_ivarint(bytes, &mut pos)?;
        let mtime = read_ivarint(bytes, &mut pos)?;
        out.push(Tuple {
            gid,
            uid,
            file_type,
            age_bucket,
            count,
            size,
            atime,
            mtime,
        });
    }
    Ok(out)
}

/// Encode a sorted, de-duplicated child-directory list.
pub fn encode_children(children: &[PathBuf]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_uvarint(&mut buf, children.len() as u64);
    for c in children {
        write_bytes(&mut buf, c.to_string_lossy().as_bytes());
    }
    buf
}

pub fn decode_children(bytes: &[u8]) -> Result<Vec<PathBuf>, CoreError> {
    let mut pos = 0usize;
    let n = read_uvarint(bytes, &mut pos)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let raw = read_bytes(bytes, &mut pos)?;
        let s = std::str::from_utf8(raw)
            .map_err(|e| CoreError::Codec(format!("non-utf8 child path: {e}")))?;
        out.push(PathBuf::from(s));
    }
    Ok(out)
}

/// Merge-insert `child` into an already-encoded, sorted child list without
/// producing duplicates. Returns the new encoding.
pub fn insert_child(existing: Option<&[u8]>, child: &Path) -> Result<Vec<u8>, CoreError> {
    let mut children = match existing {
        Some(b) => decode_children(b)?,
        None => Vec::new(),
    };
    if !children.iter().any(|c| c == child) {
        children.push(child.to_path_buf());
        children.sort();
    }
    Ok(encode_children(&children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgeBucket, FileType};

    fn sample_tuples() -> Vec<Tuple> {
        vec![
            Tuple {
                gid: 1,
                uid: 101,
                file_type: FileType::Bam,
                age_bucket: AgeBucket::All,
                count: 2,
                size: 21,
                atime: 50,
                mtime: 100,
            },
            Tuple {
                gid: 2,
                uid: 202,
                file_type: FileType::Cram,
                age_bucket: AgeBucket::A1Y,
                count: 1,
                size: 0,
                atime: -5,
                mtime: -1,
            },
        ]
    }

    #[test]
    fn tuple_round_trip() {
        let xs = sample_tuples();
        let bytes = encode_tuples(&xs);
        assert_eq!(decode_tuples(&bytes).unwrap(), xs);
    }

    #[test]
    fn empty_tuple_list_round_trip() {
        let bytes = encode_tuples(&[]);
        assert_eq!(decode_tuples(&bytes).unwrap(), Vec::<Tuple>::new());
    }

    #[test]
    fn child_list_round_trip() {
        let children = vec![PathBuf::from("/a/b"), PathBuf::from("/a/c")];
        let bytes = encode_children(&children);
        assert_eq!(decode_children(&bytes).unwrap(), children);
    }

    #[test]
    fn insert_child_deduplicates_and_sorts() {
        let bytes = encode_children(&[PathBuf::from("/a/z"), PathBuf::from("/a/b")]);
        let bytes = insert_child(Some(&bytes), Path::new("/a/m")).unwrap();
        let bytes = insert_child(Some(&bytes), Path::new("/a/b")).unwrap();
        let children = decode_children(&bytes).unwrap();
        assert_eq!(
            children,
            vec![
                PathBuf::from("/a/b"),
                PathBuf::from("/a/m"),
                PathBuf::from("/a/z"),
            ]
        );
    }

    #[test]
    fn corrupt_bytes_error_not_panic() {
        assert!(decode_tuples(&[0xff]).is_err());
        assert!(decode_children(&[0xff]).is_err());
    }
}
