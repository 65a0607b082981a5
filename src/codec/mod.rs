//! C1: the tuple codec. Line-format parsing/emission (`tuple`), streaming
//! grouping by directory (`stream`), and the compact binary encoding used to
//! persist tuple lists and child lists in the prefix index (`binary`).

pub mod binary;
pub mod stream;
pub mod tuple;
mod varint;

pub use stream::{parse_stream, parse_stream_to_vec};
pub use tuple::{decode_dir_b64, encode_dir_b64, format_line, parse_line};
