//! CLI surface: exactly two subcommands, `ingest-scan` and `build-summary`
//! (SPEC_FULL.md "Ambient stack" — no query/render subcommand, since
//! `spec.md`'s Non-goals exclude top-level command dispatch and formatted
//! text rendering as external adapters; this CLI only drives the two
//! write-side operations the engine crate itself owns).

pub mod arg_parser;
pub mod handlers;

pub use arg_parser::{BuildSummaryArgs, Cli, Commands, IngestScanArgs};
