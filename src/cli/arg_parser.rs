use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Disk-usage analytics engine: ingest scanned tuple streams into a prefix
/// index, then build an owner-indexed summary store over one or more scans.
#[derive(Clone, Parser)]
#[command(name = "dirsum")]
#[command(about = "Ingest scanned directory metadata and build owner usage summaries.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose (debug-level) logging. Default: false.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Parse a tuple stream and build a scan's prefix index (tuples.db + children.db).
    IngestScan(IngestScanArgs),
    /// Build an owner-indexed summary store from one or more open scans.
    BuildSummary(BuildSummaryArgs),
}

#[derive(Clone, Args)]
pub struct IngestScanArgs {
    /// Tuple stream file. Reads stdin when omitted.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output scan directory. Must not already hold a scan.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Directories written per transaction. Default: tuned for typical scans.
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[derive(Clone, Args)]
pub struct BuildSummaryArgs {
    /// A scan directory to read from. Repeat to merge several scans.
    #[arg(long = "scan", value_name = "DIR", required = true, num_args = 1..)]
    pub scans: Vec<PathBuf>,

    /// Quota CSV (`gid,disk_prefix,quota_bytes,quota_inodes`). Groups default to (0, 0).
    #[arg(long, value_name = "FILE")]
    pub quotas: Option<PathBuf>,

    /// Owner-name CSV (`gid,owner_name`).
    #[arg(long, value_name = "FILE")]
    pub owners: Option<PathBuf>,

    /// Base-directory descent-rule TSV (`prefix\tsplits\tmin_dirs`).
    #[arg(long = "descent-rules", value_name = "FILE")]
    pub descent_rules: Option<PathBuf>,

    /// A mount-point prefix used to key history samples. Repeat for several mounts.
    #[arg(long = "mount", value_name = "PREFIX", num_args = 1..)]
    pub mounts: Vec<String>,

    /// Output summary-store file. Must not already exist.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,
}
