//! Command handlers: the glue between parsed CLI args and the engine crate.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use log::info;

use crate::mount::{parse_descent_rules, MountTable};
use crate::namecache::NameCache;
use crate::owners::OwnersTable;
use crate::prefix_index::{ReaderSet, ScanIndex};
use crate::quotas::QuotaTable;
use crate::summary::create_database;
use crate::types::DescentConfig;
use crate::utils::config::SCAN_INSERT_BATCH_SIZE;

use super::arg_parser::{BuildSummaryArgs, IngestScanArgs};

/// Render a unix timestamp as an RFC3339 date for log output; an
/// out-of-range value falls back to the raw epoch seconds rather than
/// panicking.
fn format_epoch(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => format!("epoch {secs}"),
    }
}

fn open_input(path: Option<&std::path::Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening tuple stream {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_optional<T, F>(path: Option<&std::path::Path>, default: T, parse: F) -> Result<T>
where
    F: FnOnce(BufReader<File>) -> crate::error::Result<T>,
{
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening {}", p.display()))?;
            Ok(parse(BufReader::new(file))?)
        }
        None => Ok(default),
    }
}

pub fn handle_ingest_scan(args: &IngestScanArgs) -> Result<()> {
    let reader = open_input(args.input.as_deref())?;
    let batch_size = args.batch_size.unwrap_or(SCAN_INSERT_BATCH_SIZE);

    let records = crate::codec::parse_stream_to_vec(reader)?;
    let count = records.len();
    ScanIndex::create(&args.out, records.into_iter().map(Ok), batch_size)?;

    info!("ingested {count} directories into {}", args.out.display());
    Ok(())
}

pub fn handle_build_summary(args: &BuildSummaryArgs) -> Result<()> {
    let reader = ReaderSet::open(args.scans.iter().cloned())?;
    let (gids, uids) = reader.all_owners()?;
    let gids: Vec<u32> = gids.into_iter().collect();
    let uids: Vec<u32> = uids.into_iter().collect();

    let quotas = open_optional(args.quotas.as_deref(), QuotaTable::default(), QuotaTable::parse)?;
    let owners = open_optional(args.owners.as_deref(), OwnersTable::default(), OwnersTable::parse)?;
    let descent = open_optional(
        args.descent_rules.as_deref(),
        DescentConfig {
            rules: vec![],
            default: crate::types::DescentRule {
                prefix: String::new(),
                score: 0,
                splits: crate::utils::config::DEFAULT_DESCENT_SPLITS,
                min_dirs: crate::utils::config::DEFAULT_DESCENT_MIN_DIRS,
            },
        },
        parse_descent_rules,
    )?;
    let mounts = MountTable::new(&args.mounts);
    let names = NameCache::new();

    let scan_mtime = reader.latest_scan_mtime()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    info!(
        "building summary from scan dated {} ({} groups, {} users)",
        format_epoch(scan_mtime),
        gids.len(),
        uids.len()
    );

    let store = create_database(
        &reader, &descent, &quotas, &mounts, &owners, &names, &gids, &uids, scan_mtime, now, &args.out,
    )?;

    let info = store.info()?;
    info!(
        "built summary store at {}: {} group rows, {} user rows, {} history samples",
        args.out.display(),
        info.group_usage_rows,
        info.user_usage_rows,
        info.history_samples
    );
    Ok(())
}
