//! dirsum CLI: ingest scanned directory metadata and build owner usage summaries.

use anyhow::Result;
use clap::Parser;
use dirsum::cli::handlers::{handle_build_summary, handle_ingest_scan};
use dirsum::cli::{Cli, Commands};
use dirsum::utils::setup_logging;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::IngestScan(args) => handle_ingest_scan(args)?,
        Commands::BuildSummary(args) => handle_build_summary(args)?,
    }

    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
