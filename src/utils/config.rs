//! Tuning constants for ingestion, the summary build, and the trend
//! extrapolator, in one place.

// ---- Ingestion / prefix index ----

/// Directories written per transaction during `ScanIndex::create`
/// (`spec.md` §4.2). Balances transaction overhead against how much work is
/// lost if ingestion aborts mid-scan.
pub const SCAN_INSERT_BATCH_SIZE: usize = 1000;

// ---- Summary build ----

/// Batch size for summary-store writes during `create_database`
/// (`spec.md` §4.4).
pub const SUMMARY_INSERT_BATCH_SIZE: usize = 500;

/// Default base-directory descent rule applied when no configured rule's
/// prefix matches a candidate path (`spec.md` §3).
pub const DEFAULT_DESCENT_SPLITS: u32 = 4;
pub const DEFAULT_DESCENT_MIN_DIRS: u32 = 4;

// ---- Trend extrapolator ----

/// A predicted exhaustion date further than this from the latest sample is
/// reported as "never" (`spec.md` §4.5).
pub const TREND_MAX_HORIZON_SECS: i64 = 5 * 365 * 24 * 60 * 60;

/// `date_no_space` / `date_no_files` are only populated when the
/// extrapolated date falls within this many seconds of "now" (`spec.md` §4.5).
pub const TREND_IMMINENT_WINDOW_SECS: i64 = 3 * 24 * 60 * 60;

/// Number of trailing samples, beyond which the "oldest" sample used for
/// extrapolation is the third-from-last rather than the very first
/// (`spec.md` §4.5).
pub const TREND_MIN_SAMPLES_FOR_RECENT_WINDOW: usize = 3;

// ---- History idempotence ----

/// History samples are de-duplicated to this granularity: two samples whose
/// dates fall in the same minute are treated as the same sample
/// (`spec.md` §3, "Lifecycles").
pub const HISTORY_DEDUP_GRANULARITY_SECS: i64 = 60;
