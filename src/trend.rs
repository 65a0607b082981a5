//! C5: trend extrapolation. Given a chronological history of `(date, used,
//! quota)` samples, predict when `used` reaches `quota` (`spec.md` §4.5).

use crate::types::HistoryPoint;
use crate::utils::config::{TREND_IMMINENT_WINDOW_SECS, TREND_MAX_HORIZON_SECS, TREND_MIN_SAMPLES_FOR_RECENT_WINDOW};

/// Zero date ("never"/"no trend"), per `spec.md` §4.5.
pub const NEVER: i64 = 0;

/// Extrapolate the date at which `used` crosses `quota`, given a
/// chronologically ordered (ascending by `date_secs`) history.
pub fn extrapolate(history: &[HistoryPoint]) -> i64 {
    let Some(latest) = history.last() else {
        return NEVER;
    };
    if latest.used >= latest.quota {
        return latest.date_secs;
    }

    let oldest = if history.len() >= TREND_MIN_SAMPLES_FOR_RECENT_WINDOW {
        &history[history.len() - TREND_MIN_SAMPLES_FOR_RECENT_WINDOW]
    } else {
        &history[0]
    };

    if latest.date_secs == oldest.date_secs || latest.used <= oldest.used {
        return NEVER;
    }

    let dt = (latest.date_secs - oldest.date_secs) as f64;
    let du = (latest.used - oldest.used) as f64;
    let remaining = (latest.quota - latest.used.min(latest.quota)) as f64;
    let seconds_to_full = remaining * dt / du;
    let predicted = latest.date_secs + seconds_to_full.round() as i64;

    if predicted - latest.date_secs > TREND_MAX_HORIZON_SECS {
        return NEVER;
    }
    predicted
}

/// Whether `predicted` should populate `date_no_space`/`date_no_files`: only
/// when it falls within `TREND_IMMINENT_WINDOW_SECS` of `now` (`spec.md` §4.5).
pub fn is_imminent(predicted: i64, now: i64) -> bool {
    predicted != NEVER && (predicted - now).abs() <= TREND_IMMINENT_WINDOW_SECS
}
