//! Core Data epoch conversion.
//!
//! The source store timestamps everything in seconds since
//! 2001-01-01T00:00:00Z. Everything downstream of the storage reader works
//! in ordinary 1970-epoch Unix time.

use chrono::{DateTime, Utc};

/// Seconds between 1970-01-01 and 2001-01-01.
pub const CORE_DATA_EPOCH_OFFSET: i64 = 978_307_200;

/// Convert a Core Data timestamp (seconds since 2001-01-01T00:00:00Z) to a
/// 1970-epoch `DateTime<Utc>`. Out-of-range inputs clamp to the Unix epoch
/// rather than panicking, since a corrupt or absent timestamp should not
/// take down an otherwise-readable row.
pub fn core_data_to_unix(core_data_ts: f64) -> DateTime<Utc> {
    let unix_ts = (core_data_ts as i64).saturating_add(CORE_DATA_EPOCH_OFFSET);
    DateTime::from_timestamp(unix_ts, 0).unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
}
