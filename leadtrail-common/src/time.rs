//! Timestamp utilities
//!
//! All persisted timestamps are INTEGER unix milliseconds in UTC.

use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a timestamp to its stored representation (unix milliseconds)
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert stored unix milliseconds back to a timestamp
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::Internal(format!("Timestamp out of range: {}", millis)))
}

/// UTC day number (days since the unix epoch) containing `ts`
pub fn day_bucket(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis().div_euclid(MILLIS_PER_DAY)
}
