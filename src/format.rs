//! Wire and storage formatting helpers
//!
//! Decimal aggregates keep full precision in memory and are rounded to
//! six fraction digits only when serialized. Timestamps are stored as
//! UTC text with second precision so SQLite `date()` can bucket them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serializer;

/// Fraction digits kept for decimal fields on the wire
pub const DECIMAL_DIGITS: i32 = 6;

const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Round half away from zero to `DECIMAL_DIGITS` fraction digits
pub fn round_decimal(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMAL_DIGITS);
    (value * scale).round() / scale
}

/// `serialize_with` adapter for decimal fields
pub fn serialize_decimal<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_decimal(*value))
}

pub fn to_sql_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(SQL_TIMESTAMP_FORMAT).to_string()
}

pub fn from_sql_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, SQL_TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}
