//! Snowflake value decoding.
//!
//! Rowset cells arrive as strings (or null) regardless of column type. This
//! module turns them into typed JSON values using the column's `rowtype` entry.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies the Snowflake wire type
//! 2. Category-specific decoders parse the cell text
//!
//! A cell that fails to parse is kept as its original string rather than
//! dropped, so no value is ever lost.

use crate::db::client::RowType;
use crate::models::{ColumnMetadata, Row};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

/// Offset encoding used by TIMESTAMP_TZ: minutes + 1440.
const TZ_OFFSET_BIAS_MINUTES: i64 = 1440;
const NANOS_PER_SEC: i128 = 1_000_000_000;

// =============================================================================
// Type Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Decimal,
    Float,
    Boolean,
    Text,
    SemiStructured,
    Date,
    Time,
    TimestampNtz,
    TimestampLtz,
    TimestampTz,
    Binary,
    Unknown,
}

/// Classify a Snowflake wire type.
pub fn categorize_type(type_name: &str, scale: Option<i64>) -> TypeCategory {
    match type_name.to_lowercase().as_str() {
        "fixed" if scale.unwrap_or(0) == 0 => TypeCategory::Integer,
        "fixed" => TypeCategory::Decimal,
        "real" => TypeCategory::Float,
        "boolean" => TypeCategory::Boolean,
        "text" => TypeCategory::Text,
        "variant" | "object" | "array" => TypeCategory::SemiStructured,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "timestamp_ntz" => TypeCategory::TimestampNtz,
        "timestamp_ltz" => TypeCategory::TimestampLtz,
        "timestamp_tz" => TypeCategory::TimestampTz,
        "binary" => TypeCategory::Binary,
        _ => TypeCategory::Unknown,
    }
}

impl From<&RowType> for ColumnMetadata {
    fn from(rt: &RowType) -> Self {
        ColumnMetadata {
            name: rt.name.clone(),
            type_name: rt.type_name.clone(),
            nullable: rt.nullable,
            scale: rt.scale,
            precision: rt.precision,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one cell.
pub fn decode_value(rowtype: &RowType, cell: JsonValue) -> JsonValue {
    let text = match cell {
        JsonValue::String(s) => s,
        // Null, or a value some endpoint already typed
        other => return other,
    };

    let decoded = match categorize_type(&rowtype.type_name, rowtype.scale) {
        TypeCategory::Integer => text.parse::<i64>().ok().map(JsonValue::from),
        TypeCategory::Float => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number),
        TypeCategory::Boolean => match text.to_lowercase().as_str() {
            "1" | "true" => Some(JsonValue::Bool(true)),
            "0" | "false" => Some(JsonValue::Bool(false)),
            _ => None,
        },
        TypeCategory::SemiStructured => serde_json::from_str(&text).ok(),
        TypeCategory::Date => decode_date(&text),
        TypeCategory::Time => decode_time(&text),
        TypeCategory::TimestampNtz => decode_timestamp(&text).map(|dt| {
            JsonValue::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        TypeCategory::TimestampLtz => decode_timestamp(&text)
            .map(|dt| JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        TypeCategory::TimestampTz => decode_timestamp_tz(&text),
        // Decimals stay strings to keep precision; binary is already hex
        TypeCategory::Decimal
        | TypeCategory::Text
        | TypeCategory::Binary
        | TypeCategory::Unknown => None,
    };

    decoded.unwrap_or(JsonValue::String(text))
}

/// Decode one row into a column-ordered map.
pub fn decode_row(rowtype: &[RowType], cells: Vec<JsonValue>) -> Row {
    let mut row = Row::with_capacity(rowtype.len());
    let mut cells = cells.into_iter();
    for rt in rowtype {
        let cell = cells.next().unwrap_or(JsonValue::Null);
        row.insert(rt.name.clone(), decode_value(rt, cell));
    }
    row
}

/// Parse "<seconds>[.<fraction>]" into (seconds, nanoseconds), flooring negatives.
fn split_epoch(text: &str) -> Option<(i64, u32)> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if frac_part.len() > 9 || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let secs: i128 = int_part.parse().ok()?;
    let frac: i128 = if frac_part.is_empty() {
        0
    } else {
        format!("{:0<9}", frac_part).parse().ok()?
    };

    let mut total = secs * NANOS_PER_SEC + frac;
    if negative {
        total = -total;
    }

    let secs = i64::try_from(total.div_euclid(NANOS_PER_SEC)).ok()?;
    let nanos = u32::try_from(total.rem_euclid(NANOS_PER_SEC)).ok()?;
    Some((secs, nanos))
}

fn decode_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let (secs, nanos) = split_epoch(text)?;
    DateTime::from_timestamp(secs, nanos)
}

fn decode_timestamp_tz(text: &str) -> Option<JsonValue> {
    let (epoch, offset) = text.trim().split_once(' ')?;
    let utc = decode_timestamp(epoch)?;
    let offset_minutes = offset.parse::<i64>().ok()? - TZ_OFFSET_BIAS_MINUTES;
    let offset = FixedOffset::east_opt(i32::try_from(offset_minutes * 60).ok()?)?;
    Some(JsonValue::String(
        utc.with_timezone(&offset)
            .to_rfc3339_opts(SecondsFormat::AutoSi, false),
    ))
}

fn decode_date(text: &str) -> Option<JsonValue> {
    let days: i64 = text.trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(1970, 1, 1)?
        .checked_add_signed(chrono::Duration::try_days(days)?)?;
    Some(JsonValue::String(date.format("%Y-%m-%d").to_string()))
}

fn decode_time(text: &str) -> Option<JsonValue> {
    let (secs, nanos) = split_epoch(text)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(secs).ok()?, nanos)?;
    Some(JsonValue::String(time.format("%H:%M:%S%.f").to_string()))
}
