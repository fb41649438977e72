//! Calendar date normalization.
//!
//! Dates reach the server as plain strings in several layouts, as epoch
//! milliseconds, as compact `YYYYMMDD` numbers, as `{year, month, day}` objects, or wrapped inside a
//! `{value: ...}` / `{date: ...}` envelope. Every shape is classified into a
//! [`DateInput`] first and then matched explicitly; anything that does not fit
//! is reported instead of guessed.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};
use std::ops::RangeInclusive;
use thiserror::Error;

const CANONICAL_FORMAT: &str = "%Y-%m-%d";
const MAX_NESTING: usize = 4;

/// Eight-digit numbers are calendar dates, not milliseconds after the epoch.
const COMPACT_RANGE: RangeInclusive<i64> = 10_000_000..=99_999_999;

const SEPARATED_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y-%m-%dZ"];
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("unrecognized date value")]
    Unrecognized,
    #[error("'{0}' is not a valid calendar date")]
    InvalidDate(String),
    #[error("date value is nested too deeply")]
    TooDeep,
}

/// The shapes a raw date value can take.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput<'a> {
    PlainString(&'a str),
    /// Milliseconds since the Unix epoch.
    EpochLike(i64),
    /// An eight-digit number read as `YYYYMMDD`.
    CompactYmd(i64),
    StructuredYmd {
        year: &'a Value,
        month: &'a Value,
        day: &'a Value,
    },
    Nested(&'a Value),
    Unrecognized,
}

impl<'a> DateInput<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => DateInput::PlainString(s.trim()),
            Value::Number(n) => match whole_number(n) {
                Some(digits) if COMPACT_RANGE.contains(&digits) => DateInput::CompactYmd(digits),
                Some(millis) => DateInput::EpochLike(millis),
                None => DateInput::Unrecognized,
            },
            Value::Object(map) => Self::classify_object(map),
            _ => DateInput::Unrecognized,
        }
    }

    fn classify_object(map: &'a Map<String, Value>) -> Self {
        if let (Some(year), Some(month), Some(day)) =
            (map.get("year"), map.get("month"), map.get("day"))
        {
            return DateInput::StructuredYmd { year, month, day };
        }
        match map.get("value").or_else(|| map.get("date")) {
            Some(inner) => DateInput::Nested(inner),
            None => DateInput::Unrecognized,
        }
    }
}

fn whole_number(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Normalizes any supported date shape to a calendar date.
pub fn normalize_date(value: &Value) -> Result<NaiveDate, DateError> {
    normalize_at_depth(value, 0)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

fn normalize_at_depth(value: &Value, depth: usize) -> Result<NaiveDate, DateError> {
    match DateInput::classify(value) {
        DateInput::PlainString(s) => parse_date_string(s),
        DateInput::EpochLike(millis) => DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DateError::InvalidDate(millis.to_string())),
        DateInput::CompactYmd(digits) => parse_date_string(&digits.to_string()),
        DateInput::StructuredYmd { year, month, day } => from_components(year, month, day),
        DateInput::Nested(inner) => {
            if depth >= MAX_NESTING {
                return Err(DateError::TooDeep);
            }
            normalize_at_depth(inner, depth + 1)
        }
        DateInput::Unrecognized => Err(DateError::Unrecognized),
    }
}

fn parse_date_string(s: &str) -> Result<NaiveDate, DateError> {
    if s.is_empty() {
        return Err(DateError::Unrecognized);
    }
    let all_digits = s.bytes().all(|b| b.is_ascii_digit());

    if s.len() == 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-' {
        return NaiveDate::parse_from_str(s, CANONICAL_FORMAT)
            .map_err(|_| DateError::InvalidDate(s.to_string()));
    }
    if all_digits {
        if s.len() != 8 {
            return Err(DateError::Unrecognized);
        }
        return NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|_| DateError::InvalidDate(s.to_string()));
    }

    // Timestamps keep the calendar date written in the string, whatever its offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(dt.date_naive());
        }
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.date());
        }
    }
    for format in SEPARATED_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    Err(DateError::Unrecognized)
}

fn component(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn from_components(year: &Value, month: &Value, day: &Value) -> Result<NaiveDate, DateError> {
    let (Some(y), Some(m), Some(d)) = (component(year), component(month), component(day)) else {
        return Err(DateError::Unrecognized);
    };
    let invalid = || DateError::InvalidDate(format!("{}-{}-{}", y, m, d));
    let year = i32::try_from(y).map_err(|_| invalid())?;
    let month = u32::try_from(m).map_err(|_| invalid())?;
    let day = u32::try_from(d).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(value: Value) -> String {
        format_date(&normalize_date(&value).unwrap())
    }

    #[test]
    fn equivalent_shapes_agree() {
        assert_eq!(canonical(json!("2024-01-15")), "2024-01-15");
        assert_eq!(canonical(json!("20240115")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15T00:00:00Z")), "2024-01-15");
        assert_eq!(canonical(json!({"year": 2024, "month": 1, "day": 15})), "2024-01-15");
    }

    #[test]
    fn timestamp_keeps_written_date() {
        assert_eq!(canonical(json!("2024-01-15T23:30:00+09:00")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15 08:12:00")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15T08:12:00.250")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15T23:00:00.000+0900")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15 23:00:00-0500")), "2024-01-15");
        assert_eq!(canonical(json!("2024-01-15Z")), "2024-01-15");
    }

    #[test]
    fn separated_layouts() {
        assert_eq!(canonical(json!("2024/01/15")), "2024-01-15");
        assert_eq!(canonical(json!("2024.01.15")), "2024-01-15");
        assert_eq!(canonical(json!("2024-1-5")), "2024-01-05");
        assert_eq!(canonical(json!("2024-01-5")), "2024-01-05");
        assert_eq!(canonical(json!("2024/1/5")), "2024-01-05");
    }

    #[test]
    fn structured_components_may_be_strings() {
        assert_eq!(
            canonical(json!({"year": "1990", "month": "3", "day": "7"})),
            "1990-03-07"
        );
    }

    #[test]
    fn nested_envelopes_are_unwrapped() {
        assert_eq!(canonical(json!({"value": "20240115"})), "2024-01-15");
        assert_eq!(
            canonical(json!({"date": {"value": {"year": 2024, "month": 1, "day": 15}}})),
            "2024-01-15"
        );
    }

    #[test]
    fn epoch_millis_are_utc_dates() {
        // 2024-01-15T00:00:00Z
        assert_eq!(canonical(json!(1705276800000i64)), "2024-01-15");
        assert_eq!(canonical(json!(0)), "1970-01-01");
    }

    #[test]
    fn eight_digit_numbers_are_compact_dates() {
        assert_eq!(canonical(json!(20240115)), "2024-01-15");
        assert_eq!(canonical(json!(19850315.0)), "1985-03-15");
        assert_eq!(
            normalize_date(&json!(20241301)),
            Err(DateError::InvalidDate("20241301".to_string()))
        );
        assert_eq!(DateInput::classify(&json!(20240115)), DateInput::CompactYmd(20240115));
    }

    #[test]
    fn impossible_dates_are_invalid() {
        assert_eq!(
            normalize_date(&json!("2024-02-30")),
            Err(DateError::InvalidDate("2024-02-30".to_string()))
        );
        assert!(matches!(
            normalize_date(&json!("20241301")),
            Err(DateError::InvalidDate(_))
        ));
        assert!(matches!(
            normalize_date(&json!({"year": 2024, "month": 13, "day": 1})),
            Err(DateError::InvalidDate(_))
        ));
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        for value in [
            json!("yesterday"),
            json!("2024011"),
            json!(""),
            json!(true),
            json!([2024, 1, 15]),
            json!({"when": "2024-01-15"}),
            json!({"year": 2024, "month": "Jan", "day": 15}),
            json!(1.5),
        ] {
            assert_eq!(normalize_date(&value), Err(DateError::Unrecognized), "{}", value);
        }
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let value = json!({"value": {"value": {"value": {"value": {"value": "2024-01-15"}}}}});
        assert_eq!(normalize_date(&value), Err(DateError::TooDeep));
    }

    #[test]
    fn classify_reports_shape() {
        assert_eq!(
            DateInput::classify(&json!(" 2024-01-15 ")),
            DateInput::PlainString("2024-01-15")
        );
        assert_eq!(DateInput::classify(&json!(0)), DateInput::EpochLike(0));
        assert_eq!(DateInput::classify(&json!(null)), DateInput::Unrecognized);
    }
}
