//! Permissive timestamp parsing for upstream records.
//!
//! Scrapers disagree on how they report publication time: epoch numbers,
//! ISO strings, RFC 2822, bare dates, or display text like "3 hours ago".
//! [`parse_date_any`] accepts all of them and returns `None` for anything
//! else. Defaulting is the caller's decision.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values below this are read as seconds rather than milliseconds.
const SECONDS_CUTOFF: f64 = 1e11;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d, %Y", "%d %b %Y"];

/// Object keys that wrap a date value (`{"$date": ...}` and friends).
const WRAPPER_KEYS: &[&str] = &["$date", "date", "iso"];

/// Relative units and their length in seconds.
const RELATIVE_UNITS: &[(&str, i64)] = &[
    ("second", 1),
    ("sec", 1),
    ("minute", 60),
    ("min", 60),
    ("hour", 3_600),
    ("hr", 3_600),
    ("day", 86_400),
    ("week", 604_800),
    ("month", 2_592_000),
    ("year", 31_536_000),
];

/// Parse anything date-like. `now` anchors relative text.
pub fn parse_date_any(value: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => from_epoch(n.as_f64()?),
        Value::String(s) => parse_date_str(s, now),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| parse_date_any(inner, now)),
        _ => None,
    }
}

pub fn parse_date_str(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(n) = s.parse::<f64>() {
        return from_epoch(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    parse_relative(s, now)
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n == 0.0 {
        return None;
    }
    let millis = if n.abs() < SECONDS_CUTOFF { n * 1000.0 } else { n };
    DateTime::from_timestamp_millis(millis as i64)
}

/// "3 hours ago", "Streamed 2 days ago", "an hour ago", "yesterday".
fn parse_relative(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = s.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    if words.iter().any(|w| *w == "yesterday") {
        return Some(now - Duration::days(1));
    }
    if lower.contains("just now") {
        return Some(now);
    }

    let ago = words.iter().position(|w| *w == "ago")?;
    if ago < 2 {
        return None;
    }
    let amount: i64 = match words[ago - 2] {
        "a" | "an" => 1,
        n => n.parse().ok()?,
    };
    let unit = words[ago - 1].trim_end_matches('s');
    let seconds = RELATIVE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, secs)| *secs)?;

    now.checked_sub_signed(Duration::try_seconds(amount.checked_mul(seconds)?)?)
}
