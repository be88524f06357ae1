use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates::parse_date_any;
use crate::fields::{first_number, first_present, first_string};

/// Aliased source keys per canonical field, highest priority first.
pub const URL_FIELDS: &[&str] = &["url", "videoUrl"];
pub const ID_FIELDS: &[&str] = &["id"];
pub const TITLE_FIELDS: &[&str] = &["title", "videoTitle"];
pub const CHANNEL_FIELDS: &[&str] = &["channelName", "channel", "author"];
pub const VIEW_FIELDS: &[&str] = &["viewCount", "views"];
pub const LIKE_FIELDS: &[&str] = &["likes", "likeCount"];
pub const COMMENT_FIELDS: &[&str] = &["commentCount", "comments"];
pub const PUBLISHED_FIELDS: &[&str] = &["date", "publishedAt", "uploadDate", "time", "publishedAtText"];

/// URL synthesized from a bare video id.
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Floor for record age so per-hour rates stay bounded.
pub const MIN_AGE_HOURS: f64 = 1.0;

/// One upstream record mapped onto typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub url: String,
    pub title: String,
    pub channel: String,
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
    pub published_at: DateTime<Utc>,
    /// Hours between `published_at` and normalization time, never below 1.
    pub age_hours: f64,
}

/// Map an arbitrarily shaped record onto a [`CanonicalRecord`]. Total: every
/// field falls back to a default. Records with no usable publish time are
/// stamped `now`, so they count as maximally fresh.
pub fn normalize(raw: &Value, now: DateTime<Utc>) -> CanonicalRecord {
    let empty = serde_json::Map::new();
    let item = raw.as_object().unwrap_or(&empty);

    let url = first_string(item, URL_FIELDS)
        .or_else(|| first_string(item, ID_FIELDS).map(|id| format!("{WATCH_URL_PREFIX}{id}")))
        .unwrap_or_default();

    let published_at = first_present(item, PUBLISHED_FIELDS)
        .and_then(|value| parse_date_any(value, now))
        .unwrap_or(now);

    CanonicalRecord {
        url,
        title: first_string(item, TITLE_FIELDS).unwrap_or_default(),
        channel: first_string(item, CHANNEL_FIELDS).unwrap_or_default(),
        views: count(item, VIEW_FIELDS),
        likes: count(item, LIKE_FIELDS),
        comments: count(item, COMMENT_FIELDS),
        published_at,
        age_hours: age_hours(published_at, now),
    }
}

pub fn age_hours(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - published_at).num_milliseconds() as f64 / 3_600_000.0;
    hours.max(MIN_AGE_HOURS)
}

fn count(item: &serde_json::Map<String, Value>, keys: &[&str]) -> f64 {
    first_number(item, keys).unwrap_or(0.0).max(0.0)
}
