//! Run configuration reconciled from the job input document.
//!
//! The input carries overlapping, aliased fields (`searchQueries` vs
//! `searchQuery` vs top-level `searchKeywords`, `lastHours` vs `uploadDate`).
//! Each effective setting is resolved from an ordered table of [`Rule`]s;
//! the first rule whose source field yields a usable value wins, otherwise
//! the default applies. Unusable values never raise errors.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::dates::parse_date_any;
use crate::fields::{coerce_f64, coerce_u64, is_blank, string_list};
use crate::launcher::DEFAULT_PROVIDERS;
use crate::normalize::age_hours;
use crate::poller::PollSettings;
use crate::ranking::RankOptions;
use crate::scoring::ScoreWeights;

pub const DEFAULT_QUERY: &str = "microgreens";
pub const DEFAULT_MAX_RESULTS: u64 = 25;
pub const DEFAULT_LAST_HOURS: u64 = 24;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_MAX_DATASET_ITEMS: u32 = 1000;
pub const DEFAULT_POLL_SECONDS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECONDS: u64 = 300;

/// Input fields, then environment variables, that may carry the upstream token.
const TOKEN_FIELDS: &[&str] = &["upstreamApifyToken"];
const TOKEN_ENV_VARS: &[&str] = &["UPSTREAM_APIFY_TOKEN", "APIFY_TOKEN"];

/// Job-input keys the reconciled config owns. Everything else in
/// `forwardInput` is passed to the job untouched.
const MANAGED_FORWARD_KEYS: &[&str] = &[
    "searchQueries",
    "searchQuery",
    "query",
    "maxResults",
    "maxResultsShorts",
    "maxResultStreams",
];

/// Numeric `uploadDate` values at or above this are epoch timestamps, not hours.
const UPLOAD_DATE_EPOCH_FLOOR: f64 = 1e9;

/// Named `uploadDate` buckets, in hours.
const UPLOAD_DATE_BUCKETS: &[(&str, u64)] = &[
    ("hour", 1),
    ("today", 24),
    ("day", 24),
    ("week", 168),
    ("month", 720),
    ("year", 8760),
];

// ---------------------------------------------------------------------------
// Resolution rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Top level of the input document.
    Top,
    /// Inside `forwardInput`.
    Forward,
}

struct Rule<T> {
    scope: Scope,
    key: &'static str,
    read: fn(&Value, DateTime<Utc>) -> Option<T>,
}

const fn rule<T>(scope: Scope, key: &'static str, read: fn(&Value, DateTime<Utc>) -> Option<T>) -> Rule<T> {
    Rule { scope, key, read }
}

const QUERY_RULES: &[Rule<Vec<String>>] = &[
    rule(Scope::Forward, "searchQueries", read_list),
    rule(Scope::Forward, "searchQuery", read_single),
    rule(Scope::Forward, "query", read_single),
    rule(Scope::Top, "searchKeywords", read_list),
];

const LAST_HOURS_RULES: &[Rule<u64>] = &[
    rule(Scope::Top, "lastHours", read_positive_u64),
    rule(Scope::Top, "uploadDate", read_upload_date_hours),
    rule(Scope::Forward, "uploadDate", read_upload_date_hours),
];

const MAX_RESULTS_RULES: &[Rule<u64>] = &[rule(Scope::Forward, "maxResults", read_u64)];
const MAX_SHORTS_RULES: &[Rule<u64>] = &[rule(Scope::Forward, "maxResultsShorts", read_u64)];
const MAX_STREAMS_RULES: &[Rule<u64>] = &[rule(Scope::Forward, "maxResultStreams", read_u64)];
const TOP_N_RULES: &[Rule<u64>] = &[rule(Scope::Top, "topN", read_positive_u64)];
const MIN_VIEWS_RULES: &[Rule<f64>] = &[rule(Scope::Top, "minViews", read_non_negative_f64)];
const MAX_ITEMS_RULES: &[Rule<u64>] = &[rule(Scope::Top, "maxDatasetItems", read_u64)];
const POLL_SECONDS_RULES: &[Rule<u64>] = &[rule(Scope::Top, "pollSeconds", read_positive_u64)];
const POLL_TIMEOUT_RULES: &[Rule<u64>] = &[rule(Scope::Top, "pollTimeoutSeconds", read_u64)];
const PROVIDER_RULES: &[Rule<Vec<String>>] = &[rule(Scope::Top, "actorIds", read_list)];

struct Sources<'a> {
    top: &'a Map<String, Value>,
    forward: &'a Map<String, Value>,
    now: DateTime<Utc>,
}

impl Sources<'_> {
    fn resolve<T>(&self, rules: &[Rule<T>]) -> Option<T> {
        rules.iter().find_map(|r| {
            let map = match r.scope {
                Scope::Top => self.top,
                Scope::Forward => self.forward,
            };
            map.get(r.key)
                .filter(|v| !is_blank(v))
                .and_then(|v| (r.read)(v, self.now))
        })
    }
}

fn read_list(value: &Value, _: DateTime<Utc>) -> Option<Vec<String>> {
    let list = string_list(value);
    (!list.is_empty()).then_some(list)
}

/// A singular query is one search string, commas included.
fn read_single(value: &Value, now: DateTime<Utc>) -> Option<Vec<String>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| vec![s.to_string()])
        }
        other => read_list(other, now),
    }
}

fn read_u64(value: &Value, _: DateTime<Utc>) -> Option<u64> {
    coerce_u64(value)
}

fn read_positive_u64(value: &Value, _: DateTime<Utc>) -> Option<u64> {
    coerce_u64(value).filter(|n| *n > 0)
}

fn read_non_negative_f64(value: &Value, _: DateTime<Utc>) -> Option<f64> {
    coerce_f64(value).filter(|n| *n >= 0.0)
}

/// `uploadDate` as an hour count, a named bucket, or a date to measure from.
fn read_upload_date_hours(value: &Value, now: DateTime<Utc>) -> Option<u64> {
    if let Some(hours) = coerce_f64(value).filter(|n| *n < UPLOAD_DATE_EPOCH_FLOOR) {
        return (hours > 0.0).then(|| hours.ceil() as u64);
    }
    if let Value::String(s) = value {
        let key = s.trim().to_lowercase();
        if let Some((_, hours)) = UPLOAD_DATE_BUCKETS.iter().find(|(name, _)| *name == key) {
            return Some(*hours);
        }
    }
    let since = parse_date_any(value, now)?;
    Some(age_hours(since, now).ceil() as u64)
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Upstream API token. Never printed.
#[derive(Clone, PartialEq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Explicit input field first, then the environment.
pub fn resolve_credential(
    input: &Value,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Credential> {
    let from_input = TOKEN_FIELDS
        .iter()
        .filter_map(|key| input.get(*key))
        .filter_map(Value::as_str)
        .map(str::to_string);
    let from_env = TOKEN_ENV_VARS.iter().filter_map(|var| env(*var));

    from_input
        .chain(from_env)
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
        .map(Credential)
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Effective parameters for one run. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub queries: Vec<String>,
    pub max_results: u64,
    pub max_results_shorts: u64,
    pub max_result_streams: u64,
    pub last_hours: u64,
    pub top_n: usize,
    pub min_views: f64,
    pub score_weights: ScoreWeights,
    pub max_dataset_items: u32,
    pub poll_seconds: u64,
    pub poll_timeout_seconds: u64,
    /// Candidate actors, tried in order.
    pub providers: Vec<String>,
    /// Unmanaged `forwardInput` keys, forwarded verbatim.
    pub forward_extra: Map<String, Value>,
    pub upstream_token: Option<Credential>,
}

impl RunConfig {
    /// Reconcile using the process environment for the credential fallback.
    pub fn from_input(input: &Value, now: DateTime<Utc>) -> Self {
        Self::reconcile(input, now, |var| std::env::var(var).ok())
    }

    pub fn reconcile(
        input: &Value,
        now: DateTime<Utc>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let empty = Map::new();
        let top = input.as_object().unwrap_or(&empty);
        let forward = forward_input(top.get("forwardInput"));
        let sources = Sources {
            top,
            forward: &forward,
            now,
        };

        let forward_extra: Map<String, Value> = forward
            .iter()
            .filter(|(k, _)| !MANAGED_FORWARD_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            queries: sources
                .resolve(QUERY_RULES)
                .unwrap_or_else(|| vec![DEFAULT_QUERY.to_string()]),
            max_results: sources.resolve(MAX_RESULTS_RULES).unwrap_or(DEFAULT_MAX_RESULTS),
            max_results_shorts: sources.resolve(MAX_SHORTS_RULES).unwrap_or(0),
            max_result_streams: sources.resolve(MAX_STREAMS_RULES).unwrap_or(0),
            last_hours: sources.resolve(LAST_HOURS_RULES).unwrap_or(DEFAULT_LAST_HOURS),
            top_n: sources
                .resolve(TOP_N_RULES)
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_TOP_N),
            min_views: sources.resolve(MIN_VIEWS_RULES).unwrap_or(0.0),
            score_weights: score_weights(top.get("scoreWeights")),
            max_dataset_items: sources
                .resolve(MAX_ITEMS_RULES)
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(DEFAULT_MAX_DATASET_ITEMS),
            poll_seconds: sources.resolve(POLL_SECONDS_RULES).unwrap_or(DEFAULT_POLL_SECONDS),
            poll_timeout_seconds: sources
                .resolve(POLL_TIMEOUT_RULES)
                .unwrap_or(DEFAULT_POLL_TIMEOUT_SECONDS),
            providers: sources.resolve(PROVIDER_RULES).unwrap_or_else(|| {
                DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect()
            }),
            forward_extra,
            upstream_token: resolve_credential(input, env),
        }
    }

    /// Input document sent to the upstream job.
    pub fn job_input(&self) -> Value {
        let mut params = self.forward_extra.clone();
        params.insert("searchQueries".into(), json!(self.queries));
        params.insert("maxResults".into(), json!(self.max_results));
        params.insert("maxResultsShorts".into(), json!(self.max_results_shorts));
        params.insert("maxResultStreams".into(), json!(self.max_result_streams));
        Value::Object(params)
    }

    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            min_views: self.min_views,
            last_hours: self.last_hours,
            top_n: self.top_n,
            weights: self.score_weights,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_seconds),
            timeout: Duration::from_secs(self.poll_timeout_seconds),
        }
    }

    /// Log the effective configuration without the credential.
    pub fn log_redacted(&self) {
        info!(
            queries = ?self.queries,
            last_hours = self.last_hours,
            top_n = self.top_n,
            min_views = self.min_views,
            max_dataset_items = self.max_dataset_items,
            poll_seconds = self.poll_seconds,
            poll_timeout_seconds = self.poll_timeout_seconds,
            providers = ?self.providers,
            has_token = self.upstream_token.is_some(),
            "Run configuration"
        );
        if self.upstream_token.is_none() {
            warn!("UPSTREAM_APIFY_TOKEN not set; trying without a token (public actors only)");
        }
    }
}

/// `forwardInput` as a map. A bare string is a single search query.
fn forward_input(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            let mut map = Map::new();
            map.insert("searchQueries".into(), json!([s.trim()]));
            map
        }
        _ => Map::new(),
    }
}

fn score_weights(value: Option<&Value>) -> ScoreWeights {
    let defaults = ScoreWeights::default();
    let Some(map) = value.and_then(Value::as_object) else {
        return defaults;
    };
    let weight = |key: &str, default: f64| {
        map.get(key)
            .and_then(coerce_f64)
            .filter(|w| *w >= 0.0)
            .unwrap_or(default)
    };
    ScoreWeights {
        views: weight("views", defaults.views),
        likes: weight("likes", defaults.likes),
        comments: weight("comments", defaults.comments),
    }
}
