use serde::Serialize;

use crate::normalize::CanonicalRecord;
use crate::scoring::{score, ScoreWeights};

/// Thresholds and limits applied when building the shortlist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub min_views: f64,
    pub last_hours: u64,
    pub top_n: usize,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub score: f64,
}

/// Filter by popularity and freshness, score, sort descending and keep the
/// first `top_n`. Equal scores keep their input order.
pub fn rank(records: impl IntoIterator<Item = CanonicalRecord>, opts: &RankOptions) -> Vec<ScoredRecord> {
    let max_age = opts.last_hours as f64;

    let mut scored: Vec<ScoredRecord> = records
        .into_iter()
        .filter(|r| r.views >= opts.min_views)
        .filter(|r| r.age_hours <= max_age)
        .map(|record| ScoredRecord {
            score: score(&record, &opts.weights),
            record,
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(opts.top_n);
    scored
}
