use serde::{Deserialize, Serialize};

use crate::normalize::CanonicalRecord;

/// Per-dimension weights. They need not sum to 1; scores only rank
/// records within one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            views: 0.6,
            likes: 0.25,
            comments: 0.15,
        }
    }
}

/// Engagement per hour since publication, weighted per dimension.
pub fn score(record: &CanonicalRecord, weights: &ScoreWeights) -> f64 {
    let age = record.age_hours;
    (record.views / age) * weights.views
        + (record.likes / age) * weights.likes
        + (record.comments / age) * weights.comments
}
