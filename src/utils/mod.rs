use crate::models::RecommendationScore;
use std::cmp::Ordering;

pub mod metrics;
pub mod validation;

/// Canonical result-list order: score descending, ties broken by ascending
/// target id so equal-scored lists are deterministic.
pub fn sort_scores(scores: &mut [RecommendationScore]) {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
