//! Stock ranking-quality metrics.
//!
//! Every metric ranks each user's rows with the Top-K order, keeps the
//! first `k`, and averages a per-user score over the users present in the
//! ground truth. A ground-truth user without recommendations scores 0.
//!
//! Before scoring, the table is checked: `k == 0`, empty ground truth and
//! non-finite relevance are errors rather than a silent zero.

pub mod hit_rate;
pub mod ndcg;
pub mod precision;
pub mod recall;

pub use hit_rate::HitRate;
pub use ndcg::Ndcg;
pub use precision::Precision;
pub use recall::Recall;

use crate::error::{PipelineError, Result};
use crate::top_k::rank_order;
use crate::traits::ScoringMetric;
use data_loader::{InteractionLog, ItemId, RecommendationTable, UserId};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Look up a stock metric by its name (case-insensitive)
pub fn metric_by_name(name: &str) -> Option<Box<dyn ScoringMetric>> {
    match name.to_ascii_lowercase().as_str() {
        "hitrate" | "hit_rate" => Some(Box::new(HitRate)),
        "precision" => Some(Box::new(Precision)),
        "recall" => Some(Box::new(Recall)),
        "ndcg" => Some(Box::new(Ndcg)),
        _ => None,
    }
}

fn scoring_error(metric: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::Scoring {
        metric: metric.to_string(),
        reason: reason.into(),
    }
}

/// Shared driver: validate, rank, then average `per_user` over the
/// ground-truth users.
///
/// `per_user` receives the user's top-`k` items in rank order and the set
/// of relevant items.
pub(crate) fn mean_over_users<F>(
    metric: &str,
    recommendations: &RecommendationTable,
    ground_truth: &InteractionLog,
    k: usize,
    per_user: F,
) -> Result<f64>
where
    F: Fn(&[ItemId], &HashSet<ItemId>) -> f64 + Sync,
{
    if k == 0 {
        return Err(scoring_error(metric, "cutoff k must be positive"));
    }
    if ground_truth.is_empty() {
        return Err(scoring_error(metric, "ground truth is empty"));
    }
    if let Some(row) = recommendations.iter().find(|r| !r.relevance.is_finite()) {
        return Err(scoring_error(
            metric,
            format!(
                "non-finite relevance {} for user {} item {}",
                row.relevance, row.user_id, row.item_id
            ),
        ));
    }

    let relevant = ground_truth.seen_items();
    let ranked = ranked_items(recommendations, k);
    let users: Vec<(&UserId, &HashSet<ItemId>)> = relevant.iter().collect();

    let total: f64 = users
        .par_iter()
        .map(|(user_id, items)| match ranked.get(*user_id) {
            Some(top) => per_user(top, items),
            None => 0.0,
        })
        .sum();

    Ok(total / users.len() as f64)
}

/// Each user's top-`k` item ids in rank order
fn ranked_items(recommendations: &RecommendationTable, k: usize) -> HashMap<UserId, Vec<ItemId>> {
    recommendations
        .by_user()
        .into_iter()
        .map(|(user_id, mut rows)| {
            rows.sort_by(|a, b| rank_order(a, b));
            let items = rows.into_iter().take(k).map(|r| r.item_id).collect();
            (user_id, items)
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Recommendation;

    #[test]
    fn test_metric_by_name() {
        assert_eq!(metric_by_name("HitRate").unwrap().name(), "HitRate");
        assert_eq!(metric_by_name("ndcg").unwrap().name(), "NDCG");
        assert!(metric_by_name("map").is_none());
    }

    #[test]
    fn test_zero_k_is_error() {
        let err = HitRate
            .evaluate(&fixtures::recommendations(), &fixtures::ground_truth(), 0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scoring { .. }));
    }

    #[test]
    fn test_nan_is_error_not_zero() {
        let recs = RecommendationTable::from_rows(vec![Recommendation::new(1, 1, f64::NAN)]);
        let err = Precision
            .evaluate(&recs, &fixtures::ground_truth(), 5)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scoring { metric, .. } if metric == "Precision"));
    }

    #[test]
    fn test_empty_ground_truth_is_error() {
        let err = Recall
            .evaluate(&fixtures::recommendations(), &InteractionLog::new(), 5)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scoring { .. }));
    }

    #[test]
    fn test_label() {
        assert_eq!(HitRate.label(10), "HitRate@10");
    }
}
