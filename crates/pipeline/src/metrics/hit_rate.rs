//! Share of users with at least one relevant item in their top `k`.

use super::mean_over_users;
use crate::error::Result;
use crate::traits::ScoringMetric;
use data_loader::{InteractionLog, RecommendationTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct HitRate;

impl ScoringMetric for HitRate {
    fn name(&self) -> &str {
        "HitRate"
    }

    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        k: usize,
    ) -> Result<f64> {
        mean_over_users(self.name(), recommendations, ground_truth, k, |top, relevant| {
            if top.iter().any(|item| relevant.contains(item)) {
                1.0
            } else {
                0.0
            }
        })
    }
}
