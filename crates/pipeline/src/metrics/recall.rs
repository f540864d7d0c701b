//! Relevant items in the top `k`, divided by the number of relevant items.

use super::mean_over_users;
use crate::error::Result;
use crate::traits::ScoringMetric;
use data_loader::{InteractionLog, RecommendationTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct Recall;

impl ScoringMetric for Recall {
    fn name(&self) -> &str {
        "Recall"
    }

    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        k: usize,
    ) -> Result<f64> {
        mean_over_users(self.name(), recommendations, ground_truth, k, |top, relevant| {
            let hits = top.iter().filter(|item| relevant.contains(*item)).count();
            hits as f64 / relevant.len() as f64
        })
    }
}
