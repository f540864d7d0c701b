//! Relevant items in the top `k`, divided by `k`.

use super::mean_over_users;
use crate::error::Result;
use crate::traits::ScoringMetric;
use data_loader::{InteractionLog, RecommendationTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct Precision;

impl ScoringMetric for Precision {
    fn name(&self) -> &str {
        "Precision"
    }

    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        k: usize,
    ) -> Result<f64> {
        mean_over_users(self.name(), recommendations, ground_truth, k, |top, relevant| {
            let hits = top.iter().filter(|item| relevant.contains(*item)).count();
            hits as f64 / k as f64
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures;

    #[test]
    fn test_precision() {
        // user 1: 1 hit of 2, user 2: 0 of 2
        let value = Precision
            .evaluate(&fixtures::recommendations(), &fixtures::ground_truth(), 2)
            .unwrap();
        assert!((value - 0.25).abs() < 1e-12);
    }
}
