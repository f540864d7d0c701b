//! Normalised discounted cumulative gain with binary relevance.
//!
//! ## Algorithm
//! DCG  = sum over hits at rank i (0-based) of 1 / log2(i + 2)
//! IDCG = the same sum over the first min(k, |relevant|) ranks
//! NDCG = DCG / IDCG

use super::mean_over_users;
use crate::error::Result;
use crate::traits::ScoringMetric;
use data_loader::{InteractionLog, RecommendationTable};

#[derive(Debug, Clone, Copy, Default)]
pub struct Ndcg;

fn discount(rank: usize) -> f64 {
    1.0 / ((rank + 2) as f64).log2()
}

impl ScoringMetric for Ndcg {
    fn name(&self) -> &str {
        "NDCG"
    }

    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        k: usize,
    ) -> Result<f64> {
        mean_over_users(self.name(), recommendations, ground_truth, k, |top, relevant| {
            let dcg: f64 = top
                .iter()
                .enumerate()
                .filter(|(_, item)| relevant.contains(*item))
                .map(|(rank, _)| discount(rank))
                .sum();
            let idcg: f64 = (0..k.min(relevant.len())).map(discount).sum();
            dcg / idcg
        })
    }
}
