//! Core traits for the ranking pipeline.
//!
//! `RecommendationFilter` removes rows from a recommendation table and
//! `ScoringMetric` reduces a table to one number against ground truth.

use crate::error::Result;
use data_loader::{InteractionLog, RecommendationTable};

/// Removes unwanted rows from a recommendation table.
///
/// ## Design Note
/// - `Send + Sync` lets one filter be shared by parallel search workers
/// - Filters take ownership of the table and return the kept rows
pub trait RecommendationFilter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to `recommendations`
    fn apply(&self, recommendations: RecommendationTable) -> RecommendationTable;
}

/// A ranking-quality metric evaluated at a cutoff `k`.
///
/// Implementations must fail on a table they cannot score (non-finite
/// relevance, `k == 0`, empty ground truth) instead of returning 0.
pub trait ScoringMetric: Send + Sync {
    /// Short metric name, e.g. `"HitRate"`
    fn name(&self) -> &str;

    /// Score the top `k` rows per user of `recommendations` against
    /// `ground_truth`
    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        k: usize,
    ) -> Result<f64>;

    /// Name qualified with the cutoff, e.g. `"HitRate@10"`
    fn label(&self, k: usize) -> String {
        format!("{}@{}", self.name(), k)
    }
}
