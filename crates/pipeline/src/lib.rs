//! Ranking utilities shared by every recommender and search run.
//!
//! This crate provides:
//! - Top-K selection with a reproducible tie-break
//! - FallbackMerger for joining model output over fallback recommendations
//! - RecommendationFilter trait and the seen-items filter
//! - FeatureAssembler for feature-based models
//! - ScoringMetric trait and stock metrics (HitRate, Precision, Recall, NDCG)
//!
//! ## Architecture
//! A trial's recommendations flow through the pipeline in stages:
//! 1. The model predicts, optionally dropping already seen items
//! 2. FallbackMerger fills missing slots from the fallback table
//! 3. A ScoringMetric scores the final top K against the test log
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::metrics::HitRate;
//! use pipeline::{FallbackMerger, ScoringMetric};
//!
//! let max = FallbackMerger::max_relevance(fallback.as_ref());
//! let merged = FallbackMerger::merge(&predicted, fallback.as_ref(), 10, max)?;
//! let value = HitRate.evaluate(&merged, split.test(), 10)?;
//! ```

pub mod error;
pub mod fallback;
pub mod features;
pub mod filters;
pub mod metrics;
pub mod top_k;
pub mod traits;

// Re-export main types
pub use error::{PipelineError, Result, TableRole};
pub use fallback::{dominance_offset, validate_table, FallbackMerger, FALLBACK_DOMINANCE_FACTOR};
pub use features::{FeatureAssembler, PairFeatures};
pub use filters::{filter_seen_items, SeenItemsFilter};
pub use metrics::metric_by_name;
pub use top_k::{rank_order, select_top_k};
pub use traits::{RecommendationFilter, ScoringMetric};
