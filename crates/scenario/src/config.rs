//! Scenario configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` parses to the configuration below.
//! The default `by_date` split has no `test_start` and is rejected with a
//! configuration error when a search builds it. Set `test_start` to a unix
//! timestamp, or switch to `"how_to_split": "randomly"`.
//!
//! ```json
//! {
//!   "k": 10,
//!   "n_trials": 10,
//!   "n_jobs": 1,
//!   "direction": "maximize",
//!   "filter_seen_items": true,
//!   "failure_policy": "abort",
//!   "seed": 1234,
//!   "sampler": "random",
//!   "criterion": "HitRate",
//!   "metrics": [],
//!   "split": {
//!     "how_to_split": "by_date",
//!     "test_start": null,
//!     "test_size": 0.3,
//!     "drop_cold_users": false,
//!     "drop_cold_items": true
//!   }
//! }
//! ```

use crate::error::{Result, ScenarioError};
use crate::search::{SearchLoop, DEFAULT_SAMPLER_SEED};
use crate::study::{Direction, GridSampler, RandomSampler, Sampler, TrialFailurePolicy};
use data_loader::Timestamp;
use pipeline::{metric_by_name, ScoringMetric};
use serde::{Deserialize, Serialize};
use splitters::{LogSplitter, SplitKind, SplitMethod};
use std::path::Path;
use std::sync::Arc;

/// Which optimizer sampler proposes parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    #[default]
    Random,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub how_to_split: SplitKind,
    /// First test timestamp of a by-date split
    pub test_start: Option<Timestamp>,
    /// Test fraction of a random split
    pub test_size: f64,
    pub drop_cold_users: bool,
    pub drop_cold_items: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            how_to_split: SplitKind::ByDate,
            test_start: None,
            test_size: 0.3,
            drop_cold_users: false,
            drop_cold_items: true,
        }
    }
}

impl SplitConfig {
    pub fn method(&self, seed: u64) -> Result<SplitMethod> {
        match self.how_to_split {
            SplitKind::ByDate => {
                let test_start = self.test_start.ok_or_else(|| {
                    ScenarioError::Configuration(
                        "by_date split requires test_start".to_string(),
                    )
                })?;
                Ok(SplitMethod::ByDate { test_start })
            }
            SplitKind::Randomly => Ok(SplitMethod::Randomly {
                test_size: self.test_size,
                seed,
            }),
        }
    }

    pub fn splitter(&self) -> LogSplitter {
        LogSplitter::new()
            .with_drop_cold_users(self.drop_cold_users)
            .with_drop_cold_items(self.drop_cold_items)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub k: usize,
    pub n_trials: usize,
    pub n_jobs: usize,
    pub direction: Direction,
    pub filter_seen_items: bool,
    pub failure_policy: TrialFailurePolicy,
    /// Seeds both the random split and the random sampler
    pub seed: u64,
    pub sampler: SamplerKind,
    /// Metric the search optimizes
    pub criterion: String,
    /// Extra metrics recorded with every trial
    pub metrics: Vec<String>,
    pub split: SplitConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            k: 10,
            n_trials: 10,
            n_jobs: 1,
            direction: Direction::Maximize,
            filter_seen_items: true,
            failure_policy: TrialFailurePolicy::Abort,
            seed: DEFAULT_SAMPLER_SEED,
            sampler: SamplerKind::Random,
            criterion: "HitRate".to_string(),
            metrics: Vec::new(),
            split: SplitConfig::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScenarioError::Configuration(format!("invalid scenario config: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScenarioError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Reject settings no search could run with
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ScenarioError::Configuration("k must be positive".to_string()));
        }
        if self.n_trials == 0 {
            return Err(ScenarioError::Configuration(
                "n_trials must be at least 1".to_string(),
            ));
        }
        if self.n_jobs == 0 {
            return Err(ScenarioError::Configuration(
                "n_jobs must be at least 1".to_string(),
            ));
        }
        self.criterion()?;
        self.extra_metrics()?;
        Ok(())
    }

    pub fn criterion(&self) -> Result<Box<dyn ScoringMetric>> {
        resolve_metric(&self.criterion)
    }

    pub fn extra_metrics(&self) -> Result<Vec<Box<dyn ScoringMetric>>> {
        self.metrics.iter().map(|name| resolve_metric(name)).collect()
    }

    pub fn sampler(&self) -> Arc<dyn Sampler> {
        match self.sampler {
            SamplerKind::Random => Arc::new(RandomSampler::new(self.seed)),
            SamplerKind::Grid => Arc::new(GridSampler),
        }
    }

    /// Search loop configured from these settings
    pub fn search_loop(&self) -> SearchLoop {
        SearchLoop::new(self.k, self.n_trials)
            .with_n_jobs(self.n_jobs)
            .with_direction(self.direction)
            .with_sampler(self.sampler())
            .with_failure_policy(self.failure_policy)
            .with_filter_seen_items(self.filter_seen_items)
    }
}

fn resolve_metric(name: &str) -> Result<Box<dyn ScoringMetric>> {
    metric_by_name(name)
        .ok_or_else(|| ScenarioError::Configuration(format!("unknown metric '{}'", name)))
}
