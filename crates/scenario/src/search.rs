//! The search loop: N trials of [`MainObjective`] through the optimizer.
//!
//! ## Recommender ownership
//! - `n_jobs == 1`: every trial mutates the caller's recommender in place
//! - `n_jobs > 1`: each worker gets its own `clone_box` copy and the
//!   caller's recommender is left untouched
//!
//! Fitted state is never shared between concurrently running trials.
//!
//! ## Example Usage
//!
//! ```ignore
//! use scenario::{SearchLoop, SearchSpace};
//!
//! let result = SearchLoop::new(10, 20)
//!     .with_n_jobs(4)
//!     .run(&space, &split, &mut model, &HitRate, &metrics, None)?;
//! println!("best {} = {}", format_params(&result.best_parameters), result.best_value);
//! ```

use crate::checkpoint::Checkpoint;
use crate::error::{Result, ScenarioError};
use crate::experiment::{Experiment, TrialRecord};
use crate::objective::{MainObjective, TrialWorker};
use crate::search_space::SearchSpace;
use crate::study::{Direction, FrozenTrial, RandomSampler, Sampler, Study, TrialFailurePolicy};
use data_loader::{RecommendationTable, SplitData};
use models::{format_params, ParamMap, Recommender};
use pipeline::ScoringMetric;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const DEFAULT_SAMPLER_SEED: u64 = 1234;

/// Outcome of a search run
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_parameters: ParamMap,
    pub best_value: f64,
    /// Completed trials in the order they finished
    pub trial_history: Vec<TrialRecord>,
    /// Every trial the optimizer ran, failed ones included, by number
    pub trials: Vec<FrozenTrial>,
}

pub struct SearchLoop {
    k: usize,
    n_trials: usize,
    n_jobs: usize,
    direction: Direction,
    sampler: Arc<dyn Sampler>,
    failure_policy: TrialFailurePolicy,
    checkpoint: Option<Arc<dyn Checkpoint>>,
    filter_seen_items: bool,
}

impl SearchLoop {
    pub fn new(k: usize, n_trials: usize) -> Self {
        Self {
            k,
            n_trials,
            n_jobs: 1,
            direction: Direction::default(),
            sampler: Arc::new(RandomSampler::new(DEFAULT_SAMPLER_SEED)),
            failure_policy: TrialFailurePolicy::default(),
            checkpoint: None,
            filter_seen_items: true,
        }
    }

    /// Number of concurrent trials (default: 1)
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_failure_policy(mut self, policy: TrialFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn Checkpoint>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn with_filter_seen_items(mut self, filter: bool) -> Self {
        self.filter_seen_items = filter;
        self
    }

    /// Run the search and return the best parameters found
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        search_space: &SearchSpace,
        split_data: &SplitData,
        recommender: &mut dyn Recommender,
        criterion: &dyn ScoringMetric,
        metrics: &[Box<dyn ScoringMetric>],
        fallback: Option<&RecommendationTable>,
    ) -> Result<SearchResult> {
        if self.n_jobs == 0 {
            return Err(ScenarioError::Configuration(
                "n_jobs must be at least 1".to_string(),
            ));
        }
        if self.n_trials == 0 {
            return Err(ScenarioError::Configuration(
                "n_trials must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        info!(
            "Searching {} over {} parameter(s): {} trials, {} job(s), criterion {}",
            recommender.name(),
            search_space.len(),
            self.n_trials,
            self.n_jobs,
            criterion.label(self.k)
        );

        let experiment = Experiment::new();
        let objective = MainObjective::new(
            search_space,
            split_data,
            criterion,
            metrics,
            fallback,
            self.k,
            &experiment,
        )?
        .with_filter_seen_items(self.filter_seen_items);

        let mut study = Study::new(Arc::clone(&self.sampler), self.direction)
            .with_failure_policy(self.failure_policy);
        if let Some(checkpoint) = &self.checkpoint {
            study = study.with_checkpoint(Arc::clone(checkpoint));
        }

        if self.n_jobs == 1 {
            study.optimize(vec![TrialWorker::new(&objective, recommender)], self.n_trials)?;
        } else {
            let mut instances: Vec<Box<dyn Recommender>> =
                (0..self.n_jobs).map(|_| recommender.clone_box()).collect();
            let workers: Vec<TrialWorker<'_>> = instances
                .iter_mut()
                .map(|instance| TrialWorker::new(&objective, instance.as_mut()))
                .collect();
            study.optimize(workers, self.n_trials)?;
        }

        let best = study.best_trial().ok_or(ScenarioError::NoCompletedTrials)?;
        let best_value = best.value.ok_or(ScenarioError::NoCompletedTrials)?;
        let best_parameters = search_space.resolve(&best.params)?;

        info!(
            "Best {} = {} with {} (trial {}) in {:?}",
            criterion.label(self.k),
            best_value,
            format_params(&best_parameters),
            best.number,
            start.elapsed()
        );

        Ok(SearchResult {
            best_parameters,
            best_value,
            trial_history: experiment.into_records(),
            trials: study.trials(),
        })
    }
}
