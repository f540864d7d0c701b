//! The optimizer service.
//!
//! From the search harness's point of view the optimizer is a black box:
//! per trial it hands out a [`ParameterProposer`] that picks an index in a
//! closed range, and it runs a caller-supplied objective `n_trials` times.
//!
//! ## Scheduling
//! - One worker: trials run one after another on the calling thread
//! - `n` workers: a dedicated Rayon pool of `n` threads, each thread driving
//!   its own [`Objective`] and pulling trial numbers from a shared counter
//!
//! A trial runs to completion once started. When a trial fails under
//! [`TrialFailurePolicy::Abort`], no further trials are scheduled, trials
//! already in flight finish, and the first error is returned.

use crate::checkpoint::{Checkpoint, StudySnapshot};
use crate::error::{Result, ScenarioError};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

// =============================================================================
// Proposers and samplers
// =============================================================================

/// Per-trial index selection
pub trait ParameterProposer {
    /// An index in `low..=high` for parameter `name`
    fn choose_index(&mut self, name: &str, low: usize, high: usize) -> usize;
}

/// Creates the proposer for each trial
pub trait Sampler: Send + Sync {
    fn name(&self) -> &str;

    fn proposer(&self, trial_number: usize) -> Box<dyn ParameterProposer + Send>;
}

/// Uniform random indices, reproducible per trial number
#[derive(Debug, Clone, Copy)]
pub struct RandomSampler {
    seed: u64,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

struct RandomProposer {
    rng: StdRng,
}

impl ParameterProposer for RandomProposer {
    fn choose_index(&mut self, _name: &str, low: usize, high: usize) -> usize {
        self.rng.random_range(low..=high)
    }
}

impl Sampler for RandomSampler {
    fn name(&self) -> &str {
        "RandomSampler"
    }

    fn proposer(&self, trial_number: usize) -> Box<dyn ParameterProposer + Send> {
        let seed = self.seed.wrapping_add(trial_number as u64);
        Box::new(RandomProposer {
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

/// Exhaustive enumeration: trial `n` is the mixed-radix decomposition of `n`
/// over the requested ranges, first parameter varying fastest. Wraps
/// around once every combination has been proposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSampler;

struct GridProposer {
    remaining: usize,
}

impl ParameterProposer for GridProposer {
    fn choose_index(&mut self, _name: &str, low: usize, high: usize) -> usize {
        let radix = high - low + 1;
        let digit = self.remaining % radix;
        self.remaining /= radix;
        low + digit
    }
}

impl Sampler for GridSampler {
    fn name(&self) -> &str {
        "GridSampler"
    }

    fn proposer(&self, trial_number: usize) -> Box<dyn ParameterProposer + Send> {
        Box::new(GridProposer {
            remaining: trial_number,
        })
    }
}

// =============================================================================
// Trials
// =============================================================================

/// Handle for one running trial; records every index it hands out
pub struct Trial {
    number: usize,
    proposer: Box<dyn ParameterProposer + Send>,
    params: BTreeMap<String, usize>,
}

impl Trial {
    pub fn new(number: usize, proposer: Box<dyn ParameterProposer + Send>) -> Self {
        Self {
            number,
            proposer,
            params: BTreeMap::new(),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Indices chosen so far, by parameter name
    pub fn params(&self) -> &BTreeMap<String, usize> {
        &self.params
    }
}

impl ParameterProposer for Trial {
    fn choose_index(&mut self, name: &str, low: usize, high: usize) -> usize {
        let index = self.proposer.choose_index(name, low, high);
        self.params.insert(name.to_string(), index);
        index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Complete,
    Failed,
}

/// A finished trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    pub number: usize,
    /// Candidate index chosen for each parameter
    pub params: BTreeMap<String, usize>,
    pub value: Option<f64>,
    pub state: TrialState,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

impl Direction {
    /// Whether `candidate` is strictly better than `incumbent`
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }
}

/// What a failing trial does to the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialFailurePolicy {
    /// Stop scheduling trials and return the error
    #[default]
    Abort,
    /// Record the trial as failed and keep going
    Skip,
}

/// One evaluation of the search criterion
pub trait Objective: Send {
    fn call(&mut self, trial: &mut Trial) -> Result<f64>;
}

impl<F> Objective for F
where
    F: FnMut(&mut Trial) -> Result<f64> + Send,
{
    fn call(&mut self, trial: &mut Trial) -> Result<f64> {
        self(trial)
    }
}

// =============================================================================
// Study
// =============================================================================

pub struct Study {
    sampler: Arc<dyn Sampler>,
    direction: Direction,
    failure_policy: TrialFailurePolicy,
    checkpoint: Option<Arc<dyn Checkpoint>>,
    trials: Mutex<Vec<FrozenTrial>>,
    next_number: AtomicUsize,
    stopped: AtomicBool,
}

impl Study {
    pub fn new(sampler: Arc<dyn Sampler>, direction: Direction) -> Self {
        Self {
            sampler,
            direction,
            failure_policy: TrialFailurePolicy::default(),
            checkpoint: None,
            trials: Mutex::new(Vec::new()),
            next_number: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn with_failure_policy(mut self, policy: TrialFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sink invoked with a snapshot of the study before every trial
    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn Checkpoint>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Run `n_trials` more trials, one worker per element of `workers`
    pub fn optimize<O: Objective>(&self, mut workers: Vec<O>, n_trials: usize) -> Result<()> {
        if workers.is_empty() {
            return Err(ScenarioError::Configuration(
                "at least one worker is required".to_string(),
            ));
        }
        let end = self.next_number.load(Ordering::SeqCst) + n_trials;
        info!(
            "Optimizing {} trials with {} worker(s) using {}",
            n_trials,
            workers.len(),
            self.sampler.name()
        );

        if workers.len() == 1 {
            return self.run_worker(&mut workers[0], end);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.len())
            .build()
            .map_err(|e| ScenarioError::WorkerPool(e.to_string()))?;

        let results: Vec<Result<()>> = pool.install(|| {
            workers
                .par_iter_mut()
                .with_max_len(1)
                .map(|worker| self.run_worker(worker, end))
                .collect()
        });
        results.into_iter().collect()
    }

    fn run_worker<O: Objective>(&self, objective: &mut O, end: usize) -> Result<()> {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return Ok(());
            }
            let number = self.next_number.fetch_add(1, Ordering::SeqCst);
            if number >= end {
                return Ok(());
            }

            if let Some(checkpoint) = &self.checkpoint {
                if let Err(err) = checkpoint.save(&self.snapshot()) {
                    self.stopped.store(true, Ordering::SeqCst);
                    return Err(err);
                }
            }

            let mut trial = Trial::new(number, self.sampler.proposer(number));
            let outcome = objective.call(&mut trial).and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ScenarioError::NonFiniteValue {
                        trial: number,
                        value,
                    })
                }
            });

            match outcome {
                Ok(value) => {
                    debug!("Trial {} finished with value {}", number, value);
                    self.trials.lock().push(FrozenTrial {
                        number,
                        params: trial.params,
                        value: Some(value),
                        state: TrialState::Complete,
                        error: None,
                    });
                }
                Err(err) => {
                    self.trials.lock().push(FrozenTrial {
                        number,
                        params: trial.params,
                        value: None,
                        state: TrialState::Failed,
                        error: Some(err.to_string()),
                    });
                    if self.failure_policy == TrialFailurePolicy::Skip && !err.is_fatal() {
                        warn!("Trial {} failed and was skipped: {}", number, err);
                        continue;
                    }
                    self.stopped.store(true, Ordering::SeqCst);
                    return Err(err);
                }
            }
        }
    }

    /// All finished trials, ordered by trial number
    pub fn trials(&self) -> Vec<FrozenTrial> {
        let mut trials = self.trials.lock().clone();
        trials.sort_by_key(|t| t.number);
        trials
    }

    /// Best completed trial; equal values go to the lowest trial number
    pub fn best_trial(&self) -> Option<FrozenTrial> {
        best_of(&self.trials(), self.direction)
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().and_then(|t| t.value)
    }

    pub fn snapshot(&self) -> StudySnapshot {
        let trials = self.trials();
        StudySnapshot {
            sampler: self.sampler.name().to_string(),
            direction: self.direction,
            best_trial: best_of(&trials, self.direction),
            trials,
        }
    }
}

/// `trials` must be sorted by number
fn best_of(trials: &[FrozenTrial], direction: Direction) -> Option<FrozenTrial> {
    let mut best: Option<(&FrozenTrial, f64)> = None;
    for trial in trials {
        let Some(value) = trial.value else { continue };
        match best {
            Some((_, incumbent)) if !direction.is_better(value, incumbent) => {}
            _ => best = Some((trial, value)),
        }
    }
    best.map(|(trial, _)| trial.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_study() -> Study {
        Study::new(Arc::new(GridSampler), Direction::Maximize)
    }

    #[test]
    fn test_grid_sampler_enumerates_mixed_radix() {
        let mut seen = Vec::new();
        for number in 0..6 {
            let mut proposer = GridSampler.proposer(number);
            let a = proposer.choose_index("a", 0, 2);
            let b = proposer.choose_index("b", 0, 1);
            seen.push((a, b));
        }
        assert_eq!(seen, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_random_sampler_in_range_and_reproducible() {
        let sampler = RandomSampler::new(7);
        for number in 0..50 {
            let a = sampler.proposer(number).choose_index("x", 2, 5);
            let b = sampler.proposer(number).choose_index("x", 2, 5);
            assert_eq!(a, b);
            assert!((2..=5).contains(&a));
        }
    }

    #[test]
    fn test_sequential_optimize_and_best() {
        let study = grid_study();
        let objective = |trial: &mut Trial| -> Result<f64> {
            let index = trial.choose_index("x", 0, 3);
            Ok(-((index as f64) - 2.0).powi(2))
        };

        study.optimize(vec![objective], 4).unwrap();

        let best = study.best_trial().unwrap();
        assert_eq!(best.params["x"], 2);
        assert_eq!(study.trials().len(), 4);
    }

    #[test]
    fn test_ties_go_to_lowest_trial_number() {
        let study = Study::new(Arc::new(GridSampler), Direction::Minimize);
        study
            .optimize(vec![|_: &mut Trial| -> Result<f64> { Ok(1.0) }], 3)
            .unwrap();
        assert_eq!(study.best_trial().unwrap().number, 0);
    }

    #[test]
    fn test_abort_stops_scheduling() {
        let study = grid_study();
        let objective = |trial: &mut Trial| -> Result<f64> {
            if trial.number() == 1 {
                Err(ScenarioError::NoCompletedTrials)
            } else {
                Ok(1.0)
            }
        };

        let err = study.optimize(vec![objective], 5).unwrap_err();
        assert!(matches!(err, ScenarioError::NoCompletedTrials));
        let trials = study.trials();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[1].state, TrialState::Failed);
    }

    #[test]
    fn test_skip_policy_continues() {
        let study = grid_study().with_failure_policy(TrialFailurePolicy::Skip);
        let objective = |trial: &mut Trial| -> Result<f64> {
            if trial.number() % 2 == 0 {
                Err(ScenarioError::NoCompletedTrials)
            } else {
                Ok(trial.number() as f64)
            }
        };

        study.optimize(vec![objective], 5).unwrap();
        assert_eq!(study.trials().len(), 5);
        assert_eq!(study.best_trial().unwrap().number, 3);
    }

    #[test]
    fn test_fatal_error_aborts_under_skip() {
        let study = grid_study().with_failure_policy(TrialFailurePolicy::Skip);
        let objective = |_: &mut Trial| -> Result<f64> {
            Err(ScenarioError::ProposalOutOfRange {
                name: "x".to_string(),
                index: 9,
                len: 1,
            })
        };

        assert!(study.optimize(vec![objective], 3).is_err());
        assert_eq!(study.trials().len(), 1);
    }

    #[test]
    fn test_nan_value_is_a_failure() {
        let study = grid_study();
        let err = study
            .optimize(vec![|_: &mut Trial| -> Result<f64> { Ok(f64::NAN) }], 2)
            .unwrap_err();
        assert!(matches!(err, ScenarioError::NonFiniteValue { trial: 0, .. }));
    }

    #[test]
    fn test_parallel_workers_run_every_trial_once() {
        let study = grid_study();
        let workers: Vec<_> = (0..3)
            .map(|_| {
                |trial: &mut Trial| -> Result<f64> {
                    let index = trial.choose_index("x", 0, 9);
                    Ok(index as f64)
                }
            })
            .collect();

        study.optimize(workers, 10).unwrap();

        let numbers: Vec<usize> = study.trials().iter().map(|t| t.number).collect();
        assert_eq!(numbers, (0..10).collect::<Vec<_>>());
        assert_eq!(study.best_value(), Some(9.0));
    }
}
