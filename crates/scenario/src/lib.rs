//! # Scenario Crate
//!
//! Hyperparameter search for recommenders.
//!
//! ## Components
//!
//! ### Optimizer service
//! `Study` runs an objective `n_trials` times, sequentially or on a pool of
//! workers, with parameters proposed by a `Sampler` (`RandomSampler`,
//! `GridSampler`). Progress can be handed to a `Checkpoint` sink.
//!
//! ### Trial objective
//! `MainObjective` runs one trial: bind parameters, fit, predict, merge
//! fallback recommendations, score, record in the `Experiment` log.
//!
//! ### Search loop and production replay
//! `SearchLoop` gives every concurrent worker its own recommender and
//! reports the best parameters; `ProductionReplay` refits them on the
//! full log.
//!
//! ### Scenario
//! `Scenario` wires a `ScenarioConfig` split, metric set and fallback
//! recommender around the search loop.
//!
//! ## Example Usage
//!
//! ```ignore
//! use models::PopularRecommender;
//! use scenario::{Scenario, ScenarioConfig, SearchSpace};
//!
//! let scenario = Scenario::new(ScenarioConfig::from_file(path)?);
//! let mut model = PopularRecommender::new();
//! let space = SearchSpace::new().with_param("alpha", vec![0.into(), 100.into()]);
//! let result = scenario.research(&mut model, &space, &log, None, None, None, None)?;
//! let recs = scenario.production(&model, &result.best_parameters, &log, None, None, None, None)?;
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod experiment;
pub mod objective;
pub mod production;
pub mod scenario;
pub mod search;
pub mod search_space;
pub mod study;

pub use checkpoint::{Checkpoint, StudySnapshot};
pub use config::{SamplerKind, ScenarioConfig, SplitConfig};
pub use error::{Result, ScenarioError};
pub use experiment::{Experiment, TrialRecord};
pub use objective::{MainObjective, TrialWorker};
pub use production::ProductionReplay;
pub use scenario::Scenario;
pub use search::{SearchLoop, SearchResult, DEFAULT_SAMPLER_SEED};
pub use search_space::SearchSpace;
pub use study::{
    Direction, FrozenTrial, GridSampler, Objective, ParameterProposer, RandomSampler, Sampler,
    Study, Trial, TrialFailurePolicy, TrialState,
};
