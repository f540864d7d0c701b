//! Errors surfaced by a search run.

use data_loader::DataLoadError;
use models::ModelError;
use pipeline::PipelineError;
use splitters::SplitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Malformed search setup, detected before any trial runs
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Data error: {0}")]
    Data(#[from] DataLoadError),

    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    /// The optimizer returned an index outside the candidate list
    #[error("Optimizer proposed index {index} for parameter {name} with {len} candidates")]
    ProposalOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("Trial {trial} returned a non-finite criterion value {value}")]
    NonFiniteValue { trial: usize, value: f64 },

    #[error("No trial completed successfully")]
    NoCompletedTrials,

    #[error("Checkpoint failed: {0}")]
    Checkpoint(String),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl ScenarioError {
    /// Errors that stop the run regardless of the trial failure policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScenarioError::Configuration(_)
                | ScenarioError::ProposalOutOfRange { .. }
                | ScenarioError::Checkpoint(_)
                | ScenarioError::WorkerPool(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScenarioError>;
