//! Checkpointing of study progress.
//!
//! The study hands a serialisable snapshot to an optional sink before each
//! trial. Where the snapshot goes (a file, a database, nowhere) is up to
//! the sink.

use crate::error::Result;
use crate::study::{Direction, FrozenTrial};
use serde::{Deserialize, Serialize};

/// State of a study at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySnapshot {
    pub sampler: String,
    pub direction: Direction,
    pub trials: Vec<FrozenTrial>,
    pub best_trial: Option<FrozenTrial>,
}

/// Receives study snapshots; errors abort the search
pub trait Checkpoint: Send + Sync {
    fn save(&self, snapshot: &StudySnapshot) -> Result<()>;
}
