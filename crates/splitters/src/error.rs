//! Error types for the splitters crate.

use data_loader::DataLoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    /// `how_to_split` named a scheme that does not exist
    #[error("Unknown split method '{0}', expected 'by_date' or 'randomly'")]
    UnknownMethod(String),

    /// Random split fraction outside (0, 1)
    #[error("Invalid test size {0}, expected a fraction in (0, 1)")]
    InvalidTestSize(f64),

    /// Nothing to split
    #[error("Cannot split an empty log")]
    EmptyLog,

    /// The assembled split violated a SplitData invariant
    #[error(transparent)]
    Data(#[from] DataLoadError),
}

pub type Result<T> = std::result::Result<T, SplitError>;
