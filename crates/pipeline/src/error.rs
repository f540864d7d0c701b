//! Error types for the ranking pipeline.

use data_loader::{ItemId, UserId};
use std::fmt;
use thiserror::Error;

/// Which table a consistency error was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Primary,
    Fallback,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRole::Primary => write!(f, "primary"),
            TableRole::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A table that must be keyed by (user, item) has two rows for one pair
    #[error("Duplicate row for user {user_id} item {item_id} in {table} recommendations")]
    DuplicatePair {
        table: TableRole,
        user_id: UserId,
        item_id: ItemId,
    },

    /// NaN or infinite relevance where a total order is required
    #[error("Non-finite relevance {value} for user {user_id} item {item_id} in {table} recommendations")]
    InvalidRelevance {
        table: TableRole,
        user_id: UserId,
        item_id: ItemId,
        value: f64,
    },

    /// A metric was asked to score something it cannot score
    #[error("Cannot compute {metric}: {reason}")]
    Scoring { metric: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
