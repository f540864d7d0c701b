//! Errors raised by recommenders and their parameter schema.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid value for parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{0} must be fitted before predicting")]
    NotFitted(String),

    #[error("Cannot fit {0} on an empty log")]
    EmptyLog(String),

    #[error("{model} requires {side} features")]
    MissingFeatures { model: String, side: &'static str },

    #[error("Label {value} for user {user_id} item {item_id} is not 0 or 1")]
    InvalidLabel {
        user_id: u32,
        item_id: u32,
        value: f64,
    },

    #[error("Linear system for {0} is singular; increase reg_param")]
    SingularSystem(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
