//! # Models Crate
//!
//! The recommender capability and its concrete implementations.
//!
//! ## Components
//!
//! ### Parameters
//! `ParamValue`, `ParamMap`, `ParamDomain` and `ParamSpec` describe
//! hyperparameters; `ModelConfig::apply` binds a whole map or nothing.
//!
//! ### Recommenders
//! - `PopularRecommender`: smoothed item popularity
//! - `AlsRecommender`: implicit-feedback matrix factorisation
//! - `LinearRecommender`: logistic regression over side features
//!
//! ## Example Usage
//!
//! ```ignore
//! use models::{recommender_by_name, Recommender};
//!
//! let mut model = recommender_by_name("als").expect("known model");
//! let recs = model.fit_predict(&log, 10, &users, &items, None, None, true)?;
//! ```

pub mod als;
pub mod error;
pub mod linear;
pub mod params;
pub mod popular;
mod scoring;
pub mod traits;

pub use als::AlsRecommender;
pub use error::{ModelError, Result};
pub use linear::LinearRecommender;
pub use params::{format_params, ModelConfig, ParamDomain, ParamMap, ParamSpec, ParamValue};
pub use popular::PopularRecommender;
pub use traits::Recommender;

/// Names accepted by [`recommender_by_name`]
pub const RECOMMENDER_NAMES: [&str; 3] = ["popular", "als", "linear"];

/// A recommender with default parameters, selected by short name
pub fn recommender_by_name(name: &str) -> Option<Box<dyn Recommender>> {
    match name {
        "popular" => Some(Box::new(PopularRecommender::new())),
        "als" => Some(Box::new(AlsRecommender::new())),
        "linear" => Some(Box::new(LinearRecommender::new())),
        _ => None,
    }
}
