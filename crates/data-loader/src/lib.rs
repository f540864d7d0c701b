//! # Data Loader Crate
//!
//! Domain types and loading for recommender research data.
//!
//! ## Main Components
//!
//! - **types**: ids, interaction logs, recommendation tables, side features
//! - **split_data**: the immutable train/test bundle shared across trials
//! - **parser**: parse `::`-delimited log and feature files
//! - **index**: load a whole dataset directory
//! - **error**: error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Dataset;
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data/sample"))?;
//! let (interactions, users, items) = dataset.counts();
//! println!("{} interactions from {} users on {} items", interactions, users, items);
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod split_data;
pub mod types;

pub use error::{DataLoadError, Result};
pub use index::Dataset;
pub use split_data::SplitData;
pub use types::{
    FeatureTable, Interaction, InteractionLog, ItemId, Recommendation, RecommendationTable,
    Timestamp, UserId,
};
