//! Dataset loading from a directory.
//!
//! A dataset directory holds:
//! - `log.dat`   interaction log (required)
//! - `users.dat` user side features (optional)
//! - `items.dat` item side features (optional)

use crate::error::Result;
use crate::parser;
use crate::types::*;
use std::path::Path;

/// A fully loaded dataset: the interaction log plus optional side features.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub log: InteractionLog,
    pub user_features: Option<FeatureTable>,
    pub item_features: Option<FeatureTable>,
}

impl Dataset {
    /// Load the dataset from a directory
    ///
    /// Steps:
    /// 1. Parse the log and both feature files in parallel
    /// 2. Treat missing feature files as "no features"
    /// 3. Propagate the first parse error
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        tracing::info!("Loading dataset from {}", data_dir.display());

        let log_path = data_dir.join("log.dat");
        let users_path = data_dir.join("users.dat");
        let items_path = data_dir.join("items.dat");

        let (log, (user_features, item_features)) = rayon::join(
            || parser::parse_log(&log_path),
            || {
                rayon::join(
                    || load_optional_features(&users_path),
                    || load_optional_features(&items_path),
                )
            },
        );

        let dataset = Self {
            log: log?,
            user_features: user_features?,
            item_features: item_features?,
        };

        let (interactions, users, items) = dataset.counts();
        tracing::info!(
            "Loaded {} interactions ({} users, {} items)",
            interactions,
            users,
            items
        );
        Ok(dataset)
    }

    /// (interactions, distinct users, distinct items)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.log.len(), self.log.users().len(), self.log.items().len())
    }
}

fn load_optional_features(path: &Path) -> Result<Option<FeatureTable>> {
    if path.exists() {
        parser::parse_features(path).map(Some)
    } else {
        Ok(None)
    }
}
