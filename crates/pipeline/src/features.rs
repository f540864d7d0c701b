//! Feature assembly for feature-based recommenders.
//!
//! A (user, item) pair is described by the concatenation of the user's and
//! the item's side features. Pairs missing either side are skipped, the
//! same as an inner join of the interaction log with both feature tables.

use data_loader::{FeatureTable, InteractionLog, ItemId, UserId};
use rayon::prelude::*;

/// Assembled features for one (user, item) pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairFeatures {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub features: Vec<f64>,
}

/// Builds pair feature vectors from user and item feature tables.
///
/// ## Performance Note
/// Pairs are assembled in parallel with Rayon; output keeps input order.
#[derive(Clone, Copy)]
pub struct FeatureAssembler<'a> {
    user_features: &'a FeatureTable,
    item_features: &'a FeatureTable,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(user_features: &'a FeatureTable, item_features: &'a FeatureTable) -> Self {
        Self {
            user_features,
            item_features,
        }
    }

    /// Length of every assembled vector
    pub fn dim(&self) -> usize {
        self.user_features.dim() + self.item_features.dim()
    }

    /// Concatenated features of one pair, `None` if either side is missing
    pub fn assemble(&self, user_id: UserId, item_id: ItemId) -> Option<Vec<f64>> {
        let user = self.user_features.get(user_id)?;
        let item = self.item_features.get(item_id)?;

        let mut features = Vec::with_capacity(user.len() + item.len());
        features.extend_from_slice(user);
        features.extend_from_slice(item);
        Some(features)
    }

    /// Assemble every pair that has both sides
    pub fn assemble_pairs(&self, pairs: &[(UserId, ItemId)]) -> Vec<PairFeatures> {
        pairs
            .par_iter()
            .filter_map(|&(user_id, item_id)| {
                self.assemble(user_id, item_id).map(|features| PairFeatures {
                    user_id,
                    item_id,
                    features,
                })
            })
            .collect()
    }

    /// Training rows for a log: features with the interaction relevance as
    /// label
    pub fn assemble_log(&self, log: &InteractionLog) -> Vec<(Vec<f64>, f64)> {
        log.as_slice()
            .par_iter()
            .filter_map(|interaction| {
                self.assemble(interaction.user_id, interaction.item_id)
                    .map(|features| (features, interaction.relevance))
            })
            .collect()
    }
}
