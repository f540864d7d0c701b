//! Filter to remove items a user has already interacted with.

use crate::traits::RecommendationFilter;
use data_loader::{InteractionLog, ItemId, RecommendationTable, UserId};
use std::collections::{HashMap, HashSet};

/// Removes recommendations for (user, item) pairs present in a log.
///
/// ## Algorithm
/// The seen pairs are indexed once at construction, so each row costs
/// one hash lookup.
#[derive(Debug, Clone, Default)]
pub struct SeenItemsFilter {
    seen: HashMap<UserId, HashSet<ItemId>>,
}

impl SeenItemsFilter {
    pub fn new(log: &InteractionLog) -> Self {
        Self {
            seen: log.seen_items(),
        }
    }

    /// Whether `user_id` has interacted with `item_id`
    pub fn is_seen(&self, user_id: UserId, item_id: ItemId) -> bool {
        self.seen
            .get(&user_id)
            .is_some_and(|items| items.contains(&item_id))
    }
}

/// Drop every (user, item) pair of `recommendations` present in `log`
pub fn filter_seen_items(
    recommendations: RecommendationTable,
    log: &InteractionLog,
) -> RecommendationTable {
    SeenItemsFilter::new(log).apply(recommendations)
}

impl RecommendationFilter for SeenItemsFilter {
    fn name(&self) -> &str {
        "SeenItemsFilter"
    }

    fn apply(&self, recommendations: RecommendationTable) -> RecommendationTable {
        recommendations
            .into_iter()
            .filter(|row| !self.is_seen(row.user_id, row.item_id))
            .collect()
    }
}
