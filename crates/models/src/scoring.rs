//! Candidate scoring shared by the concrete recommenders.

use data_loader::{InteractionLog, ItemId, Recommendation, RecommendationTable, UserId};
use pipeline::{select_top_k, RecommendationFilter, SeenItemsFilter};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Score every (user, item) candidate pair in parallel over users, run the
/// scored table through the filters and keep the top `k` per user.
///
/// `score` returns `None` for pairs the model cannot score (cold users or
/// items); those pairs produce no row. Filters run before the cutoff so a
/// user still gets `k` rows when some of their best items are removed.
pub(crate) fn score_candidates<F>(
    log: &InteractionLog,
    k: usize,
    users: &BTreeSet<UserId>,
    items: &BTreeSet<ItemId>,
    filter_seen_items: bool,
    score: F,
) -> RecommendationTable
where
    F: Fn(UserId, ItemId) -> Option<f64> + Sync,
{
    let mut filters: Vec<Box<dyn RecommendationFilter>> = Vec::new();
    if filter_seen_items {
        filters.push(Box::new(SeenItemsFilter::new(log)));
    }

    let users: Vec<UserId> = users.iter().copied().collect();
    let rows: Vec<Recommendation> = users
        .par_iter()
        .flat_map_iter(|&user_id| {
            let score = &score;
            items.iter().filter_map(move |&item_id| {
                score(user_id, item_id).map(|r| Recommendation::new(user_id, item_id, r))
            })
        })
        .collect();

    let mut table = RecommendationTable::from_rows(rows);
    for filter in &filters {
        let before = table.len();
        table = filter.apply(table);
        debug!(filter = filter.name(), removed = before - table.len(), "Applied filter");
    }

    select_top_k(&table, k)
}
