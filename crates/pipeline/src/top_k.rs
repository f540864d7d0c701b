//! Top-K selection per user.
//!
//! ## Ordering
//! Rows are ranked by relevance descending (IEEE total order, so the
//! result never depends on how NaN compares), then by item id ascending.
//! The item-id tie-break makes the selection reproducible across runs.
//!
//! The output is grouped by user id ascending, each user's rows in rank
//! order, which makes the selector idempotent:
//! `select_top_k(&select_top_k(t, k), k) == select_top_k(t, k)`.

use data_loader::{Recommendation, RecommendationTable, UserId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Rank order of two rows belonging to the same user
pub fn rank_order(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Keep at most `k` highest-ranked rows for every user in `table`.
///
/// Users with fewer than `k` rows keep all of them; `k == 0` yields an
/// empty table.
pub fn select_top_k(table: &RecommendationTable, k: usize) -> RecommendationTable {
    if k == 0 {
        return RecommendationTable::new();
    }

    let mut grouped: BTreeMap<UserId, Vec<Recommendation>> = BTreeMap::new();
    for row in table.iter() {
        grouped.entry(row.user_id).or_default().push(row.clone());
    }

    let mut groups: Vec<Vec<Recommendation>> = grouped.into_values().collect();
    groups.par_iter_mut().for_each(|rows| {
        rows.sort_by(rank_order);
        rows.truncate(k);
    });

    groups.into_iter().flatten().collect()
}
