//! Merging a primary recommendation table with a fallback table.
//!
//! ## Algorithm
//! 1. Validate both tables: one row per (user, item), finite relevance
//! 2. Shift every primary relevance by a dominance offset derived from the
//!    largest fallback relevance, so any primary row outranks any fallback row.
//!    Negative primary relevance widens the offset instead of being clamped,
//!    so the primary's own order survives the shift
//! 3. Full outer join on (user, item); where both tables score a pair the
//!    shifted primary row wins
//! 4. Re-select the top `k` per user
//!
//! The largest fallback relevance is captured once by the caller and
//! passed in, so repeated merges against the same fallback share one
//! offset.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::FallbackMerger;
//!
//! let max = FallbackMerger::max_relevance(Some(&fallback));
//! let merged = FallbackMerger::merge(&primary, Some(&fallback), 10, max)?;
//! ```

use crate::error::{PipelineError, Result, TableRole};
use crate::top_k::select_top_k;
use data_loader::{ItemId, Recommendation, RecommendationTable, UserId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Multiplier applied to the captured fallback maximum
pub const FALLBACK_DOMINANCE_FACTOR: f64 = 10.0;

/// Offset added to primary relevance before merging.
///
/// A zero capture (all-zero fallback) still needs a positive offset, so it
/// falls back to 1.
pub fn dominance_offset(fallback_max_relevance: f64) -> f64 {
    let max = fallback_max_relevance.abs();
    if max > 0.0 {
        FALLBACK_DOMINANCE_FACTOR * max
    } else {
        1.0
    }
}

/// Reject tables with duplicate (user, item) rows or non-finite relevance
pub fn validate_table(table: &RecommendationTable, role: TableRole) -> Result<()> {
    let mut seen: HashSet<(UserId, ItemId)> = HashSet::with_capacity(table.len());
    for row in table.iter() {
        if !row.relevance.is_finite() {
            return Err(PipelineError::InvalidRelevance {
                table: role,
                user_id: row.user_id,
                item_id: row.item_id,
                value: row.relevance,
            });
        }
        if !seen.insert((row.user_id, row.item_id)) {
            return Err(PipelineError::DuplicatePair {
                table: role,
                user_id: row.user_id,
                item_id: row.item_id,
            });
        }
    }
    Ok(())
}

/// Joins primary recommendations over fallback recommendations
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMerger;

impl FallbackMerger {
    /// Largest absolute relevance in `fallback`, 0 when absent or empty
    pub fn max_relevance(fallback: Option<&RecommendationTable>) -> f64 {
        fallback
            .and_then(|table| table.max_abs_relevance())
            .unwrap_or(0.0)
    }

    /// Merge `primary` with `fallback` and keep the top `k` per user.
    ///
    /// Without a fallback (or with an empty one) this is exactly
    /// [`select_top_k`] on `primary`. The shift also covers the lowest
    /// negative primary relevance, so every shifted primary row is at least
    /// the dominance offset and primary rows keep their relative order.
    pub fn merge(
        primary: &RecommendationTable,
        fallback: Option<&RecommendationTable>,
        k: usize,
        fallback_max_relevance: f64,
    ) -> Result<RecommendationTable> {
        let fallback = match fallback {
            Some(table) if !table.is_empty() => table,
            _ => return Ok(select_top_k(primary, k)),
        };

        validate_table(primary, TableRole::Primary)?;
        validate_table(fallback, TableRole::Fallback)?;

        let primary_floor = primary
            .iter()
            .map(|r| r.relevance)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0);
        let offset = dominance_offset(fallback_max_relevance) + (-primary_floor).max(0.0);
        debug!(
            "Merging {} primary rows over {} fallback rows (offset {})",
            primary.len(),
            fallback.len(),
            offset
        );

        let mut merged: HashMap<(UserId, ItemId), Recommendation> =
            HashMap::with_capacity(primary.len() + fallback.len());
        for row in fallback.iter() {
            merged.insert((row.user_id, row.item_id), row.clone());
        }
        for row in primary.iter() {
            let mut shifted = row.clone();
            shifted.relevance = row.relevance + offset;
            merged.insert((row.user_id, row.item_id), shifted);
        }

        let merged: RecommendationTable = merged.into_values().collect();
        Ok(select_top_k(&merged, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(UserId, ItemId, f64)]) -> RecommendationTable {
        rows.iter()
            .map(|&(u, i, r)| Recommendation::new(u, i, r))
            .collect()
    }

    fn items_of(table: &RecommendationTable, user: UserId) -> Vec<ItemId> {
        table
            .iter()
            .filter(|r| r.user_id == user)
            .map(|r| r.item_id)
            .collect()
    }

    #[test]
    fn test_offset() {
        assert_eq!(dominance_offset(2.5), 25.0);
        assert_eq!(dominance_offset(-3.0), 30.0);
        assert_eq!(dominance_offset(0.0), 1.0);
    }

    #[test]
    fn test_max_relevance_capture() {
        assert_eq!(FallbackMerger::max_relevance(None), 0.0);
        assert_eq!(FallbackMerger::max_relevance(Some(&RecommendationTable::new())), 0.0);
        let fb = table(&[(1, 1, 0.5), (1, 2, -4.0)]);
        assert_eq!(FallbackMerger::max_relevance(Some(&fb)), 4.0);
    }

    #[test]
    fn test_fallback_fills_missing_slots() {
        let primary = table(&[(1, 10, 0.2)]);
        let fallback = table(&[(1, 20, 5.0), (1, 30, 3.0), (2, 20, 5.0)]);
        let max = FallbackMerger::max_relevance(Some(&fallback));

        let merged = FallbackMerger::merge(&primary, Some(&fallback), 2, max).unwrap();

        // primary first despite lower raw relevance
        assert_eq!(items_of(&merged, 1), vec![10, 20]);
        // user 2 only has fallback rows
        assert_eq!(items_of(&merged, 2), vec![20]);
    }

    #[test]
    fn test_primary_wins_shared_pair() {
        let primary = table(&[(1, 10, 0.5)]);
        let fallback = table(&[(1, 10, 9.0)]);

        let merged = FallbackMerger::merge(&primary, Some(&fallback), 5, 9.0).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows()[0].relevance, 0.5 + 90.0);
    }

    #[test]
    fn test_negative_primary_still_dominates() {
        let primary = table(&[(1, 10, -100.0)]);
        let fallback = table(&[(1, 20, 1.0)]);

        let merged = FallbackMerger::merge(&primary, Some(&fallback), 1, 1.0).unwrap();
        assert_eq!(items_of(&merged, 1), vec![10]);
    }

    #[test]
    fn test_negative_primary_keeps_its_order() {
        let primary = table(&[(1, 1, -5.0), (1, 2, -1.0)]);
        let fallback = table(&[(1, 9, 0.5)]);
        let max = FallbackMerger::max_relevance(Some(&fallback));

        let merged = FallbackMerger::merge(&primary, Some(&fallback), 1, max).unwrap();
        assert_eq!(items_of(&merged, 1), items_of(&select_top_k(&primary, 1), 1));
        assert_eq!(items_of(&merged, 1), vec![2]);

        let merged = FallbackMerger::merge(&primary, Some(&fallback), 3, max).unwrap();
        assert_eq!(items_of(&merged, 1), vec![2, 1, 9]);
    }

    #[test]
    fn test_no_fallback_is_plain_top_k() {
        let primary = table(&[(1, 1, 0.1), (1, 2, 0.3), (1, 3, 0.2)]);

        let merged = FallbackMerger::merge(&primary, None, 2, 0.0).unwrap();
        assert_eq!(merged, select_top_k(&primary, 2));

        let empty = RecommendationTable::new();
        let merged = FallbackMerger::merge(&primary, Some(&empty), 2, 0.0).unwrap();
        assert_eq!(merged, select_top_k(&primary, 2));
    }

    #[test]
    fn test_duplicate_fallback_pair_rejected() {
        let primary = table(&[(1, 1, 1.0)]);
        let fallback = table(&[(1, 2, 1.0), (1, 2, 2.0)]);

        let err = FallbackMerger::merge(&primary, Some(&fallback), 2, 2.0).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DuplicatePair {
                table: TableRole::Fallback,
                user_id: 1,
                item_id: 2
            }
        );
    }

    #[test]
    fn test_nan_primary_rejected() {
        let primary = table(&[(1, 1, f64::NAN)]);
        let fallback = table(&[(1, 2, 1.0)]);

        let err = FallbackMerger::merge(&primary, Some(&fallback), 2, 1.0).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidRelevance {
                table: TableRole::Primary,
                ..
            }
        ));
    }
}
