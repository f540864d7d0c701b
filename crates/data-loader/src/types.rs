//! Core domain types for interaction logs and recommendation tables.
//!
//! This module defines the data structures shared by every other crate:
//! - Type aliases for ids and timestamps (UserId, ItemId, Timestamp)
//! - `Interaction` / `InteractionLog` for observed user-item events
//! - `Recommendation` / `RecommendationTable` for scored output
//! - `FeatureTable` for dense user or item side features

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for an item
pub type ItemId = u32;

/// Unix timestamp (seconds) of an interaction
pub type Timestamp = i64;

// =============================================================================
// Interaction Log
// =============================================================================

/// A single observed interaction of a user with an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Strength of the interaction (rating, click count, 0/1 label, ...)
    pub relevance: f64,
    pub timestamp: Timestamp,
}

impl Interaction {
    pub fn new(user_id: UserId, item_id: ItemId, relevance: f64, timestamp: Timestamp) -> Self {
        Self {
            user_id,
            item_id,
            relevance,
            timestamp,
        }
    }
}

/// An ordered collection of interactions (train log, test log, full log).
///
/// The log keeps insertion order so that splits and models see the same
/// rows in the same order on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    interactions: Vec<Interaction>,
}

impl InteractionLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_interactions(interactions: Vec<Interaction>) -> Self {
        Self { interactions }
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    pub fn as_slice(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn into_interactions(self) -> Vec<Interaction> {
        self.interactions
    }

    /// Distinct users present in the log
    pub fn users(&self) -> BTreeSet<UserId> {
        self.interactions.iter().map(|i| i.user_id).collect()
    }

    /// Distinct items present in the log
    pub fn items(&self) -> BTreeSet<ItemId> {
        self.interactions.iter().map(|i| i.item_id).collect()
    }

    /// Items each user has interacted with
    pub fn seen_items(&self) -> HashMap<UserId, HashSet<ItemId>> {
        let mut seen: HashMap<UserId, HashSet<ItemId>> = HashMap::new();
        for interaction in &self.interactions {
            seen.entry(interaction.user_id)
                .or_default()
                .insert(interaction.item_id);
        }
        seen
    }

    /// Returns a new log containing only the interactions matching `predicate`
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Interaction) -> bool,
    {
        Self {
            interactions: self
                .interactions
                .iter()
                .filter(|i| predicate(i))
                .copied()
                .collect(),
        }
    }

    pub fn max_timestamp(&self) -> Option<Timestamp> {
        self.interactions.iter().map(|i| i.timestamp).max()
    }

    /// First interaction with a non-finite relevance, if any
    pub fn find_non_finite(&self) -> Option<&Interaction> {
        self.interactions.iter().find(|i| !i.relevance.is_finite())
    }
}

impl FromIterator<Interaction> for InteractionLog {
    fn from_iter<T: IntoIterator<Item = Interaction>>(iter: T) -> Self {
        Self {
            interactions: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Recommendation Table
// =============================================================================

/// A scored (user, item) pair produced by a recommender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub relevance: f64,
    /// Optional context label the score was produced for
    pub context: Option<String>,
}

impl Recommendation {
    pub fn new(user_id: UserId, item_id: ItemId, relevance: f64) -> Self {
        Self {
            user_id,
            item_id,
            relevance,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A set of recommendations, not globally sorted.
///
/// Tables produced by the ranking utilities hold at most one row per
/// (user, item) pair; tables coming from outside are validated before
/// they are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationTable {
    rows: Vec<Recommendation>,
}

impl RecommendationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Recommendation>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Recommendation) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recommendation> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[Recommendation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Recommendation> {
        self.rows
    }

    /// Distinct users with at least one row
    pub fn users(&self) -> BTreeSet<UserId> {
        self.rows.iter().map(|r| r.user_id).collect()
    }

    /// Rows grouped by user, users in ascending order, rows in table order
    pub fn by_user(&self) -> BTreeMap<UserId, Vec<&Recommendation>> {
        let mut grouped: BTreeMap<UserId, Vec<&Recommendation>> = BTreeMap::new();
        for row in &self.rows {
            grouped.entry(row.user_id).or_default().push(row);
        }
        grouped
    }

    /// Highest relevance in the table, `None` when empty
    pub fn max_relevance(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| r.relevance)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Highest absolute relevance in the table, `None` when empty
    pub fn max_abs_relevance(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| r.relevance.abs())
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Relevance of the first row for (user, item)
    pub fn relevance_of(&self, user_id: UserId, item_id: ItemId) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.user_id == user_id && r.item_id == item_id)
            .map(|r| r.relevance)
    }

    /// Sum of all relevance values
    pub fn total_relevance(&self) -> f64 {
        self.rows.iter().map(|r| r.relevance).sum()
    }
}

impl FromIterator<Recommendation> for RecommendationTable {
    fn from_iter<T: IntoIterator<Item = Recommendation>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecommendationTable {
    type Item = Recommendation;
    type IntoIter = std::vec::IntoIter<Recommendation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

// =============================================================================
// Side Features
// =============================================================================

/// Dense side features keyed by user or item id.
///
/// Every row has the same dimension; the first inserted row fixes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    dim: Option<usize>,
    rows: HashMap<u32, Vec<f64>>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert features for `id`, replacing any previous row.
    pub fn insert(&mut self, id: u32, features: Vec<f64>) -> Result<()> {
        match self.dim {
            Some(dim) if dim != features.len() => {
                return Err(DataLoadError::FeatureDimMismatch {
                    id,
                    expected: dim,
                    found: features.len(),
                });
            }
            Some(_) => {}
            None => self.dim = Some(features.len()),
        }
        self.rows.insert(id, features);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&[f64]> {
        self.rows.get(&id).map(|v| v.as_slice())
    }

    /// Feature dimension, 0 for an empty table
    pub fn dim(&self) -> usize {
        self.dim.unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.rows.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_users_items_and_seen() {
        let log = InteractionLog::from_interactions(vec![
            Interaction::new(1, 10, 1.0, 100),
            Interaction::new(2, 20, 1.0, 101),
            Interaction::new(1, 30, 1.0, 102),
        ]);

        assert_eq!(log.users().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(log.items().into_iter().collect::<Vec<_>>(), vec![10, 20, 30]);

        let seen = log.seen_items();
        assert!(seen[&1].contains(&10));
        assert!(seen[&1].contains(&30));
        assert!(!seen[&1].contains(&20));
        assert_eq!(log.max_timestamp(), Some(102));
    }

    #[test]
    fn test_table_max_relevance() {
        let table = RecommendationTable::from_rows(vec![
            Recommendation::new(1, 1, 0.5),
            Recommendation::new(1, 2, -3.0),
            Recommendation::new(2, 1, 2.0),
        ]);

        assert_eq!(table.max_relevance(), Some(2.0));
        assert_eq!(table.max_abs_relevance(), Some(3.0));
        assert_eq!(table.relevance_of(1, 2), Some(-3.0));
        assert!(RecommendationTable::new().max_relevance().is_none());
    }

    #[test]
    fn test_feature_table_dimension_is_fixed() {
        let mut features = FeatureTable::new();
        features.insert(1, vec![0.1, 0.2]).unwrap();

        let err = features.insert(2, vec![0.1]).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::FeatureDimMismatch { id: 2, expected: 2, found: 1 }
        ));
        assert_eq!(features.dim(), 2);
        assert_eq!(features.get(1), Some(&[0.1, 0.2][..]));
    }
}
