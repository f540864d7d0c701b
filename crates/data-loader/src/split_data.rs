//! The immutable train/test bundle shared by every trial of a search run.

use crate::error::{DataLoadError, Result};
use crate::types::{FeatureTable, InteractionLog, ItemId, Timestamp, UserId};
use std::collections::{BTreeSet, HashSet};

/// Train and test logs plus the candidate users/items and side features.
///
/// Built once per search run and read-only afterwards: there are no
/// mutating accessors. Share it across trials with `Arc<SplitData>`.
///
/// ## Invariants checked by [`SplitData::new`]
/// - every user appearing in `train` is in `users`
/// - every item appearing in `train` is in `items`
/// - all relevance values in train and test are finite
///
/// Cold users/items may appear only in `test`; whether they survive
/// depends on the splitter's cold-dropping flags.
#[derive(Debug, Clone)]
pub struct SplitData {
    train: InteractionLog,
    test: InteractionLog,
    users: BTreeSet<UserId>,
    items: BTreeSet<ItemId>,
    user_features: Option<FeatureTable>,
    item_features: Option<FeatureTable>,
}

impl SplitData {
    pub fn new(
        train: InteractionLog,
        test: InteractionLog,
        users: BTreeSet<UserId>,
        items: BTreeSet<ItemId>,
        user_features: Option<FeatureTable>,
        item_features: Option<FeatureTable>,
    ) -> Result<Self> {
        if let Some(user_id) = train.iter().map(|i| i.user_id).find(|u| !users.contains(u)) {
            return Err(DataLoadError::ValidationError(format!(
                "train user {} is missing from the candidate users",
                user_id
            )));
        }
        if let Some(item_id) = train.iter().map(|i| i.item_id).find(|i| !items.contains(i)) {
            return Err(DataLoadError::ValidationError(format!(
                "train item {} is missing from the candidate items",
                item_id
            )));
        }
        for (name, log) in [("train", &train), ("test", &test)] {
            if let Some(bad) = log.find_non_finite() {
                return Err(DataLoadError::InvalidValue {
                    field: format!("{} relevance", name),
                    value: format!(
                        "{} for user {} item {}",
                        bad.relevance, bad.user_id, bad.item_id
                    ),
                });
            }
        }

        Ok(Self {
            train,
            test,
            users,
            items,
            user_features,
            item_features,
        })
    }

    pub fn train(&self) -> &InteractionLog {
        &self.train
    }

    pub fn test(&self) -> &InteractionLog {
        &self.test
    }

    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.users
    }

    pub fn items(&self) -> &BTreeSet<ItemId> {
        &self.items
    }

    pub fn user_features(&self) -> Option<&FeatureTable> {
        self.user_features.as_ref()
    }

    pub fn item_features(&self) -> Option<&FeatureTable> {
        self.item_features.as_ref()
    }

    /// Verify that no (user, item, timestamp) triple occurs in both logs.
    ///
    /// Time-based splits guarantee this; random splits of logs with
    /// repeated triples may not.
    pub fn check_disjoint(&self) -> Result<()> {
        let train_triples: HashSet<(UserId, ItemId, Timestamp)> = self
            .train
            .iter()
            .map(|i| (i.user_id, i.item_id, i.timestamp))
            .collect();

        match self
            .test
            .iter()
            .find(|i| train_triples.contains(&(i.user_id, i.item_id, i.timestamp)))
        {
            Some(shared) => Err(DataLoadError::ValidationError(format!(
                "user {} item {} at {} is in both train and test",
                shared.user_id, shared.item_id, shared.timestamp
            ))),
            None => Ok(()),
        }
    }
}
