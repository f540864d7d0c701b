//! Reproduce the best configuration on the full log.
//!
//! One fit and one predict with fixed parameters. No split, no fallback
//! merge, no scoring.

use crate::error::{Result, ScenarioError};
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use models::{format_params, ParamMap, Recommender};
use std::collections::BTreeSet;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy)]
pub struct ProductionReplay {
    k: usize,
    filter_seen_items: bool,
}

impl ProductionReplay {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            filter_seen_items: true,
        }
    }

    pub fn with_filter_seen_items(mut self, filter: bool) -> Self {
        self.filter_seen_items = filter;
        self
    }

    /// Fit a fresh copy of `prototype` with `best_parameters` on `log`.
    ///
    /// `users`/`items` default to every user/item of `log`. The prototype
    /// itself is not modified.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(recommender = prototype.name(), rows = log.len()))]
    pub fn produce(
        &self,
        prototype: &dyn Recommender,
        best_parameters: &ParamMap,
        log: &InteractionLog,
        users: Option<&BTreeSet<UserId>>,
        items: Option<&BTreeSet<ItemId>>,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
    ) -> Result<RecommendationTable> {
        if self.k == 0 {
            return Err(ScenarioError::Configuration(
                "k must be positive".to_string(),
            ));
        }

        let mut model = prototype.clone_box();
        model.set_params(best_parameters)?;
        info!("Production fit of {}{}", model, format_params(best_parameters));

        let default_users;
        let users = match users {
            Some(users) => users,
            None => {
                default_users = log.users();
                &default_users
            }
        };
        let default_items;
        let items = match items {
            Some(items) => items,
            None => {
                default_items = log.items();
                &default_items
            }
        };

        let recs = model.fit_predict(
            log,
            self.k,
            users,
            items,
            user_features,
            item_features,
            self.filter_seen_items,
        )?;
        info!("Produced {} recommendations for {} users", recs.len(), recs.users().len());
        Ok(recs)
    }
}
