//! The recommender capability.
//!
//! A recommender is a typed parameter struct ([`ModelConfig`]) that can be
//! fitted on an interaction log and asked for top-K recommendations.
//! Search workers each own a recommender; `clone_box` gives a new worker
//! its own instance.

use crate::error::Result;
use crate::params::{ModelConfig, ParamMap, ParamSpec};
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use std::collections::BTreeSet;
use std::fmt;

pub trait Recommender: ModelConfig + Send + fmt::Display {
    /// Returns the name of this recommender (for logging/debugging)
    fn name(&self) -> &str;

    /// Default hyperparameter domains to search over
    fn search_space(&self) -> Vec<ParamSpec>;

    /// Bind new parameter values; nothing changes if any value is invalid
    fn set_params(&mut self, params: &ParamMap) -> Result<()> {
        self.apply(params)
    }

    /// Train on `log`, replacing any previously fitted state
    fn fit(
        &mut self,
        log: &InteractionLog,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
    ) -> Result<()>;

    /// Score candidate (user, item) pairs and keep the top `k` per user.
    ///
    /// With `filter_seen_items`, pairs present in `log` are never returned.
    #[allow(clippy::too_many_arguments)]
    fn predict(
        &self,
        log: &InteractionLog,
        k: usize,
        users: &BTreeSet<UserId>,
        items: &BTreeSet<ItemId>,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
        filter_seen_items: bool,
    ) -> Result<RecommendationTable>;

    /// `fit` followed by `predict` on the same log
    #[allow(clippy::too_many_arguments)]
    fn fit_predict(
        &mut self,
        log: &InteractionLog,
        k: usize,
        users: &BTreeSet<UserId>,
        items: &BTreeSet<ItemId>,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
        filter_seen_items: bool,
    ) -> Result<RecommendationTable> {
        self.fit(log, user_features, item_features)?;
        self.predict(
            log,
            k,
            users,
            items,
            user_features,
            item_features,
            filter_seen_items,
        )
    }

    /// Independent copy for another search worker
    fn clone_box(&self) -> Box<dyn Recommender>;
}

impl Clone for Box<dyn Recommender> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
