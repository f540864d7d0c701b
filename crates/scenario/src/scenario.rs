//! # Scenario Driver
//!
//! Ties a recommender, a validation split and a metric together:
//! 1. Split the log per [`ScenarioConfig`]
//! 2. Default candidate users/items from the full log
//! 3. Fit the fallback recommender on train and predict, if one is set
//! 4. Run the [`SearchLoop`]
//! 5. On request, refit the best configuration on the full log
//!
//! Steps 1-4 are `research`, step 5 is `production`.

use crate::checkpoint::Checkpoint;
use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::production::ProductionReplay;
use crate::search::SearchResult;
use crate::search_space::SearchSpace;
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use models::{ParamMap, Recommender};
use splitters::build_split_data;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

pub struct Scenario {
    config: ScenarioConfig,
    fallback_recommender: Option<Box<dyn Recommender>>,
    checkpoint: Option<Arc<dyn Checkpoint>>,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            fallback_recommender: None,
            checkpoint: None,
        }
    }

    /// Recommender whose predictions fill gaps left by the tuned one
    pub fn with_fallback_recommender(mut self, recommender: Box<dyn Recommender>) -> Self {
        self.fallback_recommender = Some(recommender);
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn Checkpoint>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Search `search_space` for the best parameters of `recommender`
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(recommender = recommender.name(), rows = log.len()))]
    pub fn research(
        &self,
        recommender: &mut dyn Recommender,
        search_space: &SearchSpace,
        log: &InteractionLog,
        users: Option<BTreeSet<UserId>>,
        items: Option<BTreeSet<ItemId>>,
        user_features: Option<FeatureTable>,
        item_features: Option<FeatureTable>,
    ) -> Result<SearchResult> {
        let start = Instant::now();
        let config = &self.config;
        config.validate()?;

        // Step 1-2: split once, shared read-only by every trial
        let method = config.split.method(config.seed)?;
        let split = build_split_data(
            &config.split.splitter(),
            log,
            method,
            users,
            items,
            user_features,
            item_features,
        )?;

        // Step 3: fallback recommendations, computed once
        let fallback = match &self.fallback_recommender {
            Some(prototype) => {
                let mut model = prototype.clone_box();
                let recs = model.fit_predict(
                    split.train(),
                    config.k,
                    split.users(),
                    split.items(),
                    split.user_features(),
                    split.item_features(),
                    config.filter_seen_items,
                )?;
                info!("Fallback {} produced {} rows", model, recs.len());
                Some(recs)
            }
            None => None,
        };

        // Step 4: search
        let criterion = config.criterion()?;
        let metrics = config.extra_metrics()?;
        let mut search = config.search_loop();
        if let Some(checkpoint) = &self.checkpoint {
            search = search.with_checkpoint(Arc::clone(checkpoint));
        }
        let result = search.run(
            search_space,
            &split,
            recommender,
            criterion.as_ref(),
            &metrics,
            fallback.as_ref(),
        )?;

        info!("Research finished in {:?}", start.elapsed());
        Ok(result)
    }

    /// Refit `recommender` with `best_parameters` on the full log
    #[allow(clippy::too_many_arguments)]
    pub fn production(
        &self,
        recommender: &dyn Recommender,
        best_parameters: &ParamMap,
        log: &InteractionLog,
        users: Option<&BTreeSet<UserId>>,
        items: Option<&BTreeSet<ItemId>>,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
    ) -> Result<RecommendationTable> {
        ProductionReplay::new(self.config.k)
            .with_filter_seen_items(self.config.filter_seen_items)
            .produce(
                recommender,
                best_parameters,
                log,
                users,
                items,
                user_features,
                item_features,
            )
    }
}
