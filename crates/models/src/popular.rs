//! Popularity baseline.
//!
//! ## Algorithm
//! relevance(item) = (interaction count of item + alpha) / (log size + beta)
//!
//! The score does not depend on the user, so every candidate user gets the
//! same ranking minus the items they have already seen. `alpha` smooths
//! items that never occur in the training log.

use crate::error::{ModelError, Result};
use crate::params::{wrong_kind, ModelConfig, ParamDomain, ParamMap, ParamSpec, ParamValue};
use crate::scoring::score_candidates;
use crate::traits::Recommender;
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default)]
pub struct PopularRecommender {
    alpha: f64,
    beta: f64,
    item_counts: Option<HashMap<ItemId, usize>>,
    log_size: usize,
}

impl PopularRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl ModelConfig for PopularRecommender {
    fn schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("alpha", ParamDomain::Uniform(0.0, f64::MAX)),
            ParamSpec::new("beta", ParamDomain::Uniform(0.0, f64::MAX)),
        ]
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("alpha".to_string(), ParamValue::Float(self.alpha));
        params.insert("beta".to_string(), ParamValue::Float(self.beta));
        params
    }

    fn assign(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let v = value.as_f64().ok_or_else(|| wrong_kind(name, value, "a number"))?;
        match name {
            "alpha" => self.alpha = v,
            "beta" => self.beta = v,
            other => return Err(ModelError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }
}

impl Recommender for PopularRecommender {
    fn name(&self) -> &str {
        "PopularRecommender"
    }

    fn search_space(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("alpha", ParamDomain::Uniform(0.0, 100.0)),
            ParamSpec::new("beta", ParamDomain::Uniform(0.0, 100.0)),
        ]
    }

    #[instrument(skip_all, fields(rows = log.len()))]
    fn fit(
        &mut self,
        log: &InteractionLog,
        _user_features: Option<&FeatureTable>,
        _item_features: Option<&FeatureTable>,
    ) -> Result<()> {
        if log.is_empty() {
            return Err(ModelError::EmptyLog(self.name().to_string()));
        }

        let mut counts: HashMap<ItemId, usize> = HashMap::new();
        for interaction in log.iter() {
            *counts.entry(interaction.item_id).or_insert(0) += 1;
        }
        debug!("Counted {} distinct items", counts.len());

        self.item_counts = Some(counts);
        self.log_size = log.len();
        Ok(())
    }

    fn predict(
        &self,
        log: &InteractionLog,
        k: usize,
        users: &BTreeSet<UserId>,
        items: &BTreeSet<ItemId>,
        _user_features: Option<&FeatureTable>,
        _item_features: Option<&FeatureTable>,
        filter_seen_items: bool,
    ) -> Result<RecommendationTable> {
        let counts = self
            .item_counts
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.name().to_string()))?;
        let denominator = self.log_size as f64 + self.beta;

        Ok(score_candidates(log, k, users, items, filter_seen_items, |_, item_id| {
            let count = counts.get(&item_id).copied().unwrap_or(0) as f64;
            Some((count + self.alpha) / denominator)
        }))
    }

    fn clone_box(&self) -> Box<dyn Recommender> {
        Box::new(self.clone())
    }
}

impl fmt::Display for PopularRecommender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PopularRecommender")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Interaction;

    fn log() -> InteractionLog {
        InteractionLog::from_interactions(vec![
            Interaction::new(1, 1, 1.0, 0),
            Interaction::new(2, 1, 1.0, 1),
            Interaction::new(2, 2, 1.0, 2),
            Interaction::new(3, 3, 1.0, 3),
        ])
    }

    #[test]
    fn test_popularity_order() {
        let mut model = PopularRecommender::new();
        let log = log();
        let users: BTreeSet<UserId> = [3].into_iter().collect();
        let items = log.items();

        let recs = model
            .fit_predict(&log, 2, &users, &items, None, None, true)
            .unwrap();

        let ranked: Vec<_> = recs.iter().map(|r| r.item_id).collect();
        assert_eq!(ranked, vec![1, 2]);
        assert!((recs.rows()[0].relevance - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing() {
        let mut model = PopularRecommender::new().with_alpha(1.0).with_beta(4.0);
        let log = log();
        let users: BTreeSet<UserId> = [1].into_iter().collect();
        let items: BTreeSet<ItemId> = [9].into_iter().collect();

        let recs = model
            .fit_predict(&log, 1, &users, &items, None, None, true)
            .unwrap();
        // unseen item: (0 + 1) / (4 + 4)
        assert!((recs.rows()[0].relevance - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = PopularRecommender::new();
        let err = model
            .predict(&log(), 1, &BTreeSet::new(), &BTreeSet::new(), None, None, true)
            .unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
    }

    #[test]
    fn test_set_params() {
        let mut model = PopularRecommender::new();
        let mut params = ParamMap::new();
        params.insert("alpha".to_string(), ParamValue::Int(50));
        model.set_params(&params).unwrap();

        assert_eq!(model.alpha(), 50.0);
        assert_eq!(model.params()["alpha"], ParamValue::Float(50.0));
    }
}
