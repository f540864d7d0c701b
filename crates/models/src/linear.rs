//! Logistic regression over user and item side features.
//!
//! ## Algorithm
//! 1. Join the log with both feature tables; each row's features are the
//!    user's features followed by the item's, its label the relevance
//! 2. Fit weights and intercept by full-batch gradient descent on the
//!    log-loss with an elastic-net penalty:
//!    `lambda * (elastic_net * |w|_1 + (1 - elastic_net) / 2 * |w|_2^2)`
//!    (the L1 part applied as a proximal soft-threshold step)
//! 3. Relevance of a candidate pair is the predicted probability of label 1
//!
//! Labels must be 0 or 1. Pairs missing either side's features are skipped
//! both in training and in prediction.

use crate::error::{ModelError, Result};
use crate::params::{wrong_kind, ModelConfig, ParamDomain, ParamMap, ParamSpec, ParamValue};
use crate::scoring::score_candidates;
use crate::traits::Recommender;
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use pipeline::FeatureAssembler;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, instrument};

const LEARNING_RATE: f64 = 0.5;

#[derive(Debug, Clone)]
struct Weights {
    coefficients: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LinearRecommender {
    lambda_param: f64,
    elastic_net_param: f64,
    num_iter: usize,
    weights: Option<Weights>,
}

impl Default for LinearRecommender {
    fn default() -> Self {
        Self {
            lambda_param: 0.0,
            elastic_net_param: 0.0,
            num_iter: 100,
            weights: None,
        }
    }
}

impl LinearRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lambda_param(mut self, lambda_param: f64) -> Self {
        self.lambda_param = lambda_param;
        self
    }

    pub fn with_elastic_net_param(mut self, elastic_net_param: f64) -> Self {
        self.elastic_net_param = elastic_net_param;
        self
    }

    pub fn with_num_iter(mut self, num_iter: usize) -> Self {
        self.num_iter = num_iter;
        self
    }

    fn require_features<'a>(
        &self,
        user_features: Option<&'a FeatureTable>,
        item_features: Option<&'a FeatureTable>,
    ) -> Result<FeatureAssembler<'a>> {
        let missing = |side| ModelError::MissingFeatures {
            model: self.name().to_string(),
            side,
        };
        let users = user_features.ok_or_else(|| missing("user"))?;
        let items = item_features.ok_or_else(|| missing("item"))?;
        Ok(FeatureAssembler::new(users, items))
    }
}

impl ModelConfig for LinearRecommender {
    fn schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("lambda_param", ParamDomain::Uniform(0.0, f64::MAX)),
            ParamSpec::new("elastic_net_param", ParamDomain::Uniform(0.0, 1.0)),
            ParamSpec::new("num_iter", ParamDomain::UniformInt(1, 100_000)),
        ]
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("lambda_param".to_string(), ParamValue::Float(self.lambda_param));
        params.insert(
            "elastic_net_param".to_string(),
            ParamValue::Float(self.elastic_net_param),
        );
        params.insert("num_iter".to_string(), ParamValue::Int(self.num_iter as i64));
        params
    }

    fn assign(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "lambda_param" => {
                self.lambda_param = value.as_f64().ok_or_else(|| wrong_kind(name, value, "a number"))?
            }
            "elastic_net_param" => {
                self.elastic_net_param =
                    value.as_f64().ok_or_else(|| wrong_kind(name, value, "a number"))?
            }
            "num_iter" => {
                self.num_iter =
                    value.as_i64().ok_or_else(|| wrong_kind(name, value, "an integer"))? as usize
            }
            other => return Err(ModelError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }
}

impl Recommender for LinearRecommender {
    fn name(&self) -> &str {
        "LinearRecommender"
    }

    fn search_space(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("lambda_param", ParamDomain::LogUniform(1e-4, 1.0)),
            ParamSpec::new("elastic_net_param", ParamDomain::Uniform(0.0, 1.0)),
        ]
    }

    #[instrument(skip_all, fields(rows = log.len()))]
    fn fit(
        &mut self,
        log: &InteractionLog,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
    ) -> Result<()> {
        let assembler = self.require_features(user_features, item_features)?;

        if let Some(bad) = log
            .iter()
            .find(|i| i.relevance != 0.0 && i.relevance != 1.0)
        {
            return Err(ModelError::InvalidLabel {
                user_id: bad.user_id,
                item_id: bad.item_id,
                value: bad.relevance,
            });
        }

        let rows = assembler.assemble_log(log);
        if rows.is_empty() {
            return Err(ModelError::EmptyLog(self.name().to_string()));
        }
        debug!("Training on {} rows with {} features", rows.len(), assembler.dim());

        let dim = assembler.dim();
        let n = rows.len() as f64;
        let l1 = self.lambda_param * self.elastic_net_param;
        let l2 = self.lambda_param * (1.0 - self.elastic_net_param);
        let mut weights = Weights {
            coefficients: vec![0.0; dim],
            intercept: 0.0,
        };

        for _ in 0..self.num_iter {
            let (grad, grad_intercept) = rows
                .par_iter()
                .fold(
                    || (vec![0.0; dim], 0.0),
                    |(mut grad, mut grad_b), (x, label)| {
                        let error = weights.probability(x) - label;
                        for (g, xi) in grad.iter_mut().zip(x) {
                            *g += error * xi;
                        }
                        grad_b += error;
                        (grad, grad_b)
                    },
                )
                .reduce(
                    || (vec![0.0; dim], 0.0),
                    |(mut a, a_b), (b, b_b)| {
                        for (x, y) in a.iter_mut().zip(&b) {
                            *x += y;
                        }
                        (a, a_b + b_b)
                    },
                );

            for (w, g) in weights.coefficients.iter_mut().zip(&grad) {
                let step = *w - LEARNING_RATE * (g / n + l2 * *w);
                *w = soft_threshold(step, LEARNING_RATE * l1);
            }
            weights.intercept -= LEARNING_RATE * grad_intercept / n;
        }

        self.weights = Some(weights);
        Ok(())
    }

    fn predict(
        &self,
        log: &InteractionLog,
        k: usize,
        users: &BTreeSet<UserId>,
        items: &BTreeSet<ItemId>,
        user_features: Option<&FeatureTable>,
        item_features: Option<&FeatureTable>,
        filter_seen_items: bool,
    ) -> Result<RecommendationTable> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.name().to_string()))?;
        let assembler = self.require_features(user_features, item_features)?;

        Ok(score_candidates(log, k, users, items, filter_seen_items, |user_id, item_id| {
            assembler
                .assemble(user_id, item_id)
                .map(|x| weights.probability(&x).max(0.0))
        }))
    }

    fn clone_box(&self) -> Box<dyn Recommender> {
        Box::new(self.clone())
    }
}

impl Weights {
    fn probability(&self, x: &[f64]) -> f64 {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(x)
            .map(|(w, xi)| w * xi)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-z).exp())
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl fmt::Display for LinearRecommender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinearRecommender")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Interaction;

    /// Users and items each carry one feature; label 1 iff both are positive
    fn setup() -> (InteractionLog, FeatureTable, FeatureTable) {
        let mut users = FeatureTable::new();
        users.insert(1, vec![1.0]).unwrap();
        users.insert(2, vec![-1.0]).unwrap();

        let mut items = FeatureTable::new();
        items.insert(10, vec![1.0]).unwrap();
        items.insert(20, vec![-1.0]).unwrap();

        let log = InteractionLog::from_interactions(vec![
            Interaction::new(1, 10, 1.0, 0),
            Interaction::new(1, 20, 0.0, 1),
            Interaction::new(2, 10, 0.0, 2),
            Interaction::new(2, 20, 0.0, 3),
        ]);
        (log, users, items)
    }

    #[test]
    fn test_learns_positive_pair() {
        let (log, users, items) = setup();
        let mut model = LinearRecommender::new().with_num_iter(500);
        model.fit(&log, Some(&users), Some(&items)).unwrap();

        let user_ids: BTreeSet<UserId> = [1].into_iter().collect();
        let item_ids: BTreeSet<ItemId> = [10, 20].into_iter().collect();
        let recs = model
            .predict(&log, 2, &user_ids, &item_ids, Some(&users), Some(&items), false)
            .unwrap();

        assert_eq!(recs.rows()[0].item_id, 10);
        assert!(recs.iter().all(|r| (0.0..=1.0).contains(&r.relevance)));
    }

    #[test]
    fn test_requires_features() {
        let (log, users, _) = setup();
        let err = LinearRecommender::new()
            .fit(&log, Some(&users), None)
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingFeatures { side: "item", .. }));
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (_, users, items) = setup();
        let log = InteractionLog::from_interactions(vec![Interaction::new(1, 10, 4.0, 0)]);

        let err = LinearRecommender::new()
            .fit(&log, Some(&users), Some(&items))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidLabel { value, .. } if value == 4.0));
    }

    #[test]
    fn test_strong_l1_zeroes_weights() {
        let (log, users, items) = setup();
        let mut model = LinearRecommender::new()
            .with_lambda_param(10.0)
            .with_elastic_net_param(1.0)
            .with_num_iter(50);
        model.fit(&log, Some(&users), Some(&items)).unwrap();

        let weights = model.weights.as_ref().unwrap();
        assert!(weights.coefficients.iter().all(|w| *w == 0.0));
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }
}
