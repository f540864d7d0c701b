//! One trial of hyperparameter search.
//!
//! ## Algorithm
//! 1. Propose: pick a candidate index for every search-space parameter
//! 2. Bind the parameters to the recommender
//! 3. Fit on the train log
//! 4. Predict for the candidate users and items
//! 5. Merge fallback recommendations, if any
//! 6. Score the criterion against the test log
//! 7. Record the trial in the experiment log
//! 8. Return the criterion value
//!
//! Any error stops the trial before step 7, so a failed trial never leaves
//! a record behind.
//!
//! [`MainObjective`] holds everything shared by all trials of a run and is
//! read-only; the recommender a trial mutates belongs to the worker running
//! it ([`TrialWorker`]).

use crate::error::{Result, ScenarioError};
use crate::experiment::{Experiment, TrialRecord};
use crate::search_space::SearchSpace;
use crate::study::{Objective, ParameterProposer, Trial};
use data_loader::{RecommendationTable, SplitData};
use models::{format_params, ParamMap, Recommender};
use pipeline::{validate_table, FallbackMerger, ScoringMetric, TableRole};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub struct MainObjective<'a> {
    search_space: &'a SearchSpace,
    split_data: &'a SplitData,
    criterion: &'a dyn ScoringMetric,
    metrics: &'a [Box<dyn ScoringMetric>],
    fallback: Option<&'a RecommendationTable>,
    fallback_max_relevance: f64,
    k: usize,
    filter_seen_items: bool,
    experiment: &'a Experiment,
}

impl<'a> MainObjective<'a> {
    /// Validate the setup and capture the fallback maximum once.
    pub fn new(
        search_space: &'a SearchSpace,
        split_data: &'a SplitData,
        criterion: &'a dyn ScoringMetric,
        metrics: &'a [Box<dyn ScoringMetric>],
        fallback: Option<&'a RecommendationTable>,
        k: usize,
        experiment: &'a Experiment,
    ) -> Result<Self> {
        if k == 0 {
            return Err(ScenarioError::Configuration(
                "k must be positive".to_string(),
            ));
        }
        search_space.validate()?;
        if let Some(table) = fallback {
            validate_table(table, TableRole::Fallback)?;
        }

        Ok(Self {
            search_space,
            split_data,
            criterion,
            metrics,
            fallback,
            fallback_max_relevance: FallbackMerger::max_relevance(fallback),
            k,
            filter_seen_items: true,
            experiment,
        })
    }

    /// Drop already seen items at prediction time (default: true)
    pub fn with_filter_seen_items(mut self, filter: bool) -> Self {
        self.filter_seen_items = filter;
        self
    }

    pub fn fallback_max_relevance(&self) -> f64 {
        self.fallback_max_relevance
    }

    /// Resolve one candidate per search-space parameter
    pub fn propose(&self, proposer: &mut dyn ParameterProposer) -> Result<ParamMap> {
        let mut params = ParamMap::new();
        for (name, candidates) in self.search_space.iter() {
            let index = proposer.choose_index(name, 0, candidates.len() - 1);
            let value = self.search_space.resolve_one(name, index)?;
            params.insert(name.clone(), value);
        }
        Ok(params)
    }

    /// Run one full trial against `recommender`
    #[instrument(skip_all, fields(recommender = recommender.name()))]
    pub fn run_trial(
        &self,
        recommender: &mut dyn Recommender,
        proposer: &mut dyn ParameterProposer,
    ) -> Result<f64> {
        let params = self.propose(proposer)?;
        debug!("Trial parameters: {}", format_params(&params));
        recommender.set_params(&params)?;

        let split = self.split_data;
        recommender.fit(split.train(), split.user_features(), split.item_features())?;
        let recs = recommender.predict(
            split.train(),
            self.k,
            split.users(),
            split.items(),
            split.user_features(),
            split.item_features(),
            self.filter_seen_items,
        )?;

        debug!("Predicted {} rows", recs.len());
        let recs = FallbackMerger::merge(&recs, self.fallback, self.k, self.fallback_max_relevance)?;
        debug!("{} rows after fallback merge", recs.len());

        let value = self.criterion.evaluate(&recs, split.test(), self.k)?;
        let mut metrics = BTreeMap::new();
        metrics.insert(self.criterion.label(self.k), value);
        for metric in self.metrics {
            let extra = metric.evaluate(&recs, split.test(), self.k)?;
            metrics.insert(metric.label(self.k), extra);
        }
        debug!("{} = {}", self.criterion.label(self.k), value);

        self.experiment.append(TrialRecord {
            label: format!("{}{}", recommender, format_params(&params)),
            recommendations: recs,
            metrics,
        });
        Ok(value)
    }
}

/// A search worker: the shared objective plus the worker's own recommender
pub struct TrialWorker<'a> {
    objective: &'a MainObjective<'a>,
    recommender: &'a mut dyn Recommender,
}

impl<'a> TrialWorker<'a> {
    pub fn new(objective: &'a MainObjective<'a>, recommender: &'a mut dyn Recommender) -> Self {
        Self {
            objective,
            recommender,
        }
    }
}

impl Objective for TrialWorker<'_> {
    fn call(&mut self, trial: &mut Trial) -> Result<f64> {
        self.objective.run_trial(self.recommender, trial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::{GridSampler, Sampler};
    use data_loader::{Interaction, InteractionLog};
    use models::{LinearRecommender, ModelError, ParamValue, PopularRecommender};
    use pipeline::metrics::{HitRate, Precision};

    struct OutOfRange;

    impl ParameterProposer for OutOfRange {
        fn choose_index(&mut self, _name: &str, _low: usize, high: usize) -> usize {
            high + 1
        }
    }

    fn split() -> SplitData {
        let train = InteractionLog::from_interactions(vec![
            Interaction::new(1, 1, 1.0, 0),
            Interaction::new(2, 2, 1.0, 1),
            Interaction::new(1, 3, 1.0, 2),
            Interaction::new(2, 3, 1.0, 3),
        ]);
        let test = InteractionLog::from_interactions(vec![
            Interaction::new(1, 2, 1.0, 4),
            Interaction::new(2, 1, 1.0, 5),
        ]);
        SplitData::new(
            train,
            test,
            [1, 2].into_iter().collect(),
            [1, 2, 3].into_iter().collect(),
            None,
            None,
        )
        .unwrap()
    }

    fn space() -> SearchSpace {
        SearchSpace::new().with_param("alpha", vec![ParamValue::Float(0.0), ParamValue::Float(5.0)])
    }

    #[test]
    fn test_trial_records_label_and_metrics() {
        let (space, split, experiment) = (space(), split(), Experiment::new());
        let metrics: Vec<Box<dyn ScoringMetric>> = vec![Box::new(Precision)];
        let objective =
            MainObjective::new(&space, &split, &HitRate, &metrics, None, 1, &experiment).unwrap();

        let mut model = PopularRecommender::new();
        let mut proposer = GridSampler.proposer(1);
        let value = objective.run_trial(&mut model, proposer.as_mut()).unwrap();

        // both users have exactly one unseen item left, and it is in test
        assert_eq!(value, 1.0);
        assert_eq!(model.alpha(), 5.0);

        let record = &experiment.records()[0];
        assert_eq!(record.label, r#"PopularRecommender{"alpha": 5.0}"#);
        assert_eq!(record.metrics["HitRate@1"], 1.0);
        assert_eq!(record.metrics["Precision@1"], 1.0);
        assert_eq!(record.recommendations.len(), 2);
    }

    #[test]
    fn test_failed_fit_leaves_no_record() {
        let (split, experiment) = (split(), Experiment::new());
        let space = SearchSpace::new();
        let objective =
            MainObjective::new(&space, &split, &HitRate, &[], None, 1, &experiment).unwrap();

        let mut model = LinearRecommender::new();
        let err = objective
            .run_trial(&mut model, GridSampler.proposer(0).as_mut())
            .unwrap_err();

        assert!(matches!(err, ScenarioError::Model(ModelError::MissingFeatures { .. })));
        assert!(experiment.is_empty());
    }

    #[test]
    fn test_out_of_range_proposal() {
        let (space, split, experiment) = (space(), split(), Experiment::new());
        let objective =
            MainObjective::new(&space, &split, &HitRate, &[], None, 1, &experiment).unwrap();

        let err = objective.propose(&mut OutOfRange).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::ProposalOutOfRange { index: 2, len: 2, .. }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_construction_checks() {
        let (space, split, experiment) = (space(), split(), Experiment::new());
        let zero_k = MainObjective::new(&space, &split, &HitRate, &[], None, 0, &experiment);
        assert!(matches!(zero_k, Err(ScenarioError::Configuration(_))));

        let empty = SearchSpace::new().with_param("alpha", Vec::new());
        let result = MainObjective::new(&empty, &split, &HitRate, &[], None, 1, &experiment);
        assert!(matches!(result, Err(ScenarioError::Configuration(_))));
    }

    #[test]
    fn test_fallback_max_captured_once() {
        let (space, split, experiment) = (space(), split(), Experiment::new());
        let fallback = RecommendationTable::from_rows(vec![
            data_loader::Recommendation::new(1, 2, 0.5),
            data_loader::Recommendation::new(2, 1, 3.0),
        ]);
        let objective = MainObjective::new(
            &space,
            &split,
            &HitRate,
            &[],
            Some(&fallback),
            1,
            &experiment,
        )
        .unwrap();
        assert_eq!(objective.fallback_max_relevance(), 3.0);
    }
}
