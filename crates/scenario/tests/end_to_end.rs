//! End-to-end search runs against a deterministic stub recommender.

use data_loader::{
    FeatureTable, Interaction, InteractionLog, ItemId, Recommendation, RecommendationTable,
    SplitData, UserId,
};
use models::{
    ModelConfig, ModelError, ParamDomain, ParamMap, ParamSpec, ParamValue, PopularRecommender,
    Recommender,
};
use parking_lot::Mutex;
use pipeline::{select_top_k, ScoringMetric, SeenItemsFilter};
use scenario::{
    Checkpoint, Direction, GridSampler, ParameterProposer, Sampler, Scenario, ScenarioConfig,
    ScenarioError, SearchLoop, SearchSpace, StudySnapshot, TrialFailurePolicy, TrialState,
};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Stubs
// =============================================================================

/// Scores every candidate pair with `alpha`
#[derive(Debug, Clone, Default)]
struct ConstantRecommender {
    alpha: f64,
    /// `fit` fails when alpha equals this value
    reject_alpha: Option<f64>,
}

impl ModelConfig for ConstantRecommender {
    fn schema(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("alpha", ParamDomain::Uniform(0.0, f64::MAX))]
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("alpha".to_string(), ParamValue::Float(self.alpha));
        params
    }

    fn assign(&mut self, name: &str, value: &ParamValue) -> models::Result<()> {
        match (name, value.as_f64()) {
            ("alpha", Some(alpha)) => {
                self.alpha = alpha;
                Ok(())
            }
            ("alpha", None) => Err(ModelError::InvalidParameter {
                name: name.to_string(),
                reason: "expected a number".to_string(),
            }),
            (other, _) => Err(ModelError::UnknownParameter(other.to_string())),
        }
    }
}

impl Recommender for ConstantRecommender {
    fn name(&self) -> &str {
        "ConstantRecommender"
    }

    fn search_space(&self) -> Vec<ParamSpec> {
        self.schema()
    }

    fn fit(
        &mut self,
        _log: &InteractionLog,
        _user_features: Option<&FeatureTable>,
        _item_features: Option<&FeatureTable>,
    ) -> models::Result<()> {
        if self.reject_alpha == Some(self.alpha) {
            return Err(ModelError::InvalidParameter {
                name: "alpha".to_string(),
                reason: format!("{} is rejected", self.alpha),
            });
        }
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
    ) -> models::Result<RecommendationTable> {
        let seen = SeenItemsFilter::new(log);
        let mut table = RecommendationTable::new();
        for &user_id in users {
            for &item_id in items {
                if filter_seen_items && seen.is_seen(user_id, item_id) {
                    continue;
                }
                table.push(Recommendation::new(user_id, item_id, self.alpha));
            }
        }
        Ok(select_top_k(&table, k))
    }

    fn clone_box(&self) -> Box<dyn Recommender> {
        Box::new(self.clone())
    }
}

impl fmt::Display for ConstantRecommender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstantRecommender")
    }
}

/// Sum of relevance over the users present in the ground truth
struct SumRelevance;

impl ScoringMetric for SumRelevance {
    fn name(&self) -> &str {
        "SumRelevance"
    }

    fn evaluate(
        &self,
        recommendations: &RecommendationTable,
        ground_truth: &InteractionLog,
        _k: usize,
    ) -> pipeline::Result<f64> {
        let users: HashSet<UserId> = ground_truth.iter().map(|i| i.user_id).collect();
        Ok(recommendations
            .iter()
            .filter(|r| users.contains(&r.user_id))
            .map(|r| r.relevance)
            .sum())
    }
}

struct OutOfRangeSampler;

struct OutOfRangeProposer;

impl ParameterProposer for OutOfRangeProposer {
    fn choose_index(&mut self, _name: &str, _low: usize, high: usize) -> usize {
        high + 1
    }
}

impl Sampler for OutOfRangeSampler {
    fn name(&self) -> &str {
        "OutOfRangeSampler"
    }

    fn proposer(&self, _trial_number: usize) -> Box<dyn ParameterProposer + Send> {
        Box::new(OutOfRangeProposer)
    }
}

#[derive(Default)]
struct CountingCheckpoint {
    saves: Mutex<usize>,
}

impl Checkpoint for CountingCheckpoint {
    fn save(&self, _snapshot: &StudySnapshot) -> scenario::Result<()> {
        *self.saves.lock() += 1;
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Train (1,1), (2,2), (1,3); only user 2 is in the test log
fn split_data() -> SplitData {
    let train = InteractionLog::from_interactions(vec![
        Interaction::new(1, 1, 1.0, 0),
        Interaction::new(2, 2, 1.0, 1),
        Interaction::new(1, 3, 1.0, 2),
    ]);
    let test = InteractionLog::from_interactions(vec![Interaction::new(2, 1, 1.0, 3)]);
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

fn alpha_space() -> SearchSpace {
    SearchSpace::new().with_param(
        "alpha",
        vec![ParamValue::Int(0), ParamValue::Int(50), ParamValue::Int(100)],
    )
}

fn grid_search(n_jobs: usize) -> SearchLoop {
    SearchLoop::new(2, 3)
        .with_n_jobs(n_jobs)
        .with_sampler(Arc::new(GridSampler))
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_search_selects_largest_alpha() {
    let split = split_data();
    let mut model = ConstantRecommender::default();

    let result = grid_search(1)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap();

    // user 2 has items 1 and 3 left after filtering
    assert_eq!(result.best_parameters["alpha"], ParamValue::Int(100));
    assert_eq!(result.best_value, 200.0);
    assert_eq!(result.trial_history.len(), 3);
    assert_eq!(result.trials.len(), 3);
}

#[test]
fn test_parallel_search_matches_sequential() {
    let split = split_data();
    let space = alpha_space();

    let mut sequential_model = ConstantRecommender::default();
    let sequential = grid_search(1)
        .run(&space, &split, &mut sequential_model, &SumRelevance, &[], None)
        .unwrap();

    let mut parallel_model = ConstantRecommender::default();
    let parallel = grid_search(2)
        .run(&space, &split, &mut parallel_model, &SumRelevance, &[], None)
        .unwrap();

    assert_eq!(parallel.best_parameters, sequential.best_parameters);
    assert_eq!(parallel.best_value, sequential.best_value);
    assert_eq!(parallel.trial_history.len(), 3);
    // workers own copies; the caller's instance is never bound
    assert_eq!(parallel_model.alpha, 0.0);
}

#[test]
fn test_labels_distinct_per_parameter_vector() {
    let split = split_data();
    let mut model = ConstantRecommender::default();
    let result = grid_search(1)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap();

    let labels: HashSet<&str> = result
        .trial_history
        .iter()
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(labels.len(), 3);
    assert!(labels.contains(r#"ConstantRecommender{"alpha": 100}"#));
}

#[test]
fn test_failed_trial_aborts_by_default() {
    let split = split_data();
    let mut model = ConstantRecommender {
        reject_alpha: Some(50.0),
        ..ConstantRecommender::default()
    };

    let err = grid_search(1)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Model(ModelError::InvalidParameter { .. })));
}

#[test]
fn test_skipped_trial_leaves_no_record() {
    let split = split_data();
    let mut model = ConstantRecommender {
        reject_alpha: Some(50.0),
        ..ConstantRecommender::default()
    };

    let result = grid_search(1)
        .with_failure_policy(TrialFailurePolicy::Skip)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap();

    assert_eq!(result.trial_history.len(), 2);
    assert!(result.trial_history.iter().all(|r| !r.label.contains("50")));
    assert_eq!(result.trials[1].state, TrialState::Failed);
    assert_eq!(result.best_value, 200.0);
}

#[test]
fn test_out_of_range_proposal_is_fatal() {
    let split = split_data();
    let mut model = ConstantRecommender::default();

    let err = grid_search(1)
        .with_sampler(Arc::new(OutOfRangeSampler))
        .with_failure_policy(TrialFailurePolicy::Skip)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap_err();

    assert!(matches!(
        err,
        ScenarioError::ProposalOutOfRange { index: 3, len: 3, .. }
    ));
}

#[test]
fn test_minimize_direction() {
    let split = split_data();
    let mut model = ConstantRecommender::default();
    let result = grid_search(1)
        .with_direction(Direction::Minimize)
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap();

    assert_eq!(result.best_parameters["alpha"], ParamValue::Int(0));
    assert_eq!(result.best_value, 0.0);
}

#[test]
fn test_fallback_fills_remaining_slots() {
    let split = split_data();
    let mut model = ConstantRecommender::default();
    let space = SearchSpace::new().with_param("alpha", vec![ParamValue::Int(1)]);
    let fallback = RecommendationTable::from_rows(vec![
        Recommendation::new(2, 2, 5.0),
        Recommendation::new(2, 1, 4.0),
    ]);

    let result = SearchLoop::new(3, 1)
        .run(&space, &split, &mut model, &SumRelevance, &[], Some(&fallback))
        .unwrap();

    let recs = &result.trial_history[0].recommendations;
    let user_2: Vec<&Recommendation> = recs.iter().filter(|r| r.user_id == 2).collect();
    assert_eq!(user_2.len(), 3);
    // primary rows shifted by 10 * 5.0 outrank the fallback-only item 2
    assert_eq!(user_2[2].item_id, 2);
    assert_eq!(user_2[2].relevance, 5.0);
    assert_eq!(recs.relevance_of(2, 1), Some(51.0));
}

#[test]
fn test_checkpoint_saved_before_every_trial() {
    let split = split_data();
    let mut model = ConstantRecommender::default();
    let checkpoint = Arc::new(CountingCheckpoint::default());

    grid_search(1)
        .with_checkpoint(checkpoint.clone())
        .run(&alpha_space(), &split, &mut model, &SumRelevance, &[], None)
        .unwrap();

    assert_eq!(*checkpoint.saves.lock(), 3);
}

#[test]
fn test_scenario_research_then_production() {
    let log = InteractionLog::from_interactions(vec![
        Interaction::new(1, 1, 1.0, 1),
        Interaction::new(1, 2, 1.0, 2),
        Interaction::new(2, 1, 1.0, 3),
        Interaction::new(3, 2, 1.0, 4),
        Interaction::new(2, 3, 1.0, 5),
        Interaction::new(3, 1, 1.0, 6),
    ]);
    let config = ScenarioConfig::from_json(
        r#"{"k": 2, "n_trials": 2, "sampler": "grid", "metrics": ["Precision", "NDCG"],
            "split": {"how_to_split": "by_date", "test_start": 5}}"#,
    )
    .unwrap();
    let scenario = Scenario::new(config)
        .with_fallback_recommender(Box::new(ConstantRecommender::default()));

    let mut model = PopularRecommender::new();
    let space = SearchSpace::new().with_param(
        "alpha",
        vec![ParamValue::Float(0.0), ParamValue::Float(1.0)],
    );
    let result = scenario
        .research(&mut model, &space, &log, None, None, None, None)
        .unwrap();

    assert_eq!(result.trial_history.len(), 2);
    let metrics = &result.trial_history[0].metrics;
    assert!(metrics.contains_key("HitRate@2"));
    assert!(metrics.contains_key("Precision@2"));
    assert!(metrics.contains_key("NDCG@2"));

    let recs = scenario
        .production(&model, &result.best_parameters, &log, None, None, None, None)
        .unwrap();
    assert_eq!(recs.users().len(), 3);
    assert!(recs.iter().all(|r| r.relevance.is_finite()));
}
