//! Discrete hyperparameter search spaces.
//!
//! A search space maps each parameter name to a finite list of candidate
//! values; the optimizer picks an index into each list per trial. Names are
//! kept in sorted order, so every trial asks for parameters in the same
//! order.

use crate::error::{Result, ScenarioError};
use models::{ParamMap, ParamSpec, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping from parameter name to candidate values.
///
/// Deserializes from `{"alpha": [0, 50, 100], "beta": [1.0]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchSpace {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter (builder pattern)
    pub fn with_param(mut self, name: impl Into<String>, candidates: Vec<ParamValue>) -> Self {
        self.insert(name, candidates);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, candidates: Vec<ParamValue>) {
        self.params.insert(name.into(), candidates);
    }

    /// Discretise declared parameter domains into `n_points` candidates each
    pub fn from_specs(specs: &[ParamSpec], n_points: usize) -> Self {
        let params = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.domain.candidates(n_points)))
            .collect();
        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&[ParamValue]> {
        self.params.get(name).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<ParamValue>)> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of distinct parameter combinations
    pub fn grid_size(&self) -> usize {
        self.params.values().map(|c| c.len()).product()
    }

    /// Reject parameters without candidates
    pub fn validate(&self) -> Result<()> {
        match self.params.iter().find(|(_, candidates)| candidates.is_empty()) {
            Some((name, _)) => Err(ScenarioError::Configuration(format!(
                "search space parameter {} has no candidates",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Value of candidate `index` for `name`
    pub fn resolve_one(&self, name: &str, index: usize) -> Result<ParamValue> {
        let candidates = self.params.get(name).ok_or_else(|| {
            ScenarioError::Configuration(format!("parameter {} is not in the search space", name))
        })?;
        candidates
            .get(index)
            .cloned()
            .ok_or_else(|| ScenarioError::ProposalOutOfRange {
                name: name.to_string(),
                index,
                len: candidates.len(),
            })
    }

    /// Translate recorded candidate indices back into values
    pub fn resolve(&self, indices: &BTreeMap<String, usize>) -> Result<ParamMap> {
        indices
            .iter()
            .map(|(name, &index)| Ok((name.clone(), self.resolve_one(name, index)?)))
            .collect()
    }
}
