//! Implicit-feedback matrix factorisation (alternating least squares).
//!
//! ## Algorithm
//! Interactions become confidences `c = 1 + alpha * r` for observed
//! (user, item) pairs, with preference 1 for observed pairs and 0 elsewhere.
//! Starting from small random factors, each iteration
//! 1. Solves every user vector against the fixed item factors
//! 2. Solves every item vector against the fixed user factors
//!
//! using the usual `Y^T Y` precomputation so a row only pays for its own
//! observed pairs. Rows are solved in parallel with Rayon.
//!
//! Users or items absent from the training log have no factors and get no
//! recommendations.

use crate::error::{ModelError, Result};
use crate::params::{wrong_kind, ModelConfig, ParamDomain, ParamMap, ParamSpec, ParamValue};
use crate::scoring::score_candidates;
use crate::traits::Recommender;
use data_loader::{FeatureTable, InteractionLog, ItemId, RecommendationTable, UserId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info, instrument};

/// Fitted factor matrices
#[derive(Debug, Clone)]
struct Factors {
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    user_factors: Vec<Vec<f64>>,
    item_factors: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct AlsRecommender {
    rank: usize,
    reg_param: f64,
    alpha: f64,
    max_iter: usize,
    seed: u64,
    factors: Option<Factors>,
}

impl Default for AlsRecommender {
    fn default() -> Self {
        Self {
            rank: 10,
            reg_param: 0.1,
            alpha: 1.0,
            max_iter: 10,
            seed: 42,
            factors: None,
        }
    }
}

impl AlsRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_reg_param(mut self, reg_param: f64) -> Self {
        self.reg_param = reg_param;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl ModelConfig for AlsRecommender {
    fn schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("rank", ParamDomain::UniformInt(1, 4096)),
            ParamSpec::new("reg_param", ParamDomain::Uniform(0.0, f64::MAX)),
            ParamSpec::new("alpha", ParamDomain::Uniform(0.0, f64::MAX)),
            ParamSpec::new("max_iter", ParamDomain::UniformInt(1, 10_000)),
            ParamSpec::new("seed", ParamDomain::UniformInt(0, i64::MAX)),
        ]
    }

    fn params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("rank".to_string(), ParamValue::Int(self.rank as i64));
        params.insert("reg_param".to_string(), ParamValue::Float(self.reg_param));
        params.insert("alpha".to_string(), ParamValue::Float(self.alpha));
        params.insert("max_iter".to_string(), ParamValue::Int(self.max_iter as i64));
        params.insert("seed".to_string(), ParamValue::Int(self.seed as i64));
        params
    }

    fn assign(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let int = || value.as_i64().ok_or_else(|| wrong_kind(name, value, "an integer"));
        let float = || value.as_f64().ok_or_else(|| wrong_kind(name, value, "a number"));
        match name {
            "rank" => self.rank = int()? as usize,
            "reg_param" => self.reg_param = float()?,
            "alpha" => self.alpha = float()?,
            "max_iter" => self.max_iter = int()? as usize,
            "seed" => self.seed = int()? as u64,
            other => return Err(ModelError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }
}

impl Recommender for AlsRecommender {
    fn name(&self) -> &str {
        "AlsRecommender"
    }

    fn search_space(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("rank", ParamDomain::LogUniformInt(8, 256))]
    }

    #[instrument(skip_all, fields(rows = log.len(), rank = self.rank))]
    fn fit(
        &mut self,
        log: &InteractionLog,
        _user_features: Option<&FeatureTable>,
        _item_features: Option<&FeatureTable>,
    ) -> Result<()> {
        if log.is_empty() {
            return Err(ModelError::EmptyLog(self.name().to_string()));
        }

        let user_index = index_ids(log.users());
        let item_index = index_ids(log.items());

        // Summed relevance per observed pair, as rows of (column, value)
        let mut by_user: Vec<HashMap<usize, f64>> = vec![HashMap::new(); user_index.len()];
        let mut by_item: Vec<HashMap<usize, f64>> = vec![HashMap::new(); item_index.len()];
        for interaction in log.iter() {
            let u = user_index[&interaction.user_id];
            let i = item_index[&interaction.item_id];
            *by_user[u].entry(i).or_insert(0.0) += interaction.relevance;
            *by_item[i].entry(u).or_insert(0.0) += interaction.relevance;
        }
        let by_user = to_confidence_rows(by_user, self.alpha);
        let by_item = to_confidence_rows(by_item, self.alpha);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut user_factors = random_factors(&mut rng, user_index.len(), self.rank);
        let mut item_factors = random_factors(&mut rng, item_index.len(), self.rank);

        for iteration in 0..self.max_iter {
            user_factors = self.solve_side(&by_user, &item_factors)?;
            item_factors = self.solve_side(&by_item, &user_factors)?;
            debug!("ALS iteration {} done", iteration + 1);
        }

        info!(
            "Fitted ALS: {} users, {} items, rank {}",
            user_index.len(),
            item_index.len(),
            self.rank
        );
        self.factors = Some(Factors {
            user_index,
            item_index,
            user_factors,
            item_factors,
        });
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
        let factors = self
            .factors
            .as_ref()
            .ok_or_else(|| ModelError::NotFitted(self.name().to_string()))?;

        Ok(score_candidates(log, k, users, items, filter_seen_items, |user_id, item_id| {
            let u = factors.user_index.get(&user_id)?;
            let i = factors.item_index.get(&item_id)?;
            Some(dot(&factors.user_factors[*u], &factors.item_factors[*i]))
        }))
    }

    fn clone_box(&self) -> Box<dyn Recommender> {
        Box::new(self.clone())
    }
}

impl AlsRecommender {
    /// Solve all rows of one side against the fixed factors of the other
    fn solve_side(&self, rows: &[Vec<(usize, f64)>], fixed: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let rank = self.rank;
        let gram = gram_matrix(fixed, rank);

        rows.par_iter()
            .map(|observed| {
                let mut a = gram.clone();
                let mut b = vec![0.0; rank];
                for &(col, confidence) in observed {
                    let y = &fixed[col];
                    for r in 0..rank {
                        b[r] += confidence * y[r];
                        for c in 0..rank {
                            a[r * rank + c] += (confidence - 1.0) * y[r] * y[c];
                        }
                    }
                }
                for d in 0..rank {
                    a[d * rank + d] += self.reg_param;
                }
                cholesky_solve(a, b, rank)
                    .ok_or_else(|| ModelError::SingularSystem(self.name().to_string()))
            })
            .collect()
    }
}

impl fmt::Display for AlsRecommender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlsRecommender")
    }
}

// =============================================================================
// Linear algebra helpers
// =============================================================================

fn index_ids(ids: BTreeSet<u32>) -> HashMap<u32, usize> {
    ids.into_iter().enumerate().map(|(idx, id)| (id, idx)).collect()
}

fn to_confidence_rows(rows: Vec<HashMap<usize, f64>>, alpha: f64) -> Vec<Vec<(usize, f64)>> {
    rows.into_iter()
        .map(|row| {
            let mut row: Vec<(usize, f64)> = row
                .into_iter()
                .map(|(col, r)| (col, 1.0 + alpha * r))
                .collect();
            row.sort_by_key(|&(col, _)| col);
            row
        })
        .collect()
}

fn random_factors(rng: &mut StdRng, n: usize, rank: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..rank).map(|_| rng.random::<f64>() * 0.1).collect())
        .collect()
}

/// `Y^T Y` as a row-major `rank x rank` matrix
fn gram_matrix(factors: &[Vec<f64>], rank: usize) -> Vec<f64> {
    let mut gram = vec![0.0; rank * rank];
    for y in factors {
        for r in 0..rank {
            for c in 0..rank {
                gram[r * rank + c] += y[r] * y[c];
            }
        }
    }
    gram
}

/// Solve `a x = b` for symmetric positive definite `a` (row-major, n x n)
fn cholesky_solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Option<Vec<f64>> {
    // In-place decomposition into the lower triangle
    for j in 0..n {
        let mut diag = a[j * n + j];
        for p in 0..j {
            diag -= a[j * n + p] * a[j * n + p];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        let diag = diag.sqrt();
        a[j * n + j] = diag;
        for i in (j + 1)..n {
            let mut v = a[i * n + j];
            for p in 0..j {
                v -= a[i * n + p] * a[j * n + p];
            }
            a[i * n + j] = v / diag;
        }
    }

    // L y = b
    for i in 0..n {
        for p in 0..i {
            b[i] -= a[i * n + p] * b[p];
        }
        b[i] /= a[i * n + i];
    }
    // L^T x = y
    for i in (0..n).rev() {
        for p in (i + 1)..n {
            b[i] -= a[p * n + i] * b[p];
        }
        b[i] /= a[i * n + i];
    }
    Some(b)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
