//! Typed hyperparameters.
//!
//! Every recommender declares a schema of named parameters with the domain
//! each value must fall in. Parameter maps are applied all-or-nothing: the
//! whole map is checked against the schema before anything is assigned.
//!
//! ## Example Usage
//! ```ignore
//! use models::{ModelConfig, ParamMap, ParamValue, PopularRecommender};
//!
//! let mut model = PopularRecommender::default();
//! let mut params = ParamMap::new();
//! params.insert("alpha".to_string(), ParamValue::Int(50));
//! model.apply(&params)?;
//! ```

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Values
// =============================================================================

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Numeric view, integers widen to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view, floats only when they hold an integral value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            // Debug keeps the decimal point, so 1.0 and 1 render differently
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Named parameter values, ordered by name so rendering is deterministic
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Render a parameter map as `{"alpha": 100, "beta": 1.0}`
pub fn format_params(params: &ParamMap) -> String {
    let body: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{:?}: {}", name, value))
        .collect();
    format!("{{{}}}", body.join(", "))
}

// =============================================================================
// Domains
// =============================================================================

/// Set of values a parameter may take.
///
/// Serialized as `{"type": "loguniform_int", "args": [8, 256]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum ParamDomain {
    Uniform(f64, f64),
    #[serde(rename = "loguniform")]
    LogUniform(f64, f64),
    UniformInt(i64, i64),
    #[serde(rename = "loguniform_int")]
    LogUniformInt(i64, i64),
    Categorical(Vec<ParamValue>),
}

impl ParamDomain {
    /// Whether `value` lies in this domain
    pub fn contains(&self, value: &ParamValue) -> bool {
        match self {
            ParamDomain::Uniform(low, high) | ParamDomain::LogUniform(low, high) => value
                .as_f64()
                .is_some_and(|v| v.is_finite() && *low <= v && v <= *high),
            ParamDomain::UniformInt(low, high) | ParamDomain::LogUniformInt(low, high) => {
                value.as_i64().is_some_and(|v| *low <= v && v <= *high)
            }
            ParamDomain::Categorical(choices) => choices.contains(value),
        }
    }

    /// Discretise the domain into at most `n_points` candidates.
    ///
    /// Log domains are spaced geometrically. Integer domains are rounded
    /// and deduplicated, so they may yield fewer than `n_points` values.
    /// Categorical domains return every choice.
    pub fn candidates(&self, n_points: usize) -> Vec<ParamValue> {
        match self {
            ParamDomain::Uniform(low, high) => linspace(*low, *high, n_points)
                .into_iter()
                .map(ParamValue::Float)
                .collect(),
            ParamDomain::LogUniform(low, high) => geomspace(*low, *high, n_points)
                .into_iter()
                .map(ParamValue::Float)
                .collect(),
            ParamDomain::UniformInt(low, high) => {
                round_unique(linspace(*low as f64, *high as f64, n_points))
            }
            ParamDomain::LogUniformInt(low, high) => {
                round_unique(geomspace(*low as f64, *high as f64, n_points))
            }
            ParamDomain::Categorical(choices) => choices.clone(),
        }
    }
}

impl fmt::Display for ParamDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDomain::Uniform(low, high) => write!(f, "uniform[{}, {}]", low, high),
            ParamDomain::LogUniform(low, high) => write!(f, "loguniform[{}, {}]", low, high),
            ParamDomain::UniformInt(low, high) => write!(f, "uniform_int[{}, {}]", low, high),
            ParamDomain::LogUniformInt(low, high) => {
                write!(f, "loguniform_int[{}, {}]", low, high)
            }
            ParamDomain::Categorical(choices) => {
                let rendered: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
                write!(f, "one of [{}]", rendered.join(", "))
            }
        }
    }
}

fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let step = (high - low) / (n - 1) as f64;
            (0..n).map(|i| low + step * i as f64).collect()
        }
    }
}

fn geomspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    linspace(low.ln(), high.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect()
}

fn round_unique(points: Vec<f64>) -> Vec<ParamValue> {
    let mut values: Vec<i64> = points.into_iter().map(|p| p.round() as i64).collect();
    values.dedup();
    values.into_iter().map(ParamValue::Int).collect()
}

/// A named parameter and its domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub domain: ParamDomain,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, domain: ParamDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

// =============================================================================
// Typed configuration
// =============================================================================

/// A typed parameter struct with a declared schema.
pub trait ModelConfig {
    /// Every settable parameter with the domain of valid values
    fn schema(&self) -> Vec<ParamSpec>;

    /// Current parameter values
    fn params(&self) -> ParamMap;

    /// Store one value that has already been checked against the schema
    fn assign(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    /// Validate the whole map against the schema, then assign it.
    ///
    /// On error nothing has been modified.
    fn apply(&mut self, params: &ParamMap) -> Result<()> {
        let schema = self.schema();
        for (name, value) in params {
            let spec = schema
                .iter()
                .find(|spec| spec.name == *name)
                .ok_or_else(|| ModelError::UnknownParameter(name.clone()))?;
            if !spec.domain.contains(value) {
                return Err(ModelError::InvalidParameter {
                    name: name.clone(),
                    reason: format!("{} is outside {}", value, spec.domain),
                });
            }
        }
        for (name, value) in params {
            self.assign(name, value)?;
        }
        Ok(())
    }
}

/// Error for a value of the wrong kind reaching `assign`
pub(crate) fn wrong_kind(name: &str, value: &ParamValue, expected: &str) -> ModelError {
    ModelError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected {}, got {}", expected, value),
    }
}
