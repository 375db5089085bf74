//! Contract of the external parameter estimator. Solving, theta estimation and
//! bootstrap resampling all happen behind these traits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::ScenarioError, scenario::ThetaValues};

/// Opaque experiment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Creates an id from any displayable label.
    #[must_use]
    pub fn new(label: impl fmt::Display) -> Self {
        Self(label.to_string())
    }

    /// String form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<usize> for ExperimentId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ExperimentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<ExperimentId> for String {
    fn from(value: ExperimentId) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(u64),
    Text(String),
}

impl From<IdRepr> for ExperimentId {
    fn from(value: IdRepr) -> Self {
        match value {
            IdRepr::Number(n) => Self::new(n),
            IdRepr::Text(s) => Self(s),
        }
    }
}

/// Termination status reported by a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Locally optimal solution found.
    Optimal,
    /// Feasible point found without an optimality certificate.
    Feasible,
    /// Problem reported infeasible.
    Infeasible,
    /// Iteration or time limit reached.
    MaxIterations,
    /// Solver error.
    Error(String),
}

impl SolveStatus {
    /// Whether the model holds usable theta values.
    #[must_use]
    pub const fn converged(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }

    /// Label for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Optimal => "optimal",
            Self::Feasible => "feasible",
            Self::Infeasible => "infeasible",
            Self::MaxIterations => "max_iterations",
            Self::Error(_) => "error",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error ({message})"),
            other => f.write_str(other.label()),
        }
    }
}

/// One bootstrap estimate together with its row index in the bootstrap result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapRow {
    /// Row index as produced by the estimator; never renumbered.
    pub index: usize,
    /// Estimated theta values.
    pub theta: ThetaValues,
}

impl BootstrapRow {
    /// Creates a row.
    #[must_use]
    pub fn new(index: usize, theta: ThetaValues) -> Self {
        Self { index, theta }
    }

    /// Numbers rows by position, for estimators whose result has a plain 0-based index.
    #[must_use]
    pub fn enumerate(rows: impl IntoIterator<Item = ThetaValues>) -> Vec<Self> {
        rows.into_iter()
            .enumerate()
            .map(|(index, theta)| Self { index, theta })
            .collect()
    }
}

/// A model instance bound to one experiment's data.
pub trait ParameterModel {
    /// Solves the model in place with the named solver and reports the status.
    fn solve(&mut self, solver: &str) -> Result<SolveStatus, ScenarioError>;

    /// Current value of a theta variable, `None` if the model has no such symbol.
    fn theta_value(&self, name: &str) -> Option<f64>;
}

/// Parameter-estimation capability consumed by the scenario creator.
pub trait Estimator {
    /// Model type built per experiment.
    type Model: ParameterModel;

    /// Experiment identifiers in estimator order.
    fn experiment_ids(&self) -> Vec<ExperimentId>;

    /// Builds a fresh model bound to the experiment's data.
    fn build_model(&self, experiment: &ExperimentId) -> Result<Self::Model, ScenarioError>;

    /// Theta names in estimator order.
    fn theta_names(&self) -> Vec<String>;

    /// Runs `count` bootstrap re-estimations. May return fewer rows than requested.
    fn bootstrap_estimate(&mut self, count: usize) -> Result<Vec<BootstrapRow>, ScenarioError>;
}
