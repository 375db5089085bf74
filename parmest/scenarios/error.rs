use thiserror::Error;

use crate::estimator::{ExperimentId, SolveStatus};

/// Errors emitted while building, generating, or exporting scenarios.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A scenario was built without any theta values.
    #[error("scenario {name:?} has no theta values")]
    EmptyTheta {
        /// Scenario name.
        name: String,
    },
    /// Probability outside (0, 1].
    #[error("scenario {name:?} has probability {probability}, expected a value in (0, 1]")]
    InvalidProbability {
        /// Scenario name.
        name: String,
        /// Offending probability.
        probability: f64,
    },
    /// Bootstrap append was called with no rows.
    #[error("bootstrap result is empty")]
    EmptyBootstrap,
    /// The creator captured no experiments.
    #[error("estimator exposes no experiments")]
    NoExperiments,
    /// Scenario key sets differ within a set.
    #[error("scenario {scenario:?} has theta keys {found:?}, expected {expected:?}")]
    KeyMismatch {
        /// Offending scenario name.
        scenario: String,
        /// Keys of the first scenario.
        expected: Vec<String>,
        /// Keys of the offending scenario.
        found: Vec<String>,
    },
    /// A solved model could not supply a theta value.
    #[error("experiment {experiment}: model has no value for theta {theta:?}")]
    MissingTheta {
        /// Experiment id.
        experiment: ExperimentId,
        /// Theta name.
        theta: String,
    },
    /// The solve did not converge and the policy rejects it.
    #[error("experiment {experiment}: solver {solver} finished with status {status}")]
    SolveFailed {
        /// Experiment id.
        experiment: ExperimentId,
        /// Solver identifier.
        solver: String,
        /// Reported status.
        status: SolveStatus,
    },
    /// The external estimator failed.
    #[error("estimator failure: {0}")]
    Estimator(String),
    /// Filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
