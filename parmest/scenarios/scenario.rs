use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

/// Ordered mapping from theta (parameter symbol) name to value.
pub type ThetaValues = IndexMap<String, f64>;

/// A single named, weighted assignment of theta values.
///
/// Scenarios are immutable once built; sets share them behind `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    theta_values: ThetaValues,
    probability: f64,
}

impl Scenario {
    /// Builds a scenario. The name may be empty; the theta mapping may not, and the
    /// probability must lie in (0, 1].
    pub fn new(
        name: impl Into<String>,
        theta_values: ThetaValues,
        probability: f64,
    ) -> Result<Self, ScenarioError> {
        let name = name.into();
        if theta_values.is_empty() {
            return Err(ScenarioError::EmptyTheta { name });
        }
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(ScenarioError::InvalidProbability { name, probability });
        }
        Ok(Self {
            name,
            theta_values,
            probability,
        })
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Theta values in insertion order.
    #[must_use]
    pub fn theta_values(&self) -> &ThetaValues {
        &self.theta_values
    }

    /// Probability weight.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Theta names in insertion order.
    pub fn theta_names(&self) -> impl Iterator<Item = &str> {
        self.theta_values.keys().map(String::as_str)
    }

    /// True when both scenarios carry the same theta names in the same order.
    #[must_use]
    pub fn same_keys(&self, other: &Self) -> bool {
        self.theta_values.len() == other.theta_values.len()
            && self
                .theta_values
                .keys()
                .zip(other.theta_values.keys())
                .all(|(a, b)| a == b)
    }
}
