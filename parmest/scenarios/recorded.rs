use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::ScenarioError,
    estimator::{BootstrapRow, Estimator, ExperimentId, ParameterModel, SolveStatus},
    scenario::ThetaValues,
};

/// Solved theta values recorded for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExperiment {
    /// Experiment id.
    pub id: ExperimentId,
    /// Theta values the solve produced.
    pub theta: ThetaValues,
    /// Status the solve reported.
    #[serde(default = "default_status")]
    pub status: SolveStatus,
}

const fn default_status() -> SolveStatus {
    SolveStatus::Optimal
}

/// Estimator that replays previously recorded estimation results.
///
/// Useful for regenerating scenario files without re-running the estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedEstimator {
    /// Theta names in column order.
    pub theta_names: Vec<String>,
    /// Per-experiment results in experiment order.
    #[serde(default)]
    pub experiments: Vec<RecordedExperiment>,
    /// Recorded bootstrap estimates.
    #[serde(default)]
    pub bootstrap: Vec<BootstrapRow>,
}

impl RecordedEstimator {
    /// Loads recorded results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading recorded estimator {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses recorded results from JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        let recorded: Self = serde_json::from_str(raw)?;
        if recorded.theta_names.is_empty() {
            bail!("recorded estimator lists no theta names");
        }
        let mut seen = HashSet::new();
        if let Some(dup) = recorded
            .experiments
            .iter()
            .find(|exp| !seen.insert(exp.id.clone()))
        {
            bail!("duplicate experiment id {}", dup.id);
        }
        Ok(recorded)
    }

    /// Writes the recorded results as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Model whose solve restores a recorded result.
#[derive(Debug, Clone)]
pub struct RecordedModel {
    recorded: ThetaValues,
    status: SolveStatus,
    current: ThetaValues,
}

impl ParameterModel for RecordedModel {
    fn solve(&mut self, _solver: &str) -> Result<SolveStatus, ScenarioError> {
        self.current.clone_from(&self.recorded);
        Ok(self.status.clone())
    }

    fn theta_value(&self, name: &str) -> Option<f64> {
        self.current.get(name).copied()
    }
}

impl Estimator for RecordedEstimator {
    type Model = RecordedModel;

    fn experiment_ids(&self) -> Vec<ExperimentId> {
        self.experiments.iter().map(|exp| exp.id.clone()).collect()
    }

    fn build_model(&self, experiment: &ExperimentId) -> Result<RecordedModel, ScenarioError> {
        let recorded = self
            .experiments
            .iter()
            .find(|exp| &exp.id == experiment)
            .ok_or_else(|| {
                ScenarioError::Estimator(format!("no recorded result for experiment {experiment}"))
            })?;
        Ok(RecordedModel {
            recorded: recorded.theta.clone(),
            status: recorded.status.clone(),
            current: ThetaValues::new(),
        })
    }

    fn theta_names(&self) -> Vec<String> {
        self.theta_names.clone()
    }

    fn bootstrap_estimate(&mut self, count: usize) -> Result<Vec<BootstrapRow>, ScenarioError> {
        Ok(self.bootstrap.iter().take(count).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RECORDED: &str = r#"{
        "theta_names": ["k1", "k2"],
        "experiments": [
            { "id": 1, "theta": { "k1": 19.1, "k2": 1.5 } },
            { "id": 2, "theta": { "k1": 18.7, "k2": 1.4 }, "status": "infeasible" },
            { "id": 3, "theta": { "k1": 0.0, "k2": 0.0 }, "status": { "error": "restoration failed" } }
        ],
        "bootstrap": [
            { "index": 0, "theta": { "k1": 19.0, "k2": 1.45 } },
            { "index": 1, "theta": { "k1": 19.3, "k2": 1.52 } }
        ]
    }"#;

    #[test]
    fn parses_statuses_and_ids() {
        let recorded = RecordedEstimator::from_json(RECORDED).unwrap();
        assert_eq!(recorded.experiment_ids(), vec![1.into(), 2.into(), 3.into()]);
        assert_eq!(recorded.experiments[0].status, SolveStatus::Optimal);
        assert_eq!(recorded.experiments[1].status, SolveStatus::Infeasible);
        assert_eq!(
            recorded.experiments[2].status,
            SolveStatus::Error("restoration failed".into())
        );
    }

    #[test]
    fn model_holds_values_only_after_solve() {
        let recorded = RecordedEstimator::from_json(RECORDED).unwrap();
        let mut model = recorded.build_model(&2.into()).unwrap();
        assert_eq!(model.theta_value("k1"), None);
        assert_eq!(model.solve("ipopt").unwrap(), SolveStatus::Infeasible);
        assert_eq!(model.theta_value("k1"), Some(18.7));
    }

    #[test]
    fn unknown_experiment_is_estimator_error() {
        let recorded = RecordedEstimator::from_json(RECORDED).unwrap();
        assert!(matches!(
            recorded.build_model(&"nope".into()),
            Err(ScenarioError::Estimator(_))
        ));
    }

    #[test]
    fn bootstrap_returns_at_most_recorded_rows() {
        let mut recorded = RecordedEstimator::from_json(RECORDED).unwrap();
        assert_eq!(recorded.bootstrap_estimate(1).unwrap().len(), 1);
        assert_eq!(recorded.bootstrap_estimate(10).unwrap().len(), 2);
    }

    #[test]
    fn rejects_duplicates_and_missing_names() {
        let dup = r#"{ "theta_names": ["a"], "experiments": [
            { "id": 0, "theta": { "a": 1.0 } }, { "id": "0", "theta": { "a": 2.0 } } ] }"#;
        assert!(RecordedEstimator::from_json(dup).is_err());
        assert!(RecordedEstimator::from_json(r#"{ "theta_names": [] }"#).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorded.json");
        let recorded = RecordedEstimator::from_json(RECORDED).unwrap();
        recorded.save(&path).unwrap();
        assert_eq!(RecordedEstimator::load(&path).unwrap(), recorded);
    }
}
