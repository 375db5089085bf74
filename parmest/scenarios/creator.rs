use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    error::ScenarioError,
    estimator::{Estimator, ExperimentId, ParameterModel, SolveStatus},
    scenario::{Scenario, ThetaValues},
    scenario_set::ScenarioSet,
    telemetry::ScenarioTelemetry,
};

/// What to do with an experiment whose solve did not converge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolvePolicy {
    /// Stop generation with [`ScenarioError::SolveFailed`].
    #[default]
    Reject,
    /// Skip the experiment. Remaining scenarios keep probability `1/experiments`.
    Discard,
    /// Append the scenario from whatever values the model holds.
    Keep,
}

impl SolvePolicy {
    /// Label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Discard => "discard",
            Self::Keep => "keep",
        }
    }
}

/// Creator settings fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorConfig {
    /// Solver identifier handed to every solve (e.g. `ipopt`).
    pub solver: String,
    /// Experiment universe, captured once.
    pub experiments: Vec<ExperimentId>,
    /// Non-converged solve handling.
    #[serde(default)]
    pub solve_policy: SolvePolicy,
}

/// Outcome of one experiment in [`ScenarioCreator::scenarios_from_experiments`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentOutcome {
    /// Experiment id.
    pub experiment: ExperimentId,
    /// Solve status.
    pub status: SolveStatus,
    /// Whether a scenario was appended.
    pub appended: bool,
}

/// Summary of a generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationSummary {
    /// Scenarios appended to the target set.
    pub appended: usize,
    /// Experiments skipped under [`SolvePolicy::Discard`].
    pub discarded: usize,
    /// Per-experiment outcomes, empty for bootstrap generation.
    pub experiments: Vec<ExperimentOutcome>,
}

/// Builds scenario sets by driving an [`Estimator`].
pub struct ScenarioCreator<E: Estimator> {
    estimator: E,
    config: CreatorConfig,
    telemetry: Option<ScenarioTelemetry>,
}

impl<E: Estimator> ScenarioCreator<E> {
    /// Wraps an estimator, capturing its experiment ids now.
    #[must_use]
    pub fn new(estimator: E, solver: impl Into<String>) -> Self {
        let config = CreatorConfig {
            solver: solver.into(),
            experiments: estimator.experiment_ids(),
            solve_policy: SolvePolicy::default(),
        };
        Self::with_config(estimator, config)
    }

    /// Wraps an estimator with an explicit configuration.
    #[must_use]
    pub fn with_config(estimator: E, config: CreatorConfig) -> Self {
        Self {
            estimator,
            config,
            telemetry: None,
        }
    }

    /// Sets the solve policy.
    #[must_use]
    pub fn with_solve_policy(mut self, policy: SolvePolicy) -> Self {
        self.config.solve_policy = policy;
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ScenarioTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Creator configuration.
    #[must_use]
    pub fn config(&self) -> &CreatorConfig {
        &self.config
    }

    /// Underlying estimator.
    #[must_use]
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Mutable access to the estimator. Does not refresh the captured experiments.
    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    /// Appends one scenario per captured experiment, named `ExpScen<id>`, each with
    /// probability `1/experiments`, in capture order. On error `target` is left
    /// unchanged.
    pub fn scenarios_from_experiments(
        &self,
        target: &mut ScenarioSet,
    ) -> Result<GenerationSummary, ScenarioError> {
        let experiments = &self.config.experiments;
        if experiments.is_empty() {
            return Err(ScenarioError::NoExperiments);
        }
        #[allow(clippy::cast_precision_loss)]
        let probability = 1.0 / experiments.len() as f64;
        let theta_names = self.estimator.theta_names();
        let mut summary = GenerationSummary::default();
        let mut built = Vec::with_capacity(experiments.len());

        for experiment in experiments {
            let mut model = self.estimator.build_model(experiment)?;
            let status = model.solve(&self.config.solver)?;

            let appended = status.converged()
                || match self.config.solve_policy {
                    SolvePolicy::Reject => {
                        return Err(ScenarioError::SolveFailed {
                            experiment: experiment.clone(),
                            solver: self.config.solver.clone(),
                            status,
                        });
                    }
                    SolvePolicy::Discard => false,
                    SolvePolicy::Keep => true,
                };

            if appended {
                let theta = read_theta(&model, experiment, &theta_names)?;
                drop(model);
                self.log(
                    if status.converged() {
                        LogLevel::Info
                    } else {
                        LogLevel::Warn
                    },
                    "scenarios.experiment.solved",
                    json!({
                        "experiment": experiment.as_str(),
                        "solver": self.config.solver,
                        "status": status.label(),
                        "theta": theta,
                    }),
                );
                built.push(Scenario::new(
                    format!("ExpScen{experiment}"),
                    theta,
                    probability,
                )?);
            } else {
                drop(model);
                self.log(
                    LogLevel::Warn,
                    "scenarios.experiment.discarded",
                    json!({
                        "experiment": experiment.as_str(),
                        "solver": self.config.solver,
                        "status": status.to_string(),
                    }),
                );
                summary.discarded += 1;
            }
            summary.experiments.push(ExperimentOutcome {
                experiment: experiment.clone(),
                status,
                appended,
            });
        }
        summary.appended = built.len();
        for scenario in built {
            target.add_one(scenario);
        }
        Ok(summary)
    }

    /// Requests `count` bootstrap estimates and appends them to `target` with equal
    /// probability over however many rows come back.
    pub fn scenarios_from_bootstrap(
        &mut self,
        target: &mut ScenarioSet,
        count: usize,
    ) -> Result<GenerationSummary, ScenarioError> {
        let rows = self.estimator.bootstrap_estimate(count)?;
        if rows.len() < count {
            self.log(
                LogLevel::Warn,
                "scenarios.bootstrap.short",
                json!({ "requested": count, "returned": rows.len() }),
            );
        }
        let appended = target.append_bootstrap(rows)?;
        self.log(
            LogLevel::Info,
            "scenarios.bootstrap.appended",
            json!({ "set": target.name(), "requested": count, "appended": appended }),
        );
        Ok(GenerationSummary {
            appended,
            ..GenerationSummary::default()
        })
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }
}

fn read_theta<M: ParameterModel>(
    model: &M,
    experiment: &ExperimentId,
    names: &[String],
) -> Result<ThetaValues, ScenarioError> {
    names
        .iter()
        .map(|name| {
            model
                .theta_value(name)
                .map(|value| (name.clone(), value))
                .ok_or_else(|| ScenarioError::MissingTheta {
                    experiment: experiment.clone(),
                    theta: name.clone(),
                })
        })
        .collect()
}
