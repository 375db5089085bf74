//! Runtime executing a configured scenario job end to end.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

use crate::{
    config::ScenarioJobConfig,
    creator::{CreatorConfig, ScenarioCreator},
    estimator::Estimator,
    recorded::RecordedEstimator,
    scenario_set::{ExportOutcome, ScenarioSet},
    telemetry::ScenarioTelemetry,
};

/// Exported scenario set summary.
#[derive(Debug, Clone, Serialize)]
pub struct SetReport {
    /// Set name.
    pub name: String,
    /// Number of scenarios.
    pub scenarios: usize,
    /// Sum of probabilities.
    pub total_probability: f64,
    /// CSV path, `None` when the set was empty.
    pub csv: Option<PathBuf>,
}

/// Report of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Job id.
    pub id: Uuid,
    /// Solver used.
    pub solver: String,
    /// Experiments skipped by the solve policy.
    pub discarded_experiments: usize,
    /// Sets produced, in creation order.
    pub sets: Vec<SetReport>,
    /// Completion time.
    pub finished_at: DateTime<Utc>,
}

/// High-level runtime driving creators and exports.
#[derive(Debug, Default)]
pub struct ScenarioRuntime {
    telemetry: Option<ScenarioTelemetry>,
}

impl ScenarioRuntime {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ScenarioRuntimeBuilder {
        ScenarioRuntimeBuilder::default()
    }

    /// Returns telemetry handle.
    #[must_use]
    pub fn telemetry(&self) -> Option<&ScenarioTelemetry> {
        self.telemetry.as_ref()
    }

    /// Runs a job whose estimator is a recorded-results file.
    pub fn run(&self, config: &ScenarioJobConfig) -> Result<JobReport> {
        let estimator = RecordedEstimator::load(&config.estimator)?;
        self.run_with(estimator, config)
    }

    /// Runs a job against any estimator.
    pub fn run_with<E: Estimator>(&self, estimator: E, config: &ScenarioJobConfig) -> Result<JobReport> {
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("creating {}", config.output_dir.display()))?;
        let creator_config = CreatorConfig {
            solver: config.solver.clone(),
            experiments: estimator.experiment_ids(),
            solve_policy: config.solve_policy,
        };
        let mut creator = ScenarioCreator::with_config(estimator, creator_config);
        if let Some(tel) = &self.telemetry {
            creator = creator.with_telemetry(tel.clone());
        }

        let mut report = JobReport {
            id: Uuid::new_v4(),
            solver: config.solver.clone(),
            discarded_experiments: 0,
            sets: Vec::new(),
            finished_at: Utc::now(),
        };

        let mut experiment_set = None;
        if config.experiments.enabled {
            let mut set = ScenarioSet::new(&config.experiments.set_name);
            let summary = creator.scenarios_from_experiments(&mut set)?;
            report.discarded_experiments = summary.discarded;
            report
                .sets
                .push(self.export(&set, config.output_dir.join(&config.experiments.csv))?);
            experiment_set = Some(set);
        }

        let mut bootstrap_set = None;
        if config.bootstrap.enabled {
            let mut set = ScenarioSet::new(&config.bootstrap.set_name);
            creator.scenarios_from_bootstrap(&mut set, config.bootstrap.count)?;
            report
                .sets
                .push(self.export(&set, config.output_dir.join(&config.bootstrap.csv))?);
            bootstrap_set = Some(set);
        }

        if let (Some(combined), Some(exp), Some(boot)) =
            (&config.combined, &experiment_set, &bootstrap_set)
        {
            let set = exp.concat_with(boot, &combined.set_name);
            report
                .sets
                .push(self.export(&set, config.output_dir.join(&combined.csv))?);
        }

        report.finished_at = Utc::now();
        self.log(
            LogLevel::Info,
            "scenarios.job.completed",
            json!({ "job": report.id, "sets": report.sets.len() }),
        );
        Ok(report)
    }

    /// Writes one set and summarizes it.
    pub fn export(&self, set: &ScenarioSet, path: PathBuf) -> Result<SetReport> {
        let outcome = set
            .write_csv(&path)
            .with_context(|| format!("exporting set {:?} to {}", set.name(), path.display()))?;
        let csv = match outcome {
            ExportOutcome::Written { rows } => {
                self.log(
                    LogLevel::Info,
                    "scenarios.export.written",
                    json!({ "set": set.name(), "rows": rows, "file": path.display().to_string() }),
                );
                Some(path)
            }
            ExportOutcome::SkippedEmpty { .. } => {
                self.log(
                    LogLevel::Warn,
                    "scenarios.export.skipped",
                    json!({ "set": set.name(), "file": path.display().to_string() }),
                );
                None
            }
        };
        Ok(SetReport {
            name: set.name().to_owned(),
            scenarios: set.len(),
            total_probability: set.total_probability(),
            csv,
        })
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }
}

/// Builder for `ScenarioRuntime`.
#[derive(Debug, Default)]
pub struct ScenarioRuntimeBuilder {
    telemetry: Option<ScenarioTelemetry>,
    log_path: Option<PathBuf>,
}

impl ScenarioRuntimeBuilder {
    /// Sets telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: ScenarioTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Logs to a JSON-lines file unless telemetry is set explicitly.
    #[must_use]
    pub fn log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> Result<ScenarioRuntime> {
        let telemetry = match (self.telemetry, self.log_path) {
            (Some(telemetry), _) => Some(telemetry),
            (None, Some(path)) => Some(ScenarioTelemetry::builder("scenarios").log_path(path).build()?),
            (None, None) => None,
        };
        Ok(ScenarioRuntime { telemetry })
    }
}
