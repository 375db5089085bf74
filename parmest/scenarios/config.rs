use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::creator::SolvePolicy;

/// Scenario job loaded from TOML.
#[derive(Debug, Clone)]
pub struct ScenarioJobConfig {
    /// Solver identifier passed to every solve.
    pub solver: String,
    /// Handling of non-converged solves.
    pub solve_policy: SolvePolicy,
    /// Recorded-results file backing the estimator.
    pub estimator: PathBuf,
    /// Directory receiving the CSV files.
    pub output_dir: PathBuf,
    /// Optional JSON-lines log.
    pub log_path: Option<PathBuf>,
    /// Experiment-scenario stage.
    pub experiments: ExperimentStage,
    /// Bootstrap-scenario stage.
    pub bootstrap: BootstrapStage,
    /// Optional concatenation of the two sets.
    pub combined: Option<CombinedStage>,
}

impl ScenarioJobConfig {
    /// Loads configuration from a TOML file; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scenario job {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml(&raw, &base).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses configuration text, resolving relative paths against `base`.
    pub fn from_toml(raw: &str, base: &Path) -> Result<Self> {
        let document: JobDocument = toml::from_str(raw)?;
        if document.solver.trim().is_empty() {
            bail!("solver must not be empty");
        }
        if !document.experiments.enabled && !document.bootstrap.enabled {
            bail!("both experiment and bootstrap stages are disabled");
        }
        if document.bootstrap.enabled && document.bootstrap.count == 0 {
            bail!("bootstrap.count must be positive");
        }
        if document.combined.is_some()
            && !(document.experiments.enabled && document.bootstrap.enabled)
        {
            bail!("combined set needs both experiment and bootstrap stages");
        }
        let resolve = |candidate: PathBuf| {
            if candidate.is_absolute() {
                candidate
            } else {
                base.join(candidate)
            }
        };
        Ok(Self {
            solver: document.solver,
            solve_policy: document.solve_policy,
            estimator: resolve(document.estimator),
            output_dir: resolve(document.output_dir),
            log_path: document.log_path.map(resolve),
            experiments: document.experiments,
            bootstrap: document.bootstrap,
            combined: document.combined,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct JobDocument {
    #[serde(default = "default_solver")]
    solver: String,
    #[serde(default)]
    solve_policy: SolvePolicy,
    estimator: PathBuf,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    #[serde(default)]
    log_path: Option<PathBuf>,
    #[serde(default)]
    experiments: ExperimentStage,
    #[serde(default)]
    bootstrap: BootstrapStage,
    #[serde(default)]
    combined: Option<CombinedStage>,
}

/// Scenarios from the estimator's experiments.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentStage {
    /// Whether the stage runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Scenario set name.
    #[serde(default = "default_experiment_set")]
    pub set_name: String,
    /// CSV file name inside the output directory.
    #[serde(default = "default_experiment_csv")]
    pub csv: String,
}

impl Default for ExperimentStage {
    fn default() -> Self {
        Self {
            enabled: true,
            set_name: default_experiment_set(),
            csv: default_experiment_csv(),
        }
    }
}

/// Scenarios from bootstrap estimates.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapStage {
    /// Whether the stage runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Scenario set name.
    #[serde(default = "default_bootstrap_set")]
    pub set_name: String,
    /// Bootstrap estimates to request.
    #[serde(default = "default_bootstrap_count")]
    pub count: usize,
    /// CSV file name inside the output directory.
    #[serde(default = "default_bootstrap_csv")]
    pub csv: String,
}

impl Default for BootstrapStage {
    fn default() -> Self {
        Self {
            enabled: true,
            set_name: default_bootstrap_set(),
            count: default_bootstrap_count(),
            csv: default_bootstrap_csv(),
        }
    }
}

/// Concatenation of the experiment and bootstrap sets.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedStage {
    /// Scenario set name.
    #[serde(default = "default_combined_set")]
    pub set_name: String,
    /// CSV file name inside the output directory.
    #[serde(default = "default_combined_csv")]
    pub csv: String,
}

fn default_solver() -> String {
    "ipopt".into()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scenarios")
}

const fn default_true() -> bool {
    true
}

fn default_experiment_set() -> String {
    "Experiments".into()
}

fn default_experiment_csv() -> String {
    "experiments.csv".into()
}

fn default_bootstrap_set() -> String {
    "Bootstrap".into()
}

const fn default_bootstrap_count() -> usize {
    3
}

fn default_bootstrap_csv() -> String {
    "bootstrap.csv".into()
}

fn default_combined_set() -> String {
    "Combined".into()
}

fn default_combined_csv() -> String {
    "combined.csv".into()
}
