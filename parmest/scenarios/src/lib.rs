#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Parmest scenario creation – turns parameter-estimation results into weighted
//! scenario sets for two-stage stochastic programs.

/// Error taxonomy for scenario construction and export.
#[path = "../error.rs"]
pub mod error;

/// Immutable scenario records.
#[path = "../scenario.rs"]
pub mod scenario;

/// Ordered scenario collections and CSV export.
#[path = "../scenario_set.rs"]
pub mod scenario_set;

/// Estimator capability consumed by the creator.
#[path = "../estimator.rs"]
pub mod estimator;

/// Scenario generation from experiments and bootstrap rows.
#[path = "../creator.rs"]
pub mod creator;

/// Telemetry for scenario generation.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Estimator backed by recorded results.
#[path = "../recorded.rs"]
pub mod recorded;

/// Job configuration loading.
#[path = "../config.rs"]
pub mod config;

/// Runtime entry & job execution.
#[path = "../main.rs"]
pub mod runtime;

pub use creator::{CreatorConfig, GenerationSummary, ScenarioCreator, SolvePolicy};
pub use error::ScenarioError;
pub use estimator::{BootstrapRow, Estimator, ExperimentId, ParameterModel, SolveStatus};
pub use recorded::RecordedEstimator;
pub use runtime::{JobReport, ScenarioRuntime, ScenarioRuntimeBuilder};
pub use scenario::{Scenario, ThetaValues};
pub use scenario_set::{ExportOutcome, ScenarioSet};
pub use telemetry::{ScenarioTelemetry, ScenarioTelemetryBuilder};
