use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parmest_scenarios::{
    config::ScenarioJobConfig, GenerationSummary, RecordedEstimator, ScenarioCreator,
    ScenarioRuntime, ScenarioSet, SolvePolicy,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

const DEFAULT_SOLVER: &str = "ipopt";

#[derive(Parser, Debug)]
#[command(name = "scen", version, about = "Scenario sets from parameter-estimation results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a TOML-configured scenario job.
    Run {
        #[arg(long)]
        config: PathBuf,
    },
    /// One scenario per recorded experiment.
    Experiments {
        #[arg(long)]
        estimator: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "Experiments")]
        name: String,
        #[arg(long, default_value = DEFAULT_SOLVER)]
        solver: String,
        #[arg(long, value_parser = parse_policy, default_value = "reject")]
        policy: SolvePolicy,
    },
    /// Equally likely scenarios from recorded bootstrap estimates.
    Bootstrap {
        #[arg(long)]
        estimator: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 3)]
        count: usize,
        #[arg(long, default_value = "Bootstrap")]
        name: String,
        #[arg(long, default_value = DEFAULT_SOLVER)]
        solver: String,
    },
}

fn parse_policy(raw: &str) -> Result<SolvePolicy, String> {
    match raw {
        "reject" => Ok(SolvePolicy::Reject),
        "discard" => Ok(SolvePolicy::Discard),
        "keep" => Ok(SolvePolicy::Keep),
        other => Err(format!("unknown solve policy {other:?} (reject|discard|keep)")),
    }
}

fn export(set: &ScenarioSet, generated: &GenerationSummary, out: &Path) -> Result<Value> {
    let outcome = set
        .write_csv(out)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(json!({ "set": set.name(), "generation": generated, "export": outcome }))
}

fn execute(command: Commands) -> Result<Value> {
    match command {
        Commands::Run { config } => {
            let job = ScenarioJobConfig::load(&config)?;
            let runtime = ScenarioRuntime::builder()
                .log_path(job.log_path.clone())
                .build()?;
            Ok(serde_json::to_value(runtime.run(&job)?)?)
        }
        Commands::Experiments {
            estimator,
            out,
            name,
            solver,
            policy,
        } => {
            let recorded = RecordedEstimator::load(&estimator)?;
            let creator = ScenarioCreator::new(recorded, solver).with_solve_policy(policy);
            let mut set = ScenarioSet::new(name);
            let generated = creator
                .scenarios_from_experiments(&mut set)
                .context("generating experiment scenarios")?;
            export(&set, &generated, &out)
        }
        Commands::Bootstrap {
            estimator,
            out,
            count,
            name,
            solver,
        } => {
            let recorded = RecordedEstimator::load(&estimator)?;
            let mut creator = ScenarioCreator::new(recorded, solver);
            let mut set = ScenarioSet::new(name);
            let generated = creator
                .scenarios_from_bootstrap(&mut set, count)
                .context("generating bootstrap scenarios")?;
            export(&set, &generated, &out)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let summary = execute(cli.command)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
