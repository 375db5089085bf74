use std::{collections::HashMap, fs};

use indexmap::indexmap;
use parmest_scenarios::{
    BootstrapRow, Estimator, ExperimentId, ExportOutcome, ParameterModel, Scenario,
    ScenarioCreator, ScenarioError, ScenarioSet, SolveStatus, ThetaValues,
};
use tempfile::tempdir;

/// Model that "solves" by copying fitted values into its variables.
struct FittedModel {
    fitted: HashMap<String, f64>,
    vars: HashMap<String, f64>,
}

impl ParameterModel for FittedModel {
    fn solve(&mut self, _solver: &str) -> Result<SolveStatus, ScenarioError> {
        self.vars.clone_from(&self.fitted);
        Ok(SolveStatus::Optimal)
    }

    fn theta_value(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }
}

struct TwoExperiments {
    bootstrap: Vec<ThetaValues>,
}

impl Estimator for TwoExperiments {
    type Model = FittedModel;

    fn experiment_ids(&self) -> Vec<ExperimentId> {
        vec![0.into(), 1.into()]
    }

    fn build_model(&self, experiment: &ExperimentId) -> Result<FittedModel, ScenarioError> {
        let (a, b) = match experiment.as_str() {
            "0" => (1.0, 2.0),
            "1" => (3.0, 4.0),
            other => return Err(ScenarioError::Estimator(format!("unknown experiment {other}"))),
        };
        Ok(FittedModel {
            fitted: HashMap::from([("a".to_owned(), a), ("b".to_owned(), b)]),
            vars: HashMap::new(),
        })
    }

    fn theta_names(&self) -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    fn bootstrap_estimate(&mut self, count: usize) -> Result<Vec<BootstrapRow>, ScenarioError> {
        Ok(BootstrapRow::enumerate(
            self.bootstrap.iter().take(count).cloned(),
        ))
    }
}

fn estimator() -> TwoExperiments {
    TwoExperiments {
        bootstrap: vec![
            indexmap! { "a".into() => 5.0, "b".into() => 6.0 },
            indexmap! { "a".into() => 7.0, "b".into() => 8.0 },
            indexmap! { "a".into() => 9.0, "b".into() => 10.0 },
        ],
    }
}

#[test]
fn experiments_yield_one_scenario_each() {
    let creator = ScenarioCreator::new(estimator(), "ipopt");
    let mut set = ScenarioSet::new("Experiments");
    creator.scenarios_from_experiments(&mut set).unwrap();

    let names: Vec<_> = set.iter().map(Scenario::name).collect();
    assert_eq!(names, vec!["ExpScen0", "ExpScen1"]);
    assert!(set.iter().all(|s| s.probability() == 0.5));
    assert_eq!(
        set.scenarios()[0].theta_values(),
        &indexmap! { "a".to_owned() => 1.0, "b".to_owned() => 2.0 }
    );
    assert_eq!(
        set.scenarios()[1].theta_values(),
        &indexmap! { "a".to_owned() => 3.0, "b".to_owned() => 4.0 }
    );
}

#[test]
fn bootstrap_rows_export_as_csv() {
    let dir = tempdir().unwrap();
    let mut creator = ScenarioCreator::new(estimator(), "ipopt");
    let mut set = ScenarioSet::new("Bootstrap");
    creator.scenarios_from_bootstrap(&mut set, 3).unwrap();

    let names: Vec<_> = set.iter().map(Scenario::name).collect();
    assert_eq!(names, vec!["Bootstrap0", "Bootstrap1", "Bootstrap2"]);
    assert!(set.iter().all(|s| s.probability() == 1.0 / 3.0));

    let path = dir.path().join("boot.csv");
    assert_eq!(
        set.write_csv_checked(&path).unwrap(),
        ExportOutcome::Written { rows: 3 }
    );
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Name,Probability,a,b");
    assert_eq!(lines[1], format!("Bootstrap0,{},5,6", 1.0_f64 / 3.0));
    assert_eq!(lines[3], format!("Bootstrap2,{},9,10", 1.0_f64 / 3.0));
    assert!(content.ends_with('\n'));
}

#[test]
fn experiment_and_bootstrap_sets_concatenate() {
    let mut creator = ScenarioCreator::new(estimator(), "ipopt");
    let mut experiments = ScenarioSet::new("Experiments");
    creator.scenarios_from_experiments(&mut experiments).unwrap();
    let mut bootstrap = ScenarioSet::new("Bootstrap");
    creator.scenarios_from_bootstrap(&mut bootstrap, 2).unwrap();

    let all = experiments.concat_with(&bootstrap, "All");
    let names: Vec<_> = all.iter().map(Scenario::name).collect();
    assert_eq!(names, vec!["ExpScen0", "ExpScen1", "Bootstrap0", "Bootstrap1"]);
    assert_eq!(all.name(), "All");
    assert!((all.total_probability() - 2.0).abs() < 1e-12);
    assert_eq!(experiments.len(), 2);
    assert_eq!(bootstrap.len(), 2);
}

#[test]
fn empty_set_export_is_a_no_op() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nothing.csv");
    assert_eq!(
        ScenarioSet::new("").write_csv(&path).unwrap(),
        ExportOutcome::SkippedEmpty { file: path.clone() }
    );
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
