use std::{
    fmt::Write as _,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::{error::ScenarioError, estimator::BootstrapRow, scenario::Scenario};

/// Result of a CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ExportOutcome {
    /// File written with this many data rows.
    Written {
        /// Data rows (header excluded).
        rows: usize,
    },
    /// Set was empty; nothing written.
    SkippedEmpty {
        /// File that would have been written.
        file: PathBuf,
    },
}

/// Ordered, named collection of scenarios.
///
/// Insertion order is the CSV row order. Probabilities are not renormalized:
/// keeping them summing to one is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct ScenarioSet {
    name: String,
    scenarios: Vec<Arc<Scenario>>,
}

impl ScenarioSet {
    /// Creates an empty set. The name may be empty.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenarios: Vec::new(),
        }
    }

    /// Set name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True when the set holds no scenarios.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Scenarios in insertion order.
    #[must_use]
    pub fn scenarios(&self) -> &[Arc<Scenario>] {
        &self.scenarios
    }

    /// Iterates scenarios in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter().map(AsRef::as_ref)
    }

    /// Sum of scenario probabilities.
    #[must_use]
    pub fn total_probability(&self) -> f64 {
        self.iter().map(Scenario::probability).sum()
    }

    /// Appends a scenario. No dedup and no key check.
    pub fn add_one(&mut self, scenario: impl Into<Arc<Scenario>>) {
        self.scenarios.push(scenario.into());
    }

    /// Returns a new set named `new_name` holding this set's scenarios followed by
    /// `other`'s. Both operands are left untouched; records are shared.
    #[must_use]
    pub fn concat_with(&self, other: &Self, new_name: impl Into<String>) -> Self {
        let mut scenarios = Vec::with_capacity(self.len() + other.len());
        scenarios.extend(self.scenarios.iter().cloned());
        scenarios.extend(other.scenarios.iter().cloned());
        Self {
            name: new_name.into(),
            scenarios,
        }
    }

    /// Appends one equally likely scenario per bootstrap row, named
    /// `Bootstrap<row index>`. Returns the number appended.
    pub fn append_bootstrap(&mut self, rows: Vec<BootstrapRow>) -> Result<usize, ScenarioError> {
        if rows.is_empty() {
            return Err(ScenarioError::EmptyBootstrap);
        }
        #[allow(clippy::cast_precision_loss)]
        let probability = 1.0 / rows.len() as f64;
        // Build everything first so a bad row leaves the set unchanged.
        let built = rows
            .into_iter()
            .map(|row| Scenario::new(format!("Bootstrap{}", row.index), row.theta, probability))
            .collect::<Result<Vec<_>, _>>()?;
        let appended = built.len();
        self.scenarios.extend(built.into_iter().map(Arc::new));
        Ok(appended)
    }

    /// Checks that every scenario carries the first scenario's theta names in the
    /// same order.
    pub fn validate_keys(&self) -> Result<(), ScenarioError> {
        let Some(first) = self.scenarios.first() else {
            return Ok(());
        };
        match self.scenarios.iter().find(|scen| !first.same_keys(scen)) {
            Some(bad) => Err(ScenarioError::KeyMismatch {
                scenario: bad.name().to_owned(),
                expected: first.theta_names().map(str::to_owned).collect(),
                found: bad.theta_names().map(str::to_owned).collect(),
            }),
            None => Ok(()),
        }
    }

    /// Renders the CSV text `write_csv` would write. Empty for an empty set.
    ///
    /// Header columns come from the first scenario; later rows are written
    /// positionally even when their keys differ.
    #[must_use]
    pub fn to_csv_string(&self) -> String {
        let Some(first) = self.scenarios.first() else {
            return String::new();
        };
        let mut out = String::from("Name,Probability");
        for theta in first.theta_names() {
            let _ = write!(out, ",{theta}");
        }
        out.push('\n');
        for scen in &self.scenarios {
            let _ = write!(out, "{},{}", scen.name(), scen.probability());
            for value in scen.theta_values().values() {
                let _ = write!(out, ",{value}");
            }
            out.push('\n');
        }
        out
    }

    /// Writes the set as CSV. An empty set writes nothing and reports
    /// [`ExportOutcome::SkippedEmpty`].
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<ExportOutcome, ScenarioError> {
        let path = path.as_ref();
        if self.is_empty() {
            tracing::warn!(
                set = %self.name,
                file = %path.display(),
                "empty scenario set, not writing file"
            );
            return Ok(ExportOutcome::SkippedEmpty {
                file: path.to_path_buf(),
            });
        }
        if let Err(err) = self.validate_keys() {
            tracing::warn!(set = %self.name, %err, "columns will be misaligned");
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_csv_string().as_bytes())?;
        writer.flush()?;
        Ok(ExportOutcome::Written { rows: self.len() })
    }

    /// Like [`Self::write_csv`] but refuses to write a set with mismatched keys.
    pub fn write_csv_checked(&self, path: impl AsRef<Path>) -> Result<ExportOutcome, ScenarioError> {
        self.validate_keys()?;
        self.write_csv(path)
    }
}

impl<'a> IntoIterator for &'a ScenarioSet {
    type Item = &'a Arc<Scenario>;
    type IntoIter = std::slice::Iter<'a, Arc<Scenario>>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenarios.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ThetaValues;
    use indexmap::indexmap;
    use tempfile::tempdir;

    fn theta(a: f64, b: f64) -> ThetaValues {
        indexmap! { "a".into() => a, "b".into() => b }
    }

    fn scen(name: &str, a: f64, b: f64, probability: f64) -> Scenario {
        Scenario::new(name, theta(a, b), probability).unwrap()
    }

    #[test]
    fn append_bootstrap_splits_mass_evenly() {
        let mut set = ScenarioSet::new("Bootstrap");
        let rows = vec![
            BootstrapRow::new(4, theta(5.0, 6.0)),
            BootstrapRow::new(1, theta(7.0, 8.0)),
            BootstrapRow::new(9, theta(9.0, 10.0)),
            BootstrapRow::new(2, theta(1.0, 1.0)),
        ];
        assert_eq!(set.append_bootstrap(rows).unwrap(), 4);
        let names: Vec<_> = set.iter().map(Scenario::name).collect();
        assert_eq!(names, vec!["Bootstrap4", "Bootstrap1", "Bootstrap9", "Bootstrap2"]);
        assert!(set.iter().all(|s| s.probability() == 0.25));
    }

    #[test]
    fn append_bootstrap_rejects_empty_rows() {
        let mut set = ScenarioSet::new("b");
        assert!(matches!(
            set.append_bootstrap(Vec::new()),
            Err(ScenarioError::EmptyBootstrap)
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn append_bootstrap_is_all_or_nothing() {
        let mut set = ScenarioSet::new("b");
        let rows = vec![
            BootstrapRow::new(0, theta(1.0, 2.0)),
            BootstrapRow::new(1, ThetaValues::new()),
        ];
        assert!(set.append_bootstrap(rows).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn concat_preserves_order_identity_and_operands() {
        let mut left = ScenarioSet::new("left");
        left.add_one(scen("l0", 1.0, 2.0, 0.5));
        left.add_one(scen("l1", 3.0, 4.0, 0.5));
        let mut right = ScenarioSet::new("right");
        right.add_one(scen("r0", 5.0, 6.0, 1.0));

        let joined = left.concat_with(&right, "joined");
        assert_eq!(joined.name(), "joined");
        assert_eq!(joined.len(), 3);
        assert!(Arc::ptr_eq(&joined.scenarios()[0], &left.scenarios()[0]));
        assert!(Arc::ptr_eq(&joined.scenarios()[2], &right.scenarios()[0]));
        assert!((joined.total_probability() - 2.0).abs() < 1e-12);

        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 1);
        assert_eq!(left.name(), "left");
    }

    #[test]
    fn concat_result_is_independent() {
        let mut left = ScenarioSet::new("left");
        left.add_one(scen("l0", 1.0, 2.0, 1.0));
        let right = ScenarioSet::new("right");
        let mut joined = left.concat_with(&right, "joined");
        joined.add_one(scen("extra", 0.0, 0.0, 1.0));
        assert_eq!(left.len(), 1);
        assert_eq!(joined.len(), 2);
    }

    #[test]
    fn add_one_allows_duplicates() {
        let mut set = ScenarioSet::new("");
        let shared = Arc::new(scen("dup", 1.0, 1.0, 0.5));
        set.add_one(Arc::clone(&shared));
        set.add_one(shared);
        assert_eq!(set.len(), 2);
        assert_eq!(set.name(), "");
    }

    #[test]
    fn empty_set_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let outcome = ScenarioSet::new("empty").write_csv(&path).unwrap();
        assert_eq!(outcome, ExportOutcome::SkippedEmpty { file: path.clone() });
        assert!(!path.exists());
    }

    #[test]
    fn csv_has_header_and_one_line_per_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("set.csv");
        let mut set = ScenarioSet::new("exp");
        set.add_one(scen("ExpScen0", 1.0, 2.0, 0.5));
        set.add_one(scen("ExpScen1", 3.5, 4.0, 0.5));
        assert_eq!(
            set.write_csv(&path).unwrap(),
            ExportOutcome::Written { rows: 2 }
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Name,Probability,a,b\nExpScen0,0.5,1,2\nExpScen1,0.5,3.5,4\n"
        );
        assert_eq!(content.lines().count(), 1 + set.len());
    }

    #[test]
    fn mismatched_keys_write_positionally_but_fail_validation() {
        let dir = tempdir().unwrap();
        let mut set = ScenarioSet::new("mixed");
        set.add_one(scen("ab", 1.0, 2.0, 0.5));
        set.add_one(
            Scenario::new("ba", indexmap! { "b".into() => 20.0, "a".into() => 10.0 }, 0.5)
                .unwrap(),
        );

        let err = set.validate_keys().unwrap_err();
        assert!(matches!(err, ScenarioError::KeyMismatch { ref scenario, .. } if scenario == "ba"));

        let loose = dir.path().join("loose.csv");
        set.write_csv(&loose).unwrap();
        let content = std::fs::read_to_string(&loose).unwrap();
        assert!(content.ends_with("ba,0.5,20,10\n"));

        let strict = dir.path().join("strict.csv");
        assert!(set.write_csv_checked(&strict).is_err());
        assert!(!strict.exists());
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let mut set = ScenarioSet::new("s");
        set.add_one(scen("x", 1.0, 2.0, 1.0));
        let err = set
            .write_csv(dir.path().join("missing").join("s.csv"))
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Io(_)));
    }
}
