//! Human-readable and JSON reports

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write as _;
use trajex_core::Trajectory;
use trajex_leaf::Value;
use trajex_merge::MergeOutcome;

/// One row of a run table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRow {
    /// Run index
    pub index: usize,
    /// Run name
    pub name: String,
    /// Whether the run finished
    pub completed: bool,
    /// Explored parameter values of this run
    pub values: IndexMap<String, Value>,
}

/// Runs of a trajectory with their explored values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTable {
    /// Trajectory name
    pub trajectory: String,
    /// Full names of the explored parameters
    pub parameters: Vec<String>,
    /// One row per run
    pub runs: Vec<RunRow>,
}

impl RunTable {
    /// Table of every run of `traj`
    #[must_use]
    pub fn of(traj: &Trajectory) -> Self {
        let explored = traj.explored_values();
        let runs = traj
            .ledger()
            .records()
            .map(|record| {
                let position = traj.ledger().position(record.index);
                let values = explored
                    .iter()
                    .filter_map(|(name, range)| {
                        let value = range.get(position?)?;
                        Some((name.clone(), value.clone()))
                    })
                    .collect();
                RunRow {
                    index: record.index,
                    name: record.name.clone(),
                    completed: record.completed,
                    values,
                }
            })
            .collect();
        Self {
            trajectory: traj.name().to_string(),
            parameters: explored.keys().cloned().collect(),
            runs,
        }
    }

    /// Plain-text rendering, one line per run
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("trajectory '{}': {} run(s)\n", self.trajectory, self.runs.len());
        for row in &self.runs {
            let values = row
                .values
                .iter()
                .map(|(name, value)| format!("{}={value}", short_name(name)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "  {}  {values}", row.name);
        }
        out
    }
}

/// Plain-text rendering of a merge outcome
#[must_use]
pub fn render_outcome(outcome: &MergeOutcome, target: &Trajectory) -> String {
    let mut out = format!(
        "merged '{}' into '{}' as {}\n",
        outcome.other_trajectory,
        target.name(),
        outcome.merge_name
    );
    let _ = writeln!(
        out,
        "  runs added: {} (now {}), duplicates skipped: {}",
        outcome.merged_runs,
        target.len(),
        outcome.duplicate_runs.len()
    );
    if !outcome.changed_parameters.is_empty() {
        let _ = writeln!(out, "  changed: {}", outcome.changed_parameters.join(", "));
    }
    for (old, new) in &outcome.run_names {
        let _ = writeln!(out, "  {old} -> {new}");
    }
    for link in &outcome.skipped_links {
        let _ = writeln!(out, "  skipped link {link}");
    }
    out
}

fn short_name(full: &str) -> &str {
    full.rsplit('.').next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Description;
    use pretty_assertions::assert_eq;

    fn trajectory() -> Trajectory {
        Description::from_toml_str(
            "[parameters]\nx = 0\ny = \"a\"\n[explore]\nx = [1, 2]\ny = [\"a\", \"b\"]\n",
        )
        .unwrap()
        .build()
        .unwrap()
    }

    #[test]
    fn table_lists_explored_values() {
        let table = RunTable::of(&trajectory());
        assert_eq!(table.parameters, vec!["parameters.x", "parameters.y"]);
        assert_eq!(table.runs.len(), 2);
        assert_eq!(table.runs[1].values["parameters.x"], Value::Int(2));
        assert_eq!(
            table.render(),
            "trajectory 'trajectory': 2 run(s)\n  run_00000000  x=1 y=\"a\"\n  run_00000001  x=2 y=\"b\"\n"
        );
    }

    #[test]
    fn table_serializes() {
        let json = serde_json::to_value(RunTable::of(&trajectory())).unwrap();
        assert_eq!(json["runs"][0]["name"], "run_00000000");
        assert_eq!(json["runs"][0]["values"]["parameters.y"], "a");
    }
}
