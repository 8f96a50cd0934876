//! Run ledger
//!
//! Bidirectional run index ↔ name table, per-run status, and the cursor that
//! selects which run the trajectory currently presents.

use crate::config::RunNaming;
use crate::error::{Result, TrajectoryError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display, Formatter};

/// Bookkeeping of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run index
    pub index: usize,
    /// Run name
    pub name: String,
    /// Whether the run finished
    pub completed: bool,
    /// Start time
    pub started: Option<DateTime<Utc>>,
    /// Finish time
    pub finished: Option<DateTime<Utc>>,
    /// Short description of the run's parameter values
    pub summary: String,
}

impl RunRecord {
    /// Fresh, not yet started record
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            completed: false,
            started: None,
            finished: None,
            summary: String::new(),
        }
    }

    /// Wall time between start and finish
    #[must_use]
    pub fn runtime(&self) -> Option<Duration> {
        Some(self.finished? - self.started?)
    }
}

/// Run given by index or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRef {
    /// By index
    Index(usize),
    /// By name
    Name(String),
}

impl Display for RunRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl From<usize> for RunRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for RunRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for RunRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Ordered run records with an index ↔ name bijection
///
/// # Invariants
/// - `to_index(to_name(i)) == i` for every held index
/// - a full ledger holds exactly the indices `0..len`; a narrow one holds a
///   single record with its original index
/// - the cursor, when set, names a held index
#[derive(Debug, Clone, PartialEq)]
pub struct RunLedger {
    naming: RunNaming,
    records: BTreeMap<usize, RunRecord>,
    by_name: HashMap<String, usize>,
    cursor: Option<usize>,
}

impl RunLedger {
    /// Ledger holding run 0
    #[must_use]
    pub fn new(naming: RunNaming) -> Self {
        let mut ledger = Self {
            naming,
            records: BTreeMap::new(),
            by_name: HashMap::new(),
            cursor: None,
        };
        ledger.add_run();
        ledger
    }

    /// Naming convention
    #[inline]
    #[must_use]
    pub fn naming(&self) -> &RunNaming {
        &self.naming
    }

    /// Number of runs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no run is held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the next run, returning its index
    pub fn add_run(&mut self) -> usize {
        let index = self.records.keys().next_back().map_or(0, |last| last + 1);
        let name = self.naming.format(index);
        self.by_name.insert(name.clone(), index);
        self.records.insert(index, RunRecord::new(index, name));
        index
    }

    /// Append a run carrying the status of `record` from another ledger
    ///
    /// Returns the new index and name.
    pub fn adopt(&mut self, record: &RunRecord) -> (usize, String) {
        let index = self.add_run();
        let name = self.naming.format(index);
        if let Some(own) = self.records.get_mut(&index) {
            own.completed = record.completed;
            own.started = record.started;
            own.finished = record.finished;
            own.summary.clone_from(&record.summary);
        }
        (index, name)
    }

    /// Name of run `index`
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown indices
    pub fn to_name(&self, index: usize) -> Result<&str> {
        self.records
            .get(&index)
            .map(|r| r.name.as_str())
            .ok_or_else(|| TrajectoryError::run_not_found(index))
    }

    /// Index of run `name`
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown names
    pub fn to_index(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TrajectoryError::run_not_found(name))
    }

    /// Index of a run given either way
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn index_of(&self, run: &RunRef) -> Result<usize> {
        match run {
            RunRef::Index(i) if self.records.contains_key(i) => Ok(*i),
            RunRef::Index(i) => Err(TrajectoryError::run_not_found(i)),
            RunRef::Name(name) => self.to_index(name),
        }
    }

    /// Position of run `index` in the ranges of explored leaves
    ///
    /// Equal to the index for full ledgers.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<usize> {
        if !self.records.contains_key(&index) {
            return None;
        }
        if self.is_full() {
            Some(index)
        } else {
            Some(self.records.range(..index).count())
        }
    }

    fn is_full(&self) -> bool {
        self.records
            .keys()
            .next_back()
            .map_or(true, |last| last + 1 == self.records.len())
    }

    /// Record of a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn record(&self, run: &RunRef) -> Result<&RunRecord> {
        let index = self.index_of(run)?;
        self.records
            .get(&index)
            .ok_or_else(|| TrajectoryError::run_not_found(run))
    }

    fn record_mut(&mut self, run: &RunRef) -> Result<&mut RunRecord> {
        let index = self.index_of(run)?;
        self.records
            .get_mut(&index)
            .ok_or_else(|| TrajectoryError::run_not_found(run))
    }

    /// Records in index order
    pub fn records(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.values()
    }

    /// Run names in index order
    #[must_use]
    pub fn run_names(&self) -> Vec<&str> {
        self.records.values().map(|r| r.name.as_str()).collect()
    }

    /// Completion of one run, or of all runs for `None`
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn is_completed(&self, run: Option<&RunRef>) -> Result<bool> {
        match run {
            Some(run) => Ok(self.record(run)?.completed),
            None => Ok(self.records.values().all(|r| r.completed)),
        }
    }

    /// Whether any run completed
    #[must_use]
    pub fn any_completed(&self) -> bool {
        self.records.values().any(|r| r.completed)
    }

    /// Record the start of a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn mark_started(&mut self, run: &RunRef, at: DateTime<Utc>) -> Result<()> {
        self.record_mut(run)?.started = Some(at);
        Ok(())
    }

    /// Record the completion of a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn mark_completed(&mut self, run: &RunRef, at: DateTime<Utc>) -> Result<()> {
        let record = self.record_mut(run)?;
        record.completed = true;
        record.finished = Some(at);
        Ok(())
    }

    /// Attach a summary to a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn set_summary(&mut self, run: &RunRef, summary: impl Into<String>) -> Result<()> {
        self.record_mut(run)?.summary = summary.into();
        Ok(())
    }

    /// Select a run; returns its index
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn select(&mut self, run: &RunRef) -> Result<usize> {
        let index = self.index_of(run)?;
        self.cursor = Some(index);
        Ok(index)
    }

    /// Deselect
    #[inline]
    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Selected run index
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Selected run name
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.cursor
            .and_then(|i| self.records.get(&i))
            .map(|r| r.name.as_str())
    }

    /// Drop every record and start over with run 0
    pub fn reset(&mut self) {
        self.records.clear();
        self.by_name.clear();
        self.cursor = None;
        self.add_run();
    }

    /// Single-record copy of run `index`, selected
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown indices
    pub fn narrowed(&self, index: usize) -> Result<Self> {
        let record = self
            .records
            .get(&index)
            .cloned()
            .ok_or_else(|| TrajectoryError::run_not_found(index))?;
        Ok(Self {
            naming: self.naming.clone(),
            by_name: HashMap::from([(record.name.clone(), index)]),
            records: BTreeMap::from([(index, record)]),
            cursor: Some(index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ledger(len: usize) -> RunLedger {
        let mut ledger = RunLedger::new(RunNaming::default());
        while ledger.len() < len {
            ledger.add_run();
        }
        ledger
    }

    #[test]
    fn starts_with_run_zero() {
        let ledger = RunLedger::new(RunNaming::default());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.to_name(0).unwrap(), "run_00000000");
        assert_eq!(ledger.cursor(), None);
    }

    #[test]
    fn bijection() {
        let ledger = ledger(5);
        for i in 0..5 {
            assert_eq!(ledger.to_index(ledger.to_name(i).unwrap()).unwrap(), i);
        }
        assert!(ledger.to_name(5).is_err());
        assert!(ledger.to_index("run_ALL").is_err());
    }

    #[test]
    fn completion() {
        let mut ledger = ledger(2);
        assert!(!ledger.is_completed(None).unwrap());
        ledger.mark_completed(&RunRef::Index(0), Utc::now()).unwrap();
        assert!(ledger.is_completed(Some(&RunRef::from("run_00000000"))).unwrap());
        assert!(!ledger.is_completed(None).unwrap());
        ledger.mark_completed(&RunRef::Index(1), Utc::now()).unwrap();
        assert!(ledger.is_completed(None).unwrap());
    }

    #[test]
    fn runtime_needs_both_timestamps() {
        let mut ledger = ledger(1);
        let run = RunRef::Index(0);
        let start = Utc::now();
        ledger.mark_started(&run, start).unwrap();
        assert_eq!(ledger.record(&run).unwrap().runtime(), None);
        ledger
            .mark_completed(&run, start + Duration::seconds(3))
            .unwrap();
        assert_eq!(
            ledger.record(&run).unwrap().runtime(),
            Some(Duration::seconds(3))
        );
    }

    #[test]
    fn cursor_selection() {
        let mut ledger = ledger(3);
        assert_eq!(ledger.select(&RunRef::from("run_00000002")).unwrap(), 2);
        assert_eq!(ledger.current_name(), Some("run_00000002"));
        assert!(ledger.select(&RunRef::Index(7)).is_err());
        assert_eq!(ledger.cursor(), Some(2));
        ledger.clear_cursor();
        assert_eq!(ledger.cursor(), None);
    }

    #[test]
    fn adopt_copies_status_with_fresh_name() {
        let mut ledger = ledger(3);
        let mut foreign = RunRecord::new(0, "run_00000000");
        foreign.completed = true;
        foreign.summary = "x: 1".into();

        let (index, name) = ledger.adopt(&foreign);
        assert_eq!((index, name.as_str()), (3, "run_00000003"));
        let own = ledger.record(&RunRef::Index(3)).unwrap();
        assert!(own.completed);
        assert_eq!(own.summary, "x: 1");
    }

    #[test]
    fn narrow_ledger_keeps_original_index() {
        let ledger = ledger(4);
        let narrow = ledger.narrowed(2).unwrap();
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow.to_name(2).unwrap(), "run_00000002");
        assert_eq!(narrow.position(2), Some(0));
        assert_eq!(narrow.cursor(), Some(2));
        assert_eq!(ledger.position(2), Some(2));
    }

    #[test]
    fn reset_restores_single_run() {
        let mut ledger = ledger(4);
        ledger.select(&RunRef::Index(3)).unwrap();
        ledger.reset();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.cursor(), None);
        assert_eq!(ledger.run_names(), vec!["run_00000000"]);
    }
}
