//! Merge options

use serde::{Deserialize, Serialize};

/// Settings of one merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Integer parameter numbering repetitions, shifted when merged
    pub trial_parameter: Option<String>,
    /// Skip source runs whose parameters match a target run
    pub remove_duplicates: bool,
    /// Leave derived parameters out of compatibility checks and rewriting
    pub ignore_derived_parameters: bool,
    /// Do not copy trajectory-level results of the source
    pub ignore_results: bool,
    /// Record the merge below `config.merge`
    pub keep_info: bool,
    /// Also record the source's name, length and comment
    pub keep_other_info: bool,
    /// Copy the source's git, environment and merge records
    pub merge_config: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            trial_parameter: None,
            remove_duplicates: false,
            ignore_derived_parameters: false,
            ignore_results: false,
            keep_info: true,
            keep_other_info: true,
            merge_config: true,
        }
    }
}

impl MergeOptions {
    /// Options with bookkeeping enabled and everything else off
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trial parameter
    #[must_use]
    pub fn with_trial_parameter(mut self, name: impl Into<String>) -> Self {
        self.trial_parameter = Some(name.into());
        self
    }

    /// Enable or disable duplicate removal
    #[must_use]
    pub fn with_remove_duplicates(mut self, enabled: bool) -> Self {
        self.remove_duplicates = enabled;
        self
    }

    /// Enable or disable ignoring derived parameters
    #[must_use]
    pub fn with_ignore_derived_parameters(mut self, enabled: bool) -> Self {
        self.ignore_derived_parameters = enabled;
        self
    }

    /// Enable or disable ignoring trajectory-level results
    #[must_use]
    pub fn with_ignore_results(mut self, enabled: bool) -> Self {
        self.ignore_results = enabled;
        self
    }

    /// Enable or disable merge bookkeeping
    #[must_use]
    pub fn with_keep_info(mut self, enabled: bool) -> Self {
        self.keep_info = enabled;
        self
    }

    /// Enable or disable recording the source trajectory
    #[must_use]
    pub fn with_keep_other_info(mut self, enabled: bool) -> Self {
        self.keep_other_info = enabled;
        self
    }

    /// Enable or disable copying configuration records
    #[must_use]
    pub fn with_merge_config(mut self, enabled: bool) -> Self {
        self.merge_config = enabled;
        self
    }
}
