//! Trajectory configuration and run naming

use serde::{Deserialize, Serialize};
use trajex_leaf::{validate_segment, ErrorClass, NodePath};
use trajex_tree::ResolveOptions;

/// Where a node sits relative to the run branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunBranch {
    /// Not below any run segment
    Trajectory,
    /// Below the shared sentinel segment
    Shared,
    /// Below the segment of this run index
    Run(usize),
}

/// Run naming convention: `prefix + zero-padded index`, plus a shared sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNaming {
    prefix: String,
    width: usize,
    shared: String,
}

impl RunNaming {
    /// Create naming convention; see [`TrajectoryConfig::validate`] for the rules
    #[must_use]
    pub fn new(prefix: impl Into<String>, width: usize, shared: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            shared: shared.into(),
        }
    }

    /// Name of run `index`
    ///
    /// # Examples
    /// - `4` → `run_00000004` with the defaults
    #[must_use]
    pub fn format(&self, index: usize) -> String {
        format!("{}{:0width$}", self.prefix, index, width = self.width)
    }

    /// Index encoded in a run name; `None` for the sentinel and anything else
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<usize> {
        let digits = name.strip_prefix(self.prefix.as_str())?;
        if digits.len() < self.width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse().ok()?;
        (self.format(index) == name).then_some(index)
    }

    /// Whether `segment` is a numeric run name
    #[inline]
    #[must_use]
    pub fn is_run(&self, segment: &str) -> bool {
        self.parse(segment).is_some()
    }

    /// Whether `segment` is the shared sentinel
    #[inline]
    #[must_use]
    pub fn is_shared(&self, segment: &str) -> bool {
        segment == self.shared
    }

    /// Shared sentinel name
    #[inline]
    #[must_use]
    pub fn shared(&self) -> &str {
        &self.shared
    }

    /// Run name prefix
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Branch of a full name, decided by its first run-like segment
    #[must_use]
    pub fn branch_of(&self, path: &NodePath) -> RunBranch {
        for seg in path.iter() {
            if self.is_shared(seg) {
                return RunBranch::Shared;
            }
            if let Some(index) = self.parse(seg) {
                return RunBranch::Run(index);
            }
        }
        RunBranch::Trajectory
    }

    /// Positions of the numeric run segments of `path`
    #[must_use]
    pub fn run_positions(&self, path: &NodePath) -> Vec<usize> {
        path.positions(|seg| self.is_run(seg))
    }
}

impl Default for RunNaming {
    fn default() -> Self {
        Self::new("run_", 8, "run_ALL")
    }
}

/// Trajectory configuration
///
/// Every field has a default, so partial TOML documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Trajectory name
    pub name: String,
    /// Free-form description
    pub comment: String,
    /// Prefix of run names
    pub run_prefix: String,
    /// Zero padding of run indices
    pub run_name_width: usize,
    /// Sentinel segment shared by all runs
    pub shared_run_name: String,
    /// Default: allow shortcut lookups
    pub shortcuts: bool,
    /// Default: largest shortcut hop
    pub max_depth: Option<usize>,
    /// Default: follow links during lookup
    pub with_links: bool,
}

impl TrajectoryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With trajectory name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// With comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// With run name prefix and padding
    #[inline]
    #[must_use]
    pub fn with_run_names(mut self, prefix: impl Into<String>, width: usize) -> Self {
        self.run_prefix = prefix.into();
        self.run_name_width = width;
        self
    }

    /// With shared sentinel
    #[inline]
    #[must_use]
    pub fn with_shared_run_name(mut self, shared: impl Into<String>) -> Self {
        self.shared_run_name = shared.into();
        self
    }

    /// With shortcut lookups on or off
    #[inline]
    #[must_use]
    pub fn with_shortcuts(mut self, shortcuts: bool) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    /// With largest shortcut hop
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// With link following on or off
    #[inline]
    #[must_use]
    pub fn with_links(mut self, with_links: bool) -> Self {
        self.with_links = with_links;
        self
    }

    /// Parse from a TOML document and validate
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or invalid settings
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings
    ///
    /// # Errors
    /// - [`ConfigError::InvalidName`] for an empty or non-segment name
    /// - [`ConfigError::InvalidRunPrefix`] for a prefix that is not segment-safe
    /// - [`ConfigError::InvalidWidth`] for padding outside `1..=20`
    /// - [`ConfigError::InvalidSharedName`] for a sentinel that is not
    ///   segment-safe or reads as a numeric run name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if validate_segment(&self.name).is_err() {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        if validate_segment(&self.run_prefix).is_err() {
            return Err(ConfigError::InvalidRunPrefix(self.run_prefix.clone()));
        }
        if !(1..=20).contains(&self.run_name_width) {
            return Err(ConfigError::InvalidWidth(self.run_name_width));
        }
        if validate_segment(&self.shared_run_name).is_err()
            || self.naming().is_run(&self.shared_run_name)
        {
            return Err(ConfigError::InvalidSharedName(self.shared_run_name.clone()));
        }
        Ok(())
    }

    /// Run naming convention
    #[must_use]
    pub fn naming(&self) -> RunNaming {
        RunNaming::new(
            self.run_prefix.clone(),
            self.run_name_width,
            self.shared_run_name.clone(),
        )
    }

    /// Default lookup options
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            shortcuts: self.shortcuts,
            max_depth: self.max_depth,
            with_links: self.with_links,
        }
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        let naming = RunNaming::default();
        Self {
            name: "trajectory".to_string(),
            comment: String::new(),
            run_prefix: naming.prefix,
            run_name_width: naming.width,
            shared_run_name: naming.shared,
            shortcuts: true,
            max_depth: None,
            with_links: true,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Trajectory name unusable
    #[error("invalid trajectory name: '{0}'")]
    InvalidName(String),

    /// Run prefix unusable
    #[error("invalid run prefix: '{0}'")]
    InvalidRunPrefix(String),

    /// Padding out of bounds
    #[error("invalid run name width: {0} (must be 1..=20)")]
    InvalidWidth(usize),

    /// Sentinel unusable
    #[error("invalid shared run name: '{0}'")]
    InvalidSharedName(String),

    /// Malformed TOML
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_run_names() {
        let naming = RunNaming::default();
        assert_eq!(naming.format(4), "run_00000004");
        assert_eq!(naming.parse("run_00000004"), Some(4));
        assert_eq!(naming.parse("run_ALL"), None);
        assert_eq!(naming.parse("run_4"), None);
        assert_eq!(naming.parse("other"), None);
        assert!(naming.is_shared("run_ALL"));
    }

    #[test]
    fn wide_indices_keep_parsing() {
        let naming = RunNaming::new("run_", 2, "run_ALL");
        assert_eq!(naming.format(123), "run_123");
        assert_eq!(naming.parse("run_123"), Some(123));
        assert_eq!(naming.parse("run_0123"), None);
    }

    #[test]
    fn sentinel_sorts_after_numeric_names() {
        let naming = RunNaming::default();
        assert!(naming.shared() > naming.format(99_999_999).as_str());
    }

    #[test]
    fn branch_classification() {
        let naming = RunNaming::default();
        let p = |s: &str| s.parse::<NodePath>().unwrap();
        assert_eq!(naming.branch_of(&p("results.runs.run_00000002.z")), RunBranch::Run(2));
        assert_eq!(naming.branch_of(&p("results.runs.run_ALL.z")), RunBranch::Shared);
        assert_eq!(naming.branch_of(&p("results.z")), RunBranch::Trajectory);
        assert_eq!(naming.run_positions(&p("a.run_00000001.b.run_00000001")), vec![1, 3]);
    }

    #[test]
    fn parse_partial_toml() {
        let config = TrajectoryConfig::from_toml_str(
            r#"
            name = "sweep"
            max_depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "sweep");
        assert_eq!(config.max_depth, Some(3));
        assert_eq!(config.run_name_width, 8);
        assert!(config.shortcuts);
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(matches!(
            TrajectoryConfig::new().with_run_names("run_", 0).validate(),
            Err(ConfigError::InvalidWidth(0))
        ));
        assert!(matches!(
            TrajectoryConfig::new().with_shared_run_name("run_00000001").validate(),
            Err(ConfigError::InvalidSharedName(_))
        ));
        assert!(matches!(
            TrajectoryConfig::new().with_name("a.b").validate(),
            Err(ConfigError::InvalidName(_))
        ));
        assert!(matches!(
            TrajectoryConfig::from_toml_str("name = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
