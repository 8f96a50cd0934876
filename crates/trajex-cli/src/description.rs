//! Trajectory description files
//!
//! A description names the trajectory, lists parameter defaults and the
//! ranges to explore. TOML and YAML are accepted, chosen by file extension:
//!
//! ```toml
//! [trajectory]
//! name = "traffic"
//!
//! [parameters]
//! "traffic.ncars" = 10
//! "traffic.speed" = 1.5
//!
//! [explore]
//! ncars = [10, 20, 30]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use trajex_core::{RootGroup, Trajectory, TrajectoryConfig, TrajectoryError};
use trajex_leaf::Value;

/// Contents of a description file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Description {
    /// Trajectory settings
    pub trajectory: TrajectoryConfig,
    /// Parameter defaults, by name below `parameters`
    pub parameters: IndexMap<String, Value>,
    /// Derived parameter values, by name below `derived_parameters`
    pub derived_parameters: IndexMap<String, Value>,
    /// Ranges to explore
    pub explore: IndexMap<String, Vec<Value>>,
    /// Values appended after exploring
    pub expand: IndexMap<String, Vec<Value>>,
}

/// Description loading failure
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    /// File could not be read
    #[error("cannot read '{path}': {source}")]
    Io {
        /// File
        path: PathBuf,
        /// Cause
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid TOML description: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed YAML
    #[error("invalid YAML description: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Extension is neither TOML nor YAML
    #[error("unknown description format: '{0}' (expected .toml, .yaml or .yml)")]
    UnknownFormat(PathBuf),

    /// Trajectory could not be built
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

impl Description {
    /// Parse a TOML description
    ///
    /// # Errors
    /// Returns [`DescriptionError::Toml`] on malformed input
    pub fn from_toml_str(s: &str) -> Result<Self, DescriptionError> {
        Ok(toml::from_str(s)?)
    }

    /// Parse a YAML description
    ///
    /// # Errors
    /// Returns [`DescriptionError::Yaml`] on malformed input
    pub fn from_yaml_str(s: &str) -> Result<Self, DescriptionError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Read a description file
    ///
    /// # Errors
    /// I/O, parse and unknown-format failures
    pub fn from_path(path: &Path) -> Result<Self, DescriptionError> {
        let read = || {
            std::fs::read_to_string(path).map_err(|source| DescriptionError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let description = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&read()?)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&read()?)?,
            _ => return Err(DescriptionError::UnknownFormat(path.to_path_buf())),
        };
        debug!(path = %path.display(), name = %description.trajectory.name, "loaded description");
        Ok(description)
    }

    /// Build the described trajectory
    ///
    /// # Errors
    /// Configuration, naming and exploration failures
    pub fn build(&self) -> Result<Trajectory, DescriptionError> {
        let mut traj = Trajectory::new(self.trajectory.clone())?;
        for (name, value) in &self.parameters {
            traj.parameters().add_leaf(name, Some(value.clone()))?;
        }
        for (name, value) in &self.derived_parameters {
            traj.derived_parameters().add_leaf(name, Some(value.clone()))?;
        }
        traj.explore(self.explore.iter().map(|(k, v)| (k.as_str(), v.clone())))?;
        if !self.expand.is_empty() {
            traj.expand(self.expand.iter().map(|(k, v)| (k.as_str(), v.clone())))?;
        }
        Ok(traj)
    }
}
