//! Trajex Core - the trajectory aggregate
//!
//! A trajectory is a hierarchical namespace of parameters and results that
//! is evaluated over a set of runs:
//! - Four roots: `config`, `parameters`, `derived_parameters`, `results`
//! - Exploration turns parameters into per-run sequences of equal length
//! - A run ledger names the runs and tracks their status
//! - Selecting a run makes every explored parameter present that run's value
//!   and scopes lookups to that run's branches
//! - Persistence goes through the [`StorageService`] seam
//!
//! # Example
//!
//! ```rust
//! use trajex_core::{RootGroup, RunRef, Trajectory, TrajectoryConfig};
//! use trajex_leaf::Value;
//!
//! # fn main() -> Result<(), trajex_core::TrajectoryError> {
//! let mut traj = Trajectory::new(TrajectoryConfig::new().with_name("sweep"))?;
//! traj.parameters().add_leaf("traffic.ncars", Some(Value::Int(10)))?;
//! traj.explore([("ncars", vec![Value::Int(10), Value::Int(20), Value::Int(30)])])?;
//! assert_eq!(traj.len(), 3);
//!
//! traj.set_cursor(Some(RunRef::from("run_00000001")))?;
//! assert_eq!(traj.value("ncars")?, &Value::Int(20));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
mod explore;
pub mod ledger;
pub mod roots;
mod runs;
pub mod storage;
mod trajectory;

pub use config::{ConfigError, RunBranch, RunNaming, TrajectoryConfig};
pub use error::{Result, TrajectoryError};
pub use explore::ExpandOptions;
pub use ledger::{RunLedger, RunRecord, RunRef};
pub use roots::{RootGroup, RootHandle, RootKind};
pub use storage::{
    LoadDepth, LoadRequest, StorageContext, StorageError, StorageItem, StorageService,
};
pub use trajectory::{Lookup, Trajectory};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with trajectories
    pub use crate::{
        RootGroup, RootKind, RunRef, Trajectory, TrajectoryConfig, TrajectoryError,
    };
    pub use trajex_leaf::{NodePath, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn narrow_copy_presents_one_run() {
        let mut traj = Trajectory::new(TrajectoryConfig::new()).unwrap();
        traj.parameters().add_leaf("x", Some(Value::Int(0))).unwrap();
        traj.parameters().add_leaf("c", Some(Value::Int(7))).unwrap();
        traj.explore([("x", vec![Value::Int(1), Value::Int(2), Value::Int(3)])])
            .unwrap();

        let narrow = traj.narrow_copy(2).unwrap();
        assert_eq!(narrow.len(), 1);
        assert_eq!(narrow.current_run_name(), Some("run_00000002"));
        assert_eq!(narrow.value("x").unwrap(), &Value::Int(3));
        assert_eq!(narrow.value("c").unwrap(), &Value::Int(7));
        assert_eq!(traj.len(), 3);
        assert!(traj.narrow_copy(3).is_err());
    }

    #[test]
    fn parameter_values_follow_cursor() {
        let mut traj = Trajectory::new(TrajectoryConfig::new()).unwrap();
        traj.parameters().add_leaf("x", Some(Value::Int(0))).unwrap();
        traj.explore([("x", vec![Value::Int(1), Value::Int(2)])])
            .unwrap();

        assert_eq!(
            traj.parameter_values(RootKind::Parameters)["parameters.x"],
            Value::Int(0)
        );
        traj.set_cursor(Some(RunRef::Index(1))).unwrap();
        assert_eq!(
            traj.parameter_values(RootKind::Parameters)["parameters.x"],
            Value::Int(2)
        );
        assert_eq!(
            traj.explored_values()["parameters.x"],
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn trajectory_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Trajectory>();
    }
}
