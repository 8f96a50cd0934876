//! Trajex CLI - trajectories from description files
//!
//! The `trajex` binary builds trajectories from TOML or YAML descriptions:
//! - `trajex explore <description>` lists the runs and their values
//! - `trajex merge <target> <other>` merges two described trajectories and
//!   reports the outcome
//!
//! Both accept `--json`.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod commands;
pub mod description;
pub mod report;

pub use commands::{cli, execute};
pub use description::{Description, DescriptionError};
pub use report::{render_outcome, RunRow, RunTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
