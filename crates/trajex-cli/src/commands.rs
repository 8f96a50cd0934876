//! Command definitions and dispatch

use crate::description::Description;
use crate::report::{render_outcome, RunTable};
use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::info;
use trajex_core::Trajectory;
use trajex_merge::{MergeEngine, MergeOptions};

/// Command line definition
#[must_use]
pub fn cli() -> Command {
    let description = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help(help)
    };
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("trajex")
        .version(crate::VERSION)
        .about("Build, explore and merge parameter trajectories")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("explore")
                .about("Build a trajectory from a description and list its runs")
                .arg(description("description", "TOML or YAML description file"))
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("merge")
                .about("Merge the trajectory described by <other> into <target>")
                .arg(description("target", "Description of the trajectory merged into"))
                .arg(description("other", "Description of the trajectory merged in"))
                .arg(
                    Arg::new("remove-duplicates")
                        .long("remove-duplicates")
                        .action(ArgAction::SetTrue)
                        .help("Skip runs whose parameters the target already has"),
                )
                .arg(
                    Arg::new("trial-parameter")
                        .long("trial-parameter")
                        .value_name("NAME")
                        .help("Integer parameter numbering repetitions"),
                )
                .arg(
                    Arg::new("ignore-derived-parameters")
                        .long("ignore-derived-parameters")
                        .action(ArgAction::SetTrue)
                        .help("Leave derived parameters out of the merge"),
                )
                .arg(
                    Arg::new("ignore-results")
                        .long("ignore-results")
                        .action(ArgAction::SetTrue)
                        .help("Do not copy trajectory-level results"),
                )
                .arg(
                    Arg::new("table")
                        .long("table")
                        .action(ArgAction::SetTrue)
                        .help("Also list the runs of the merged trajectory"),
                )
                .arg(json),
        )
}

/// Run the selected subcommand and return its output
///
/// # Errors
/// Description, exploration and merge failures
pub fn execute(matches: &ArgMatches) -> anyhow::Result<String> {
    match matches.subcommand() {
        Some(("explore", args)) => {
            let traj = load(path_arg(args, "description")?)?;
            let table = RunTable::of(&traj);
            if args.get_flag("json") {
                Ok(serde_json::to_string_pretty(&table)?)
            } else {
                Ok(table.render())
            }
        }
        Some(("merge", args)) => {
            let mut target = load(path_arg(args, "target")?)?;
            let other = load(path_arg(args, "other")?)?;

            let mut options = MergeOptions::new()
                .with_remove_duplicates(args.get_flag("remove-duplicates"))
                .with_ignore_derived_parameters(args.get_flag("ignore-derived-parameters"))
                .with_ignore_results(args.get_flag("ignore-results"));
            if let Some(trial) = args.get_one::<String>("trial-parameter") {
                options = options.with_trial_parameter(trial.clone());
            }
            let outcome = MergeEngine::new(options)
                .merge(&mut target, &other)
                .with_context(|| format!("merging '{}' into '{}'", other.name(), target.name()))?;

            let with_table = args.get_flag("table");
            if args.get_flag("json") {
                let mut value = serde_json::to_value(&outcome)?;
                if with_table {
                    value["table"] = serde_json::to_value(RunTable::of(&target))?;
                }
                Ok(serde_json::to_string_pretty(&value)?)
            } else {
                let mut out = render_outcome(&outcome, &target);
                if with_table {
                    out.push_str(&RunTable::of(&target).render());
                }
                Ok(out)
            }
        }
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => bail!("no command given"),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument <{name}>"))
}

fn load(path: &Path) -> anyhow::Result<Trajectory> {
    let description =
        Description::from_path(path).with_context(|| format!("loading '{}'", path.display()))?;
    let traj = description
        .build()
        .with_context(|| format!("building '{}'", description.trajectory.name))?;
    info!(trajectory = traj.name(), runs = traj.len(), "built trajectory");
    Ok(traj)
}
