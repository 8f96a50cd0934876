//! `trajex` binary

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let matches = trajex_cli::cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let output = trajex_cli::execute(&matches)?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
