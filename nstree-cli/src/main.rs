//! nstree
//!
//! Shows the namespace memberships of processes in the context of the user
//! or PID namespace hierarchy.

use clap::Parser;
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;
mod terminal;

use cli::Cli;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity, RUST_LOG wins when set
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run::execute(&cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
