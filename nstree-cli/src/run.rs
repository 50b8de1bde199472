//! Discovery and display of the namespace hierarchy

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};
use nstree_namespace::{NamespaceManager, TreeRenderer};
use tracing::debug;

use crate::cli::Cli;
use crate::terminal;

pub fn execute(cli: &Cli) -> Result<()> {
    let selection = cli.selection()?;

    let color = io::stdout().is_terminal();
    let width = cli.width.unwrap_or_else(terminal::width);
    let options = cli.display_options(width, color);
    options.validate()?;

    debug!(?selection, ?options, "Resolved options");

    let manager = NamespaceManager::new(options.discovery.clone());

    // Resolve the subtree anchor before the scan so a bad PID fails fast.
    let start = manager
        .start_for(&selection)
        .context("Failed to find namespace subtree")?;

    let forest = manager
        .discover(&selection)
        .context("Failed to discover namespaces")?;

    let output = if cli.json {
        let mut json = forest.to_json()?;
        json.push('\n');
        json
    } else {
        TreeRenderer::new(&forest, &options.render, manager.procfs())
            .render(start)
            .context("Failed to display namespaces")?
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("Failed to write output")?;
    stdout.flush().context("Failed to write output")?;

    Ok(())
}
