//! CLI argument definitions

use clap::Parser;
use nstree_core::{ProcessId, Result};
use nstree_namespace::{
    DiscoveryOptions, DisplayOptions, Hierarchy, RenderOptions, Selection,
};

#[derive(Parser, Debug)]
#[command(name = "nstree")]
#[command(
    about = "Show the namespace memberships of processes in the context of the user or PID namespace hierarchy",
    long_about = "Show the namespace memberships of processes in the context of the user or PID \
namespace hierarchy.\n\n\
With PID arguments, only those processes are examined. Without them, every process on the \
system is examined, and '--subtree <PID>' limits the display to the part of the hierarchy \
rooted at the namespace of that process.\n\n\
By default the user namespace hierarchy is shown, together with the nonuser namespaces owned \
by each user namespace. '--pidns' shows the PID namespace hierarchy instead."
)]
#[command(version)]
pub struct Cli {
    /// Processes to examine (default: all processes)
    #[arg(value_name = "PID")]
    pub pids: Vec<ProcessId>,

    /// Show the subtree rooted at the namespace of this process
    #[arg(long, value_name = "PID", conflicts_with = "pids")]
    pub subtree: Option<ProcessId>,

    /// Show the PID namespace hierarchy instead of the user namespace hierarchy
    #[arg(long)]
    pub pidns: bool,

    /// Show only user namespaces, omitting the namespaces they own
    #[arg(long, conflicts_with = "pidns")]
    pub userns_only: bool,

    /// Don't show the processes that are members of each namespace
    #[arg(long)]
    pub no_pids: bool,

    /// Show the command being run by each process
    #[arg(long)]
    pub show_comm: bool,

    /// Show each process's PIDs in all of its PID namespaces (with --pidns)
    #[arg(long)]
    pub all_pids: bool,

    /// Don't use color in the output
    #[arg(long)]
    pub no_color: bool,

    /// Print the discovered namespaces as JSON instead of a tree
    #[arg(long)]
    pub json: bool,

    /// Output width used to wrap PID lists (default: terminal width)
    #[arg(long, value_name = "COLS")]
    pub width: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Processes to scan and where the display starts
    pub fn selection(&self) -> Result<Selection> {
        Selection::from_args(self.pids.clone(), self.subtree)
    }

    /// Discovery and render options implied by the flags
    #[must_use]
    pub fn display_options(&self, width: usize, color: bool) -> DisplayOptions {
        let hierarchy = if self.pidns {
            Hierarchy::Pid
        } else {
            Hierarchy::User
        };

        let discovery = DiscoveryOptions::new()
            .with_hierarchy(hierarchy)
            .with_userns_only(self.userns_only);

        let render = RenderOptions::new()
            .with_pids(!self.no_pids)
            .with_command(self.show_comm)
            .with_all_pids(self.all_pids)
            .with_color(color && !self.no_color)
            .with_width(width);

        DisplayOptions::new(discovery, render)
    }
}
