//! Discovery and display configuration

use nstree_core::{Error, ProcessId, Result};

use crate::kind::NamespaceKind;
use crate::probe::Relation;

/// Which namespace hierarchy is reconstructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Hierarchy {
    /// User namespaces, with the nonuser namespaces each one owns
    #[default]
    User,
    /// PID namespaces only
    Pid,
}

impl Hierarchy {
    /// The ancestor relation followed while building the forest
    #[must_use]
    pub const fn relation(self) -> Relation {
        match self {
            Self::User => Relation::Owner,
            Self::Pid => Relation::Parent,
        }
    }

    /// The namespace of a process that anchors a subtree display
    #[must_use]
    pub const fn subtree_kind(self) -> NamespaceKind {
        match self {
            Self::User => NamespaceKind::User,
            Self::Pid => NamespaceKind::Pid,
        }
    }
}

/// Options controlling which namespaces are discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Hierarchy to reconstruct
    pub hierarchy: Hierarchy,

    /// Scan only user namespaces (user hierarchy only)
    pub userns_only: bool,
}

impl DiscoveryOptions {
    /// Create options for the default user namespace hierarchy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the hierarchy to reconstruct
    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Restrict the scan to user namespaces
    #[must_use]
    pub fn with_userns_only(mut self, enable: bool) -> Self {
        self.userns_only = enable;
        self
    }

    /// Namespace kinds scanned for each process
    #[must_use]
    pub fn kinds(&self) -> Vec<NamespaceKind> {
        match self.hierarchy {
            Hierarchy::Pid => vec![NamespaceKind::Pid],
            Hierarchy::User if self.userns_only => vec![NamespaceKind::User],
            Hierarchy::User => NamespaceKind::ALL.to_vec(),
        }
    }
}

/// Options controlling how the forest is displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Show the member processes of each namespace
    pub show_pids: bool,

    /// Show the command each member process is running
    pub show_command: bool,

    /// Show each member's PIDs in every PID namespace it belongs to
    pub show_all_pids: bool,

    /// Use ANSI colors
    pub color: bool,

    /// Output width in columns, used to wrap PID lists
    pub width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_pids: true,
            show_command: false,
            show_all_pids: false,
            color: true,
            width: Self::DEFAULT_WIDTH,
        }
    }
}

impl RenderOptions {
    /// Width assumed when the terminal size is unknown
    pub const DEFAULT_WIDTH: usize = 80;

    /// Create the default render options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show or hide member PIDs
    #[must_use]
    pub fn with_pids(mut self, enable: bool) -> Self {
        self.show_pids = enable;
        self
    }

    /// Show or hide each member's command name
    #[must_use]
    pub fn with_command(mut self, enable: bool) -> Self {
        self.show_command = enable;
        self
    }

    /// Show or hide each member's PIDs in all PID namespaces
    #[must_use]
    pub fn with_all_pids(mut self, enable: bool) -> Self {
        self.show_all_pids = enable;
        self
    }

    /// Enable or disable color
    #[must_use]
    pub fn with_color(mut self, enable: bool) -> Self {
        self.color = enable;
        self
    }

    /// Set the output width
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Whether members are listed one per line instead of as a packed list
    #[must_use]
    pub const fn one_per_line(&self) -> bool {
        self.show_command || self.show_all_pids
    }
}

/// Combined discovery and render options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// What to discover
    pub discovery: DiscoveryOptions,

    /// How to display it
    pub render: RenderOptions,
}

impl DisplayOptions {
    /// Combine discovery and render options
    #[must_use]
    pub const fn new(discovery: DiscoveryOptions, render: RenderOptions) -> Self {
        Self { discovery, render }
    }

    /// Reject option combinations that make no sense together
    pub fn validate(&self) -> Result<()> {
        let pidns = self.discovery.hierarchy == Hierarchy::Pid;

        if self.discovery.userns_only && pidns {
            return Err(Error::invalid_config(
                "combining --pidns and --userns-only is nonsensical",
            ));
        }

        if self.render.show_all_pids && !pidns {
            return Err(Error::invalid_config(
                "--all-pids can be specified only with --pidns",
            ));
        }

        if !self.render.show_pids && (self.render.show_command || self.render.show_all_pids) {
            return Err(Error::invalid_config(
                "combining --no-pids with --show-comm or --all-pids is nonsensical",
            ));
        }

        Ok(())
    }
}

/// Which processes are examined, and where the display starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Only the listed processes
    Pids(Vec<ProcessId>),
    /// Every process on the system
    All,
    /// Every process on the system, displaying only the subtree rooted at
    /// the namespace of this process
    Subtree(ProcessId),
}

impl Selection {
    /// Build a selection from positional PIDs and an optional subtree PID
    ///
    /// Repeated PIDs are examined once.
    pub fn from_args(mut pids: Vec<ProcessId>, subtree: Option<ProcessId>) -> Result<Self> {
        match (subtree, pids.is_empty()) {
            (Some(_), false) => Err(Error::invalid_config(
                "combining --subtree with PID arguments is nonsensical",
            )),
            (Some(pid), true) => Ok(Self::Subtree(pid)),
            (None, true) => Ok(Self::All),
            (None, false) => {
                pids.sort_unstable();
                pids.dedup();
                Ok(Self::Pids(pids))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DisplayOptions::default();
        assert_eq!(options.discovery.hierarchy, Hierarchy::User);
        assert!(options.render.show_pids);
        assert!(options.render.color);
        assert_eq!(options.render.width, 80);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_kinds_per_hierarchy() {
        assert_eq!(DiscoveryOptions::new().kinds().len(), 7);
        assert_eq!(
            DiscoveryOptions::new().with_userns_only(true).kinds(),
            vec![NamespaceKind::User]
        );
        assert_eq!(
            DiscoveryOptions::new().with_hierarchy(Hierarchy::Pid).kinds(),
            vec![NamespaceKind::Pid]
        );
    }

    #[test]
    fn test_hierarchy_relation() {
        assert_eq!(Hierarchy::User.relation(), Relation::Owner);
        assert_eq!(Hierarchy::Pid.relation(), Relation::Parent);
        assert_eq!(Hierarchy::Pid.subtree_kind(), NamespaceKind::Pid);
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        let pidns = DiscoveryOptions::new().with_hierarchy(Hierarchy::Pid);

        let options = DisplayOptions::new(pidns.clone().with_userns_only(true), RenderOptions::new());
        assert!(options.validate().is_err());

        let options = DisplayOptions::new(
            DiscoveryOptions::new(),
            RenderOptions::new().with_all_pids(true),
        );
        assert!(options.validate().is_err());

        let options = DisplayOptions::new(pidns.clone(), RenderOptions::new().with_all_pids(true));
        assert!(options.validate().is_ok());

        let options = DisplayOptions::new(
            pidns,
            RenderOptions::new().with_pids(false).with_command(true),
        );
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_one_per_line() {
        assert!(!RenderOptions::new().one_per_line());
        assert!(RenderOptions::new().with_command(true).one_per_line());
        assert!(RenderOptions::new().with_all_pids(true).one_per_line());
    }

    #[test]
    fn test_selection_from_args() {
        let pid = ProcessId::from_raw(42);

        assert_eq!(Selection::from_args(vec![], None).unwrap(), Selection::All);
        assert_eq!(
            Selection::from_args(vec![pid], None).unwrap(),
            Selection::Pids(vec![pid])
        );
        assert_eq!(
            Selection::from_args(vec![], Some(pid)).unwrap(),
            Selection::Subtree(pid)
        );
        assert!(Selection::from_args(vec![pid], Some(pid)).is_err());
    }

    #[test]
    fn test_selection_repeated_pids() {
        let a = ProcessId::from_raw(42);
        let b = ProcessId::from_raw(7);

        assert_eq!(
            Selection::from_args(vec![a, a], None).unwrap(),
            Selection::Pids(vec![a])
        );
        assert_eq!(
            Selection::from_args(vec![a, b, a, b], None).unwrap(),
            Selection::Pids(vec![b, a])
        );
    }
}
