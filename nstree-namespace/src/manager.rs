//! Discovery runs over live processes

use nstree_core::{Error, NamespaceId, ProcessId, Result};

use crate::config::{DiscoveryOptions, Selection};
use crate::forest::NamespaceForest;
use crate::kind::NamespaceKind;
use crate::probe::{KernelProbe, NamespaceProbe};
use crate::proc::ProcFs;

/// Builds namespace forests from the processes visible in `/proc`
#[derive(Debug)]
pub struct NamespaceManager {
    options: DiscoveryOptions,
    procfs: ProcFs,
    probe: KernelProbe,
}

impl NamespaceManager {
    /// Create a manager reading the procfs at `/proc`
    #[must_use]
    pub fn new(options: DiscoveryOptions) -> Self {
        Self::with_procfs(options, ProcFs::default())
    }

    /// Create a manager reading the given procfs
    #[must_use]
    pub const fn with_procfs(options: DiscoveryOptions, procfs: ProcFs) -> Self {
        Self {
            options,
            procfs,
            probe: KernelProbe::new(),
        }
    }

    /// Create a manager with default options
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DiscoveryOptions::default())
    }

    /// Get the discovery options
    #[must_use]
    pub const fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Get the procfs being scanned
    #[must_use]
    pub const fn procfs(&self) -> &ProcFs {
        &self.procfs
    }

    /// Discover the namespaces of the selected processes
    ///
    /// Processes that exit, or whose namespaces cannot be opened, while the
    /// scan is running are skipped. A PID listed more than once is examined
    /// once.
    ///
    /// # Errors
    /// Returns error if `/proc` cannot be listed or the namespace topology
    /// contradicts itself.
    pub fn discover(&self, selection: &Selection) -> Result<NamespaceForest> {
        let pids = match selection {
            Selection::Pids(pids) => {
                let mut pids = pids.clone();
                pids.sort_unstable();
                pids.dedup();
                pids
            }
            Selection::All | Selection::Subtree(_) => self.procfs.list_pids()?,
        };
        let kinds = self.options.kinds();

        tracing::info!(
            processes = pids.len(),
            kinds = ?kinds,
            hierarchy = ?self.options.hierarchy,
            "Scanning namespaces"
        );

        let mut forest = NamespaceForest::new();
        let mut skipped = 0usize;
        for &pid in &pids {
            for &kind in &kinds {
                if !self.add_process_namespace(&mut forest, pid, kind)? {
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            namespaces = forest.len(),
            skipped,
            root = ?forest.root(),
            "Namespace scan complete"
        );

        Ok(forest)
    }

    /// Add one `/proc/PID/ns/*` entry, and its ancestors, to `forest`
    ///
    /// Returns `false` when the namespace file could not be opened.
    pub fn add_process_namespace(
        &self,
        forest: &mut NamespaceForest,
        pid: ProcessId,
        kind: NamespaceKind,
    ) -> Result<bool> {
        let handle = match self.procfs.open_namespace(pid, kind) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    path = %self.procfs.namespace_path(pid, kind).display(),
                    error = %e,
                    "Could not open namespace (process terminated while scanning?)"
                );
                return Ok(false);
            }
        };

        forest.add(&self.probe, &handle, Some(pid), &self.options)?;
        Ok(true)
    }

    /// Identity of the namespace anchoring a subtree display for `pid`
    ///
    /// # Errors
    /// Returns [`Error::ProcessNotFound`] if the process's user (or PID)
    /// namespace cannot be opened.
    pub fn subtree_root(&self, pid: ProcessId) -> Result<NamespaceId> {
        let kind = self.options.hierarchy.subtree_kind();
        let handle = self
            .procfs
            .open_namespace(pid, kind)
            .map_err(|e| Error::ProcessNotFound {
                pid,
                message: format!("cannot open {kind} namespace: {e}"),
            })?;

        self.probe.identify(&handle)
    }

    /// Start point for rendering the given selection
    ///
    /// `None` means the whole forest.
    pub fn start_for(&self, selection: &Selection) -> Result<Option<NamespaceId>> {
        match selection {
            Selection::Subtree(pid) => self.subtree_root(*pid).map(Some),
            Selection::Pids(_) | Selection::All => Ok(None),
        }
    }
}
