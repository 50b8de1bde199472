//! `/proc` enumeration of processes and their namespaces

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nstree_core::{ProcessId, Result};

use crate::kind::NamespaceKind;
use crate::probe::NamespaceHandle;
use crate::render::ProcessInfo;

/// Access to a procfs mount
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcFs {
    /// Use the procfs mounted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mount point of this procfs
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `pid`'s namespace symlink for `kind`
    #[must_use]
    pub fn namespace_path(&self, pid: ProcessId, kind: NamespaceKind) -> PathBuf {
        self.pid_dir(pid).join("ns").join(kind.proc_name())
    }

    /// Open `pid`'s namespace of the given kind
    ///
    /// Fails when the process has exited or is not accessible to the caller.
    pub fn open_namespace(
        &self,
        pid: ProcessId,
        kind: NamespaceKind,
    ) -> io::Result<NamespaceHandle> {
        NamespaceHandle::open(self.namespace_path(pid, kind))
    }

    /// PIDs of all running processes, in ascending order
    pub fn list_pids(&self) -> Result<Vec<ProcessId>> {
        let mut pids = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(pid) = entry
                .file_name()
                .to_str()
                .filter(|name| name.starts_with(|c: char| matches!(c, '1'..='9')))
                .and_then(|name| name.parse::<ProcessId>().ok())
            {
                pids.push(pid);
            }
        }

        pids.sort_unstable();
        tracing::debug!(count = pids.len(), root = %self.root.display(), "Listed processes");
        Ok(pids)
    }

    fn pid_dir(&self, pid: ProcessId) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl ProcessInfo for ProcFs {
    fn command_name(&self, pid: ProcessId) -> Option<String> {
        fs::read_to_string(self.pid_dir(pid).join("comm"))
            .ok()
            .map(|comm| comm.trim_end_matches('\n').to_string())
    }

    fn namespace_pids(&self, pid: ProcessId) -> Option<Vec<i32>> {
        let status = fs::read_to_string(self.pid_dir(pid).join("status")).ok()?;
        Some(parse_nstgid(&status))
    }
}

/// Values of the `NStgid:` field of a `/proc/PID/status` file
///
/// `NStgid` is used rather than `NSpid` so that every thread of a process
/// reports the process's IDs. Missing on kernels older than 4.1.
fn parse_nstgid(status: &str) -> Vec<i32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("NStgid:"))
        .map(|ids| {
            ids.split_whitespace()
                .filter_map(|id| id.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}
