//! Namespace kinds

use std::fmt;
use std::str::FromStr;

use nix::sched::CloneFlags;
use nstree_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// The kind of a namespace, as reported by `NS_GET_NSTYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    /// Cgroup root directory
    Cgroup,
    /// System V IPC and POSIX message queues
    Ipc,
    /// Mount points
    Mnt,
    /// Network devices, stacks and ports
    Net,
    /// Process IDs
    Pid,
    /// User and group IDs
    User,
    /// Hostname and NIS domain name
    Uts,
}

impl NamespaceKind {
    /// Every kind, in the order of the `/proc/PID/ns` symlinks that are scanned
    pub const ALL: [Self; 7] = [
        Self::Cgroup,
        Self::Ipc,
        Self::Mnt,
        Self::Net,
        Self::Pid,
        Self::User,
        Self::Uts,
    ];

    /// Name of the symlink in `/proc/PID/ns`, also used for display
    #[must_use]
    pub const fn proc_name(self) -> &'static str {
        match self {
            Self::Cgroup => "cgroup",
            Self::Ipc => "ipc",
            Self::Mnt => "mnt",
            Self::Net => "net",
            Self::Pid => "pid",
            Self::User => "user",
            Self::Uts => "uts",
        }
    }

    /// The `CLONE_NEW*` flag that creates this kind of namespace
    #[must_use]
    pub const fn clone_flag(self) -> CloneFlags {
        match self {
            Self::Cgroup => CloneFlags::CLONE_NEWCGROUP,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
            Self::Mnt => CloneFlags::CLONE_NEWNS,
            Self::Net => CloneFlags::CLONE_NEWNET,
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::User => CloneFlags::CLONE_NEWUSER,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
        }
    }

    /// Map the value returned by `NS_GET_NSTYPE` back to a kind
    pub fn from_clone_flag(code: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.clone_flag().bits() == code)
            .ok_or(Error::UnknownNamespaceType(code))
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_name())
    }
}

impl FromStr for NamespaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.proc_name() == s)
            .ok_or_else(|| Error::invalid_config(format!("unknown namespace kind '{s}'")))
    }
}
