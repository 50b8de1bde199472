//! Error types for nstree

use nix::errno::Errno;
use thiserror::Error;

use crate::types::{NamespaceId, ProcessId};

/// nstree error types
///
/// Every variant is fatal for a discovery run. Permission denial while
/// resolving an ancestor namespace is not represented here: it is a
/// boundary condition reported by the probe itself.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A namespace ioctl failed with something other than `EPERM`
    #[error("Namespace probe {operation} failed: {errno}")]
    Probe {
        /// Operation that failed
        operation: &'static str,
        /// Kernel error code
        errno: Errno,
    },

    /// `NS_GET_NSTYPE` returned a value that is not a `CLONE_NEW*` flag
    #[error("Unknown namespace type code: {0:#x}")]
    UnknownNamespaceType(i32),

    /// A second topmost namespace was discovered in one run
    #[error("Inconsistent topology: root already set to {existing}, found {found}")]
    DuplicateRoot {
        /// Root recorded first
        existing: NamespaceId,
        /// Namespace that also claimed to be the root
        found: NamespaceId,
    },

    /// Ancestor chain exceeded the recursion ceiling
    #[error("Ancestor chain of namespace {namespace} exceeds {limit} levels")]
    AncestryTooDeep {
        /// Namespace being resolved when the ceiling was hit
        namespace: NamespaceId,
        /// Depth ceiling
        limit: usize,
    },

    /// Ancestor chain led back to a namespace still being resolved
    #[error("Namespace {0} is its own ancestor")]
    AncestryCycle(NamespaceId),

    /// Namespace identity not present in the forest
    #[error("Namespace {0} was not discovered")]
    UnknownNamespace(NamespaceId),

    /// Process could not be resolved to a namespace
    #[error("Process {pid} not found: {message}")]
    ProcessNotFound {
        /// Process that was requested
        pid: ProcessId,
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Formatting output failed
    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfig`]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type alias for nstree operations
pub type Result<T> = std::result::Result<T, Error>;
