//! Namespace hierarchy discovery and display
//!
//! This crate reconstructs the Linux namespace hierarchy as seen from the
//! calling process:
//! - [`probe`] - `ioctl_ns(2)` introspection of namespace files
//! - [`forest`] - the namespace forest and its recursive builder
//! - [`render`] - indented text rendering of the forest
//! - [`proc`] - `/proc` enumeration of processes and their namespaces
//! - [`manager`] - discovery runs tying the above together

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod forest;
pub mod kind;
pub mod manager;
pub mod probe;
pub mod proc;
pub mod render;

pub use config::{DiscoveryOptions, DisplayOptions, Hierarchy, RenderOptions, Selection};
pub use forest::{NamespaceForest, NamespaceNode};
pub use kind::NamespaceKind;
pub use manager::NamespaceManager;
pub use probe::{Ancestor, KernelProbe, MockProbe, NamespaceHandle, NamespaceProbe, Relation};
pub use proc::ProcFs;
pub use render::{ProcessInfo, TreeRenderer};

// Re-export commonly used types
pub use nstree_core::{NamespaceId, ProcessId};
