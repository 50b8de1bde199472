//! nstree Core - Foundation types and errors
//!
//! This crate provides the value types shared by the namespace discovery
//! engine and the command-line front end.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{NamespaceId, ProcessId};
