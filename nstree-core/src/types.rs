//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Identity of a namespace: the device ID and inode number of its `nsfs` file
///
/// Two handles refer to the same namespace exactly when their identities are
/// equal, so this is the key for everything the discovery engine records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NamespaceId {
    device: u64,
    inode: u64,
}

impl NamespaceId {
    /// Reserved identity standing for user namespaces that cannot be seen
    /// from the caller's position in the hierarchy.
    ///
    /// No namespace file reports device 0 and inode 0.
    pub const INVISIBLE: Self = Self::new(0, 0);

    /// Create an identity from a device ID and inode number
    #[must_use]
    pub const fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    /// Device ID of the backing `nsfs` object
    #[must_use]
    pub const fn device(self) -> u64 {
        self.device
    }

    /// Inode number of the backing `nsfs` object
    #[must_use]
    pub const fn inode(self) -> u64 {
        self.inode
    }

    /// Whether this is the invisible-ancestor sentinel
    #[must_use]
    pub const fn is_invisible(self) -> bool {
        self.device == 0 && self.inode == 0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.device, self.inode)
    }
}

/// Process identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        #[allow(clippy::cast_possible_wrap)]
        Self(std::process::id() as i32)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Self(pid)),
            _ => Err(Error::invalid_config(format!(
                "'{s}' is not a valid process ID"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_id_display() {
        let id = NamespaceId::new(4, 4_026_531_837);
        assert_eq!(id.to_string(), "4,4026531837");
        assert_eq!(id.device(), 4);
        assert_eq!(id.inode(), 4_026_531_837);
    }

    #[test]
    fn test_namespace_id_structural_equality() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        assert!(seen.insert(NamespaceId::new(5, 100)));
        assert!(!seen.insert(NamespaceId::new(5, 100)));
        assert!(seen.insert(NamespaceId::new(100, 5)));
    }

    #[test]
    fn test_invisible_sentinel() {
        assert!(NamespaceId::INVISIBLE.is_invisible());
        assert!(!NamespaceId::new(0, 1).is_invisible());
        assert!(!NamespaceId::new(1, 0).is_invisible());
    }

    #[test]
    fn test_namespace_id_serde() {
        let id = NamespaceId::new(7, 50);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"device":7,"inode":50}"#);
    }

    #[test]
    fn test_process_id_parse() {
        assert_eq!("123".parse::<ProcessId>().unwrap(), ProcessId::from_raw(123));
        assert!("0".parse::<ProcessId>().is_err());
        assert!("-4".parse::<ProcessId>().is_err());
        assert!("abc".parse::<ProcessId>().is_err());
    }

    #[test]
    fn test_process_id() {
        let pid = ProcessId::from_raw(123);
        assert_eq!(pid.as_raw(), 123);
        assert_eq!(pid.to_string(), "123");
        assert!(ProcessId::current().as_raw() > 0);
    }
}
