//! Namespace introspection via `ioctl_ns(2)`
//!
//! A namespace has no stable handle other than an open file referring to
//! it. The probe turns such a handle into an identity, a kind and, where
//! the kernel allows it, a handle on the parent or owning namespace.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs::File;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::errno::Errno;
use nstree_core::{Error, NamespaceId, Result};

use crate::kind::NamespaceKind;

const NSIO: u8 = 0xb7;

nix::ioctl_none!(
    /// `NS_GET_USERNS`: open the owning user namespace
    ns_get_userns,
    NSIO,
    0x1
);
nix::ioctl_none!(
    /// `NS_GET_PARENT`: open the parent namespace
    ns_get_parent,
    NSIO,
    0x2
);
nix::ioctl_none!(
    /// `NS_GET_NSTYPE`: return the `CLONE_NEW*` type of the namespace
    ns_get_nstype,
    NSIO,
    0x3
);

/// Which ancestor of a namespace to ask the kernel for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `NS_GET_USERNS`: the owning user namespace of a nonuser namespace,
    /// or the parent of a user namespace
    Owner,
    /// `NS_GET_PARENT`: the parent of a PID (or user) namespace
    Parent,
}

impl Relation {
    /// Name of the ioctl request implementing this relation
    #[must_use]
    pub const fn request_name(self) -> &'static str {
        match self {
            Self::Owner => "NS_GET_USERNS",
            Self::Parent => "NS_GET_PARENT",
        }
    }
}

/// Outcome of an ancestor lookup
#[derive(Debug)]
pub enum Ancestor<H> {
    /// The kernel handed back the ancestor
    Found(H),
    /// The ancestor exists but lies outside the caller's view (`EPERM`)
    Denied,
}

/// Kernel introspection of namespace handles
///
/// Any failure other than a denied ancestor lookup is returned as an
/// error and ends the discovery run.
pub trait NamespaceProbe {
    /// An open reference to a namespace
    type Handle;

    /// Device ID and inode number of the namespace behind `handle`
    fn identify(&self, handle: &Self::Handle) -> Result<NamespaceId>;

    /// Kind of the namespace behind `handle`
    fn classify(&self, handle: &Self::Handle) -> Result<NamespaceKind>;

    /// Parent or owning namespace of `handle`
    fn resolve_ancestor(
        &self,
        handle: &Self::Handle,
        relation: Relation,
    ) -> Result<Ancestor<Self::Handle>>;
}

/// An open `nsfs` file, closed on drop
#[derive(Debug)]
pub struct NamespaceHandle {
    file: File,
}

impl NamespaceHandle {
    /// Open a namespace file such as `/proc/PID/ns/user`
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        File::open(path).map(|file| Self { file })
    }
}

impl From<OwnedFd> for NamespaceHandle {
    fn from(fd: OwnedFd) -> Self {
        Self {
            file: File::from(fd),
        }
    }
}

impl AsFd for NamespaceHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Probe backed by the running kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelProbe;

impl KernelProbe {
    /// Create a kernel probe
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NamespaceProbe for KernelProbe {
    type Handle = NamespaceHandle;

    fn identify(&self, handle: &NamespaceHandle) -> Result<NamespaceId> {
        let meta = handle.file.metadata()?;
        Ok(NamespaceId::new(meta.dev(), meta.ino()))
    }

    fn classify(&self, handle: &NamespaceHandle) -> Result<NamespaceKind> {
        // SAFETY: the descriptor is owned by `handle` and open for the call.
        let code = unsafe { ns_get_nstype(handle.as_fd().as_raw_fd()) }.map_err(|errno| {
            Error::Probe {
                operation: "NS_GET_NSTYPE",
                errno,
            }
        })?;
        NamespaceKind::from_clone_flag(code)
    }

    fn resolve_ancestor(
        &self,
        handle: &NamespaceHandle,
        relation: Relation,
    ) -> Result<Ancestor<NamespaceHandle>> {
        let fd = handle.as_fd().as_raw_fd();
        // SAFETY: the descriptor is owned by `handle` and open for the call.
        let res = unsafe {
            match relation {
                Relation::Owner => ns_get_userns(fd),
                Relation::Parent => ns_get_parent(fd),
            }
        };

        match res {
            Ok(ancestor) => {
                // SAFETY: on success the ioctl returns a new descriptor that
                // nothing else owns.
                let owned = unsafe { OwnedFd::from_raw_fd(ancestor) };
                Ok(Ancestor::Found(NamespaceHandle::from(owned)))
            }
            Err(Errno::EPERM) => Ok(Ancestor::Denied),
            Err(errno) => {
                tracing::error!(
                    request = relation.request_name(),
                    error = %errno,
                    "Ancestor lookup failed"
                );
                Err(Error::Probe {
                    operation: relation.request_name(),
                    errno,
                })
            }
        }
    }
}

/// In-memory probe for testing (doesn't touch the kernel)
///
/// Handles are plain [`NamespaceId`]s. A namespace registered without an
/// owner or parent answers that lookup with [`Ancestor::Denied`].
///
/// # Example
/// ```
/// use nstree_namespace::{DiscoveryOptions, MockProbe, NamespaceForest, NamespaceKind};
/// use nstree_core::{NamespaceId, ProcessId};
///
/// let init = NamespaceId::new(4, 1);
/// let net = NamespaceId::new(4, 2);
/// let probe = MockProbe::new()
///     .with_namespace(init, NamespaceKind::User)
///     .with_namespace(net, NamespaceKind::Net)
///     .with_owner(net, init);
///
/// let mut forest = NamespaceForest::new();
/// forest
///     .add(&probe, &net, Some(ProcessId::from_raw(1)), &DiscoveryOptions::new())
///     .unwrap();
///
/// assert_eq!(forest.root(), Some(init));
/// assert_eq!(forest.get(init).unwrap().children(), &[net]);
/// ```
#[derive(Debug, Default)]
pub struct MockProbe {
    namespaces: HashMap<NamespaceId, MockNamespace>,
    classify_calls: Cell<usize>,
    resolve_calls: Cell<usize>,
}

#[derive(Debug)]
struct MockNamespace {
    kind: NamespaceKind,
    owner: Option<NamespaceId>,
    parent: Option<NamespaceId>,
    failure: Option<Errno>,
}

impl MockProbe {
    /// Create an empty mock probe
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace whose ancestor lookups are denied until set
    #[must_use]
    pub fn with_namespace(mut self, id: NamespaceId, kind: NamespaceKind) -> Self {
        self.namespaces.insert(
            id,
            MockNamespace {
                kind,
                owner: None,
                parent: None,
                failure: None,
            },
        );
        self
    }

    /// Set the namespace returned by `NS_GET_USERNS`
    #[must_use]
    pub fn with_owner(mut self, id: NamespaceId, owner: NamespaceId) -> Self {
        if let Some(ns) = self.namespaces.get_mut(&id) {
            ns.owner = Some(owner);
        }
        self
    }

    /// Set the namespace returned by `NS_GET_PARENT`
    #[must_use]
    pub fn with_parent(mut self, id: NamespaceId, parent: NamespaceId) -> Self {
        if let Some(ns) = self.namespaces.get_mut(&id) {
            ns.parent = Some(parent);
        }
        self
    }

    /// Make every ancestor lookup on `id` fail with `errno`
    #[must_use]
    pub fn with_failure(mut self, id: NamespaceId, errno: Errno) -> Self {
        if let Some(ns) = self.namespaces.get_mut(&id) {
            ns.failure = Some(errno);
        }
        self
    }

    /// Number of `classify` calls made (for testing)
    #[must_use]
    pub fn classify_calls(&self) -> usize {
        self.classify_calls.get()
    }

    /// Number of `resolve_ancestor` calls made (for testing)
    #[must_use]
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.get()
    }

    fn lookup(&self, id: NamespaceId, operation: &'static str) -> Result<&MockNamespace> {
        self.namespaces.get(&id).ok_or(Error::Probe {
            operation,
            errno: Errno::EBADF,
        })
    }
}

impl NamespaceProbe for MockProbe {
    type Handle = NamespaceId;

    fn identify(&self, handle: &NamespaceId) -> Result<NamespaceId> {
        Ok(*handle)
    }

    fn classify(&self, handle: &NamespaceId) -> Result<NamespaceKind> {
        self.classify_calls.set(self.classify_calls.get() + 1);
        self.lookup(*handle, "NS_GET_NSTYPE").map(|ns| ns.kind)
    }

    fn resolve_ancestor(
        &self,
        handle: &NamespaceId,
        relation: Relation,
    ) -> Result<Ancestor<NamespaceId>> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        let ns = self.lookup(*handle, relation.request_name())?;

        if let Some(errno) = ns.failure {
            return Err(Error::Probe {
                operation: relation.request_name(),
                errno,
            });
        }

        let ancestor = match relation {
            Relation::Owner => ns.owner,
            Relation::Parent => ns.parent,
        };
        Ok(ancestor.map_or(Ancestor::Denied, Ancestor::Found))
    }
}
