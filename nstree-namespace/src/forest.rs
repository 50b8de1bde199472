//! The namespace forest and its recursive builder
//!
//! Namespaces are discovered through the processes that are members of
//! them. Each newly seen namespace drags its whole ancestor chain into the
//! forest before [`NamespaceForest::add`] returns, so edges always point at
//! nodes that already exist.

use std::collections::HashMap;

use nstree_core::{Error, NamespaceId, ProcessId, Result};
use serde::Serialize;

use crate::config::{DiscoveryOptions, Hierarchy};
use crate::kind::NamespaceKind;
use crate::probe::{Ancestor, NamespaceProbe};

/// Upper bound on ancestor recursion. The kernel nests user and PID
/// namespaces at most 32 deep.
pub const MAX_ANCESTRY_DEPTH: usize = 64;

/// One discovered namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceNode {
    kind: NamespaceKind,
    children: Vec<NamespaceId>,
    members: Vec<ProcessId>,
}

impl NamespaceNode {
    const fn new(kind: NamespaceKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Namespace kind
    #[must_use]
    pub const fn kind(&self) -> NamespaceKind {
        self.kind
    }

    /// Child (PID hierarchy) or owned (user hierarchy) namespaces, in
    /// discovery order
    #[must_use]
    pub fn children(&self) -> &[NamespaceId] {
        &self.children
    }

    /// Member processes, in discovery order
    #[must_use]
    pub fn members(&self) -> &[ProcessId] {
        &self.members
    }

    /// Member processes in ascending order
    #[must_use]
    pub fn sorted_members(&self) -> Vec<ProcessId> {
        let mut members = self.members.clone();
        members.sort_unstable();
        members
    }
}

/// All namespaces seen during one discovery run
///
/// The forest only ever grows. It holds identities, never open handles.
#[derive(Debug, Clone, Default)]
pub struct NamespaceForest {
    nodes: HashMap<NamespaceId, NamespaceNode>,
    root: Option<NamespaceId>,
}

impl NamespaceForest {
    /// Create an empty forest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Topmost namespace visible to the caller, once discovered
    #[must_use]
    pub const fn root(&self) -> Option<NamespaceId> {
        self.root
    }

    /// Look up a namespace
    #[must_use]
    pub fn get(&self, id: NamespaceId) -> Option<&NamespaceNode> {
        self.nodes.get(&id)
    }

    /// The invisible-ancestor bucket, if any namespace needed it
    #[must_use]
    pub fn invisible(&self) -> Option<&NamespaceNode> {
        self.nodes.get(&NamespaceId::INVISIBLE)
    }

    /// Number of nodes, including the invisible-ancestor bucket
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing has been discovered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (NamespaceId, &NamespaceNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// The node listing `id` among its children
    #[must_use]
    pub fn parent_of(&self, id: NamespaceId) -> Option<NamespaceId> {
        self.iter()
            .find(|(_, node)| node.children.contains(&id))
            .map(|(parent, _)| parent)
    }

    /// Add the namespace behind `handle`, and its ancestors, to the forest
    ///
    /// If `pid` is given it is recorded as a member of the namespace. A
    /// namespace already in the forest only gains the member; its ancestry
    /// is never resolved twice.
    ///
    /// # Errors
    /// Any probe failure other than a denied ancestor lookup, a second
    /// root, or an ancestor chain that loops or exceeds
    /// [`MAX_ANCESTRY_DEPTH`].
    pub fn add<P: NamespaceProbe>(
        &mut self,
        probe: &P,
        handle: &P::Handle,
        pid: Option<ProcessId>,
        options: &DiscoveryOptions,
    ) -> Result<NamespaceId> {
        let mut chain = Vec::new();
        self.add_to_chain(probe, handle, pid, options, &mut chain)
    }

    fn add_to_chain<P: NamespaceProbe>(
        &mut self,
        probe: &P,
        handle: &P::Handle,
        pid: Option<ProcessId>,
        options: &DiscoveryOptions,
        chain: &mut Vec<NamespaceId>,
    ) -> Result<NamespaceId> {
        let id = probe.identify(handle)?;

        if chain.contains(&id) {
            return Err(Error::AncestryCycle(id));
        }

        if !self.nodes.contains_key(&id) {
            chain.push(id);
            self.insert_with_ancestry(probe, handle, id, options, chain)?;
            chain.pop();
        }

        if let Some(pid) = pid {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.members.push(pid);
            }
        }

        Ok(id)
    }

    fn insert_with_ancestry<P: NamespaceProbe>(
        &mut self,
        probe: &P,
        handle: &P::Handle,
        id: NamespaceId,
        options: &DiscoveryOptions,
        chain: &mut Vec<NamespaceId>,
    ) -> Result<()> {
        if chain.len() > MAX_ANCESTRY_DEPTH {
            return Err(Error::AncestryTooDeep {
                namespace: id,
                limit: MAX_ANCESTRY_DEPTH,
            });
        }

        let kind = probe.classify(handle)?;
        self.nodes.insert(id, NamespaceNode::new(kind));
        tracing::debug!(namespace = %id, kind = %kind, "Discovered namespace");

        match probe.resolve_ancestor(handle, options.hierarchy.relation())? {
            Ancestor::Found(ancestor) => {
                let ancestor_id = self.add_to_chain(probe, &ancestor, None, options, chain)?;
                drop(ancestor);
                self.push_child(ancestor_id, id);
                tracing::trace!(parent = %ancestor_id, child = %id, "Linked namespace");
            }
            Ancestor::Denied
                if kind == NamespaceKind::User || options.hierarchy == Hierarchy::Pid =>
            {
                self.set_root(id)?;
            }
            Ancestor::Denied => self.attach_invisible(id),
        }

        Ok(())
    }

    fn push_child(&mut self, parent: NamespaceId, child: NamespaceId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn set_root(&mut self, id: NamespaceId) -> Result<()> {
        match self.root {
            Some(existing) if existing != id => {
                tracing::error!(existing = %existing, found = %id, "Second root namespace");
                Err(Error::DuplicateRoot {
                    existing,
                    found: id,
                })
            }
            _ => {
                tracing::info!(namespace = %id, "Found topmost visible namespace");
                self.root = Some(id);
                Ok(())
            }
        }
    }

    fn attach_invisible(&mut self, id: NamespaceId) {
        tracing::debug!(namespace = %id, "Owner is an invisible ancestor user namespace");
        self.nodes
            .entry(NamespaceId::INVISIBLE)
            .or_insert_with(|| NamespaceNode::new(NamespaceKind::User))
            .children
            .push(id);
    }

    /// Serializable view of the forest, nodes ordered by identity
    #[must_use]
    pub fn snapshot(&self) -> ForestSnapshot<'_> {
        let mut nodes: Vec<_> = self
            .iter()
            .map(|(id, node)| NodeSnapshot {
                id,
                kind: node.kind,
                invisible: id.is_invisible(),
                children: &node.children,
                members: node.sorted_members(),
            })
            .collect();
        nodes.sort_by_key(|node| node.id);

        ForestSnapshot {
            root: self.root,
            nodes,
        }
    }

    /// The forest as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

/// JSON shape of a [`NamespaceForest`]
#[derive(Debug, Serialize)]
pub struct ForestSnapshot<'a> {
    /// Topmost visible namespace
    pub root: Option<NamespaceId>,
    /// Every node, the invisible-ancestor bucket included
    pub nodes: Vec<NodeSnapshot<'a>>,
}

/// JSON shape of a [`NamespaceNode`]
#[derive(Debug, Serialize)]
pub struct NodeSnapshot<'a> {
    /// Namespace identity
    pub id: NamespaceId,
    /// Namespace kind
    pub kind: NamespaceKind,
    /// Whether this is the invisible-ancestor bucket
    pub invisible: bool,
    /// Child or owned namespaces
    pub children: &'a [NamespaceId],
    /// Member processes, sorted
    pub members: Vec<ProcessId>,
}
