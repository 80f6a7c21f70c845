//! Adjacency table
//!
//! An adjacency is a resolved neighbor binding: an outgoing interface plus
//! the rewrite to reach one neighbor on it. Glean adjacencies stand in
//! where no neighbor is known yet and trigger discovery on first use.
//!
//! Adjacencies are interned and reference counted. Paths that resolve over
//! an adjacency register as its children so rewrite and interface events
//! reach them through back-walks.

use std::collections::HashMap;
use std::net::IpAddr;

use tracing::debug;

use crate::fib::node::{BackWalkCtx, BackWalkReason, ChildList, NodeKey};
use crate::fib::pool::Pool;
use crate::fib::types::{LinkType, Protocol};
use crate::fib::Fib;

/// What an adjacency is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjKey {
    /// A specific neighbor on an interface, rewriting for `link`.
    Neighbor {
        proto: Protocol,
        link: LinkType,
        addr: IpAddr,
        interface: u32,
    },
    /// The whole attached subnet of an interface.
    Glean { proto: Protocol, interface: u32 },
}

impl AdjKey {
    pub fn interface(&self) -> u32 {
        match self {
            AdjKey::Neighbor { interface, .. } => *interface,
            AdjKey::Glean { interface, .. } => *interface,
        }
    }
}

#[derive(Debug)]
struct Adjacency {
    key: AdjKey,
    locks: u32,
    children: ChildList,
}

/// Interned adjacencies with lock counts and child bookkeeping.
#[derive(Debug, Default)]
pub struct AdjacencyTable {
    adjs: Pool<Adjacency>,
    by_key: HashMap<AdjKey, u32>,
}

impl AdjacencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the neighbor adjacency for (proto, link, addr,
    /// interface), taking a lock.
    pub fn nbr_add_or_lock(
        &mut self,
        proto: Protocol,
        link: LinkType,
        addr: IpAddr,
        interface: u32,
    ) -> u32 {
        self.add_or_lock(AdjKey::Neighbor {
            proto,
            link,
            addr,
            interface,
        })
    }

    /// Find or create the glean adjacency for an interface, taking a lock.
    pub fn glean_add_or_lock(&mut self, proto: Protocol, interface: u32) -> u32 {
        self.add_or_lock(AdjKey::Glean { proto, interface })
    }

    fn add_or_lock(&mut self, key: AdjKey) -> u32 {
        match self.by_key.get(&key) {
            Some(&index) => {
                self.adjs.get_mut(index).locks += 1;
                index
            }
            None => {
                let index = self.adjs.put(Adjacency {
                    key,
                    locks: 1,
                    children: ChildList::new(),
                });
                self.by_key.insert(key, index);
                debug!(?key, index, "adjacency created");
                index
            }
        }
    }

    pub fn lock(&mut self, index: u32) {
        self.adjs.get_mut(index).locks += 1;
    }

    /// Drop one lock; the adjacency is reclaimed at zero. A reclaimed
    /// adjacency must have no children left.
    pub fn unlock(&mut self, index: u32) {
        let adj = self.adjs.get_mut(index);
        adj.locks -= 1;
        if adj.locks == 0 {
            debug_assert!(adj.children.is_empty(), "adjacency freed with children");
            let adj = self.adjs.take(index);
            self.by_key.remove(&adj.key);
            debug!(index, "adjacency reclaimed");
        }
    }

    /// Register a dependent child; returns its sibling handle.
    pub fn child_add(&mut self, index: u32, child: NodeKey) -> u32 {
        self.adjs.get_mut(index).children.add(child)
    }

    pub fn child_remove(&mut self, index: u32, sibling: u32) {
        self.adjs.get_mut(index).children.remove(sibling);
    }

    pub fn exists(&self, index: u32) -> bool {
        self.adjs.contains(index)
    }

    pub fn key(&self, index: u32) -> AdjKey {
        self.adjs.get(index).key
    }

    /// The outgoing interface of an adjacency.
    pub fn interface(&self, index: u32) -> u32 {
        self.adjs.get(index).key.interface()
    }

    pub fn lock_count(&self, index: u32) -> u32 {
        self.adjs.get(index).locks
    }

    pub fn child_count(&self, index: u32) -> usize {
        self.adjs.get(index).children.len()
    }

    pub fn children(&self, index: u32) -> Vec<NodeKey> {
        self.adjs.get(index).children.collect()
    }

    pub fn find(&self, key: &AdjKey) -> Option<u32> {
        self.by_key.get(key).copied()
    }

    /// All adjacencies whose outgoing interface is `interface`.
    pub fn on_interface(&self, interface: u32) -> Vec<u32> {
        self.adjs
            .iter()
            .filter(|(_, adj)| adj.key.interface() == interface)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adjs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjs.is_empty()
    }
}

impl Fib {
    /// An adjacency's rewrite was updated (e.g. neighbor resolution
    /// completed). Back-walk its children so they restack.
    pub fn adjacency_rewrite_updated(&mut self, adj_index: u32) {
        debug!(adj_index, "adjacency rewrite updated");
        let children = self.adjacencies.children(adj_index);
        let mut ctx = BackWalkCtx::new(BackWalkReason::ADJ_UPDATE);
        self.walk_children(&children, &mut ctx);
    }
}
