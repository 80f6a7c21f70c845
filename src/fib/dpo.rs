//! Data-plane objects
//!
//! A DPO is an opaque handle the packet path dereferences to forward: an
//! adjacency, a table lookup, a punt to the local stack, a load-balance, or
//! the drop. The control plane only stacks and unstacks them.
//!
//! Lookup and receive DPOs are interned here with lock counts; adjacency
//! DPOs index the adjacency table and load-balances their own pool.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::fib::pool::Pool;
use crate::fib::types::DpoProto;

/// What a DPO resolves to in the data plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DpoKind {
    /// Not a forwarding object. The zero DPO.
    #[default]
    Invalid,
    Drop,
    /// A neighbor adjacency (complete or incomplete rewrite).
    Adjacency,
    /// A glean adjacency: triggers neighbor discovery on first use.
    AdjacencyGlean,
    /// A second lookup in another FIB table.
    Lookup,
    /// Punt to the local receive handler.
    Receive,
    /// Fan-out over several next-hops.
    LoadBalance,
}

/// A typed reference to a data-plane object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dpo {
    pub kind: DpoKind,
    pub proto: DpoProto,
    pub index: u32,
}

impl Dpo {
    /// The zero DPO: forwards nothing, compares unequal to every real one.
    pub const INVALID: Dpo = Dpo {
        kind: DpoKind::Invalid,
        proto: DpoProto::Ip4,
        index: 0,
    };

    /// The per-protocol drop. Drops are static singletons and are never
    /// locked.
    pub fn drop_for(proto: DpoProto) -> Dpo {
        Dpo {
            kind: DpoKind::Drop,
            proto,
            index: 0,
        }
    }

    pub fn adjacency(proto: DpoProto, index: u32) -> Dpo {
        Dpo {
            kind: DpoKind::Adjacency,
            proto,
            index,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind != DpoKind::Invalid
    }

    pub fn is_drop(&self) -> bool {
        self.kind == DpoKind::Drop
    }

    /// True for both neighbor and glean adjacencies.
    pub fn is_adjacency(&self) -> bool {
        matches!(self.kind, DpoKind::Adjacency | DpoKind::AdjacencyGlean)
    }
}

impl fmt::Display for Dpo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DpoKind::Invalid => write!(f, "dpo-invalid"),
            DpoKind::Drop => write!(f, "dpo-drop {:?}", self.proto),
            DpoKind::Adjacency => write!(f, "dpo-adj:{}", self.index),
            DpoKind::AdjacencyGlean => write!(f, "dpo-glean:{}", self.index),
            DpoKind::Lookup => write!(f, "dpo-lookup:{}", self.index),
            DpoKind::Receive => write!(f, "dpo-receive:{}", self.index),
            DpoKind::LoadBalance => write!(f, "dpo-load-balance:{}", self.index),
        }
    }
}

/// Which packet field a lookup DPO keys its second lookup on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupInput {
    DstAddress,
}

/// Where a lookup DPO finds the table to look in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupTable {
    FromConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LookupKey {
    table_id: u32,
    proto: DpoProto,
    input: LookupInput,
    table: LookupTable,
}

#[derive(Debug)]
struct LookupDpo {
    key: LookupKey,
    locks: u32,
}

/// Interned lookup DPOs, one per (table, protocol, input, table-source).
#[derive(Debug, Default)]
pub struct LookupStore {
    pool: Pool<LookupDpo>,
    by_key: HashMap<LookupKey, u32>,
}

impl LookupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the lookup bound to `table_id`, taking a lock.
    pub fn add_or_lock(
        &mut self,
        table_id: u32,
        proto: DpoProto,
        input: LookupInput,
        table: LookupTable,
    ) -> Dpo {
        let key = LookupKey {
            table_id,
            proto,
            input,
            table,
        };
        let index = match self.by_key.get(&key) {
            Some(&index) => {
                self.pool.get_mut(index).locks += 1;
                index
            }
            None => {
                let index = self.pool.put(LookupDpo { key, locks: 1 });
                self.by_key.insert(key, index);
                index
            }
        };
        Dpo {
            kind: DpoKind::Lookup,
            proto,
            index,
        }
    }

    pub fn lock(&mut self, index: u32) {
        self.pool.get_mut(index).locks += 1;
    }

    pub fn unlock(&mut self, index: u32) {
        let lookup = self.pool.get_mut(index);
        lookup.locks -= 1;
        if lookup.locks == 0 {
            let lookup = self.pool.take(index);
            self.by_key.remove(&lookup.key);
        }
    }

    pub fn lock_count(&self, index: u32) -> u32 {
        self.pool.get(index).locks
    }

    pub fn table_id(&self, index: u32) -> u32 {
        self.pool.get(index).key.table_id
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReceiveKey {
    proto: DpoProto,
    interface: u32,
    addr: IpAddr,
}

#[derive(Debug)]
struct ReceiveDpo {
    key: ReceiveKey,
    locks: u32,
}

/// Interned receive DPOs, one per (protocol, interface, local address).
#[derive(Debug, Default)]
pub struct ReceiveStore {
    pool: Pool<ReceiveDpo>,
    by_key: HashMap<ReceiveKey, u32>,
}

impl ReceiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_or_lock(&mut self, proto: DpoProto, interface: u32, addr: IpAddr) -> Dpo {
        let key = ReceiveKey {
            proto,
            interface,
            addr,
        };
        let index = match self.by_key.get(&key) {
            Some(&index) => {
                self.pool.get_mut(index).locks += 1;
                index
            }
            None => {
                let index = self.pool.put(ReceiveDpo { key, locks: 1 });
                self.by_key.insert(key, index);
                index
            }
        };
        Dpo {
            kind: DpoKind::Receive,
            proto,
            index,
        }
    }

    pub fn lock(&mut self, index: u32) {
        self.pool.get_mut(index).locks += 1;
    }

    pub fn unlock(&mut self, index: u32) {
        let receive = self.pool.get_mut(index);
        receive.locks -= 1;
        if receive.locks == 0 {
            let receive = self.pool.take(index);
            self.by_key.remove(&receive.key);
        }
    }

    pub fn lock_count(&self, index: u32) -> u32 {
        self.pool.get(index).locks
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl crate::fib::Fib {
    /// Take one more lock on whatever `dpo` references.
    ///
    /// Holding a DPO means holding a lock: resolvers and contributors hand
    /// out locked DPOs and whoever stores or returns one owns the lock.
    /// Drops are static and the zero DPO references nothing.
    pub fn dpo_lock(&mut self, dpo: &Dpo) {
        match dpo.kind {
            DpoKind::Adjacency | DpoKind::AdjacencyGlean => self.adjacencies.lock(dpo.index),
            DpoKind::Lookup => self.lookups.lock(dpo.index),
            DpoKind::Receive => self.receives.lock(dpo.index),
            DpoKind::LoadBalance => self.load_balances.lock(dpo.index),
            DpoKind::Drop | DpoKind::Invalid => {}
        }
    }

    /// Release the lock a DPO carries. Freed load-balances cascade into
    /// releasing their members.
    pub fn dpo_release(&mut self, dpo: &Dpo) {
        match dpo.kind {
            DpoKind::Adjacency | DpoKind::AdjacencyGlean => self.adjacencies.unlock(dpo.index),
            DpoKind::Lookup => self.lookups.unlock(dpo.index),
            DpoKind::Receive => self.receives.unlock(dpo.index),
            DpoKind::LoadBalance => {
                if let Some(members) = self.load_balances.unlock(dpo.index) {
                    for member in members {
                        self.dpo_release(&member.dpo);
                    }
                }
            }
            DpoKind::Drop | DpoKind::Invalid => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fib::types::INDEX_INVALID;

    #[test]
    fn test_invalid_dpo() {
        let dpo = Dpo::INVALID;
        assert!(!dpo.is_valid());
        assert!(!dpo.is_adjacency());
        assert_eq!(dpo, Dpo::default());
    }

    #[test]
    fn test_drop_dpo() {
        let drop4 = Dpo::drop_for(DpoProto::Ip4);
        let drop6 = Dpo::drop_for(DpoProto::Ip6);
        assert!(drop4.is_valid());
        assert!(drop4.is_drop());
        assert_ne!(drop4, drop6);
    }

    #[test]
    fn test_lookup_store_interning() {
        let mut store = LookupStore::new();
        let a = store.add_or_lock(
            5,
            DpoProto::Ip4,
            LookupInput::DstAddress,
            LookupTable::FromConfig,
        );
        let b = store.add_or_lock(
            5,
            DpoProto::Ip4,
            LookupInput::DstAddress,
            LookupTable::FromConfig,
        );
        assert_eq!(a.index, b.index);
        assert_eq!(store.lock_count(a.index), 2);

        let c = store.add_or_lock(
            6,
            DpoProto::Ip4,
            LookupInput::DstAddress,
            LookupTable::FromConfig,
        );
        assert_ne!(a.index, c.index);

        store.unlock(a.index);
        store.unlock(b.index);
        store.unlock(c.index);
        assert!(store.is_empty());
    }

    #[test]
    fn test_receive_store_interning() {
        let mut store = ReceiveStore::new();
        let addr: IpAddr = "10.0.0.1".parse().unwrap();
        let a = store.add_or_lock(DpoProto::Ip4, 3, addr);
        let b = store.add_or_lock(DpoProto::Ip4, 3, addr);
        assert_eq!(a.index, b.index);
        assert_eq!(a.kind, DpoKind::Receive);

        // receive on no particular interface is a distinct object
        let c = store.add_or_lock(DpoProto::Ip4, INDEX_INVALID, addr);
        assert_ne!(a.index, c.index);

        store.unlock(a.index);
        store.unlock(b.index);
        store.unlock(c.index);
        assert!(store.is_empty());
    }
}
