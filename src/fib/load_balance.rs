//! Load-balance objects and PIC-edge notifications
//!
//! Multipath entries fan packets out over the DPOs of their resolved paths.
//! The hash key is the list of (weight, path, DPO) triples the paths
//! append; a load-balance object in the pool freezes one such list and
//! owns the locks its member DPOs carry.
//!
//! When a recursive path flips resolved/unresolved because a RESOLVE_VIA_*
//! constraint changed, the load-balance maps are told immediately so that
//! forwarding can shift to pre-computed backup buckets before the back-walk
//! finishes rippling.

use tracing::debug;

use crate::fib::dpo::{Dpo, DpoKind};
use crate::fib::pool::Pool;
use crate::fib::types::DpoProto;

/// One next-hop's contribution to a multipath hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBalancePath {
    pub weight: u32,
    pub path_index: u32,
    pub dpo: Dpo,
}

#[derive(Debug)]
struct LoadBalance {
    members: Vec<LoadBalancePath>,
    locks: u32,
}

/// Pool of load-balance objects plus the PIC-edge event channel.
#[derive(Debug, Default)]
pub struct LoadBalancePool {
    pool: Pool<LoadBalance>,
    pic_events: Vec<u32>,
}

impl LoadBalancePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze a hash key into a load-balance object and hand back its DPO,
    /// locked once for the caller. The object takes over the member locks.
    pub fn create(&mut self, proto: DpoProto, members: Vec<LoadBalancePath>) -> Dpo {
        assert!(!members.is_empty(), "empty load-balance");
        let index = self.pool.put(LoadBalance { members, locks: 1 });
        Dpo {
            kind: DpoKind::LoadBalance,
            proto,
            index,
        }
    }

    pub fn lock(&mut self, index: u32) {
        self.pool.get_mut(index).locks += 1;
    }

    /// Drop one lock. At zero the object is freed and its members are
    /// handed back so the caller can release the locks they carry.
    pub fn unlock(&mut self, index: u32) -> Option<Vec<LoadBalancePath>> {
        let lb = self.pool.get_mut(index);
        lb.locks -= 1;
        if lb.locks == 0 {
            Some(self.pool.take(index).members)
        } else {
            None
        }
    }

    pub fn members(&self, index: u32) -> &[LoadBalancePath] {
        &self.pool.get(index).members
    }

    /// PIC-edge trigger: a path's resolved state changed under a
    /// RESOLVE_VIA_* constraint.
    pub fn path_state_change(&mut self, path_index: u32) {
        debug!(path_index, "load-balance map path state change");
        self.pic_events.push(path_index);
    }

    /// Paths that have signalled a PIC-edge state change, in order.
    pub fn pic_events(&self) -> &[u32] {
        &self.pic_events
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_members() {
        let mut pool = LoadBalancePool::new();
        let members = vec![
            LoadBalancePath {
                weight: 1,
                path_index: 0,
                dpo: Dpo::adjacency(DpoProto::Ip4, 7),
            },
            LoadBalancePath {
                weight: 3,
                path_index: 1,
                dpo: Dpo::adjacency(DpoProto::Ip4, 8),
            },
        ];
        let dpo = pool.create(DpoProto::Ip4, members.clone());

        assert_eq!(dpo.kind, DpoKind::LoadBalance);
        assert_eq!(pool.members(dpo.index), &members[..]);

        let released = pool.unlock(dpo.index);
        assert_eq!(released, Some(members));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_locks_delay_free() {
        let mut pool = LoadBalancePool::new();
        let dpo = pool.create(
            DpoProto::Ip4,
            vec![LoadBalancePath {
                weight: 1,
                path_index: 0,
                dpo: Dpo::adjacency(DpoProto::Ip4, 7),
            }],
        );
        pool.lock(dpo.index);

        assert!(pool.unlock(dpo.index).is_none());
        assert!(pool.unlock(dpo.index).is_some());
    }

    #[test]
    fn test_pic_events_recorded_in_order() {
        let mut pool = LoadBalancePool::new();
        pool.path_state_change(4);
        pool.path_state_change(2);
        assert_eq!(pool.pic_events(), &[4, 2]);
    }

    #[test]
    #[should_panic(expected = "empty load-balance")]
    fn test_empty_create_panics() {
        let mut pool = LoadBalancePool::new();
        pool.create(DpoProto::Ip4, Vec::new());
    }
}
