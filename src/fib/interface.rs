//! Interface manager
//!
//! Tracks the little the FIB needs to know about interfaces: admin state,
//! point-to-point classification, and a stable ordering for path
//! comparison. State transitions fan out to the adjacencies on the
//! interface, which back-walk their dependent paths.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::fib::node::{BackWalkCtx, BackWalkReason};
use crate::fib::pool::Pool;
use crate::fib::types::INDEX_INVALID;
use crate::fib::Fib;

#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub admin_up: bool,
    pub p2p: bool,
}

/// Registry of interfaces known to the FIB.
#[derive(Debug, Default)]
pub struct InterfaceManager {
    interfaces: Pool<Interface>,
}

impl InterfaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface; starts admin-up.
    pub fn add(&mut self, name: &str, p2p: bool) -> u32 {
        let index = self.interfaces.put(Interface {
            name: name.to_string(),
            admin_up: true,
            p2p,
        });
        debug!(interface = name, index, p2p, "interface registered");
        index
    }

    pub fn exists(&self, index: u32) -> bool {
        index != INDEX_INVALID && self.interfaces.contains(index)
    }

    /// A deleted interface is neither up nor p2p.
    pub fn is_admin_up(&self, index: u32) -> bool {
        self.exists(index) && self.interfaces.get(index).admin_up
    }

    pub fn is_p2p(&self, index: u32) -> bool {
        self.exists(index) && self.interfaces.get(index).p2p
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        if self.exists(index) {
            Some(self.interfaces.get(index).name.as_str())
        } else {
            None
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<u32> {
        self.interfaces
            .iter()
            .find(|(_, i)| i.name == name)
            .map(|(index, _)| index)
    }

    /// Stable ordering for path comparison: by name, then by index. Either
    /// side may name a deleted or never-registered interface.
    pub fn compare(&self, a: u32, b: u32) -> Ordering {
        match (self.name(a), self.name(b)) {
            (Some(na), Some(nb)) => na.cmp(nb).then(a.cmp(&b)),
            _ => a.cmp(&b),
        }
    }

    fn set_admin_up(&mut self, index: u32, up: bool) -> bool {
        let iface = self.interfaces.get_mut(index);
        let changed = iface.admin_up != up;
        iface.admin_up = up;
        changed
    }

    fn remove(&mut self, index: u32) -> Interface {
        self.interfaces.take(index)
    }
}

impl Fib {
    /// Change an interface's admin state and back-walk everything resolving
    /// over it.
    pub fn interface_set_admin_up(&mut self, if_index: u32, up: bool) {
        if !self.interfaces.set_admin_up(if_index, up) {
            return;
        }
        info!(
            interface = self.interfaces.name(if_index).unwrap_or("?"),
            up, "interface admin state change"
        );
        let reason = if up {
            BackWalkReason::INTERFACE_UP
        } else {
            // the adjacencies over a downed link stop forwarding too
            BackWalkReason::INTERFACE_DOWN | BackWalkReason::ADJ_DOWN
        };
        let mut ctx = BackWalkCtx::new(reason);
        self.walk_interface_adjacencies(if_index, &mut ctx);
    }

    /// Delete an interface. Paths resolving over it become permanent drops
    /// until their routes are removed and re-added.
    pub fn interface_delete(&mut self, if_index: u32) {
        let iface = self.interfaces.remove(if_index);
        info!(interface = %iface.name, "interface deleted");
        let mut ctx = BackWalkCtx::new(BackWalkReason::INTERFACE_DELETE);
        self.walk_interface_adjacencies(if_index, &mut ctx);
    }

    fn walk_interface_adjacencies(&mut self, if_index: u32, ctx: &mut BackWalkCtx) {
        for adj_index in self.adjacencies.on_interface(if_index) {
            // a walked path may have released this adjacency already
            if !self.adjacencies.exists(adj_index) {
                continue;
            }
            let children = self.adjacencies.children(adj_index);
            self.walk_children(&children, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_query() {
        let mut manager = InterfaceManager::new();
        let ge0 = manager.add("ge0", false);
        let pp0 = manager.add("pp0", true);

        assert!(manager.is_admin_up(ge0));
        assert!(!manager.is_p2p(ge0));
        assert!(manager.is_p2p(pp0));
        assert_eq!(manager.name(ge0), Some("ge0"));
        assert_eq!(manager.find_by_name("pp0"), Some(pp0));
        assert_eq!(manager.find_by_name("missing"), None);
    }

    #[test]
    fn test_invalid_index_is_down() {
        let manager = InterfaceManager::new();
        assert!(!manager.is_admin_up(INDEX_INVALID));
        assert!(!manager.is_p2p(7));
    }

    #[test]
    fn test_compare_orders_by_name() {
        let mut manager = InterfaceManager::new();
        let b = manager.add("b-if", false);
        let a = manager.add("a-if", false);

        assert_eq!(manager.compare(a, b), Ordering::Less);
        assert_eq!(manager.compare(b, a), Ordering::Greater);
        assert_eq!(manager.compare(a, a), Ordering::Equal);
    }

    #[test]
    fn test_compare_with_deleted_falls_back_to_index() {
        let mut manager = InterfaceManager::new();
        let a = manager.add("a", false);
        let b = manager.add("b", false);
        manager.remove(a);

        assert_eq!(manager.compare(a, b), Ordering::Less);
        assert_eq!(manager.compare(b, a), Ordering::Greater);
    }
}
