//! Path-lists
//!
//! A path-list is the ordered set of paths a FIB entry forwards over. The
//! full aggregator (sharing, normalization, ECMP buckets) lives above the
//! scope of this crate; this one carries just enough to own paths, detect
//! loops across them, and relay back-walks from member paths to the
//! entries that depend on the list.

use crate::fib::node::{
    BackWalkCtx, ChildList, MemoryUsage, NodeKey, NodeOps, NodeType, WalkOutcome,
};
use crate::fib::path::ConfigFlags;
use crate::fib::route_path::RoutePath;
use crate::fib::types::Protocol;
use crate::fib::{Dpo, Fib};

#[derive(Debug)]
pub struct PathList {
    paths: Vec<u32>,
    children: ChildList,
}

impl Fib {
    /// Create a path-list and one path per descriptor. Paths start
    /// unresolved.
    pub fn path_list_create(
        &mut self,
        proto: Protocol,
        cfg: ConfigFlags,
        rpaths: &[RoutePath],
    ) -> u32 {
        let pl_index = self.path_lists.put(PathList {
            paths: Vec::new(),
            children: ChildList::new(),
        });
        let paths = rpaths
            .iter()
            .map(|rpath| self.path_create(pl_index, proto, cfg, rpath))
            .collect();
        self.path_lists.get_mut(pl_index).paths = paths;
        pl_index
    }

    /// Create a path-list holding a single special path (drop, local
    /// receive, or exclusive with a caller-supplied DPO).
    pub fn path_list_create_special(
        &mut self,
        proto: Protocol,
        cfg: ConfigFlags,
        dpo: Option<&Dpo>,
    ) -> u32 {
        let pl_index = self.path_lists.put(PathList {
            paths: Vec::new(),
            children: ChildList::new(),
        });
        let path = self.path_create_special(pl_index, proto, cfg, dpo);
        self.path_lists.get_mut(pl_index).paths = vec![path];
        pl_index
    }

    /// Resolve every member. Returns true if any member is resolved.
    pub fn path_list_resolve(&mut self, pl_index: u32) -> bool {
        let paths = self.path_list_paths(pl_index);
        let mut any = false;
        for path in paths {
            any |= self.path_resolve(path);
        }
        any
    }

    pub fn path_list_paths(&self, pl_index: u32) -> Vec<u32> {
        self.path_lists.get(pl_index).paths.clone()
    }

    /// Forward-walk every member for a recursion cycle. Returns true if any
    /// member is looped.
    pub fn path_list_recursive_loop_detect(&mut self, pl_index: u32, entries: &mut Vec<u32>) -> bool {
        let paths = self.path_list_paths(pl_index);
        let mut looped = false;
        for path in paths {
            looped |= self.path_recursive_loop_detect(path, entries);
        }
        looped
    }

    /// Register an entry as depending on this list's forwarding.
    pub fn path_list_child_add(&mut self, pl_index: u32, child: NodeKey) -> u32 {
        self.path_lists.get_mut(pl_index).children.add(child)
    }

    pub fn path_list_child_remove(&mut self, pl_index: u32, sibling: u32) {
        self.path_lists.get_mut(pl_index).children.remove(sibling);
    }

    /// Relay a back-walk from a member path to the dependent entries.
    pub fn path_list_back_walk(&mut self, pl_index: u32, ctx: &mut BackWalkCtx) {
        let children = self.path_lists.get(pl_index).children.collect();
        self.walk_children(&children, ctx);
    }

    /// Destroy the list and every member path.
    pub fn path_list_destroy(&mut self, pl_index: u32) {
        let paths = self.path_list_paths(pl_index);
        for path in paths {
            self.path_destroy(path);
        }
        let list = self.path_lists.take(pl_index);
        debug_assert!(list.children.is_empty(), "path-list destroyed with children");
    }

    pub(crate) fn path_list_node_ops() -> NodeOps {
        NodeOps {
            back_walk: |fib, index, ctx| {
                fib.path_list_back_walk(index, ctx);
                WalkOutcome::Continue
            },
            last_lock_gone: |_, _| panic!("path-lists are not reference counted here"),
            mem_show: |fib| MemoryUsage {
                name: "path-list",
                in_use: fib.path_lists.len(),
                allocated: fib.path_lists.capacity(),
                elt_size: std::mem::size_of::<PathList>(),
            },
        }
    }

    pub(crate) fn register_path_list_node(&mut self) {
        self.node_registry
            .register(NodeType::PathList, Self::path_list_node_ops());
    }
}
