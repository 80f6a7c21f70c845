//! FIB core
//!
//! The forwarding information base as a dependency graph: interfaces and
//! adjacencies at the leaves, entries and tables above, and paths binding
//! them together. Everything lives in pools inside one `Fib` world and is
//! referred to by index; all operations run on a single control-plane
//! executor.

mod adjacency;
mod dpo;
mod entry;
mod interface;
mod load_balance;
mod node;
mod path;
mod path_list;
mod pool;
mod route_path;
mod types;
mod urpf;

pub use adjacency::{AdjKey, AdjacencyTable};
pub use dpo::{Dpo, DpoKind, LookupInput, LookupStore, LookupTable, ReceiveStore};
pub use entry::{EntryFlags, Source};
pub use interface::{Interface, InterfaceManager};
pub use load_balance::{LoadBalancePath, LoadBalancePool};
pub use node::{
    BackWalkCtx, BackWalkReason, ChildList, MemoryUsage, NodeKey, NodeOps, NodeRegistry, NodeType,
    WalkOutcome,
};
pub use path::{ConfigFlags, OperFlags, PathKind, RecursiveNextHop};
pub use route_path::{RoutePath, RoutePathEncode, RoutePathFlags};
pub use types::{
    addr_is_zero, ChainType, DpoProto, LinkType, Prefix, Protocol, INDEX_INVALID,
    MPLS_DEFAULT_TABLE_ID, MPLS_LABEL_INVALID,
};
pub use urpf::UrpfList;

use std::collections::HashMap;
use std::sync::Arc;

use crate::telemetry::FibMetrics;
use pool::Pool;

/// The FIB world: every pool and manager, threaded by `&mut` through all
/// operations.
pub struct Fib {
    pub interfaces: InterfaceManager,
    pub adjacencies: AdjacencyTable,
    pub lookups: LookupStore,
    pub receives: ReceiveStore,
    pub load_balances: LoadBalancePool,
    pub(crate) paths: Pool<path::Path>,
    pub(crate) path_lists: Pool<path_list::PathList>,
    pub(crate) entries: Pool<entry::FibEntry>,
    pub(crate) tables: HashMap<(Protocol, u32), entry::FibTable>,
    pub(crate) node_registry: NodeRegistry,
    pub(crate) metrics: Arc<FibMetrics>,
}

impl Fib {
    pub fn new(metrics: Arc<FibMetrics>) -> Self {
        let mut fib = Self {
            interfaces: InterfaceManager::new(),
            adjacencies: AdjacencyTable::new(),
            lookups: LookupStore::new(),
            receives: ReceiveStore::new(),
            load_balances: LoadBalancePool::new(),
            paths: Pool::new(),
            path_lists: Pool::new(),
            entries: Pool::new(),
            tables: HashMap::new(),
            node_registry: NodeRegistry::new(),
            metrics,
        };
        fib.register_path_node();
        fib.register_path_list_node();
        fib.register_entry_node();
        fib
    }

    pub fn metrics(&self) -> &FibMetrics {
        &self.metrics
    }
}

impl Default for Fib {
    fn default() -> Self {
        Self::new(Arc::new(FibMetrics::new()))
    }
}
