//! FIB paths
//!
//! A path is one way a route may forward: through a neighbor on an
//! interface, across an interface, recursively via another entry, to the
//! local stack, into another table's lookup, or to the drop. It is a node
//! in the FIB dependency graph: resolution binds it to its upstream
//! (adjacency or via-entry) and back-walks keep its forwarding current as
//! interfaces flap, rewrites complete, and recursion targets change.
//!
//! Recursion cycles are installed, never rejected: the looped path
//! contributes the drop while the control-plane edges stay in place, so
//! the moment the loop breaks is observable and forwarding recovers.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::fib::dpo::Dpo;
use crate::fib::node::{
    BackWalkCtx, BackWalkReason, ChildList, MemoryUsage, NodeKey, NodeOps, NodeType, WalkOutcome,
};
use crate::fib::route_path::{RoutePath, RoutePathEncode, RoutePathFlags};
use crate::fib::types::{
    addr_is_zero, ChainType, Prefix, Protocol, INDEX_INVALID, MPLS_DEFAULT_TABLE_ID,
};
use crate::fib::urpf::UrpfList;
use crate::fib::{Fib, LoadBalancePath};
use crate::fib::dpo::{LookupInput, LookupTable};
use crate::fib::entry::Source;

bitflags! {
    /// How a path was configured to behave.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigFlags: u8 {
        /// Drop everything, permanently.
        const DROP = 1 << 0;
        /// Receive locally.
        const LOCAL = 1 << 1;
        /// The recursion target must be a real host route.
        const RESOLVE_VIA_HOST = 1 << 2;
        /// The recursion target must be an attached route.
        const RESOLVE_VIA_ATTACHED = 1 << 3;
    }
}

bitflags! {
    /// State derived during resolution. Never copied, never compared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OperFlags: u8 {
        /// The path is part of a recursion cycle.
        const RECURSIVE_LOOP = 1 << 0;
        /// The path's upstream bindings are in place.
        const RESOLVED = 1 << 1;
        /// The path has become a permanent drop.
        const DROP = 1 << 2;
    }
}

/// The kinds of path. Declaration order is comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKind {
    /// Interface and next-hop are both known.
    AttachedNextHop,
    /// Only the interface is known.
    Attached,
    /// Only the next-hop is known.
    Recursive,
    /// Nothing is known; drop.
    Special,
    /// The client supplied the forwarding object.
    Exclusive,
    /// A second lookup in another table.
    Deag,
    /// For-us.
    Receive,
}

impl PathKind {
    fn name(self) -> &'static str {
        match self {
            PathKind::AttachedNextHop => "attached-nexthop",
            PathKind::Attached => "attached",
            PathKind::Recursive => "recursive",
            PathKind::Special => "special",
            PathKind::Exclusive => "exclusive",
            PathKind::Deag => "deag",
            PathKind::Receive => "receive",
        }
    }
}

/// A recursive path's next-hop: an address, or a local label for MPLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursiveNextHop {
    Addr(IpAddr),
    Label(u32),
}

impl RecursiveNextHop {
    fn cmp(&self, other: &RecursiveNextHop) -> Ordering {
        match (self, other) {
            (RecursiveNextHop::Addr(a), RecursiveNextHop::Addr(b)) => a.cmp(b),
            (RecursiveNextHop::Label(a), RecursiveNextHop::Label(b)) => a.cmp(b),
            (RecursiveNextHop::Addr(_), RecursiveNextHop::Label(_)) => Ordering::Less,
            (RecursiveNextHop::Label(_), RecursiveNextHop::Addr(_)) => Ordering::Greater,
        }
    }

    fn prefix(&self) -> Prefix {
        match self {
            RecursiveNextHop::Addr(addr) => Prefix::host(*addr),
            RecursiveNextHop::Label(label) => Prefix::from_label(*label),
        }
    }
}

/// The kind-specific configured payload. Exactly one variant is live for
/// the path's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    AttachedNextHop { next_hop: IpAddr, interface: u32 },
    Attached { interface: u32 },
    Recursive { next_hop: RecursiveNextHop, table_id: u32 },
    Special,
    Exclusive { dpo: Dpo },
    Deag { table_id: u32 },
    Receive { interface: u32, addr: IpAddr },
}

impl Payload {
    fn kind(&self) -> PathKind {
        match self {
            Payload::AttachedNextHop { .. } => PathKind::AttachedNextHop,
            Payload::Attached { .. } => PathKind::Attached,
            Payload::Recursive { .. } => PathKind::Recursive,
            Payload::Special => PathKind::Special,
            Payload::Exclusive { .. } => PathKind::Exclusive,
            Payload::Deag { .. } => PathKind::Deag,
            Payload::Receive { .. } => PathKind::Receive,
        }
    }
}

/// A FIB path.
///
/// The configured portion (flags, protocol, weight, payload) is what
/// creation captured and what copy duplicates. Everything below `oper` is
/// derived during resolution and is reset on copy.
#[derive(Debug)]
pub struct Path {
    /// The path-list that owns this path.
    pl_index: u32,

    cfg: ConfigFlags,
    proto: Protocol,
    /// Unnormalised multipath weight.
    weight: u32,
    payload: Payload,

    oper: OperFlags,
    /// The entry a recursive path resolves through; invalid otherwise.
    via_fib: u32,
    /// The forwarding currently contributed for the native chain.
    dpo: Dpo,
    /// This path's slot in its upstream's child list.
    sibling: u32,
    /// Graph-node base: this path's own dependents.
    children: ChildList,
}

impl Path {
    fn kind(&self) -> PathKind {
        self.payload.kind()
    }

    /// Configured or operationally forced to drop, regardless of anything
    /// else.
    fn is_permanent_drop(&self) -> bool {
        self.cfg.contains(ConfigFlags::DROP) || self.oper.contains(OperFlags::DROP)
    }

    /// Feed the compared projection of the configured state to a hasher.
    /// The hash covers exactly what comparison covers, so equal paths hash
    /// equal.
    fn hash_configured<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.proto.hash(state);
        match &self.payload {
            Payload::AttachedNextHop { next_hop, interface } => {
                next_hop.hash(state);
                interface.hash(state);
            }
            Payload::Attached { interface } => interface.hash(state),
            Payload::Recursive { next_hop, table_id } => {
                next_hop.hash(state);
                table_id.hash(state);
            }
            Payload::Deag { table_id } => table_id.hash(state),
            // compared equal regardless of payload
            Payload::Special | Payload::Exclusive { .. } | Payload::Receive { .. } => {}
        }
    }
}

fn cfg_from_route_flags(flags: RoutePathFlags) -> ConfigFlags {
    let mut cfg = ConfigFlags::empty();
    if flags.contains(RoutePathFlags::RESOLVE_VIA_HOST) {
        cfg |= ConfigFlags::RESOLVE_VIA_HOST;
    }
    if flags.contains(RoutePathFlags::RESOLVE_VIA_ATTACHED) {
        cfg |= ConfigFlags::RESOLVE_VIA_ATTACHED;
    }
    cfg
}

impl Fib {
    /// Create a path for `rpath`, owned by path-list `pl_index`. The kind
    /// is derived from which descriptor fields are populated; the path
    /// starts unresolved.
    pub fn path_create(
        &mut self,
        pl_index: u32,
        proto: Protocol,
        flags: ConfigFlags,
        rpath: &RoutePath,
    ) -> u32 {
        let cfg = flags | cfg_from_route_flags(rpath.flags);
        // a weight of zero is meaningless; accept it and fix it up
        let weight = if rpath.weight == 0 { 1 } else { rpath.weight };

        let payload = if rpath.if_index != INDEX_INVALID {
            if cfg.contains(ConfigFlags::LOCAL) {
                Payload::Receive {
                    interface: rpath.if_index,
                    addr: rpath.addr,
                }
            } else if addr_is_zero(&rpath.addr) {
                Payload::Attached {
                    interface: rpath.if_index,
                }
            } else {
                Payload::AttachedNextHop {
                    next_hop: rpath.addr,
                    interface: rpath.if_index,
                }
            }
        } else if addr_is_zero(&rpath.addr) {
            if rpath.fib_index == INDEX_INVALID {
                Payload::Special
            } else {
                Payload::Deag {
                    table_id: rpath.fib_index,
                }
            }
        } else {
            // the address selected the branch; for MPLS the payload is the
            // configured local label
            Payload::Recursive {
                next_hop: if proto == Protocol::Mpls {
                    RecursiveNextHop::Label(rpath.label)
                } else {
                    RecursiveNextHop::Addr(rpath.addr)
                },
                table_id: rpath.fib_index,
            }
        };

        let index = self.paths.put(Path {
            pl_index,
            cfg,
            proto,
            weight,
            payload,
            oper: OperFlags::empty(),
            via_fib: INDEX_INVALID,
            dpo: Dpo::INVALID,
            sibling: INDEX_INVALID,
            children: ChildList::new(),
        });
        self.metrics.paths_created.inc();
        debug!(path = index, kind = self.paths.get(index).kind().name(), "path created");
        index
    }

    /// Create a special path: drop if cfg DROP, receive if cfg LOCAL, else
    /// exclusive around the caller-supplied DPO.
    pub fn path_create_special(
        &mut self,
        pl_index: u32,
        proto: Protocol,
        cfg: ConfigFlags,
        dpo: Option<&Dpo>,
    ) -> u32 {
        let payload = if cfg.contains(ConfigFlags::DROP) {
            Payload::Special
        } else if cfg.contains(ConfigFlags::LOCAL) {
            Payload::Receive {
                interface: INDEX_INVALID,
                addr: proto.zero_addr(),
            }
        } else {
            let dpo = *dpo.expect("exclusive path without a DPO");
            self.dpo_lock(&dpo);
            Payload::Exclusive { dpo }
        };

        let index = self.paths.put(Path {
            pl_index,
            cfg,
            proto,
            weight: 1,
            payload,
            oper: OperFlags::empty(),
            via_fib: INDEX_INVALID,
            dpo: Dpo::INVALID,
            sibling: INDEX_INVALID,
            children: ChildList::new(),
        });
        self.metrics.paths_created.inc();
        debug!(path = index, kind = self.paths.get(index).kind().name(), "special path created");
        index
    }

    /// Duplicate a path's configured state into a new path owned by
    /// `pl_index`. Derived state starts over: unresolved, zero DPO.
    pub fn path_copy(&mut self, path_index: u32, pl_index: u32) -> u32 {
        let src = self.paths.get(path_index);
        let (cfg, proto, weight, payload) = (src.cfg, src.proto, src.weight, src.payload);
        if let Payload::Exclusive { dpo } = &payload {
            let dpo = *dpo;
            self.dpo_lock(&dpo);
        }
        let index = self.paths.put(Path {
            pl_index,
            cfg,
            proto,
            weight,
            payload,
            oper: OperFlags::empty(),
            via_fib: INDEX_INVALID,
            dpo: Dpo::INVALID,
            sibling: INDEX_INVALID,
            children: ChildList::new(),
        });
        self.metrics.paths_created.inc();
        debug!(path = index, from = path_index, "path copied");
        index
    }

    /// Destroy a path. Only the owning path-list does this.
    pub fn path_destroy(&mut self, path_index: u32) {
        debug!(path = path_index, "path destroyed");
        self.path_unresolve(path_index);
        let path = self.paths.take(path_index);
        if let Payload::Exclusive { dpo } = path.payload {
            self.dpo_release(&dpo);
        }
        debug_assert!(path.children.is_empty(), "path destroyed with children");
        self.metrics.paths_destroyed.inc();
    }

    /// Bind the path to its upstream and set its DPO. Returns whether the
    /// path ended up resolved.
    pub fn path_resolve(&mut self, path_index: u32) -> bool {
        self.metrics.path_resolves.inc();

        // hope for the best; conditions below clear it
        self.paths.get_mut(path_index).oper |= OperFlags::RESOLVED;

        if self.paths.get(path_index).is_permanent_drop() {
            let path = self.paths.get_mut(path_index);
            path.dpo = Dpo::drop_for(path.proto.to_dpo());
            path.oper -= OperFlags::RESOLVED;
            return self.path_is_resolved(path_index);
        }

        let (proto, payload) = {
            let path = self.paths.get(path_index);
            (path.proto, path.payload)
        };

        match payload {
            Payload::AttachedNextHop { interface, .. } => {
                self.path_attached_next_hop_set(path_index, interface);
            }
            Payload::Attached { interface } => {
                if !self.interfaces.is_admin_up(interface) {
                    self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                }
                // p2p links have nothing to discover, so no glean: the
                // zero-address neighbor adjacency covers the whole link
                let dpo = if self.interfaces.is_p2p(interface) {
                    let ai = self.adjacencies.nbr_add_or_lock(
                        proto,
                        proto.to_link(),
                        proto.zero_addr(),
                        interface,
                    );
                    Dpo::adjacency(proto.to_dpo(), ai)
                } else {
                    let ai = self.adjacencies.glean_add_or_lock(proto, interface);
                    Dpo {
                        kind: crate::fib::dpo::DpoKind::AdjacencyGlean,
                        proto: proto.to_dpo(),
                        index: ai,
                    }
                };
                let sibling = self
                    .adjacencies
                    .child_add(dpo.index, NodeKey::path(path_index));
                let path = self.paths.get_mut(path_index);
                path.dpo = dpo;
                path.sibling = sibling;
            }
            Payload::Recursive { next_hop, table_id } => {
                debug_assert_eq!(
                    self.paths.get(path_index).via_fib,
                    INDEX_INVALID,
                    "recursive path already bound"
                );
                // create the reverse-resolution entry this path recurses
                // through and become its child
                let fei = self.table_entry_special_add(
                    proto,
                    table_id,
                    next_hop.prefix(),
                    Source::Rr,
                );
                let sibling = self.entry_child_add(fei, NodeKey::path(path_index));
                let path = self.paths.get_mut(path_index);
                path.via_fib = fei;
                path.sibling = sibling;

                let dpo = self.path_recursive_adj_update(path_index, proto.to_chain());
                self.paths.get_mut(path_index).dpo = dpo;
            }
            Payload::Special => {
                let path = self.paths.get_mut(path_index);
                path.dpo = Dpo::drop_for(proto.to_dpo());
            }
            Payload::Deag { table_id } => {
                let dpo = self.lookups.add_or_lock(
                    table_id,
                    proto.to_dpo(),
                    LookupInput::DstAddress,
                    LookupTable::FromConfig,
                );
                self.paths.get_mut(path_index).dpo = dpo;
            }
            Payload::Receive { interface, addr } => {
                let dpo = self.receives.add_or_lock(proto.to_dpo(), interface, addr);
                self.paths.get_mut(path_index).dpo = dpo;
            }
            Payload::Exclusive { dpo } => {
                self.dpo_lock(&dpo);
                self.paths.get_mut(path_index).dpo = dpo;
            }
        }

        self.path_is_resolved(path_index)
    }

    /// Resolve an attached-next-hop path directly via the adjacency for
    /// its interface and neighbor.
    fn path_attached_next_hop_set(&mut self, path_index: u32, interface: u32) {
        if !self.interfaces.is_admin_up(interface) {
            self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
        }

        let proto = self.paths.get(path_index).proto;
        let ai = self.path_attached_next_hop_get_adj(path_index, proto.to_link());

        // become a child of the adjacency so rewrite changes reach us
        let sibling = self.adjacencies.child_add(ai, NodeKey::path(path_index));
        let path = self.paths.get_mut(path_index);
        path.dpo = Dpo::adjacency(proto.to_dpo(), ai);
        path.sibling = sibling;
    }

    /// Lock and return the neighbor adjacency for this path and `link`.
    ///
    /// On p2p links the per-neighbor adjacency never exists; the
    /// zero-address auto-adjacency for the link serves every neighbor.
    fn path_attached_next_hop_get_adj(&mut self, path_index: u32, link: crate::fib::types::LinkType) -> u32 {
        let path = self.paths.get(path_index);
        let Payload::AttachedNextHop { next_hop, interface } = path.payload else {
            panic!("not an attached-next-hop path");
        };
        let proto = path.proto;
        if self.interfaces.is_p2p(interface) {
            self.adjacencies
                .nbr_add_or_lock(proto, link, proto.zero_addr(), interface)
        } else {
            self.adjacencies.nbr_add_or_lock(proto, link, next_hop, interface)
        }
    }

    /// Recompute a recursive path's forwarding from its via-entry for the
    /// requested chain, applying the recursion constraints. The returned
    /// DPO carries a lock the caller owns.
    pub(crate) fn path_recursive_adj_update(&mut self, path_index: u32, fct: ChainType) -> Dpo {
        let (via_fib, proto, cfg, looped) = {
            let path = self.paths.get(path_index);
            (
                path.via_fib,
                path.proto,
                path.cfg,
                path.oper.contains(OperFlags::RECURSIVE_LOOP),
            )
        };
        let drop = Dpo::drop_for(proto.to_dpo());

        // a looped path must not pull forwarding out of the cycle it is
        // part of; contribute the drop without consulting the via-entry
        if looped {
            let path = self.paths.get_mut(path_index);
            path.oper -= OperFlags::RESOLVED;
            debug!(path = path_index, dpo = %drop, "recursive update");
            return drop;
        }

        let mut via_dpo = self.entry_contribute_forwarding(via_fib, fct);

        // hope for the best; constraints below override
        self.paths.get_mut(path_index).oper |= OperFlags::RESOLVED;

        if cfg.contains(ConfigFlags::RESOLVE_VIA_HOST) {
            // the via entry is always a host prefix here; what matters is
            // whether a source other than reverse-resolution installed it
            let best = self.entry_get_best_source(via_fib);
            if !matches!(best, Some(source) if source < Source::Rr) {
                self.dpo_release(&via_dpo);
                via_dpo = drop;
                self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                self.pic_edge_trigger(path_index);
            }
        } else if cfg.contains(ConfigFlags::RESOLVE_VIA_ATTACHED) {
            if !self
                .entry_get_flags(via_fib)
                .contains(crate::fib::entry::EntryFlags::ATTACHED)
            {
                self.dpo_release(&via_dpo);
                via_dpo = drop;
                self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                self.pic_edge_trigger(path_index);
            }
        }

        debug!(path = path_index, dpo = %via_dpo, "recursive update");
        via_dpo
    }

    /// PIC edge: tell the load-balance maps so backup buckets can engage
    /// before the back-walk finishes rippling.
    fn pic_edge_trigger(&mut self, path_index: u32) {
        self.metrics.pic_edge_events.inc();
        self.load_balances.path_state_change(path_index);
    }

    /// Re-stack a recursive path's stored DPO from its via-entry. No-op
    /// for other kinds.
    pub(crate) fn path_restack_recursive(&mut self, path_index: u32) {
        if self.paths.get(path_index).kind() != PathKind::Recursive {
            return;
        }
        let native = self.paths.get(path_index).proto.to_chain();
        let fresh = self.path_recursive_adj_update(path_index, native);
        let old = std::mem::replace(&mut self.paths.get_mut(path_index).dpo, fresh);
        self.dpo_release(&old);
    }

    /// Release the path's upstream bindings: child registrations, the RR
    /// entry, and the lock its DPO carries. Oper flags survive except
    /// RESOLVED.
    pub(crate) fn path_unresolve(&mut self, path_index: u32) {
        // the forced drop holds nothing upstream
        if self.paths.get(path_index).is_permanent_drop() {
            return;
        }

        let (payload, via_fib, sibling, dpo) = {
            let path = self.paths.get(path_index);
            (path.payload, path.via_fib, path.sibling, path.dpo)
        };

        match payload {
            Payload::Recursive { next_hop, table_id } => {
                if via_fib != INDEX_INVALID {
                    let proto = self.paths.get(path_index).proto;
                    self.entry_child_remove(via_fib, sibling);
                    self.table_entry_special_remove(
                        proto,
                        table_id,
                        &next_hop.prefix(),
                        Source::Rr,
                    );
                    self.paths.get_mut(path_index).via_fib = INDEX_INVALID;
                }
            }
            Payload::AttachedNextHop { .. } | Payload::Attached { .. } => {
                if dpo.is_adjacency() {
                    self.adjacencies.child_remove(dpo.index, sibling);
                }
            }
            // these hold only the path's DPO, released below
            Payload::Special
            | Payload::Exclusive { .. }
            | Payload::Deag { .. }
            | Payload::Receive { .. } => {}
        }

        self.dpo_release(&dpo);
        let path = self.paths.get_mut(path_index);
        path.dpo = Dpo::INVALID;
        path.sibling = INDEX_INVALID;
        path.oper -= OperFlags::RESOLVED;
    }

    /// Forward-walk for a recursion cycle that would form if this path were
    /// linked. `entries` is every entry encountered so far from the root
    /// being installed.
    ///
    /// A discovered loop is installed, not rejected: the path keeps its
    /// dependencies and contributes the drop, so the break of the loop is
    /// observable.
    pub fn path_recursive_loop_detect(&mut self, path_index: u32, entries: &mut Vec<u32>) -> bool {
        // the forced drop is never looped; it is never resolved
        if self.paths.get(path_index).is_permanent_drop() {
            return false;
        }

        if self.paths.get(path_index).kind() == PathKind::Recursive {
            let via_fib = self.paths.get(path_index).via_fib;
            if via_fib == INDEX_INVALID {
                // not yet bound; nothing to walk
                return self.path_is_looped(path_index);
            }
            if entries.contains(&via_fib) {
                // the entry about to link to this path resolves through
                // this path: a cycle. stop the walk here.
                warn!(path = path_index, "recursive loop formed");
                self.metrics.recursive_loops.inc();
                let proto = self.paths.get(path_index).proto;
                let path = self.paths.get_mut(path_index);
                path.oper |= OperFlags::RECURSIVE_LOOP;
                let old = std::mem::replace(&mut path.dpo, Dpo::drop_for(proto.to_dpo()));
                self.dpo_release(&old);
            } else if self.entry_recursive_loop_detect(via_fib, entries) {
                warn!(path = path_index, "recursive loop formed");
                self.paths.get_mut(path_index).oper |= OperFlags::RECURSIVE_LOOP;
            } else {
                debug!(path = path_index, "recursive loop cleared");
                self.paths.get_mut(path_index).oper -= OperFlags::RECURSIVE_LOOP;
            }
        }
        // all other kinds are leaves of the graph and cannot loop

        self.path_is_looped(path_index)
    }

    /// A back-walk has reached this path.
    pub(crate) fn path_back_walk(&mut self, path_index: u32, ctx: &mut BackWalkCtx) -> WalkOutcome {
        let kind = self.paths.get(path_index).kind();

        match kind {
            PathKind::Recursive => {
                if ctx.reason.contains(BackWalkReason::EVALUATE) {
                    // restack on the via-entry's fresh forwarding; visible
                    // to packets in flight
                    self.path_restack_recursive(path_index);
                }
                if ctx
                    .reason
                    .intersects(BackWalkReason::ADJ_UPDATE | BackWalkReason::ADJ_DOWN)
                {
                    // adjacency sub-type changes restack in the
                    // load-balance below; nothing to forward from here
                    return WalkOutcome::Continue;
                }
            }
            PathKind::AttachedNextHop => {
                if ctx.reason.contains(BackWalkReason::ADJ_UPDATE) {
                    let interface = match self.paths.get(path_index).payload {
                        Payload::AttachedNextHop { interface, .. } => interface,
                        _ => unreachable!(),
                    };
                    let if_is_up = self.interfaces.is_admin_up(interface);
                    if if_is_up {
                        self.paths.get_mut(path_index).oper |= OperFlags::RESOLVED;
                    } else {
                        self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                    }
                    self.path_attached_next_hop_restack(path_index);
                    if !if_is_up {
                        // children would only learn the path is unresolved
                        return WalkOutcome::Continue;
                    }
                }
                if ctx.reason.contains(BackWalkReason::ADJ_DOWN) {
                    if !self.paths.get(path_index).oper.contains(OperFlags::RESOLVED) {
                        return WalkOutcome::Continue;
                    }
                    self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                }
                if ctx.reason.contains(BackWalkReason::INTERFACE_UP) {
                    if self.paths.get(path_index).oper.contains(OperFlags::RESOLVED) {
                        return WalkOutcome::Continue;
                    }
                    self.paths.get_mut(path_index).oper |= OperFlags::RESOLVED;
                }
                if ctx.reason.contains(BackWalkReason::INTERFACE_DOWN) {
                    if !self.paths.get(path_index).oper.contains(OperFlags::RESOLVED) {
                        return WalkOutcome::Continue;
                    }
                    self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                }
                if ctx.reason.contains(BackWalkReason::INTERFACE_DELETE) {
                    // permanent drop until the route is removed and re-added
                    self.path_unresolve(path_index);
                    self.paths.get_mut(path_index).oper |= OperFlags::DROP;
                }
            }
            PathKind::Attached => {
                if ctx.reason.contains(BackWalkReason::INTERFACE_UP) {
                    self.paths.get_mut(path_index).oper |= OperFlags::RESOLVED;
                }
                if ctx.reason.contains(BackWalkReason::INTERFACE_DOWN) {
                    self.paths.get_mut(path_index).oper -= OperFlags::RESOLVED;
                }
                if ctx.reason.contains(BackWalkReason::INTERFACE_DELETE) {
                    self.path_unresolve(path_index);
                    self.paths.get_mut(path_index).oper |= OperFlags::DROP;
                }
            }
            PathKind::Deag | PathKind::Special | PathKind::Receive | PathKind::Exclusive => {
                // these kinds have no upstream parent; being walked from
                // one is a bug
                panic!("back-walk into leaf path kind {:?}", kind);
            }
        }

        // propagate further to the owning path-list
        let pl_index = self.paths.get(path_index).pl_index;
        self.path_list_back_walk(pl_index, ctx);

        WalkOutcome::Continue
    }

    /// ADJ_UPDATE restack: fetch a fresh adjacency, move the child
    /// registration if the adjacency changed, and release the extra lock.
    fn path_attached_next_hop_restack(&mut self, path_index: u32) {
        let proto = self.paths.get(path_index).proto;
        let ai = self.path_attached_next_hop_get_adj(path_index, proto.to_link());

        let path = self.paths.get_mut(path_index);
        let old = std::mem::replace(&mut path.dpo, Dpo::adjacency(proto.to_dpo(), ai));
        let sibling = path.sibling;

        if old.is_adjacency() && old.index != ai {
            self.adjacencies.child_remove(old.index, sibling);
            let new_sibling = self.adjacencies.child_add(ai, NodeKey::path(path_index));
            self.paths.get_mut(path_index).sibling = new_sibling;
            self.adjacencies.unlock(old.index);
        } else {
            self.adjacencies.unlock(ai);
        }
    }

    /// Contribute a DPO for the requested chain. The native chain hands
    /// out the stored DPO; anything else is constructed on demand. The
    /// returned DPO carries a lock the caller owns.
    pub fn path_contribute_forwarding(&mut self, path_index: u32, fct: ChainType) -> Dpo {
        let (proto, kind) = {
            let path = self.paths.get(path_index);
            (path.proto, path.kind())
        };

        if proto.to_chain() == fct {
            let dpo = self.paths.get(path_index).dpo;
            self.dpo_lock(&dpo);
            return dpo;
        }

        match kind {
            PathKind::AttachedNextHop => {
                // an adjacency of the link type this chain needs
                let ai = self.path_attached_next_hop_get_adj(path_index, fct.to_link());
                Dpo::adjacency(fct.to_dpo_proto(), ai)
            }
            PathKind::Recursive => {
                assert!(
                    fct != ChainType::Ethernet,
                    "recursive path cannot contribute an ethernet chain"
                );
                self.path_recursive_adj_update(path_index, fct)
            }
            PathKind::Deag => match fct {
                ChainType::MplsNonEos => self.lookups.add_or_lock(
                    MPLS_DEFAULT_TABLE_ID,
                    crate::fib::types::DpoProto::Mpls,
                    LookupInput::DstAddress,
                    LookupTable::FromConfig,
                ),
                ChainType::UnicastIp4 | ChainType::UnicastIp6 | ChainType::MplsEos => {
                    let dpo = self.paths.get(path_index).dpo;
                    self.dpo_lock(&dpo);
                    dpo
                }
                ChainType::Ethernet => panic!("deag path cannot contribute an ethernet chain"),
            },
            PathKind::Exclusive => {
                let Payload::Exclusive { dpo } = self.paths.get(path_index).payload else {
                    unreachable!();
                };
                self.dpo_lock(&dpo);
                dpo
            }
            PathKind::Attached | PathKind::Receive | PathKind::Special => {
                panic!("path kind {:?} contributes only its native chain", kind)
            }
        }
    }

    /// If the path is resolved, append its (weight, index, DPO) triple to
    /// the multipath hash key.
    pub fn path_append_nh_for_multipath_hash(
        &mut self,
        path_index: u32,
        fct: ChainType,
        hash_key: &mut Vec<LoadBalancePath>,
    ) {
        if !self.path_is_resolved(path_index) {
            return;
        }
        let weight = self.paths.get(path_index).weight;
        let dpo = self.path_contribute_forwarding(path_index, fct);
        hash_key.push(LoadBalancePath {
            weight,
            path_index,
            dpo,
        });
    }

    /// Append this path's legitimate source interfaces to a uRPF list.
    pub fn path_contribute_urpf(&mut self, path_index: u32, urpf: &mut UrpfList) {
        if !self.path_is_resolved(path_index) {
            return;
        }
        let payload = self.paths.get(path_index).payload;
        match payload {
            Payload::AttachedNextHop { interface, .. } | Payload::Attached { interface } => {
                urpf.append(interface);
            }
            Payload::Recursive { .. } => {
                let via_fib = self.paths.get(path_index).via_fib;
                self.entry_contribute_urpf(via_fib, urpf);
            }
            Payload::Exclusive { .. } | Payload::Special => {
                // these may link to an adjacency, if that is what the
                // client supplied
                let dpo = self.paths.get(path_index).dpo;
                if dpo.is_adjacency() {
                    urpf.append(self.adjacencies.interface(dpo.index));
                }
            }
            Payload::Deag { .. } | Payload::Receive { .. } => {}
        }
    }

    fn path_cmp_i(&self, a: &Path, b: &Path) -> Ordering {
        // different kinds or protocols are different paths; weights alone
        // are not
        a.kind()
            .cmp(&b.kind())
            .then(a.proto.cmp(&b.proto))
            .then_with(|| match (&a.payload, &b.payload) {
                (
                    Payload::AttachedNextHop { next_hop: na, interface: ia },
                    Payload::AttachedNextHop { next_hop: nb, interface: ib },
                ) => na.cmp(nb).then_with(|| self.interfaces.compare(*ia, *ib)),
                (Payload::Attached { interface: ia }, Payload::Attached { interface: ib }) => {
                    self.interfaces.compare(*ia, *ib)
                }
                (
                    Payload::Recursive { next_hop: na, table_id: ta },
                    Payload::Recursive { next_hop: nb, table_id: tb },
                ) => na.cmp(nb).then(ta.cmp(tb)),
                (Payload::Deag { table_id: ta }, Payload::Deag { table_id: tb }) => ta.cmp(tb),
                _ => Ordering::Equal,
            })
    }

    /// Structural comparison over the configured state. Weight does not
    /// participate.
    pub fn path_cmp(&self, a: u32, b: u32) -> Ordering {
        self.path_cmp_i(self.paths.get(a), self.paths.get(b))
    }

    /// Compare a path against a route-path descriptor; weight first, then
    /// the kind's configured fields.
    pub fn path_cmp_with_route_path(&self, path_index: u32, rpath: &RoutePath) -> Ordering {
        let path = self.paths.get(path_index);
        path.weight.cmp(&rpath.weight).then_with(|| match &path.payload {
            Payload::AttachedNextHop { next_hop, interface } => next_hop
                .cmp(&rpath.addr)
                .then_with(|| self.interfaces.compare(*interface, rpath.if_index)),
            Payload::Attached { interface } => self.interfaces.compare(*interface, rpath.if_index),
            Payload::Recursive { next_hop, table_id } => {
                let nh = match next_hop {
                    RecursiveNextHop::Label(label) => label.cmp(&rpath.label),
                    RecursiveNextHop::Addr(addr) => addr.cmp(&rpath.addr),
                };
                nh.then(table_id.cmp(&rpath.fib_index))
            }
            Payload::Deag { table_id } => table_id.cmp(&rpath.fib_index),
            Payload::Special | Payload::Exclusive { .. } | Payload::Receive { .. } => {
                Ordering::Equal
            }
        })
    }

    /// Stable hash over the configured state. Equal paths hash equal.
    pub fn path_hash(&self, path_index: u32) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.paths.get(path_index).hash_configured(&mut hasher);
        hasher.finish()
    }

    /// The path is resolved-visible: valid DPO, RESOLVED, not looped, not
    /// a drop.
    pub fn path_is_resolved(&self, path_index: u32) -> bool {
        let path = self.paths.get(path_index);
        path.dpo.is_valid()
            && path.oper.contains(OperFlags::RESOLVED)
            && !self.path_is_looped(path_index)
            && !path.is_permanent_drop()
    }

    pub fn path_is_looped(&self, path_index: u32) -> bool {
        self.paths
            .get(path_index)
            .oper
            .contains(OperFlags::RECURSIVE_LOOP)
    }

    pub fn path_is_recursive(&self, path_index: u32) -> bool {
        self.paths.get(path_index).kind() == PathKind::Recursive
    }

    pub fn path_is_exclusive(&self, path_index: u32) -> bool {
        self.paths.get(path_index).kind() == PathKind::Exclusive
    }

    pub fn path_is_deag(&self, path_index: u32) -> bool {
        self.paths.get(path_index).kind() == PathKind::Deag
    }

    pub fn path_exists(&self, path_index: u32) -> bool {
        self.paths.contains(path_index)
    }

    /// The interface the path resolves out of; recursion delegates to the
    /// via-entry.
    pub fn path_get_resolving_interface(&self, path_index: u32) -> u32 {
        let path = self.paths.get(path_index);
        match path.payload {
            Payload::AttachedNextHop { interface, .. }
            | Payload::Attached { interface }
            | Payload::Receive { interface, .. } => interface,
            Payload::Recursive { .. } => self.entry_get_resolving_interface(path.via_fib),
            Payload::Special | Payload::Deag { .. } | Payload::Exclusive { .. } => INDEX_INVALID,
        }
    }

    /// The adjacency the path currently forwards through. The DPO must be
    /// an adjacency.
    pub fn path_get_adj(&self, path_index: u32) -> u32 {
        let dpo = self.paths.get(path_index).dpo;
        assert!(dpo.is_adjacency(), "path DPO is not an adjacency");
        dpo.index
    }

    pub fn path_get_weight(&self, path_index: u32) -> u32 {
        self.paths.get(path_index).weight
    }

    pub fn path_get_proto(&self, path_index: u32) -> Protocol {
        self.paths.get(path_index).proto
    }

    pub(crate) fn path_dpo(&self, path_index: u32) -> Dpo {
        self.paths.get(path_index).dpo
    }

    /// Append a route-path descriptor re-encoding this path. The DPO field
    /// is populated only for exclusive paths.
    pub fn path_encode(&self, pl_index: u32, path_index: u32, out: &mut Vec<RoutePathEncode>) {
        let path = self.paths.get(path_index);
        debug_assert_eq!(path.pl_index, pl_index);

        let mut rpath = RoutePath::new(path.proto).with_weight(path.weight);
        if path.cfg.contains(ConfigFlags::RESOLVE_VIA_HOST) {
            rpath.flags |= RoutePathFlags::RESOLVE_VIA_HOST;
        }
        if path.cfg.contains(ConfigFlags::RESOLVE_VIA_ATTACHED) {
            rpath.flags |= RoutePathFlags::RESOLVE_VIA_ATTACHED;
        }

        let mut dpo = None;
        match &path.payload {
            Payload::Receive { interface, addr } => {
                rpath.if_index = *interface;
                rpath.addr = *addr;
            }
            Payload::Attached { interface } => {
                rpath.if_index = *interface;
            }
            Payload::AttachedNextHop { next_hop, interface } => {
                rpath.if_index = *interface;
                rpath.addr = *next_hop;
            }
            Payload::Recursive { next_hop, table_id } => {
                match next_hop {
                    RecursiveNextHop::Addr(addr) => rpath.addr = *addr,
                    RecursiveNextHop::Label(label) => rpath.label = *label,
                }
                rpath.fib_index = *table_id;
            }
            Payload::Deag { table_id } => {
                rpath.fib_index = *table_id;
            }
            Payload::Special => {}
            Payload::Exclusive { dpo: ex } => {
                dpo = Some(*ex);
            }
        }

        out.push(RoutePathEncode { rpath, dpo });
    }

    /// Multi-line textual form of one path, for the operator CLI.
    pub fn path_format(&self, path_index: u32) -> String {
        let path = self.paths.get(path_index);
        let mut s = String::new();

        write!(
            s,
            "index:{} pl-index:{} {} weight={} {}:",
            path_index,
            path.pl_index,
            path.proto,
            path.weight,
            path.kind().name()
        )
        .unwrap();
        if !path.oper.is_empty() {
            write!(s, " oper-flags:{}", oper_flag_names(path.oper)).unwrap();
        }
        if !path.cfg.is_empty() {
            write!(s, " cfg-flags:{}", cfg_flag_names(path.cfg)).unwrap();
        }
        s.push('\n');

        match &path.payload {
            Payload::AttachedNextHop { next_hop, interface } => {
                write!(s, "  {} {}", next_hop, self.format_interface(*interface)).unwrap();
                if self.interfaces.is_p2p(*interface) {
                    s.push_str(" (p2p)");
                }
                if path.dpo.is_valid() {
                    write!(s, "\n  {}", path.dpo).unwrap();
                } else {
                    s.push_str("\n  unresolved");
                }
            }
            Payload::Attached { interface } => {
                write!(s, "  {}", self.format_interface(*interface)).unwrap();
            }
            Payload::Recursive { next_hop, table_id } => {
                match next_hop {
                    RecursiveNextHop::Addr(addr) => write!(s, "  via {}", addr).unwrap(),
                    RecursiveNextHop::Label(label) => write!(s, "  via label {}", label).unwrap(),
                }
                write!(s, " in fib:{} via-fib:{} via-dpo:{}", table_id, path.via_fib, path.dpo)
                    .unwrap();
            }
            Payload::Receive { .. }
            | Payload::Special
            | Payload::Deag { .. }
            | Payload::Exclusive { .. } => {
                if path.dpo.is_valid() {
                    write!(s, "  {}", path.dpo).unwrap();
                }
            }
        }
        s
    }

    fn format_interface(&self, if_index: u32) -> String {
        match self.interfaces.name(if_index) {
            Some(name) => name.to_string(),
            None => format!("if_index:{}", if_index),
        }
    }

    /// Textual dump of every path's children, for the single-path CLI view.
    pub fn path_format_children(&self, path_index: u32) -> String {
        let children = self.paths.get(path_index).children.collect();
        let mut s = String::from("children:");
        for child in children {
            write!(s, " {:?}:{}", child.node_type, child.index).unwrap();
        }
        s
    }

    /// All live path indices, in index order.
    pub fn path_indices(&self) -> Vec<u32> {
        self.paths.iter().map(|(index, _)| index).collect()
    }

    pub(crate) fn path_node_ops() -> NodeOps {
        NodeOps {
            back_walk: |fib, index, ctx| fib.path_back_walk(index, ctx),
            // paths are not shared, so they are never locked
            last_lock_gone: |_, _| panic!("paths are not reference counted"),
            mem_show: |fib| MemoryUsage {
                name: "path",
                in_use: fib.paths.len(),
                allocated: fib.paths.capacity(),
                elt_size: std::mem::size_of::<Path>(),
            },
        }
    }

    pub(crate) fn register_path_node(&mut self) {
        self.node_registry
            .register(NodeType::Path, Self::path_node_ops());
    }
}

fn oper_flag_names(flags: OperFlags) -> String {
    let mut names = Vec::new();
    if flags.contains(OperFlags::RECURSIVE_LOOP) {
        names.push("recursive-loop");
    }
    if flags.contains(OperFlags::RESOLVED) {
        names.push("resolved");
    }
    if flags.contains(OperFlags::DROP) {
        names.push("drop");
    }
    names.join(",")
}

fn cfg_flag_names(flags: ConfigFlags) -> String {
    let mut names = Vec::new();
    if flags.contains(ConfigFlags::DROP) {
        names.push("drop");
    }
    if flags.contains(ConfigFlags::LOCAL) {
        names.push("local");
    }
    if flags.contains(ConfigFlags::RESOLVE_VIA_HOST) {
        names.push("resolve-via-host");
    }
    if flags.contains(ConfigFlags::RESOLVE_VIA_ATTACHED) {
        names.push("resolve-via-attached");
    }
    names.join(",")
}
