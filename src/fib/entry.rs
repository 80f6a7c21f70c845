//! FIB entries and tables
//!
//! An entry binds a prefix in a table to forwarding via its path-list.
//! Entries are also the recursion targets: a recursive path asks its table
//! to add a reverse-resolution (RR) source entry at the next-hop's host
//! prefix and becomes that entry's child.
//!
//! An entry carrying only the RR source was synthesized for reverse
//! resolution: it inherits flags and forwarding from its longest-prefix
//! cover until a real source claims the prefix.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;
use tracing::{debug, info};

use crate::fib::dpo::Dpo;
use crate::fib::node::{
    BackWalkCtx, BackWalkReason, ChildList, MemoryUsage, NodeKey, NodeOps, NodeType, WalkOutcome,
};
use crate::fib::path::ConfigFlags;
use crate::fib::route_path::RoutePath;
use crate::fib::types::{ChainType, Prefix, Protocol, INDEX_INVALID};
use crate::fib::urpf::UrpfList;
use crate::fib::Fib;

/// Who installed an entry. Order is priority: earlier variants win, and
/// the RR source ranks last by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    /// Directly configured on an interface.
    Interface,
    /// Configured route (config file or API).
    Api,
    /// Synthesized so a recursive path has something to resolve through.
    Rr,
}

bitflags! {
    /// Properties of an entry that its dependents may predicate on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u8 {
        /// The prefix is directly attached.
        const ATTACHED = 1 << 0;
        /// The prefix is a local receive.
        const LOCAL = 1 << 1;
        /// The entry drops regardless of paths.
        const DROP = 1 << 2;
    }
}

#[derive(Debug)]
pub struct FibEntry {
    proto: Protocol,
    table_id: u32,
    prefix: Prefix,
    /// Source to reference count. Several recursive paths may each add the
    /// RR source to the same entry.
    sources: BTreeMap<Source, u32>,
    flags: EntryFlags,
    path_list: Option<u32>,
    pl_sibling: u32,
    children: ChildList,
}

impl FibEntry {
    fn rr_only(&self) -> bool {
        self.sources.len() == 1 && self.sources.contains_key(&Source::Rr)
    }
}

/// One forwarding table: a prefix-keyed map of entries.
#[derive(Debug, Default)]
pub struct FibTable {
    by_prefix: HashMap<Prefix, u32>,
}

impl Fib {
    fn table(&mut self, proto: Protocol, table_id: u32) -> &mut FibTable {
        self.tables.entry((proto, table_id)).or_default()
    }

    pub fn table_entry_find(&self, proto: Protocol, table_id: u32, prefix: &Prefix) -> Option<u32> {
        self.tables
            .get(&(proto, table_id))?
            .by_prefix
            .get(prefix)
            .copied()
    }

    /// Find the entry at `prefix`, creating it if absent. The source is
    /// marked present but not reference counted.
    fn table_entry_find_or_create(
        &mut self,
        proto: Protocol,
        table_id: u32,
        prefix: Prefix,
        source: Source,
    ) -> u32 {
        if let Some(index) = self.table_entry_find(proto, table_id, &prefix) {
            self.entries
                .get_mut(index)
                .sources
                .entry(source)
                .or_insert(1);
            return index;
        }
        let index = self.entries.put(FibEntry {
            proto,
            table_id,
            prefix,
            sources: BTreeMap::from([(source, 1)]),
            flags: EntryFlags::empty(),
            path_list: None,
            pl_sibling: INDEX_INVALID,
            children: ChildList::new(),
        });
        self.table(proto, table_id).by_prefix.insert(prefix, index);
        debug!(%prefix, table_id, ?source, index, "entry created");
        index
    }

    /// Add a reference on `source` at `prefix`, creating the entry if the
    /// prefix is not yet present. This is how recursive paths obtain their
    /// via-entry.
    pub fn table_entry_special_add(
        &mut self,
        proto: Protocol,
        table_id: u32,
        prefix: Prefix,
        source: Source,
    ) -> u32 {
        if let Some(index) = self.table_entry_find(proto, table_id, &prefix) {
            *self
                .entries
                .get_mut(index)
                .sources
                .entry(source)
                .or_insert(0) += 1;
            return index;
        }
        self.table_entry_find_or_create(proto, table_id, prefix, source)
    }

    /// Drop a reference on `source` at `prefix`; the entry goes away with
    /// its last source.
    pub fn table_entry_special_remove(
        &mut self,
        proto: Protocol,
        table_id: u32,
        prefix: &Prefix,
        source: Source,
    ) {
        let Some(index) = self.table_entry_find(proto, table_id, prefix) else {
            return;
        };
        let sources = &mut self.entries.get_mut(index).sources;
        if let Some(count) = sources.get_mut(&source) {
            *count -= 1;
            if *count == 0 {
                sources.remove(&source);
            }
        }
        self.entry_remove_if_sourceless(index);
    }

    fn entry_remove_if_sourceless(&mut self, index: u32) {
        let entry = self.entries.get(index);
        if !entry.sources.is_empty() {
            return;
        }
        debug_assert!(
            entry.children.is_empty(),
            "sourceless entry still has children"
        );
        let (proto, table_id, prefix) = (entry.proto, entry.table_id, entry.prefix);
        self.table(proto, table_id).by_prefix.remove(&prefix);
        self.entries.take(index);
        debug!(%prefix, table_id, "entry removed");
    }

    /// Install (or replace) a configured route: create its paths, resolve
    /// them, run loop detection, and re-stack dependents.
    pub fn route_add(
        &mut self,
        proto: Protocol,
        table_id: u32,
        prefix: Prefix,
        flags: EntryFlags,
        cfg: ConfigFlags,
        rpaths: &[RoutePath],
    ) -> u32 {
        let index = self.table_entry_find_or_create(proto, table_id, prefix, Source::Api);
        self.entries.get_mut(index).flags = flags;
        self.entry_replace_path_list(index, proto, cfg, rpaths, None);
        info!(%prefix, table_id, paths = rpaths.len(), "route installed");
        index
    }

    /// Install a special route: drop (cfg DROP), local receive (cfg LOCAL),
    /// or exclusive around a caller-supplied DPO.
    pub fn route_add_special(
        &mut self,
        proto: Protocol,
        table_id: u32,
        prefix: Prefix,
        cfg: ConfigFlags,
        dpo: Option<&Dpo>,
    ) -> u32 {
        let index = self.table_entry_find_or_create(proto, table_id, prefix, Source::Api);
        let mut flags = EntryFlags::empty();
        if cfg.contains(ConfigFlags::DROP) {
            flags |= EntryFlags::DROP;
        }
        if cfg.contains(ConfigFlags::LOCAL) {
            flags |= EntryFlags::LOCAL;
        }
        self.entries.get_mut(index).flags = flags;
        self.entry_replace_path_list(index, proto, cfg, &[], dpo);
        info!(%prefix, table_id, "special route installed");
        index
    }

    fn entry_replace_path_list(
        &mut self,
        index: u32,
        proto: Protocol,
        cfg: ConfigFlags,
        rpaths: &[RoutePath],
        dpo: Option<&Dpo>,
    ) {
        if let Some(old) = self.entries.get(index).path_list {
            let sibling = self.entries.get(index).pl_sibling;
            self.path_list_child_remove(old, sibling);
            self.path_list_destroy(old);
        }

        let pl = if rpaths.is_empty() {
            self.path_list_create_special(proto, cfg, dpo)
        } else {
            self.path_list_create(proto, cfg, rpaths)
        };
        let sibling = self.path_list_child_add(pl, NodeKey::entry(index));
        let entry = self.entries.get_mut(index);
        entry.path_list = Some(pl);
        entry.pl_sibling = sibling;

        self.path_list_resolve(pl);
        self.entry_post_update(index);
    }

    /// Withdraw a configured route. The entry survives if the RR source
    /// still needs it; dependents re-evaluate either way.
    pub fn route_remove(&mut self, proto: Protocol, table_id: u32, prefix: &Prefix) {
        let Some(index) = self.table_entry_find(proto, table_id, prefix) else {
            return;
        };
        if let Some(pl) = self.entries.get(index).path_list {
            let sibling = self.entries.get(index).pl_sibling;
            self.path_list_child_remove(pl, sibling);
            self.path_list_destroy(pl);
            let entry = self.entries.get_mut(index);
            entry.path_list = None;
            entry.pl_sibling = INDEX_INVALID;
        }
        let entry = self.entries.get_mut(index);
        entry.sources.remove(&Source::Api);
        entry.flags = EntryFlags::empty();
        info!(%prefix, table_id, "route removed");

        if self.entries.get(index).sources.is_empty() {
            self.entry_remove_if_sourceless(index);
        } else {
            self.entry_post_update(index);
        }
    }

    /// After an entry's forwarding changed: re-run loop detection for its
    /// own paths and its dependents, re-stack, and walk the children.
    fn entry_post_update(&mut self, index: u32) {
        if let Some(pl) = self.entries.get(index).path_list {
            let mut entries = vec![index];
            self.path_list_recursive_loop_detect(pl, &mut entries);
            for path in self.path_list_paths(pl) {
                self.path_restack_recursive(path);
            }
        }

        // dependent recursive paths re-check for cycles formed or broken
        for child in self.entries.get(index).children.collect() {
            if child.node_type == NodeType::Path {
                let mut entries = Vec::new();
                self.path_recursive_loop_detect(child.index, &mut entries);
            }
        }

        let children = self.entries.get(index).children.collect();
        let mut ctx = BackWalkCtx::new(BackWalkReason::EVALUATE);
        self.walk_children(&children, &mut ctx);
    }

    pub fn entry_prefix(&self, index: u32) -> Prefix {
        self.entries.get(index).prefix
    }

    /// The path-list currently providing this entry's forwarding, if any.
    pub fn entry_path_list(&self, index: u32) -> Option<u32> {
        self.entries.get(index).path_list
    }

    /// The highest-priority source on the entry.
    pub fn entry_get_best_source(&self, index: u32) -> Option<Source> {
        self.entries.get(index).sources.keys().next().copied()
    }

    /// Entry flags; RR-only entries inherit their cover's.
    pub fn entry_get_flags(&self, index: u32) -> EntryFlags {
        let entry = self.entries.get(index);
        if entry.rr_only() {
            match self.entry_cover(index) {
                Some(cover) => self.entry_get_flags(cover),
                None => EntryFlags::empty(),
            }
        } else {
            entry.flags
        }
    }

    /// The most-specific other entry in the table covering this prefix.
    pub fn entry_cover(&self, index: u32) -> Option<u32> {
        let entry = self.entries.get(index);
        let table = self.tables.get(&(entry.proto, entry.table_id))?;
        table
            .by_prefix
            .iter()
            .filter(|&(prefix, &other)| other != index && prefix.covers(&entry.prefix))
            .max_by_key(|&(prefix, _)| prefix.len())
            .map(|(_, &other)| other)
    }

    /// Register a dependent of this entry's forwarding (a recursive path).
    pub fn entry_child_add(&mut self, index: u32, child: NodeKey) -> u32 {
        self.entries.get_mut(index).children.add(child)
    }

    pub fn entry_child_remove(&mut self, index: u32, sibling: u32) {
        self.entries.get_mut(index).children.remove(sibling);
    }

    pub fn entry_child_count(&self, index: u32) -> usize {
        self.entries.get(index).children.len()
    }

    /// Contribute this entry's forwarding for `fct`. The returned DPO
    /// carries a lock the caller owns.
    ///
    /// Forwarding comes from the entry's own resolved paths when a real
    /// source installed any, else from the cover, else the drop.
    pub fn entry_contribute_forwarding(&mut self, index: u32, fct: ChainType) -> Dpo {
        let entry = self.entries.get(index);
        let pl = entry.path_list;

        if let Some(pl) = pl {
            let mut hash_key = Vec::new();
            for path in self.path_list_paths(pl) {
                self.path_append_nh_for_multipath_hash(path, fct, &mut hash_key);
            }
            return match hash_key.len() {
                0 => Dpo::drop_for(fct.to_dpo_proto()),
                1 => hash_key[0].dpo,
                _ => self.load_balances.create(fct.to_dpo_proto(), hash_key),
            };
        }

        match self.entry_cover(index) {
            Some(cover) => self.entry_contribute_forwarding(cover, fct),
            None => Dpo::drop_for(fct.to_dpo_proto()),
        }
    }

    /// Forward-walk for a recursion cycle. The entry adds itself to the
    /// walk set and descends into its path-list.
    pub fn entry_recursive_loop_detect(&mut self, index: u32, entries: &mut Vec<u32>) -> bool {
        entries.push(index);
        match self.entries.get(index).path_list {
            Some(pl) => self.path_list_recursive_loop_detect(pl, entries),
            None => false,
        }
    }

    /// The interface the entry's forwarding resolves out of, if any.
    pub fn entry_get_resolving_interface(&self, index: u32) -> u32 {
        if let Some(pl) = self.entries.get(index).path_list {
            for path in self.path_list_paths(pl) {
                if self.path_is_resolved(path) {
                    return self.path_get_resolving_interface(path);
                }
            }
            return INDEX_INVALID;
        }
        match self.entry_cover(index) {
            Some(cover) => self.entry_get_resolving_interface(cover),
            None => INDEX_INVALID,
        }
    }

    /// Append the interfaces this entry's forwarding may legitimately
    /// receive from.
    pub fn entry_contribute_urpf(&mut self, index: u32, urpf: &mut UrpfList) {
        if let Some(pl) = self.entries.get(index).path_list {
            for path in self.path_list_paths(pl) {
                self.path_contribute_urpf(path, urpf);
            }
            return;
        }
        if let Some(cover) = self.entry_cover(index) {
            self.entry_contribute_urpf(cover, urpf);
        }
    }

    pub(crate) fn entry_node_ops() -> NodeOps {
        NodeOps {
            back_walk: |fib, index, ctx| {
                // nothing is cached here; relay to the dependents
                let children = fib.entries.get(index).children.collect();
                fib.walk_children(&children, ctx);
                WalkOutcome::Continue
            },
            last_lock_gone: |_, _| panic!("entries are not reference counted here"),
            mem_show: |fib| MemoryUsage {
                name: "entry",
                in_use: fib.entries.len(),
                allocated: fib.entries.capacity(),
                elt_size: std::mem::size_of::<FibEntry>(),
            },
        }
    }

    pub(crate) fn register_entry_node(&mut self) {
        self.node_registry
            .register(NodeType::Entry, Self::entry_node_ops());
    }
}
