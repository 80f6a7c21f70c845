//! End-to-end path scenarios: resolution, back-walks, recursion
//! constraints, loops, and interface lifecycle.

use rfib::fib::{
    AdjKey, BackWalkCtx, BackWalkReason, ChainType, ConfigFlags, Dpo, DpoKind, EntryFlags, Fib,
    LinkType, NodeKey, Prefix, Protocol, RoutePath, RoutePathFlags, UrpfList, INDEX_INVALID,
};
use std::net::IpAddr;

fn v4(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

fn v4_prefix(addr: &str, len: u8) -> Prefix {
    Prefix::V4 {
        addr: addr.parse().unwrap(),
        len,
    }
}

fn anh_rpath(addr: &str, if_index: u32) -> RoutePath {
    RoutePath::new(Protocol::Ip4)
        .with_addr(v4(addr))
        .with_interface(if_index)
}

fn recursive_rpath(addr: &str, table: u32) -> RoutePath {
    RoutePath::new(Protocol::Ip4).with_addr(v4(addr)).with_table(table)
}

/// Scenario 1: attached next-hop on a broadcast interface, following the
/// interface through down and back up.
#[test]
fn test_attached_next_hop_interface_flap() {
    let mut fib = Fib::default();
    let ge3 = fib.interfaces.add("ge3", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge3)],
    );
    let path = fib.path_list_paths(pl)[0];

    assert!(fib.path_resolve(path));
    assert!(fib.path_is_resolved(path));

    // the DPO is the neighbor adjacency keyed on the configured address
    let adj = fib.path_get_adj(path);
    assert_eq!(
        fib.adjacencies.key(adj),
        AdjKey::Neighbor {
            proto: Protocol::Ip4,
            link: LinkType::Ip4,
            addr: v4("10.0.0.2"),
            interface: ge3,
        }
    );

    fib.interface_set_admin_up(ge3, false);
    assert!(!fib.path_is_resolved(path));

    fib.interface_set_admin_up(ge3, true);
    assert!(fib.path_is_resolved(path));

    fib.path_list_destroy(pl);
}

/// Scenario 2: on a p2p link the adjacency is keyed on the zero address,
/// whatever neighbor was configured.
#[test]
fn test_attached_next_hop_p2p_uses_zero_address() {
    let mut fib = Fib::default();
    let pp7 = fib.interfaces.add("pp7", true);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("192.168.44.2", pp7)],
    );
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_resolve(path));

    let adj = fib.path_get_adj(path);
    assert_eq!(
        fib.adjacencies.key(adj),
        AdjKey::Neighbor {
            proto: Protocol::Ip4,
            link: LinkType::Ip4,
            addr: v4("0.0.0.0"),
            interface: pp7,
        }
    );

    fib.path_list_destroy(pl);
}

/// Scenario 3: attached on a broadcast interface resolves via a glean.
#[test]
fn test_attached_resolves_via_glean() {
    let mut fib = Fib::default();
    let ge4 = fib.interfaces.add("ge4", false);

    let pl = fib.path_list_create(
        Protocol::Ip6,
        ConfigFlags::empty(),
        &[RoutePath::new(Protocol::Ip6).with_interface(ge4)],
    );
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_resolve(path));

    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp6);
    assert_eq!(dpo.kind, DpoKind::AdjacencyGlean);
    assert_eq!(
        fib.adjacencies.key(dpo.index),
        AdjKey::Glean {
            proto: Protocol::Ip6,
            interface: ge4,
        }
    );
    fib.dpo_release(&dpo);

    fib.path_list_destroy(pl);
}

/// Scenario 4: resolve-via-host fails when the via-entry has only the
/// reverse-resolution source; the path drops and PIC-edge fires, while an
/// unconstrained twin resolves through the cover.
#[test]
fn test_resolve_via_host_requires_host_route() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    // a default route so the RR entry has a cover to inherit from
    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("0.0.0.0", 0),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.1", ge0)],
    );

    let constrained = recursive_rpath("1.1.1.1", 0)
        .with_flags(RoutePathFlags::RESOLVE_VIA_HOST);
    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[constrained, recursive_rpath("1.1.1.1", 0)],
    );
    let paths = fib.path_list_paths(pl);

    assert!(!fib.path_resolve(paths[0]));
    assert!(!fib.path_is_resolved(paths[0]));
    let dpo = fib.path_contribute_forwarding(paths[0], ChainType::UnicastIp4);
    assert!(dpo.is_drop());

    // PIC-edge notification was issued for the constrained path
    assert!(fib.load_balances.pic_events().contains(&paths[0]));

    // the unconstrained twin inherits the cover's forwarding
    assert!(fib.path_resolve(paths[1]));
    assert!(fib.path_is_resolved(paths[1]));
    let dpo = fib.path_contribute_forwarding(paths[1], ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    fib.dpo_release(&dpo);

    fib.path_list_destroy(pl);
}

/// Resolve-via-host succeeds once a real host route owns the via prefix.
#[test]
fn test_resolve_via_host_with_real_host_route() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("1.1.1.1", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0)],
    );

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[recursive_rpath("1.1.1.1", 0).with_flags(RoutePathFlags::RESOLVE_VIA_HOST)],
    );
    let path = fib.path_list_paths(pl)[0];

    assert!(fib.path_resolve(path));
    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    fib.dpo_release(&dpo);

    fib.path_list_destroy(pl);
}

/// Resolve-via-attached requires the via-entry to be an attached route.
#[test]
fn test_resolve_via_attached() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    // attached subnet route
    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("10.0.0.0", 24),
        EntryFlags::ATTACHED,
        ConfigFlags::empty(),
        &[RoutePath::new(Protocol::Ip4).with_interface(ge0)],
    );

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[recursive_rpath("10.0.0.9", 0).with_flags(RoutePathFlags::RESOLVE_VIA_ATTACHED)],
    );
    let path = fib.path_list_paths(pl)[0];

    // the RR entry for 10.0.0.9/32 inherits ATTACHED from its cover
    assert!(fib.path_resolve(path));
    assert!(fib.path_is_resolved(path));

    fib.path_list_destroy(pl);
}

/// Scenario 5: a two-route recursion cycle is installed, marked looped,
/// forwards via the non-looped sibling, and recovers when the loop breaks.
#[test]
fn test_recursive_loop_installed_and_broken() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("1.1.1.1", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[recursive_rpath("2.2.2.2", 0)],
    );

    // closes the cycle; the sibling attached next-hop still forwards
    let entry_b = fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("2.2.2.2", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[recursive_rpath("1.1.1.1", 0), anh_rpath("10.0.0.2", ge0)],
    );

    let entry_a = fib
        .table_entry_find(Protocol::Ip4, 0, &v4_prefix("1.1.1.1", 32))
        .unwrap();
    let path_a = fib.path_list_paths(fib.entry_path_list(entry_a).unwrap())[0];
    let paths_b = fib.path_list_paths(fib.entry_path_list(entry_b).unwrap());
    let (path_b_recursive, path_b_attached) = (paths_b[0], paths_b[1]);

    // the back edge is looped and contributes the drop
    assert!(fib.path_is_looped(path_a));
    assert!(!fib.path_is_resolved(path_a));
    let dpo = fib.path_contribute_forwarding(path_a, ChainType::UnicastIp4);
    assert!(dpo.is_drop());

    assert!(fib.path_is_looped(path_b_recursive));
    assert!(fib.path_is_resolved(path_b_attached));

    // the entry still forwards using the non-looped sibling only
    let dpo = fib.entry_contribute_forwarding(entry_b, ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    fib.dpo_release(&dpo);

    // break the loop; the surviving edge clears and re-resolves
    fib.route_remove(Protocol::Ip4, 0, &v4_prefix("1.1.1.1", 32));
    assert!(!fib.path_is_looped(path_b_recursive));
    assert!(fib.path_is_resolved(path_b_recursive));
}

/// Scenario 6: deleting the interface turns the path into a permanent drop
/// that later walks cannot revive.
#[test]
fn test_interface_delete_is_permanent_drop() {
    let mut fib = Fib::default();
    let ge5 = fib.interfaces.add("ge5", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.5.0.2", ge5)],
    );
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_resolve(path));

    fib.interface_delete(ge5);
    assert!(!fib.path_is_resolved(path));

    // the dropped path released its adjacency
    assert!(fib.adjacencies.is_empty());

    // an interface-up walk does not revive it
    let mut ctx = BackWalkCtx::new(BackWalkReason::INTERFACE_UP);
    fib.node_back_walk(NodeKey::path(path), &mut ctx);
    assert!(!fib.path_is_resolved(path));

    // nor does an explicit re-resolve
    assert!(!fib.path_resolve(path));
    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_drop());

    fib.path_list_destroy(pl);
}

/// Destroying a path releases every upstream lock and child registration.
#[test]
fn test_destroy_releases_upstreams() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[
            anh_rpath("10.0.0.2", ge0),
            RoutePath::new(Protocol::Ip4).with_interface(ge0),
            recursive_rpath("9.9.9.9", 0),
            RoutePath::new(Protocol::Ip4).with_table(7),
        ],
    );
    fib.path_list_resolve(pl);

    assert!(!fib.adjacencies.is_empty());
    assert!(!fib.lookups.is_empty());
    assert!(fib
        .table_entry_find(Protocol::Ip4, 0, &v4_prefix("9.9.9.9", 32))
        .is_some());

    fib.path_list_destroy(pl);

    assert!(fib.adjacencies.is_empty());
    assert!(fib.lookups.is_empty());
    // the RR entry went with its last child
    assert!(fib
        .table_entry_find(Protocol::Ip4, 0, &v4_prefix("9.9.9.9", 32))
        .is_none());
}

/// A path configured to drop holds no upstream state at all.
#[test]
fn test_cfg_drop_holds_no_locks() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::DROP,
        &[anh_rpath("10.0.0.2", ge0)],
    );
    let path = fib.path_list_paths(pl)[0];

    assert!(!fib.path_resolve(path));
    assert!(fib.adjacencies.is_empty());

    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_drop());

    fib.path_list_destroy(pl);
}

/// Copies share configured state but start life unresolved with the zero
/// DPO.
#[test]
fn test_copy_semantics() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0)],
    );
    let path = fib.path_list_paths(pl)[0];
    fib.path_resolve(path);

    let copy = fib.path_copy(path, pl);
    assert_eq!(fib.path_cmp(path, copy), std::cmp::Ordering::Equal);
    assert_eq!(fib.path_hash(path), fib.path_hash(copy));
    assert!(!fib.path_is_resolved(copy));
    let dpo = fib.path_contribute_forwarding(copy, ChainType::UnicastIp4);
    assert_eq!(dpo, Dpo::INVALID);

    fib.path_destroy(copy);
    fib.path_list_destroy(pl);
}

/// Two resolved paths fan out into a load-balance carrying their weights.
#[test]
fn test_multipath_hash_key_and_load_balance() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);
    let ge1 = fib.interfaces.add("ge1", false);

    let entry = fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("10.99.0.0", 16),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[
            anh_rpath("10.0.0.2", ge0).with_weight(1),
            anh_rpath("10.1.0.2", ge1).with_weight(3),
        ],
    );

    let dpo = fib.entry_contribute_forwarding(entry, ChainType::UnicastIp4);
    assert_eq!(dpo.kind, DpoKind::LoadBalance);

    let members = fib.load_balances.members(dpo.index).to_vec();
    assert_eq!(members.len(), 2);
    let weights: Vec<u32> = members.iter().map(|m| m.weight).collect();
    assert_eq!(weights, vec![1, 3]);
    assert!(members.iter().all(|m| m.dpo.is_adjacency()));

    fib.dpo_release(&dpo);
}

/// An unresolved path contributes nothing to the hash key.
#[test]
fn test_unresolved_path_skips_hash_key() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);
    let ge1 = fib.interfaces.add("ge1", false);
    fib.interface_set_admin_up(ge1, false);

    let entry = fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("10.99.0.0", 16),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0), anh_rpath("10.1.0.2", ge1)],
    );

    // only the path over the up interface contributes
    let dpo = fib.entry_contribute_forwarding(entry, ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    fib.dpo_release(&dpo);
}

/// uRPF collects attached interfaces directly and through recursion.
#[test]
fn test_urpf_contribution() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);
    let ge1 = fib.interfaces.add("ge1", false);

    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("7.7.7.7", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.1.0.2", ge1)],
    );

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0), recursive_rpath("7.7.7.7", 0)],
    );
    fib.path_list_resolve(pl);

    let mut urpf = UrpfList::new();
    for path in fib.path_list_paths(pl) {
        fib.path_contribute_urpf(path, &mut urpf);
    }
    urpf.bake();

    assert!(urpf.contains(ge0));
    assert!(urpf.contains(ge1));
    assert_eq!(urpf.len(), 2);

    fib.path_list_destroy(pl);
}

/// Adjacency rewrite updates restack attached next-hop paths in place.
#[test]
fn test_adj_update_restacks() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0)],
    );
    let path = fib.path_list_paths(pl)[0];
    fib.path_resolve(path);

    let adj = fib.path_get_adj(path);
    let locks_before = fib.adjacencies.lock_count(adj);

    fib.adjacency_rewrite_updated(adj);

    // same adjacency, same single lock, still resolved
    assert_eq!(fib.path_get_adj(path), adj);
    assert_eq!(fib.adjacencies.lock_count(adj), locks_before);
    assert!(fib.path_is_resolved(path));

    fib.path_list_destroy(pl);
}

/// Deag paths contribute an MPLS-table lookup for the non-EOS chain.
#[test]
fn test_deag_contributions() {
    let mut fib = Fib::default();

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[RoutePath::new(Protocol::Ip4).with_table(9)],
    );
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_resolve(path));
    assert!(fib.path_is_deag(path));

    let native = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert_eq!(native.kind, DpoKind::Lookup);
    assert_eq!(fib.lookups.table_id(native.index), 9);
    fib.dpo_release(&native);

    let mpls = fib.path_contribute_forwarding(path, ChainType::MplsNonEos);
    assert_eq!(mpls.kind, DpoKind::Lookup);
    assert_eq!(fib.lookups.table_id(mpls.index), 0);
    fib.dpo_release(&mpls);

    fib.path_list_destroy(pl);
    assert!(fib.lookups.is_empty());
}

/// Receive paths lock a receive DPO for (proto, interface, address).
#[test]
fn test_receive_path() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::LOCAL,
        &[anh_rpath("10.0.0.1", ge0)],
    );
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_resolve(path));

    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert_eq!(dpo.kind, DpoKind::Receive);
    fib.dpo_release(&dpo);

    fib.path_list_destroy(pl);
    assert!(fib.receives.is_empty());
}

/// Encode round-trips a created path back to an equal descriptor.
#[test]
fn test_encode_round_trip() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let rpath = anh_rpath("10.0.0.2", ge0).with_weight(4);
    let pl = fib.path_list_create(Protocol::Ip4, ConfigFlags::empty(), &[rpath]);
    let path = fib.path_list_paths(pl)[0];

    let mut out = Vec::new();
    fib.path_encode(pl, path, &mut out);
    assert_eq!(out.len(), 1);
    assert_eq!(
        fib.path_cmp_with_route_path(path, &out[0].rpath),
        std::cmp::Ordering::Equal
    );
    assert!(out[0].dpo.is_none());

    fib.path_list_destroy(pl);
}

/// The resolving interface follows recursion into the via-entry.
#[test]
fn test_resolving_interface_through_recursion() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("3.3.3.3", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0)],
    );

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[recursive_rpath("3.3.3.3", 0)],
    );
    let path = fib.path_list_paths(pl)[0];
    fib.path_resolve(path);

    assert_eq!(fib.path_get_resolving_interface(path), ge0);

    fib.path_list_destroy(pl);
}

/// A route replacing another re-stacks recursive dependents via EVALUATE
/// back-walks.
#[test]
fn test_route_change_restacks_dependents() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);
    let ge1 = fib.interfaces.add("ge1", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[recursive_rpath("5.5.5.5", 0)],
    );
    let path = fib.path_list_paths(pl)[0];
    fib.path_resolve(path);

    // unresolved target: recursion falls back to drop
    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_drop());

    // installing the real route walks the dependent path
    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("5.5.5.5", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0)],
    );
    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    assert_eq!(fib.adjacencies.interface(dpo.index), ge0);
    fib.dpo_release(&dpo);

    // replacing it moves the forwarding to the new interface
    fib.route_add(
        Protocol::Ip4,
        0,
        v4_prefix("5.5.5.5", 32),
        EntryFlags::empty(),
        ConfigFlags::empty(),
        &[anh_rpath("10.1.0.2", ge1)],
    );
    let dpo = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert!(dpo.is_adjacency());
    assert_eq!(fib.adjacencies.interface(dpo.index), ge1);
    fib.dpo_release(&dpo);

    fib.path_list_destroy(pl);
}

/// Exclusive paths contribute the caller's DPO for any chain.
#[test]
fn test_exclusive_path() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    // hand-build an adjacency to stand in for a client-owned object
    let adj = fib
        .adjacencies
        .nbr_add_or_lock(Protocol::Ip4, LinkType::Ip4, v4("10.0.0.7"), ge0);
    let client_dpo = Dpo::adjacency(rfib::fib::DpoProto::Ip4, adj);

    let pl = fib.path_list_create_special(Protocol::Ip4, ConfigFlags::empty(), Some(&client_dpo));
    let path = fib.path_list_paths(pl)[0];
    assert!(fib.path_is_exclusive(path));
    assert!(fib.path_resolve(path));

    let native = fib.path_contribute_forwarding(path, ChainType::UnicastIp4);
    assert_eq!(native.index, adj);
    fib.dpo_release(&native);

    let mpls = fib.path_contribute_forwarding(path, ChainType::MplsEos);
    assert_eq!(mpls.index, adj);
    fib.dpo_release(&mpls);

    let mut urpf = UrpfList::new();
    fib.path_contribute_urpf(path, &mut urpf);
    assert!(urpf.contains(ge0));

    fib.path_list_destroy(pl);
    // only the client's own lock remains
    assert_eq!(fib.adjacencies.lock_count(adj), 1);
    fib.adjacencies.unlock(adj);
    assert!(fib.adjacencies.is_empty());
}

/// Paths of invalid index do not exist; accessors on live ones agree.
#[test]
fn test_predicates_and_accessors() {
    let mut fib = Fib::default();
    let ge0 = fib.interfaces.add("ge0", false);

    let pl = fib.path_list_create(
        Protocol::Ip4,
        ConfigFlags::empty(),
        &[anh_rpath("10.0.0.2", ge0).with_weight(5)],
    );
    let path = fib.path_list_paths(pl)[0];

    assert!(fib.path_exists(path));
    assert!(!fib.path_exists(path + 100));
    assert!(!fib.path_is_recursive(path));
    assert!(!fib.path_is_exclusive(path));
    assert!(!fib.path_is_deag(path));
    assert_eq!(fib.path_get_weight(path), 5);
    assert_eq!(fib.path_get_proto(path), Protocol::Ip4);
    assert_eq!(fib.path_get_resolving_interface(path), ge0);

    fib.path_list_destroy(pl);
    assert_eq!(fib.path_indices(), Vec::<u32>::new());
    assert!(!fib.path_exists(path));
}

/// INDEX sentinel round-trips through descriptors untouched.
#[test]
fn test_descriptor_sentinels() {
    let rpath = RoutePath::new(Protocol::Ip4);
    assert_eq!(rpath.if_index, INDEX_INVALID);
    assert_eq!(rpath.fib_index, INDEX_INVALID);
}
