//! Route-path descriptors
//!
//! The descriptor a client hands the FIB to describe one way of reaching a
//! route: some subset of {interface, next-hop address or label, table,
//! weight, resolution flags}. Path creation derives the path kind from
//! which fields are populated; `encode` turns a live path back into one.

use std::net::IpAddr;

use bitflags::bitflags;

use crate::fib::dpo::Dpo;
use crate::fib::types::{Protocol, INDEX_INVALID, MPLS_LABEL_INVALID};

bitflags! {
    /// Resolution constraints a client may attach to a route path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RoutePathFlags: u8 {
        /// The recursion target must be a host route installed by a real
        /// source, not one synthesized for reverse resolution.
        const RESOLVE_VIA_HOST = 1 << 0;
        /// The recursion target must be an attached route.
        const RESOLVE_VIA_ATTACHED = 1 << 1;
    }
}

/// One way of reaching a route, as described by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePath {
    pub proto: Protocol,
    /// Next-hop address; the zero address means "none".
    pub addr: IpAddr,
    /// Outgoing interface, or `INDEX_INVALID` for none.
    pub if_index: u32,
    /// Table to recurse or deaggregate into, or `INDEX_INVALID` for none.
    pub fib_index: u32,
    /// MPLS local label to recurse through (MPLS protocol only), or
    /// `MPLS_LABEL_INVALID` for none.
    pub label: u32,
    pub weight: u32,
    pub flags: RoutePathFlags,
}

impl RoutePath {
    /// An empty descriptor: no interface, no table, zero address.
    pub fn new(proto: Protocol) -> Self {
        Self {
            proto,
            addr: proto.zero_addr(),
            if_index: INDEX_INVALID,
            fib_index: INDEX_INVALID,
            label: MPLS_LABEL_INVALID,
            weight: 1,
            flags: RoutePathFlags::empty(),
        }
    }

    pub fn with_addr(mut self, addr: IpAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_interface(mut self, if_index: u32) -> Self {
        self.if_index = if_index;
        self
    }

    pub fn with_table(mut self, fib_index: u32) -> Self {
        self.fib_index = fib_index;
        self
    }

    pub fn with_label(mut self, label: u32) -> Self {
        self.label = label;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_flags(mut self, flags: RoutePathFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A route path re-encoded from a live path, for higher-level RPC layers.
///
/// `dpo` is populated only for exclusive paths, which are defined by the
/// forwarding object the client supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePathEncode {
    pub rpath: RoutePath,
    pub dpo: Option<Dpo>,
}
