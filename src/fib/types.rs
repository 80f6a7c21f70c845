//! Shared FIB types
//!
//! Protocols, link types, forwarding chain types, and prefixes. These are
//! the vocabulary every other FIB module speaks.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Sentinel for "no index". Used for interfaces, entries, paths and tables.
pub const INDEX_INVALID: u32 = u32::MAX;

/// The table id MPLS lookups fall back to when no table is configured.
pub const MPLS_DEFAULT_TABLE_ID: u32 = 0;

/// Sentinel for "no MPLS label configured".
pub const MPLS_LABEL_INVALID: u32 = u32::MAX;

/// Address family / protocol of a next-hop.
///
/// This cannot be derived from the next-hop address alone since the address
/// may legitimately be all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    Ip4,
    Ip6,
    Mpls,
}

impl Protocol {
    /// The link type used when resolving an adjacency for this protocol.
    pub fn to_link(self) -> LinkType {
        match self {
            Protocol::Ip4 => LinkType::Ip4,
            Protocol::Ip6 => LinkType::Ip6,
            Protocol::Mpls => LinkType::Mpls,
        }
    }

    /// The data-plane protocol forwarding objects carry for this protocol.
    pub fn to_dpo(self) -> DpoProto {
        match self {
            Protocol::Ip4 => DpoProto::Ip4,
            Protocol::Ip6 => DpoProto::Ip6,
            Protocol::Mpls => DpoProto::Mpls,
        }
    }

    /// The forwarding chain a path natively contributes for this protocol.
    pub fn to_chain(self) -> ChainType {
        match self {
            Protocol::Ip4 => ChainType::UnicastIp4,
            Protocol::Ip6 => ChainType::UnicastIp6,
            Protocol::Mpls => ChainType::MplsNonEos,
        }
    }

    /// The all-zeros address in this protocol's address family.
    ///
    /// MPLS next-hops are addressed in IP space, so the v4 zero serves.
    pub fn zero_addr(self) -> IpAddr {
        match self {
            Protocol::Ip4 | Protocol::Mpls => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Protocol::Ip6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Ip4 => "ip4",
            Protocol::Ip6 => "ip6",
            Protocol::Mpls => "mpls",
        };
        f.write_str(s)
    }
}

/// Layer-2 link type an adjacency rewrites for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkType {
    Ip4,
    Ip6,
    Mpls,
    Ethernet,
}

/// Protocol tag carried by data-plane objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DpoProto {
    #[default]
    Ip4,
    Ip6,
    Mpls,
    Ethernet,
}

/// The forwarding context a consumer requests a contribution for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    UnicastIp4,
    UnicastIp6,
    MplsEos,
    MplsNonEos,
    Ethernet,
}

impl ChainType {
    /// The link type an adjacency must rewrite for to serve this chain.
    pub fn to_link(self) -> LinkType {
        match self {
            ChainType::UnicastIp4 => LinkType::Ip4,
            ChainType::UnicastIp6 => LinkType::Ip6,
            ChainType::MplsEos | ChainType::MplsNonEos => LinkType::Mpls,
            ChainType::Ethernet => LinkType::Ethernet,
        }
    }

    /// The data-plane protocol of objects contributed for this chain.
    pub fn to_dpo_proto(self) -> DpoProto {
        match self {
            ChainType::UnicastIp4 => DpoProto::Ip4,
            ChainType::UnicastIp6 => DpoProto::Ip6,
            ChainType::MplsEos | ChainType::MplsNonEos => DpoProto::Mpls,
            ChainType::Ethernet => DpoProto::Ethernet,
        }
    }
}

/// Returns true if the address is the unspecified address of its family.
pub fn addr_is_zero(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(a) => a.is_unspecified(),
        IpAddr::V6(a) => a.is_unspecified(),
    }
}

/// A FIB prefix: an IP network or an MPLS local label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    V4 { addr: Ipv4Addr, len: u8 },
    V6 { addr: Ipv6Addr, len: u8 },
    Mpls { label: u32 },
}

impl Prefix {
    /// The host prefix covering exactly `addr`.
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Prefix::V4 { addr: a, len: 32 },
            IpAddr::V6(a) => Prefix::V6 { addr: a, len: 128 },
        }
    }

    /// The prefix matching an MPLS local label.
    pub fn from_label(label: u32) -> Self {
        Prefix::Mpls { label }
    }

    pub fn len(&self) -> u8 {
        match self {
            Prefix::V4 { len, .. } => *len,
            Prefix::V6 { len, .. } => *len,
            Prefix::Mpls { .. } => 0,
        }
    }

    /// True if `self` covers `other` (same family, `self` no longer, and the
    /// masked address bits agree). A prefix covers itself.
    pub fn covers(&self, other: &Prefix) -> bool {
        match (self, other) {
            (Prefix::V4 { addr, len }, Prefix::V4 { addr: oa, len: ol }) => {
                len <= ol && mask_v4(*addr, *len) == mask_v4(*oa, *len)
            }
            (Prefix::V6 { addr, len }, Prefix::V6 { addr: oa, len: ol }) => {
                len <= ol && mask_v6(*addr, *len) == mask_v6(*oa, *len)
            }
            (Prefix::Mpls { label }, Prefix::Mpls { label: ol }) => label == ol,
            _ => false,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::V4 { addr, len } => write!(f, "{}/{}", addr, len),
            Prefix::V6 { addr, len } => write!(f, "{}/{}", addr, len),
            Prefix::Mpls { label } => write!(f, "mpls:{}", label),
        }
    }
}

fn mask_v4(addr: Ipv4Addr, len: u8) -> u32 {
    let bits = u32::from(addr);
    if len == 0 {
        0
    } else {
        bits & (!0u32 << (32 - len))
    }
}

fn mask_v6(addr: Ipv6Addr, len: u8) -> u128 {
    let bits = u128::from(addr);
    if len == 0 {
        0
    } else {
        bits & (!0u128 << (128 - len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proto_to_chain() {
        assert_eq!(Protocol::Ip4.to_chain(), ChainType::UnicastIp4);
        assert_eq!(Protocol::Ip6.to_chain(), ChainType::UnicastIp6);
        assert_eq!(Protocol::Mpls.to_chain(), ChainType::MplsNonEos);
    }

    #[test]
    fn test_zero_addr() {
        assert!(addr_is_zero(&Protocol::Ip4.zero_addr()));
        assert!(addr_is_zero(&Protocol::Ip6.zero_addr()));
        assert!(!addr_is_zero(&"10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_host_prefix() {
        let p = Prefix::host("192.168.1.1".parse().unwrap());
        assert_eq!(p.len(), 32);

        let p = Prefix::host("2001:db8::1".parse().unwrap());
        assert_eq!(p.len(), 128);
    }

    #[test]
    fn test_prefix_covers() {
        let net = Prefix::V4 {
            addr: "10.0.0.0".parse().unwrap(),
            len: 8,
        };
        let host = Prefix::host("10.1.2.3".parse().unwrap());
        let other = Prefix::host("11.0.0.1".parse().unwrap());

        assert!(net.covers(&host));
        assert!(!net.covers(&other));
        assert!(net.covers(&net));
        // a host route does not cover its network
        assert!(!host.covers(&net));
    }

    #[test]
    fn test_prefix_covers_v6() {
        let net = Prefix::V6 {
            addr: "2001:db8::".parse().unwrap(),
            len: 32,
        };
        let host = Prefix::host("2001:db8::42".parse().unwrap());
        assert!(net.covers(&host));

        let default = Prefix::V6 {
            addr: "::".parse().unwrap(),
            len: 0,
        };
        assert!(default.covers(&host));
    }

    #[test]
    fn test_label_prefix() {
        let a = Prefix::from_label(100);
        let b = Prefix::from_label(100);
        let c = Prefix::from_label(101);
        assert!(a.covers(&b));
        assert!(!a.covers(&c));
    }
}
