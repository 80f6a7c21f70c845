//! Configuration types

use serde::Deserialize;
use std::collections::HashMap;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interfaces: HashMap<String, InterfaceConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    /// Point-to-point link: neighbors resolve via the link, not per-address.
    #[serde(default)]
    pub p2p: bool,
    #[serde(default = "default_true")]
    pub admin_up: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Forward via next-hop and/or interface.
    #[default]
    Normal,
    /// Drop everything for this prefix.
    Drop,
    /// Receive locally.
    Local,
    /// Look up again in another table.
    Deag,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Destination prefix in CIDR notation.
    pub dest: String,
    /// Table the route is installed in.
    #[serde(default)]
    pub table: u32,
    #[serde(default)]
    pub kind: RouteKind,
    /// Next-hop address.
    pub via: Option<String>,
    /// Outgoing interface name.
    pub interface: Option<String>,
    /// Table to recurse or deaggregate into.
    pub next_table: Option<u32>,
    /// Multipath weight (0 is coerced to 1).
    #[serde(default)]
    pub weight: u32,
    /// Require the recursion target to be a real host route.
    #[serde(default)]
    pub resolve_via_host: bool,
    /// Require the recursion target to be an attached route.
    #[serde(default)]
    pub resolve_via_attached: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}
