//! Configuration validation

use std::fmt;

use super::{Config, RouteKind};

/// How bad a finding is. Errors block building the FIB; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("WARN"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

/// One finding, tied to the config item it was found in.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Which config item, e.g. `routes[2] (10.0.0.0/8)`.
    pub context: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

/// The findings of one validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn warn(&mut self, context: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            context: context.to_string(),
            message: message.into(),
        });
    }

    fn error(&mut self, context: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            context: context.to_string(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Print every finding to stderr, the way the CLI surfaces them.
    pub fn print_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }
}

/// Validate configuration and return the findings
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    for (i, route) in config.routes.iter().enumerate() {
        let ctx = format!("routes[{}] ({})", i, route.dest);

        if parse_cidr(&route.dest).is_none() {
            result.error(&ctx, "invalid destination prefix");
        }

        if let Some(ref iface) = route.interface {
            if !config.interfaces.contains_key(iface) {
                result.error(&ctx, format!("unknown interface {}", iface));
            }
        }

        if let Some(ref via) = route.via {
            if via.parse::<std::net::IpAddr>().is_err() {
                result.error(&ctx, format!("invalid next-hop address {}", via));
            }
        }

        match route.kind {
            RouteKind::Normal => {
                if route.via.is_none() && route.interface.is_none() {
                    result.error(&ctx, "normal route needs a next-hop or an interface");
                }
            }
            RouteKind::Deag => {
                if route.next_table.is_none() {
                    result.error(&ctx, "deag route needs next_table");
                }
                if route.via.is_some() || route.interface.is_some() {
                    result.warn(&ctx, "deag route ignores next-hop and interface");
                }
            }
            RouteKind::Drop => {
                if route.via.is_some() {
                    result.warn(&ctx, "drop route ignores next-hop");
                }
            }
            RouteKind::Local => {}
        }

        if route.weight == 0 {
            result.warn(&ctx, "weight 0 is treated as 1");
        }

        if (route.resolve_via_host || route.resolve_via_attached)
            && (route.interface.is_some() || route.via.is_none())
        {
            result.warn(&ctx, "resolve_via_* only applies to recursive routes");
        }
    }

    result
}

/// Parse CIDR notation (e.g. "10.0.0.0/24" or "2001:db8::/32")
pub fn parse_cidr(cidr: &str) -> Option<(std::net::IpAddr, u8)> {
    let (addr, len) = cidr.split_once('/')?;
    let addr: std::net::IpAddr = addr.parse().ok()?;
    let len: u8 = len.parse().ok()?;

    let max = match addr {
        std::net::IpAddr::V4(_) => 32,
        std::net::IpAddr::V6(_) => 128,
    };
    if len > max {
        return None;
    }

    Some((addr, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterfaceConfig, RouteConfig};
    use std::collections::HashMap;

    fn make_route(dest: &str) -> RouteConfig {
        RouteConfig {
            dest: dest.to_string(),
            table: 0,
            kind: RouteKind::Normal,
            via: Some("10.0.0.2".to_string()),
            interface: None,
            next_table: None,
            weight: 1,
            resolve_via_host: false,
            resolve_via_attached: false,
        }
    }

    fn make_config(routes: Vec<RouteConfig>) -> Config {
        let mut interfaces = HashMap::new();
        interfaces.insert(
            "ge0".to_string(),
            InterfaceConfig {
                p2p: false,
                admin_up: true,
            },
        );
        Config {
            interfaces,
            routes,
            logging: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = make_config(vec![make_route("10.1.0.0/16")]);
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn test_bad_prefix() {
        let config = make_config(vec![make_route("10.1.0.0/40")]);
        assert!(validate(&config).has_errors());
    }

    #[test]
    fn test_unknown_interface() {
        let mut route = make_route("10.1.0.0/16");
        route.interface = Some("missing".to_string());
        let config = make_config(vec![route]);

        let result = validate(&config);
        assert!(result.has_errors());
        // the finding names the offending route
        assert!(result.diagnostics()[0].context.contains("routes[0]"));
        assert!(result.diagnostics()[0].context.contains("10.1.0.0/16"));
    }

    #[test]
    fn test_normal_route_needs_target() {
        let mut route = make_route("10.1.0.0/16");
        route.via = None;
        let config = make_config(vec![route]);
        assert!(validate(&config).has_errors());
    }

    #[test]
    fn test_deag_needs_next_table() {
        let mut route = make_route("10.1.0.0/16");
        route.kind = RouteKind::Deag;
        route.via = None;
        let config = make_config(vec![route]);
        assert!(validate(&config).has_errors());
    }

    #[test]
    fn test_weight_zero_warns() {
        let mut route = make_route("10.1.0.0/16");
        route.weight = 0;
        let config = make_config(vec![route]);

        let result = validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_diagnostic_display() {
        let mut result = ValidationResult::new();
        result.error("routes[3] (10.0.0.0/8)", "invalid destination prefix");

        let rendered = result.diagnostics()[0].to_string();
        assert_eq!(
            rendered,
            "[ERROR] routes[3] (10.0.0.0/8): invalid destination prefix"
        );
    }

    #[test]
    fn test_parse_cidr() {
        assert!(parse_cidr("10.0.0.0/8").is_some());
        assert!(parse_cidr("0.0.0.0/0").is_some());
        assert!(parse_cidr("2001:db8::/32").is_some());
        assert!(parse_cidr("10.0.0.0").is_none());
        assert!(parse_cidr("10.0.0.0/33").is_none());
        assert!(parse_cidr("999.0.0.0/8").is_none());
    }
}
