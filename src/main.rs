use clap::{Parser, Subcommand};
use rfib::config::{self, RouteKind};
use rfib::fib::{
    ConfigFlags, EntryFlags, Fib, Prefix, Protocol, RoutePath, RoutePathFlags,
};
use rfib::telemetry::{init_logging, FibMetrics};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rfib")]
#[command(about = "A routing FIB control plane implemented in Rust")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect the FIB built from a configuration
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config.toml without building the FIB
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Dump all paths, or one path with its child list
    Paths {
        /// Path index to show in detail
        index: Option<u32>,

        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Per-node-type memory accounting
    Memory {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    // Initialize logging (RUST_LOG env var takes priority)
    init_logging(None);

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => cmd_config_validate(&config),
        Commands::Show {
            what: ShowTarget::Paths { index, config },
        } => cmd_show_paths(&config, index),
        Commands::Show {
            what: ShowTarget::Memory { config },
        } => cmd_show_memory(&config),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_config_validate(config_path: &PathBuf) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!("[INFO] Configuration is valid");
        Ok(())
    }
}

fn cmd_show_paths(config_path: &PathBuf, index: Option<u32>) -> Result<(), String> {
    let fib = load_world(config_path)?;

    match index {
        Some(pi) => {
            // show one in detail
            if fib.path_exists(pi) {
                println!("{}", fib.path_format(pi));
                println!("{}", fib.path_format_children(pi));
            } else {
                println!("path {} invalid", pi);
            }
        }
        None => {
            println!("FIB Paths");
            for pi in fib.path_indices() {
                println!("{}", fib.path_format(pi));
            }
        }
    }
    Ok(())
}

fn cmd_show_memory(config_path: &PathBuf) -> Result<(), String> {
    let fib = load_world(config_path)?;

    println!("{:<12} {:>8} {:>10} {:>10}", "Name", "In-use", "Allocated", "Size");
    for usage in fib.memory_usage() {
        println!(
            "{:<12} {:>8} {:>10} {:>10}",
            usage.name, usage.in_use, usage.allocated, usage.elt_size
        );
    }
    Ok(())
}

/// Load and validate the config, then build the FIB world from it.
fn load_world(config_path: &PathBuf) -> Result<Fib, String> {
    info!("Loading {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to load config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();
    if validation.has_errors() {
        return Err("Validation failed with errors".to_string());
    }

    build_fib(&cfg)
}

fn build_fib(cfg: &config::Config) -> Result<Fib, String> {
    let metrics = Arc::new(FibMetrics::new());
    let mut fib = Fib::new(metrics);

    // sort for deterministic interface indices
    let mut names: Vec<&String> = cfg.interfaces.keys().collect();
    names.sort();
    for name in names {
        let iface = &cfg.interfaces[name];
        let index = fib.interfaces.add(name, iface.p2p);
        if !iface.admin_up {
            fib.interface_set_admin_up(index, false);
        }
        info!("Interface {} configured: p2p={}", name, iface.p2p);
    }

    for route in &cfg.routes {
        install_route(&mut fib, route)?;
    }

    Ok(fib)
}

fn install_route(fib: &mut Fib, route: &config::RouteConfig) -> Result<(), String> {
    let (addr, len) = config::parse_cidr(&route.dest)
        .ok_or_else(|| format!("Invalid destination prefix: {}", route.dest))?;
    let (proto, prefix) = match addr {
        IpAddr::V4(addr) => (Protocol::Ip4, Prefix::V4 { addr, len }),
        IpAddr::V6(addr) => (Protocol::Ip6, Prefix::V6 { addr, len }),
    };

    match route.kind {
        RouteKind::Drop => {
            fib.route_add_special(proto, route.table, prefix, ConfigFlags::DROP, None);
        }
        RouteKind::Local => match &route.interface {
            Some(name) => {
                let if_index = fib
                    .interfaces
                    .find_by_name(name)
                    .ok_or_else(|| format!("Unknown interface: {}", name))?;
                let mut rpath = RoutePath::new(proto).with_interface(if_index);
                if let Some(via) = &route.via {
                    rpath.addr = via.parse().map_err(|_| format!("Invalid address: {}", via))?;
                }
                fib.route_add(
                    proto,
                    route.table,
                    prefix,
                    EntryFlags::LOCAL,
                    ConfigFlags::LOCAL,
                    &[rpath],
                );
            }
            None => {
                fib.route_add_special(proto, route.table, prefix, ConfigFlags::LOCAL, None);
            }
        },
        RouteKind::Deag => {
            let next_table = route
                .next_table
                .ok_or_else(|| format!("Deag route {} needs next_table", route.dest))?;
            let rpath = RoutePath::new(proto).with_table(next_table);
            fib.route_add(
                proto,
                route.table,
                prefix,
                EntryFlags::empty(),
                ConfigFlags::empty(),
                &[rpath],
            );
        }
        RouteKind::Normal => {
            let mut rpath = RoutePath::new(proto).with_weight(route.weight);
            let mut entry_flags = EntryFlags::empty();

            if let Some(via) = &route.via {
                rpath.addr = via.parse().map_err(|_| format!("Invalid next-hop: {}", via))?;
            }
            match &route.interface {
                Some(name) => {
                    rpath.if_index = fib
                        .interfaces
                        .find_by_name(name)
                        .ok_or_else(|| format!("Unknown interface: {}", name))?;
                    if route.via.is_none() {
                        entry_flags |= EntryFlags::ATTACHED;
                    }
                }
                None => {
                    // no interface: recurse in next_table, or this table
                    rpath.fib_index = route.next_table.unwrap_or(route.table);
                }
            }

            let mut flags = RoutePathFlags::empty();
            if route.resolve_via_host {
                flags |= RoutePathFlags::RESOLVE_VIA_HOST;
            }
            if route.resolve_via_attached {
                flags |= RoutePathFlags::RESOLVE_VIA_ATTACHED;
            }
            rpath.flags = flags;

            fib.route_add(
                proto,
                route.table,
                prefix,
                entry_flags,
                ConfigFlags::empty(),
                &[rpath],
            );
        }
    }

    Ok(())
}
