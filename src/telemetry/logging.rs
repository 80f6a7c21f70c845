//! Logging initialization.
//!
//! RUST_LOG takes priority; otherwise the config file's `[logging]`
//! section picks the level and output format (pretty, compact, json).

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_logging(config: Option<&LoggingConfig>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = config.and_then(|c| c.level.as_deref());
        EnvFilter::new(level_directive(level.unwrap_or("info")))
    };

    let format = config.and_then(|c| c.format.as_deref()).unwrap_or("pretty");
    let registry = tracing_subscriber::registry().with(filter);
    let _ = match format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        // "pretty" or anything else
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
}

/// Maps a configured level name onto a filter directive. Unrecognized
/// names fall back to info.
fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("error"), "error");
        assert_eq!(level_directive("WARN"), "warn");
        assert_eq!(level_directive("Debug"), "debug");
        assert_eq!(level_directive("trace"), "trace");
        assert_eq!(level_directive("verbose"), "info");
        assert_eq!(level_directive(""), "info");
    }
}
