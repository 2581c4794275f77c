//! tracing-subscriber setup for the binary and for tests.

use std::io::IsTerminal;
use std::sync::Once;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

/// Crate level when `RUST_LOG` does not name this crate.
fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

/// Build the filter: `RUST_LOG` directives first, then `datadash=<level>` unless
/// `RUST_LOG` already sets it.
pub fn env_filter(debug: bool) -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(&directives);

    if debug || !directives.contains(&format!("{}=", crate::APP_NAME)) {
        let directive = format!("{}={}", crate::APP_NAME, default_level(debug));
        if let Ok(d) = directive.parse::<Directive>() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// Install the global subscriber, writing to stderr. Safe to call more than once.
pub fn init(debug: bool) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter(debug))
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init();
        if installed.is_ok() {
            let debug_enabled: bool = debug;
            tracing::debug!(debug_enabled, "logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_crate_level() {
        let filter = env_filter(true).to_string();
        assert!(filter.contains("datadash=debug"), "{filter}");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
