//! Diagnostic logging setup.
//!
//! Library code logs through `tracing` macros. The binary installs one
//! stderr subscriber at startup; without it those events go nowhere. The
//! sandbox operation log is separate and always written.

use anyhow::{Context, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding an `EnvFilter` directive, e.g. `psyker=trace`.
pub const LOG_ENV: &str = "PSYKER_LOG";

const DEFAULT_DIRECTIVE: &str = "psyker=warn";
const VERBOSE_DIRECTIVE: &str = "psyker=debug";

/// Choose the filter directive: `PSYKER_LOG` if set, else by verbosity.
pub fn filter_directive(verbose: bool, env_value: Option<&str>) -> String {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => VERBOSE_DIRECTIVE.to_string(),
        None => DEFAULT_DIRECTIVE.to_string(),
    }
}

/// Install the global stderr subscriber.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(verbose, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid {} directive '{}'", LOG_ENV, directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))
}
