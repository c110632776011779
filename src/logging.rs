//! Diagnostic logging via `tracing`.
//!
//! User-facing output goes through [`crate::ui::Ui`]; this subscriber only carries
//! diagnostics (subprocess launches, skipped config entries) to stderr.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive, e.g. `GITPROF_LOG=debug`
pub const LOG_ENV: &str = "GITPROF_LOG";

/// Pick the filter: `GITPROF_LOG` wins, then `--verbose`, then warnings only
pub fn build_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("gitprof=debug")
        } else {
            EnvFilter::new("warn")
        }
    })
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init_logging(verbose: bool, color: bool) {
    let _ = fmt()
        .with_env_filter(build_env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .try_init();
}
