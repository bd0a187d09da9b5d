// ABOUTME: Tracing subscriber setup for the bridge binary.
// ABOUTME: RUST_LOG wins; otherwise --verbose means debug, else the configured level.

use tracing_subscriber::EnvFilter;

/// Pick the filter directive. `RUST_LOG` is checked by the caller.
fn directive(verbose: bool, level: &str) -> String {
    if verbose {
        "debug".to_string()
    } else if level.trim().is_empty() {
        "info".to_string()
    } else {
        level.trim().to_string()
    }
}

/// Install the global fmt subscriber.
pub fn init_logging(verbose: bool, level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive(verbose, level)))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}
