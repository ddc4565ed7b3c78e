//! Tracing subscriber setup for the bridge library.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "REDSTONE_LOG";

static INIT: Once = Once::new();

/// Install the bridge's log subscriber.
///
/// Reads `REDSTONE_LOG` for per-module levels, e.g.
/// `REDSTONE_LOG=redstone_bridge::guard=trace,redstone_bridge=debug`.
/// Falls back to `redstone=info` when unset or invalid.
///
/// Idempotent. If the embedding process already installed a global
/// subscriber, that one is kept.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("redstone=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}
