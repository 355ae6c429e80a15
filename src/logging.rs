//! Logging initialization

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` or `info` for this crate and
/// `tower_http`, `warn` for everything else.
pub fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{}={},tower_http={}",
            env!("CARGO_PKG_NAME"),
            level,
            level
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    if debug {
        tracing::debug!("Debug logging enabled");
    }
}
