//! Log subscriber setup shared by the server and CLI binaries.

use tracing_subscriber::EnvFilter;

use facematch_core::config::{LogFormat, LoggingConfig};
use facematch_core::{Error, Result};

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    installed.map_err(|e| Error::Internal {
        message: format!("installing log subscriber: {e}"),
    })
}
