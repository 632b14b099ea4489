use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use super::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber. `RUST_LOG` wins over `LOG_LEVEL` when both are set.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {e}", config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };

    result.map_err(|e| anyhow!("Could not install tracing subscriber: {e}"))
}
