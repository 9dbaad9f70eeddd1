//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level when set, so operators can
//! narrow output (e.g. `RUST_LOG=business_manager::db=debug`) without
//! touching the config file.

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber once at process start
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match (config.format.as_str(), config.target.as_str()) {
        ("json", "stderr") => builder.json().with_writer(std::io::stderr).try_init(),
        ("json", _) => builder.json().try_init(),
        ("compact", "stderr") => builder.compact().with_writer(std::io::stderr).try_init(),
        ("compact", _) => builder.compact().try_init(),
        (_, "stderr") => builder.pretty().with_writer(std::io::stderr).try_init(),
        _ => builder.pretty().try_init(),
    };

    result.map_err(|err| anyhow!(err))
}
