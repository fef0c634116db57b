//! Log subscriber setup
//!
//! The subscriber is installed once per process with a reloadable level
//! filter. Each invocation then re-applies the level from the active deploy
//! options, so a context built from a different config file logs at its own
//! level.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, Registry};

use crate::config::Options;
use crate::error::{IssuerError, Result};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

static LEVEL_HANDLE: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

/// Install the global subscriber. Later calls do nothing.
pub fn init(format: LogFormat, level: LevelFilter) {
    LEVEL_HANDLE.get_or_init(|| {
        let (filter, handle) = reload::Layer::new(level);
        let registry = tracing_subscriber::registry().with(filter);

        // Another subscriber may already own the global slot (tests, embedders)
        let _ = match format {
            LogFormat::Text => registry.with(fmt::layer()).try_init(),
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        };

        handle
    });
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        _ => Err(IssuerError::Config(format!("Invalid log level: {level}"))),
    }
}

/// Apply the level from `options`, installing the subscriber if needed.
pub fn apply(options: &Options) -> Result<()> {
    let level = parse_level(&options.logging_level)?;

    match LEVEL_HANDLE.get() {
        Some(handle) => handle
            .reload(level)
            .map_err(|e| IssuerError::Config(format!("cannot reload log level: {e}")))?,
        None => init(options.log_format, level),
    }

    debug!(level = %level, "log level applied");
    Ok(())
}
