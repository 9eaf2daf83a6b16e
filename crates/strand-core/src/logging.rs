//! # Logging
//!
//! Tracing initialisation for binaries and tests embedding the engine.
//! The library itself only emits `tracing` events.
//!
//! `STRAND_LOG_FORMAT=json` switches to machine-parseable output; the filter
//! honours `RUST_LOG` and defaults to `strand_core=info`.

use crate::types::StrandError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format (`json` or `text`).
pub const ENV_LOG_FORMAT: &str = "STRAND_LOG_FORMAT";

const DEFAULT_FILTER: &str = "strand_core=info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Read the format from `STRAND_LOG_FORMAT`; anything but `json` is text.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(ENV_LOG_FORMAT).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Install the global subscriber.
///
/// Fails with `StrandError::Telemetry` if a subscriber is already set.
pub fn init_tracing() -> Result<(), StrandError> {
    init_with(LogFormat::from_env())
}

/// Install the global subscriber with an explicit format.
pub fn init_with(format: LogFormat) -> Result<(), StrandError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.map_err(|e| StrandError::Telemetry(e.to_string()))
}
