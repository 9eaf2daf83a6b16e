//! # Configuration
//!
//! Runtime tunables of the engine.
//!
//! Sources, in increasing priority:
//! 1. built-in defaults from [`primitives`](crate::primitives)
//! 2. a TOML file or string
//! 3. environment variables (`STRAND_RESULT_TIMEOUT_MS`,
//!    `STRAND_LITERAL_CAPACITY`, `STRAND_WORK_BATCH_CAPACITY`)
//!
//! ```toml
//! result_timeout_ms = 5000
//! literal_capacity = 64
//! ```

use crate::primitives::{DEFAULT_RESULT_TIMEOUT_MS, LITERAL_CAPACITY, WORK_BATCH_CAPACITY};
use crate::types::StrandError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding [`StrandConfig::result_timeout_ms`].
pub const ENV_RESULT_TIMEOUT_MS: &str = "STRAND_RESULT_TIMEOUT_MS";
/// Environment variable overriding [`StrandConfig::literal_capacity`].
pub const ENV_LITERAL_CAPACITY: &str = "STRAND_LITERAL_CAPACITY";
/// Environment variable overriding [`StrandConfig::work_batch_capacity`].
pub const ENV_WORK_BATCH_CAPACITY: &str = "STRAND_WORK_BATCH_CAPACITY";

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrandConfig {
    /// Bounded wait for future-backed results, in milliseconds.
    pub result_timeout_ms: u64,
    /// Per-buffer limit of pending captured literals.
    pub literal_capacity: usize,
    /// Initial capacity of a work batch.
    pub work_batch_capacity: usize,
}

impl Default for StrandConfig {
    fn default() -> Self {
        Self {
            result_timeout_ms: DEFAULT_RESULT_TIMEOUT_MS,
            literal_capacity: LITERAL_CAPACITY,
            work_batch_capacity: WORK_BATCH_CAPACITY,
        }
    }
}

impl StrandConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, StrandError> {
        toml::from_str(text).map_err(|e| StrandError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StrandError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StrandError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `STRAND_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparsable values are ignored with a warning.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = parse_var(&lookup, ENV_RESULT_TIMEOUT_MS) {
            self.result_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_LITERAL_CAPACITY) {
            self.literal_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_WORK_BATCH_CAPACITY) {
            self.work_batch_capacity = v;
        }
        self
    }

    /// The result timeout as a [`Duration`].
    #[must_use]
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
