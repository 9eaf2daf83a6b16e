//! # Engine Primitives
//!
//! Hardcoded defaults and tags for the Strand engine.
//!
//! Values that callers may tune at runtime are only the *defaults* of
//! [`StrandConfig`](crate::config::StrandConfig); the tags are fixed.

/// Default bounded wait for a future-backed result, in milliseconds.
///
/// A waiter that exceeds this deadline receives `StrandError::ResultTimeout`.
pub const DEFAULT_RESULT_TIMEOUT_MS: u64 = 3_000;

/// Maximum number of pending tokens per literal buffer.
///
/// Captures beyond this limit are dropped and logged.
pub const LITERAL_CAPACITY: usize = 50;

/// Initial capacity of a per-session work batch.
pub const WORK_BATCH_CAPACITY: usize = 10;

// =============================================================================
// DERIVED ID TAGS
// =============================================================================

/// Infix of a fork id whose origin was found: `{id}_F_{millis}`.
pub const FORK_TAG: &str = "_F_";

/// Infix of a fork id whose origin was missing: `{id}_NF_{millis}`.
pub const NO_FORK_TAG: &str = "_NF_";

/// Infix of a cached-fork id whose origin was found: `{id}_FM_{millis}`.
pub const CACHED_FORK_TAG: &str = "_FM_";

/// Infix of a cached-fork id whose origin was missing: `{id}_NFM_{millis}`.
pub const NO_CACHED_FORK_TAG: &str = "_NFM_";

/// Accessor prefix stripped when deriving field names from literals.
pub const ACCESSOR_PREFIX: &str = "get";
