//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Strand engine:
//! - Chain and node identifiers (`CallToken`, `NodeId`)
//! - Step kinds (`StepKind`)
//! - Raw step arguments (`Arg`, `ArgValue`) and filled elements (`Element`)
//! - Error types (`StrandError`)
//!
//! ## Ordering Guarantees
//!
//! Identifiers implement `Ord` so that chains and nodes can be kept in
//! `BTreeMap`/`BTreeSet` with a deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// CHAIN & NODE IDENTIFIERS
// =============================================================================

/// Call token identifying one chain-building call sequence.
///
/// Tokens are handed out by the engine from a monotonically increasing
/// counter. The entity registry uses them (together with the thread id) to
/// confirm that the node it registered is exactly the one just created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallToken(pub u64);

impl fmt::Display for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a node inside a chain arena.
///
/// A handle is only valid for the chain that produced it; the `chain` token
/// is checked on every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Token of the owning chain.
    pub chain: CallToken,
    /// Position in the chain arena.
    pub slot: u32,
}

impl NodeId {
    /// Create a node handle.
    #[must_use]
    pub const fn new(chain: CallToken, slot: u32) -> Self {
        Self { chain, slot }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chain, self.slot)
    }
}

// =============================================================================
// STEP KINDS
// =============================================================================

/// The statement kind of a node (`get`, `add`, `by`, ...).
///
/// The set is open: callers can declare their own kinds with
/// [`StepKind::custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StepKind(&'static str);

impl StepKind {
    /// Root of every chain.
    pub const ROOT: Self = Self("root");
    /// Read step.
    pub const GET: Self = Self("get");
    /// Insert step.
    pub const ADD: Self = Self("add");
    /// Update step.
    pub const PUT: Self = Self("put");
    /// Delete step.
    pub const REMOVE: Self = Self("remove");
    /// Condition sub-node.
    pub const BY: Self = Self("by");
    /// Aggregate count sub-node.
    pub const COUNT: Self = Self("count");

    /// Declare a caller-defined step kind.
    #[must_use]
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    /// Get the kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// Condition nodes may not hold positional arguments and children at once.
    #[must_use]
    pub fn is_condition(self) -> bool {
        self == Self::BY
    }

    /// Whether a chain starting with this step reads rather than writes.
    #[must_use]
    pub fn is_query(self) -> bool {
        self == Self::GET || self == Self::COUNT
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// =============================================================================
// ARGUMENT COMPONENTS
// =============================================================================

/// Reference to a dictionary constant (an enum-like domain value).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DictRef {
    /// Owning dictionary type, e.g. `Gender`.
    pub owner: String,
    /// Constant name, e.g. `MALE`.
    pub name: String,
}

impl DictRef {
    /// Create a dictionary reference.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

/// Reference to a live domain entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type name, e.g. `User`.
    pub type_name: String,
    /// Optional identity key of the instance.
    pub key: Option<String>,
}

impl EntityRef {
    /// Create an entity reference without a key.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            key: None,
        }
    }

    /// Create an entity reference with an identity key.
    #[must_use]
    pub fn keyed(type_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            key: Some(key.into()),
        }
    }
}

/// A non-null raw argument value.
///
/// Values the argument filter does not recognise are treated as disguised
/// literal placeholders (the return value of an intercepted accessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgValue {
    /// Free text.
    Text(String),
    /// Integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// Dictionary constant.
    Dictionary(DictRef),
    /// Domain entity.
    Entity(EntityRef),
}

/// One positional argument of an appended step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Null slot, filled from the literal buffer.
    Placeholder,
    /// A sub-chain to attach as a child.
    Node(NodeId),
    /// Ternary sentinel, filled from the ternary buffer.
    Ternary,
    /// Any other value, passed through the argument filter.
    Value(ArgValue),
}

impl From<ArgValue> for Arg {
    fn from(value: ArgValue) -> Self {
        Self::Value(value)
    }
}

impl From<NodeId> for Arg {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<DictRef> for Arg {
    fn from(dict: DictRef) -> Self {
        Self::Value(ArgValue::Dictionary(dict))
    }
}

impl From<EntityRef> for Arg {
    fn from(entity: EntityRef) -> Self {
        Self::Value(ArgValue::Entity(entity))
    }
}

impl From<&str> for Arg {
    fn from(text: &str) -> Self {
        Self::Value(ArgValue::Text(text.to_string()))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Value(ArgValue::Integer(value))
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// A filled positional element of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    /// Captured accessor token, e.g. `app.domain.User.getName`.
    Literal(String),
    /// Recognised dictionary constant.
    Dictionary(DictRef),
    /// Recognised entity instance.
    Entity(EntityRef),
    /// Recognised entity type name.
    EntityType(String),
}

impl Element {
    /// Shorthand for a literal element.
    #[must_use]
    pub fn literal(token: impl Into<String>) -> Self {
        Self::Literal(token.into())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(token) => f.write_str(token),
            Self::Dictionary(dict) => write!(f, "{}.{}", dict.owner, dict.name),
            Self::Entity(entity) => match &entity.key {
                Some(key) => write!(f, "{}[{}]", entity.type_name, key),
                None => f.write_str(&entity.type_name),
            },
            Self::EntityType(name) => f.write_str(name),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Strand engine.
///
/// - No silent failures
/// - Use `Result<T, StrandError>` for fallible operations
/// - `Clone` so one background result can be observed by several waiters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrandError {
    /// A step was appended to a closed, locked or failed node.
    #[error("Chain is closed: cannot append after `{kind}`")]
    ChainClosed { kind: StepKind },

    /// Bound values do not satisfy the field-count rule of a node.
    #[error("Argument count mismatch on {node}: expected {expected}, got {actual}")]
    ArgumentCountMismatch {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// A future-backed result did not arrive in time.
    #[error("Result not available after {waited_ms} ms")]
    ResultTimeout { waited_ms: u64 },

    /// The entity registry could not confirm the node for this call.
    #[error("Registration conflict for call {token}")]
    RegistrationConflict { token: CallToken },

    /// The node handle does not belong to the current chain.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No chain has been started on this session.
    #[error("No active chain")]
    NoActiveChain,

    /// A chain id was empty or contained whitespace.
    #[error("Invalid chain id: {0:?}")]
    InvalidId(String),

    /// No chain is published under the requested id.
    #[error("No cached chain: {0}")]
    UnknownChain(String),

    /// The engine has no repository to execute against.
    #[error("No repository configured")]
    NoRepository,

    /// A result was requested but no background task was attached.
    #[error("No result attached to chain")]
    NoResultAttached,

    /// The background task ended without producing a result.
    #[error("Result unavailable: {0}")]
    ResultUnavailable(String),

    /// No async runtime was available to run a background task.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The repository reported a failure.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A chain could not be rendered.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The tracing subscriber could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

// =============================================================================
// TESTS
// =============================================================================
