//! # strand-core
//!
//! The statement-chain builder for Strand.
//!
//! Strand composes multi-step data-access statements into chains of nodes
//! (with nested sub-condition chains) and hands finished chains to an
//! external repository for execution.
//!
//! ## Building a chain
//!
//! ```
//! use strand_core::{Arg, DomainService, Engine, Step, StepKind};
//!
//! let engine = Engine::builder()
//!     .domain(DomainService::new().with_entity("User"))
//!     .build();
//! let mut session = engine.session();
//!
//! let root = session.start_with("active-users")?;
//! session.capture_literal("app.domain.User.getName")?;
//! let get = session.append(root, Step::new(StepKind::GET).arg(Arg::Placeholder))?;
//! session.capture_literal("app.domain.User.getActive")?;
//! let by = session.append(get, Step::new(StepKind::BY))?;
//! session.set_values(by, vec![true.into()])?;
//! let chain = session.end()?;
//!
//! assert_eq!(chain.trunk().count(), 3);
//! assert!(engine.cache().contains("active-users"));
//! # Ok::<(), strand_core::StrandError>(())
//! ```
//!
//! ## Architectural Constraints
//!
//! - A chain under construction is owned by exactly one [`Session`]
//! - Only closed chains are shared, as `Arc<Chain>`, through the cache
//! - Storage, query languages and wire formats belong to the [`Repository`]
//! - Async only at the edge: future-backed results run on tokio tasks

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod chain;
pub mod config;
pub mod engine;
pub mod fill;
pub mod filter;
pub mod literal;
pub mod logging;
pub mod merge;
pub mod node;
pub mod primitives;
pub mod registry;
pub mod render;
pub mod repository;
pub mod result;
pub mod session;
pub mod status;
pub mod step;
pub mod types;
pub mod values;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Arg, ArgValue, CallToken, DictRef, Element, EntityRef, NodeId, StepKind, StrandError,
};

// =============================================================================
// RE-EXPORTS: Chain Engine
// =============================================================================

pub use cache::ShareSpace;
pub use chain::Chain;
pub use engine::{Engine, EngineBuilder};
pub use fill::{Filled, fill};
pub use filter::{ArgFilter, DomainFilter, DomainService};
pub use literal::{Capture, LiteralBuffer, Recorder};
pub use merge::MergeOperator;
pub use node::{ForkMode, Node};
pub use registry::{EntityRegistry, Registration, ThreadRegistry};
pub use render::{NodeView, render, to_json};
pub use repository::{Outcome, Repository};
pub use result::PendingResult;
pub use session::Session;
pub use status::Status;
pub use step::Step;
pub use values::{BoundValue, CountMismatch, ValueContainer};

// =============================================================================
// RE-EXPORTS: Ambient (configuration and logging)
// =============================================================================

pub use config::StrandConfig;
pub use logging::{LogFormat, init_tracing};
