//! # Repository Boundary
//!
//! The execution layer a finished chain is handed to. Strand never touches
//! storage itself: a [`Repository`] walks the closed chain and runs it.

use crate::chain::Chain;
use crate::types::StrandError;
use serde::Serialize;
use std::sync::Arc;

/// Result of running a chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Rows produced by a query.
    Rows(Vec<serde_json::Value>),
    /// Status code produced by a commit.
    Affected(i32),
}

impl Outcome {
    /// Rows of a query outcome.
    #[must_use]
    pub fn rows(&self) -> Option<&[serde_json::Value]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Affected(_) => None,
        }
    }

    /// Status code of a commit outcome.
    #[must_use]
    pub fn affected(&self) -> Option<i32> {
        match self {
            Self::Affected(code) => Some(*code),
            Self::Rows(_) => None,
        }
    }
}

/// Executes closed chains.
///
/// Implementations are shared by every session of an engine and may be
/// called from background tasks.
pub trait Repository: Send + Sync {
    /// Run a read chain.
    fn query(&self, chain: &Chain) -> Result<Outcome, StrandError>;

    /// Run a write chain and return its status code.
    fn commit(&self, chain: &Chain) -> Result<i32, StrandError>;

    /// Submit a work batch in order and return its status code.
    fn from_session(&self, batch: &[Arc<Chain>]) -> Result<i32, StrandError>;
}
