//! # Entity Registry Boundary
//!
//! The registry tracks which chain each thread is currently building. A
//! session registers every new root with the call token it allocated and
//! expects back exactly that node; anything else means a stale entry was
//! read and the start is rejected.

use crate::types::{CallToken, NodeId, StrandError};
use dashmap::DashMap;
use std::thread::ThreadId;

/// One registration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Thread building the chain.
    pub thread: ThreadId,
    /// Token allocated for this building sequence.
    pub token: CallToken,
    /// Root of the new chain.
    pub root: NodeId,
}

/// Registry of chains under construction.
pub trait EntityRegistry: Send + Sync {
    /// Register a new root and return the node now current for the thread.
    fn register(&self, registration: Registration) -> Result<NodeId, StrandError>;

    /// Forget the chain `token` of `thread`, if it is still the current one.
    fn deregister(&self, thread: ThreadId, token: CallToken);
}

/// Default registry: one entry per thread.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    current: DashMap<ThreadId, Registration>,
}

impl ThreadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with a chain under construction.
    #[must_use]
    pub fn active(&self) -> usize {
        self.current.len()
    }
}

impl EntityRegistry for ThreadRegistry {
    fn register(&self, registration: Registration) -> Result<NodeId, StrandError> {
        self.current.insert(registration.thread, registration);
        let current = self
            .current
            .get(&registration.thread)
            .map(|entry| *entry.value());
        match current {
            Some(found) if found.token == registration.token => Ok(found.root),
            _ => {
                tracing::warn!(token = %registration.token, "registration could not be confirmed");
                Err(StrandError::RegistrationConflict {
                    token: registration.token,
                })
            }
        }
    }

    fn deregister(&self, thread: ThreadId, token: CallToken) {
        self.current.remove_if(&thread, |_, entry| entry.token == token);
    }
}
