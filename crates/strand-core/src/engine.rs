//! # Engine
//!
//! Shared context of every session: the chain cache, the registry and
//! repository boundaries, the argument filter and the configuration.
//!
//! An [`Engine`] is cheap to clone; each worker creates its own
//! [`Session`] from it.

use crate::cache::ShareSpace;
use crate::config::StrandConfig;
use crate::filter::{ArgFilter, DomainFilter, DomainService};
use crate::registry::{EntityRegistry, ThreadRegistry};
use crate::repository::Repository;
use crate::session::Session;
use crate::types::{CallToken, StrandError};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct EngineInner {
    pub(crate) cache: ShareSpace,
    pub(crate) registry: Arc<dyn EntityRegistry>,
    pub(crate) repository: Option<Arc<dyn Repository>>,
    pub(crate) filter: Arc<dyn ArgFilter>,
    pub(crate) config: StrandConfig,
    tokens: AtomicU64,
}

/// Shared engine handle.
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Arc<EngineInner>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cached", &self.inner.cache.len())
            .field("has_repository", &self.inner.repository.is_some())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Engine {
    /// Engine with the default registry, an empty domain and no repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Create a session bound to this engine.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    /// The shared chain cache.
    #[must_use]
    pub fn cache(&self) -> &ShareSpace {
        &self.inner.cache
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StrandConfig {
        &self.inner.config
    }

    pub(crate) fn next_token(&self) -> CallToken {
        CallToken(self.inner.tokens.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn repository(&self) -> Result<Arc<dyn Repository>, StrandError> {
        self.inner
            .repository
            .as_ref()
            .map(Arc::clone)
            .ok_or(StrandError::NoRepository)
    }
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    registry: Option<Arc<dyn EntityRegistry>>,
    repository: Option<Arc<dyn Repository>>,
    filter: Option<Arc<dyn ArgFilter>>,
    config: StrandConfig,
}

impl EngineBuilder {
    /// Use a custom entity registry.
    #[must_use]
    pub fn registry(mut self, registry: impl EntityRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Execute chains against `repository`.
    #[must_use]
    pub fn repository(mut self, repository: impl Repository + 'static) -> Self {
        self.repository = Some(Arc::new(repository));
        self
    }

    /// Execute chains against a shared repository.
    #[must_use]
    pub fn shared_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Use a custom argument filter.
    #[must_use]
    pub fn filter(mut self, filter: impl ArgFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Recognise arguments against `domain` with the default filter.
    #[must_use]
    pub fn domain(self, domain: DomainService) -> Self {
        self.filter(DomainFilter::new(domain))
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: StrandConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            inner: Arc::new(EngineInner {
                cache: ShareSpace::new(),
                registry: self
                    .registry
                    .unwrap_or_else(|| Arc::new(ThreadRegistry::new())),
                repository: self.repository,
                filter: self
                    .filter
                    .unwrap_or_else(|| Arc::new(DomainFilter::default())),
                config: self.config,
                tokens: AtomicU64::new(1),
            }),
        }
    }
}
