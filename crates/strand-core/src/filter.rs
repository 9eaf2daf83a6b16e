//! # Argument Filter
//!
//! Recognition of domain values passed as step arguments.
//!
//! The filter decides whether a non-null raw argument is a legitimate
//! entity or dictionary reference. A value it does not recognise is the
//! return value of an intercepted accessor, so the fill treats it as a
//! disguised literal placeholder.

use crate::types::{ArgValue, Element};
use std::collections::BTreeSet;

/// Recognises domain values among raw step arguments.
///
/// Implementations must be `Send + Sync`: one filter is shared by every
/// session of an engine.
pub trait ArgFilter: Send + Sync {
    /// Return the element for a recognised value, or `None` to treat the
    /// value as a literal placeholder.
    fn filter(&self, value: &ArgValue) -> Option<Element>;
}

/// The domain model known to the engine: entity types and dictionaries.
#[derive(Debug, Clone, Default)]
pub struct DomainService {
    entity_types: BTreeSet<String>,
    dictionaries: BTreeSet<String>,
}

impl DomainService {
    /// Create an empty domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type name.
    #[must_use]
    pub fn with_entity(mut self, type_name: impl Into<String>) -> Self {
        self.entity_types.insert(type_name.into());
        self
    }

    /// Register a dictionary type name.
    #[must_use]
    pub fn with_dictionary(mut self, owner: impl Into<String>) -> Self {
        self.dictionaries.insert(owner.into());
        self
    }

    /// Check if an entity type is part of the domain.
    #[must_use]
    pub fn knows_entity(&self, type_name: &str) -> bool {
        self.entity_types.contains(type_name)
    }

    /// Check if a dictionary type is part of the domain.
    #[must_use]
    pub fn knows_dictionary(&self, owner: &str) -> bool {
        self.dictionaries.contains(owner)
    }
}

/// Default filter: recognises values that belong to a [`DomainService`].
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    domain: DomainService,
}

impl DomainFilter {
    /// Create a filter over the given domain.
    #[must_use]
    pub fn new(domain: DomainService) -> Self {
        Self { domain }
    }

    /// The domain this filter checks against.
    #[must_use]
    pub fn domain(&self) -> &DomainService {
        &self.domain
    }
}

impl ArgFilter for DomainFilter {
    fn filter(&self, value: &ArgValue) -> Option<Element> {
        match value {
            ArgValue::Dictionary(dict) if self.domain.knows_dictionary(&dict.owner) => {
                Some(Element::Dictionary(dict.clone()))
            }
            ArgValue::Entity(entity) if self.domain.knows_entity(&entity.type_name) => {
                Some(Element::Entity(entity.clone()))
            }
            ArgValue::Text(name) if self.domain.knows_entity(name) => {
                Some(Element::EntityType(name.clone()))
            }
            _ => None,
        }
    }
}
