//! # Node
//!
//! One statement step of a chain.
//!
//! Nodes live in a [`Chain`](crate::chain::Chain) arena and refer to each
//! other by slot. `previous`/`next` link the sequential steps; `parent` and
//! `children` link sub-condition chains to the step that owns them.
//!
//! Field and type metadata is derived from the filled elements:
//! - literal `a.b.User.getName` gives field `User.name` and type `User`
//! - dictionary `Gender::MALE` gives field `Gender.MALE` and type `Gender`
//! - entities are collected as bound entities
//! - entity type references are collected as types

use crate::merge::MergeOperator;
use crate::primitives::ACCESSOR_PREFIX;
use crate::result::PendingResult;
use crate::status::Status;
use crate::types::{Element, EntityRef, StepKind};
use crate::values::ValueContainer;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// How a chain relates to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkMode {
    /// Built with `fork`; never published.
    Fork,
    /// Built with `fork_cached`; published like an ordinary chain.
    Cached,
}

/// A single step of a chain.
#[derive(Debug)]
pub struct Node {
    kind: StepKind,
    operator: Option<String>,
    elements: Vec<Element>,
    fields: Vec<String>,
    entity_types: BTreeSet<String>,
    bound_entities: Vec<EntityRef>,
    values: Option<ValueContainer>,
    status: Status,
    is_child: bool,
    fork: Option<ForkMode>,
    merge_operator: Option<MergeOperator>,
    pub(crate) previous: Option<u32>,
    pub(crate) next: Option<u32>,
    pub(crate) parent: Option<u32>,
    pub(crate) children: Vec<u32>,
    released: bool,
    result: OnceLock<PendingResult>,
}

impl Node {
    /// The root of a new chain.
    pub(crate) fn root() -> Self {
        Self::new(StepKind::ROOT, Status::Wait)
    }

    pub(crate) fn new(kind: StepKind, status: Status) -> Self {
        Self {
            kind,
            operator: None,
            elements: Vec::new(),
            fields: Vec::new(),
            entity_types: BTreeSet::new(),
            bound_entities: Vec::new(),
            values: None,
            status,
            is_child: false,
            fork: None,
            merge_operator: None,
            previous: None,
            next: None,
            parent: None,
            children: Vec::new(),
            released: false,
            result: OnceLock::new(),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Statement kind.
    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    /// Optional operator sub-kind.
    #[must_use]
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    /// Filled elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Qualified field names, e.g. `User.name`.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Entity and dictionary types referenced by this node.
    #[must_use]
    pub fn entity_types(&self) -> &BTreeSet<String> {
        &self.entity_types
    }

    /// Entities passed as arguments.
    #[must_use]
    pub fn bound_entities(&self) -> &[EntityRef] {
        &self.bound_entities
    }

    /// Bound parameter values.
    #[must_use]
    pub fn values(&self) -> Option<&ValueContainer> {
        self.values.as_ref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether this node heads a sub-condition chain.
    #[must_use]
    pub fn is_child(&self) -> bool {
        self.is_child
    }

    /// Fork mode, if the node was built in a forked chain.
    #[must_use]
    pub fn fork(&self) -> Option<ForkMode> {
        self.fork
    }

    /// Merge operator requested for this step.
    #[must_use]
    pub fn merge_operator(&self) -> Option<MergeOperator> {
        self.merge_operator
    }

    /// Slot of the previous step.
    #[must_use]
    pub fn previous(&self) -> Option<u32> {
        self.previous
    }

    /// Slot of the next step.
    #[must_use]
    pub fn next(&self) -> Option<u32> {
        self.next
    }

    /// Slot of the owning step, for sub-condition heads.
    #[must_use]
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    /// Slots of the attached sub-condition heads.
    #[must_use]
    pub fn children(&self) -> &[u32] {
        &self.children
    }

    /// Whether the node was released by a destroy.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn result(&self) -> Option<&PendingResult> {
        self.result.get()
    }

    /// Attach a background result; the first attachment wins.
    pub(crate) fn attach_result(&self, make: impl FnOnce() -> PendingResult) -> &PendingResult {
        self.result.get_or_init(make)
    }

    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn set_operator(&mut self, operator: Option<String>) {
        self.operator = operator;
    }

    pub(crate) fn set_merge_operator(&mut self, op: Option<MergeOperator>) {
        self.merge_operator = op;
    }

    pub(crate) fn mark_child(&mut self) {
        self.is_child = true;
    }

    pub(crate) fn set_fork(&mut self, fork: Option<ForkMode>) {
        self.fork = fork;
    }

    pub(crate) fn set_values(&mut self, values: ValueContainer) {
        self.values = Some(values);
    }

    /// Install the element array and derive field/type metadata from it.
    pub(crate) fn set_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.fields.clear();
        self.entity_types.clear();
        self.bound_entities.clear();
        for element in &self.elements {
            match element {
                Element::Literal(token) => {
                    let (field, owner) = literal_field(token);
                    self.fields.push(field);
                    if let Some(owner) = owner {
                        self.entity_types.insert(owner);
                    }
                }
                Element::Dictionary(dict) => {
                    self.fields.push(format!("{}.{}", dict.owner, dict.name));
                    self.entity_types.insert(dict.owner.clone());
                }
                Element::Entity(entity) => self.bound_entities.push(entity.clone()),
                Element::EntityType(name) => {
                    self.entity_types.insert(name.clone());
                }
            }
        }
    }

    /// Drop everything but the `previous` link.
    pub(crate) fn release(&mut self) {
        self.operator = None;
        self.elements = Vec::new();
        self.fields = Vec::new();
        self.entity_types = BTreeSet::new();
        self.bound_entities = Vec::new();
        self.values = None;
        self.next = None;
        self.parent = None;
        self.children = Vec::new();
        self.result = OnceLock::new();
        self.released = true;
    }
}

/// Derive `(Type.field, Some(Type))` from an accessor token.
fn literal_field(token: &str) -> (String, Option<String>) {
    let mut parts = token.rsplitn(3, '.');
    let method = parts.next().unwrap_or(token);
    let owner = parts.next();
    let name = method.strip_prefix(ACCESSOR_PREFIX).unwrap_or(method);
    let name = lower_first(name);
    match owner {
        Some(owner) => (format!("{owner}.{name}"), Some(owner.to_string())),
        None => (name, None),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let mut out = String::with_capacity(name.len());
            out.push(first.to_ascii_lowercase());
            out.push_str(chars.as_str());
            out
        }
        _ => name.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
