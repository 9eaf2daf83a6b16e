//! # Chain Arena
//!
//! A chain owns its nodes in one arena and addresses them by [`NodeId`].
//!
//! ## Structure
//!
//! - Slot 0 is the root. The trunk follows `next` from the root.
//! - Sub-condition chains hang off trunk (or other child) steps through
//!   `children`; their heads are marked `is_child` and have no `previous`.
//! - A forked chain holds a cursor into its origin for as long as it is
//!   being built. The cursor is dropped on close.
//!
//! ## Closing
//!
//! Closing marks every open node `END`. A closed chain can be shared as
//! `Arc<Chain>`; from then on nothing can mutate it.

use crate::fill::fill;
use crate::filter::ArgFilter;
use crate::literal::LiteralBuffer;
use crate::node::{ForkMode, Node};
use crate::status::Status;
use crate::step::Step;
use crate::types::{CallToken, NodeId, StrandError};
use crate::values::{BoundValue, ValueContainer};
use std::sync::Arc;

/// Position in the origin chain of a fork.
#[derive(Debug)]
struct ForkCursor {
    source: Arc<Chain>,
    at: Option<u32>,
}

/// What the fork cursor does for one step.
enum ForkAction {
    Keep,
    Adopt(u32),
    Merge(u32),
    Disable,
}

/// An arena of nodes forming one chain.
#[derive(Debug)]
pub struct Chain {
    token: CallToken,
    id: Option<String>,
    nodes: Vec<Node>,
    tip: u32,
    literals: LiteralBuffer,
    origin: Option<ForkCursor>,
}

impl Chain {
    /// Create a chain holding only its root.
    pub(crate) fn new(token: CallToken, id: Option<String>, literal_capacity: usize) -> Self {
        Self {
            token,
            id,
            nodes: vec![Node::root()],
            tip: 0,
            literals: LiteralBuffer::with_capacity(literal_capacity),
            origin: None,
        }
    }

    /// Turn a fresh chain into a fork of `source`, starting at the origin's
    /// first step after its root.
    pub(crate) fn fork_from(mut self, source: Arc<Chain>, mode: ForkMode) -> Self {
        let at = source.nodes.first().and_then(Node::next);
        if let Some(root) = self.nodes.first_mut() {
            root.set_fork(Some(mode));
        }
        self.origin = Some(ForkCursor { source, at });
        self
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Call token of the building sequence that created this chain.
    #[must_use]
    pub fn token(&self) -> CallToken {
        self.token
    }

    /// Stable id, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Handle of the root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::new(self.token, 0)
    }

    /// Handle of the last trunk step.
    #[must_use]
    pub fn tip(&self) -> NodeId {
        NodeId::new(self.token, self.tip)
    }

    /// Look a node up by handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.chain != self.token {
            return None;
        }
        self.nodes.get(id.slot as usize)
    }

    /// Look a node up by slot.
    #[must_use]
    pub fn node_at(&self, slot: u32) -> Option<&Node> {
        self.nodes.get(slot as usize)
    }

    /// Number of nodes in the arena, children included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A chain always holds its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Trunk steps from the root onward, skipping released nodes.
    pub fn trunk(&self) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(self.nodes.first(), |node| {
            node.next().and_then(|slot| self.node_at(slot))
        })
        .filter(|node| !node.is_released())
    }

    /// The first step after the root.
    #[must_use]
    pub fn first_step(&self) -> Option<&Node> {
        self.nodes
            .first()
            .and_then(Node::next)
            .and_then(|slot| self.node_at(slot))
    }

    /// Every node is closed, locked or failed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.nodes.iter().all(|node| !node.status().can_advance())
    }

    /// Fork mode of the chain, as set on its root.
    #[must_use]
    pub fn fork_mode(&self) -> Option<ForkMode> {
        self.nodes.first().and_then(Node::fork)
    }

    /// Whether the fork cursor is still active.
    #[must_use]
    pub fn is_merging(&self) -> bool {
        self.origin.as_ref().is_some_and(|cursor| cursor.at.is_some())
    }

    /// Pending captured literals.
    #[must_use]
    pub fn literals(&self) -> &LiteralBuffer {
        &self.literals
    }

    pub(crate) fn literals_mut(&mut self) -> &mut LiteralBuffer {
        &mut self.literals
    }

    // =========================================================================
    // BUILDING
    // =========================================================================

    /// Append a step after `prev`.
    ///
    /// The literal buffers are cleared whether or not the append succeeds.
    pub(crate) fn append(
        &mut self,
        prev: NodeId,
        step: Step,
        filter: &dyn ArgFilter,
    ) -> Result<NodeId, StrandError> {
        let result = self
            .resolve(prev)
            .and_then(|slot| self.build(slot, step, filter, false));
        self.literals.clear();
        result
    }

    /// Create a sub-condition head that inherits the tip's status.
    ///
    /// The head is attached later by passing it as `Arg::Node` to an append.
    pub(crate) fn child(&mut self, step: Step, filter: &dyn ArgFilter) -> Result<NodeId, StrandError> {
        let result = self
            .resolve(self.tip())
            .and_then(|tip| self.build(tip, step, filter, true));
        self.literals.clear();
        result
    }

    fn build(
        &mut self,
        prev: u32,
        step: Step,
        filter: &dyn ArgFilter,
        as_child: bool,
    ) -> Result<NodeId, StrandError> {
        let (prev_kind, prev_status, prev_fork) = {
            let p = &self.nodes[prev as usize];
            (p.kind(), p.status(), p.fork())
        };
        if !prev_status.accepts_steps() {
            return Err(StrandError::ChainClosed { kind: prev_kind });
        }

        let filled = fill(&step.args, &self.literals, filter, |id| {
            self.node(id).is_some_and(|n| n.kind().is_condition())
        });
        let heads = filled
            .children
            .iter()
            .map(|&id| self.child_head(id))
            .collect::<Result<Vec<_>, _>>()?;

        let on_trunk = !as_child && self.head_of(prev) == 0;
        let mut elements = filled.elements;
        let mut fork = prev_fork;

        if on_trunk && fork.is_some() {
            match self.fork_action(&step) {
                ForkAction::Keep => {}
                ForkAction::Adopt(at) => {
                    if elements.is_empty() {
                        elements = self
                            .origin_node(at)
                            .map(|n| n.elements().to_vec())
                            .unwrap_or_default();
                    }
                    self.advance_origin(at);
                }
                ForkAction::Merge(at) => {
                    if let (Some(op), Some(origin)) = (step.merge, self.origin_node(at)) {
                        elements = op.apply(origin.elements(), &elements);
                    }
                    self.advance_origin(at);
                }
                ForkAction::Disable => {
                    tracing::debug!(
                        chain = %self.token,
                        kind = %step.kind,
                        "origin step kind differs, fork disabled"
                    );
                    self.origin = None;
                    fork = None;
                }
            }
        }

        let slot = self.nodes.len() as u32;
        let mut node = Node::new(step.kind, prev_status);
        node.set_operator(step.operator);
        node.set_merge_operator(step.merge);
        node.set_fork(fork);
        node.set_elements(elements);
        if as_child {
            node.mark_child();
        } else {
            node.previous = Some(prev);
            self.nodes[prev as usize].next = Some(slot);
        }
        for head in heads {
            self.nodes[head as usize].parent = Some(slot);
            node.children.push(head);
        }
        node.set_status(Status::Wait);
        self.nodes.push(node);
        self.nodes[prev as usize].set_status(Status::Wait);

        if on_trunk {
            self.tip = slot;
        }
        Ok(NodeId::new(self.token, slot))
    }

    fn fork_action(&self, step: &Step) -> ForkAction {
        let Some(at) = self.origin.as_ref().and_then(|cursor| cursor.at) else {
            return ForkAction::Keep;
        };
        match step.merge {
            None => ForkAction::Adopt(at),
            Some(_) => match self.origin_node(at) {
                Some(origin) if origin.kind() == step.kind => ForkAction::Merge(at),
                _ => ForkAction::Disable,
            },
        }
    }

    fn origin_node(&self, slot: u32) -> Option<&Node> {
        self.origin.as_ref().and_then(|cursor| cursor.source.node_at(slot))
    }

    fn advance_origin(&mut self, from: u32) {
        let next = self.origin_node(from).and_then(Node::next);
        if let Some(cursor) = self.origin.as_mut() {
            cursor.at = next;
        }
    }

    /// Walk `previous` links back to the head of the sub-chain holding `slot`.
    fn head_of(&self, slot: u32) -> u32 {
        let mut current = slot;
        while let Some(node) = self.node_at(current) {
            if node.is_child() {
                break;
            }
            match node.previous() {
                Some(prev) => current = prev,
                None => break,
            }
        }
        current
    }

    /// Resolve a node argument to the sub-condition head it belongs to.
    fn child_head(&self, id: NodeId) -> Result<u32, StrandError> {
        let slot = self.resolve(id)?;
        let head = self.head_of(slot);
        let is_child_head = self.node_at(head).is_some_and(Node::is_child);
        if is_child_head {
            Ok(head)
        } else {
            Err(StrandError::NodeNotFound(id))
        }
    }

    /// Check a handle belongs to this chain and has not been released.
    fn resolve(&self, id: NodeId) -> Result<u32, StrandError> {
        match self.node(id) {
            Some(node) if !node.is_released() => Ok(id.slot),
            _ => Err(StrandError::NodeNotFound(id)),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Mark every open node `END` and drop the fork cursor.
    ///
    /// Returns the number of nodes that changed; closing twice changes none.
    pub(crate) fn close(&mut self) -> usize {
        self.origin = None;
        let mut changed = 0;
        for node in &mut self.nodes {
            if node.status().can_advance() {
                node.set_status(Status::End);
                changed += 1;
            }
        }
        changed
    }

    /// Override a node's status, honoured only while it is above `END`.
    pub(crate) fn set_status(&mut self, id: NodeId, status: Status) -> Result<bool, StrandError> {
        let slot = self.resolve(id)?;
        let node = &mut self.nodes[slot as usize];
        if !node.status().can_advance() {
            return Ok(false);
        }
        node.set_status(status);
        Ok(true)
    }

    /// Bind parameter values to a node.
    ///
    /// On a count mismatch the previously bound values are kept.
    pub(crate) fn set_values(&mut self, id: NodeId, values: Vec<BoundValue>) -> Result<(), StrandError> {
        let slot = self.resolve(id)?;
        let chain_name = self.display_name();
        let node = &mut self.nodes[slot as usize];
        if node.status().is_closed() {
            return Err(StrandError::ChainClosed { kind: node.kind() });
        }
        let container = ValueContainer::bind(node.fields(), values).map_err(|mismatch| {
            StrandError::ArgumentCountMismatch {
                node: format!("{chain_name}/{slot}"),
                expected: mismatch.expected,
                actual: mismatch.actual,
            }
        })?;
        node.set_values(container);
        Ok(())
    }

    /// Release `from` and everything after it, children included.
    ///
    /// Returns the number of nodes released. Released nodes keep their
    /// `previous` link; releasing twice is a no-op.
    pub(crate) fn destroy_from(&mut self, from: NodeId) -> Result<usize, StrandError> {
        if self.node(from).is_none() {
            return Err(StrandError::NodeNotFound(from));
        }
        let mut pending = vec![from.slot];
        let mut released = 0;
        while let Some(slot) = pending.pop() {
            let Some(node) = self.nodes.get_mut(slot as usize) else {
                continue;
            };
            if node.is_released() {
                continue;
            }
            pending.extend(node.next());
            pending.extend(node.children().iter().copied());
            node.release();
            released += 1;
        }

        let tip_released = self.node_at(self.tip).is_some_and(Node::is_released);
        if tip_released {
            let mut slot = from.slot;
            while let Some(prev) = self.node_at(slot).and_then(Node::previous) {
                slot = prev;
                if self.node_at(slot).is_some_and(|n| !n.is_released()) {
                    break;
                }
            }
            self.tip = slot;
        }
        if released > 0 {
            tracing::debug!(chain = %self.token, released, "chain nodes released");
        }
        Ok(released)
    }

    fn display_name(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.token.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DomainFilter, DomainService};
    use crate::merge::MergeOperator;
    use crate::types::{Arg, Element, StepKind};

    fn chain() -> Chain {
        Chain::new(CallToken(1), Some("users".into()), 50)
    }

    fn filter() -> DomainFilter {
        DomainFilter::new(DomainService::new().with_entity("User"))
    }

    fn lit(s: &str) -> Element {
        Element::literal(s)
    }

    #[test]
    fn append_links_trunk() {
        let mut c = chain();
        let f = filter();
        let a = c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        let b = c.append(a, Step::new(StepKind::BY), &f).expect("append");
        assert_eq!(c.tip(), b);
        assert_eq!(c.node(a).and_then(Node::previous), Some(0));
        assert_eq!(c.node(a).and_then(Node::next), Some(b.slot));
        let kinds: Vec<_> = c.trunk().map(Node::kind).collect();
        assert_eq!(kinds, [StepKind::ROOT, StepKind::GET, StepKind::BY]);
        assert!(c.trunk().all(|n| n.status() == Status::Wait));
    }

    #[test]
    fn fill_drains_buffer() {
        let mut c = chain();
        let f = filter();
        c.literals_mut().push_literal("a.User.getName");
        c.literals_mut().push_literal("a.User.getAge");
        let a = c
            .append(c.root(), Step::new(StepKind::GET).arg(Arg::Placeholder), &f)
            .expect("append");
        let node = c.node(a).expect("node");
        assert_eq!(node.elements(), [lit("a.User.getName"), lit("a.User.getAge")]);
        assert_eq!(node.fields(), ["User.name", "User.age"]);
        assert!(c.literals().is_empty());
    }

    #[test]
    fn buffers_cleared_on_failure() {
        let mut c = chain();
        let f = filter();
        c.close();
        c.literals_mut().push_literal("a.User.getName");
        let err = c.append(c.root(), Step::new(StepKind::GET), &f);
        assert_eq!(
            err,
            Err(StrandError::ChainClosed {
                kind: StepKind::ROOT
            })
        );
        assert!(c.literals().is_empty());
    }

    #[test]
    fn foreign_handles_rejected() {
        let mut c = chain();
        let f = filter();
        let foreign = NodeId::new(CallToken(99), 0);
        assert_eq!(
            c.append(foreign, Step::new(StepKind::GET), &f),
            Err(StrandError::NodeNotFound(foreign))
        );
    }

    #[test]
    fn children_attach_to_their_head() {
        let mut c = chain();
        let f = filter();
        let get = c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        let by = c.child(Step::new(StepKind::BY), &f).expect("child");
        let inner = c.append(by, Step::new(StepKind::custom("eq")), &f).expect("append");
        assert_eq!(c.tip(), get);

        let put = c
            .append(get, Step::new(StepKind::PUT).arg(inner), &f)
            .expect("append");
        let node = c.node(put).expect("node");
        assert_eq!(node.children(), [by.slot]);
        assert!(node.elements().is_empty());
        assert_eq!(c.node(by).and_then(Node::parent), Some(put.slot));
    }

    #[test]
    fn trunk_nodes_are_not_children() {
        let mut c = chain();
        let f = filter();
        let get = c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        let err = c.append(get, Step::new(StepKind::PUT).arg(get), &f);
        assert_eq!(err, Err(StrandError::NodeNotFound(get)));
    }

    #[test]
    fn close_is_idempotent() {
        let mut c = chain();
        let f = filter();
        let a = c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        c.child(Step::new(StepKind::BY), &f).expect("child");
        assert_eq!(c.close(), 3);
        assert_eq!(c.close(), 0);
        assert!(c.is_closed());
        assert_eq!(c.node(a).map(Node::status), Some(Status::End));
    }

    #[test]
    fn status_guard() {
        let mut c = chain();
        let root = c.root();
        assert_eq!(c.set_status(root, Status::Locked), Ok(true));
        assert_eq!(c.set_status(root, Status::Wait), Ok(false));
        assert_eq!(c.node(root).map(Node::status), Some(Status::Locked));
    }

    #[test]
    fn values_follow_count_rule() {
        let mut c = chain();
        let f = filter();
        for token in ["a.User.getName", "a.User.getAge", "a.User.getCity"] {
            c.literals_mut().push_literal(token);
        }
        let by = c.append(c.root(), Step::new(StepKind::BY), &f).expect("append");
        c.set_values(by, vec!["ann".into(), 30i64.into(), "Oslo".into()])
            .expect("three values");

        let err = c.set_values(by, vec!["bob".into(), 40i64.into()]);
        assert_eq!(
            err,
            Err(StrandError::ArgumentCountMismatch {
                node: "users/1".into(),
                expected: 3,
                actual: 2
            })
        );
        let kept = c.node(by).and_then(Node::values).map(ValueContainer::len);
        assert_eq!(kept, Some(3));
    }

    #[test]
    fn destroy_cascades_forward() {
        let mut c = chain();
        let f = filter();
        let a = c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        let by = c.child(Step::new(StepKind::BY), &f).expect("child");
        let b = c.append(a, Step::new(StepKind::PUT).arg(by), &f).expect("append");
        let d = c.append(b, Step::new(StepKind::REMOVE), &f).expect("append");

        assert_eq!(c.destroy_from(b), Ok(3));
        assert_eq!(c.destroy_from(b), Ok(0));
        assert!(c.node(d).is_some_and(Node::is_released));
        assert_eq!(c.node(d).and_then(Node::previous), Some(b.slot));
        assert_eq!(c.tip(), a);
        assert_eq!(c.trunk().count(), 2);
    }

    #[test]
    fn released_chain_refuses_children() {
        let mut c = chain();
        let f = filter();
        c.append(c.root(), Step::new(StepKind::GET), &f).expect("append");
        c.literals_mut().push_literal("a.User.getAge");

        assert_eq!(c.destroy_from(c.root()), Ok(2));
        assert_eq!(
            c.child(Step::new(StepKind::BY), &f),
            Err(StrandError::NodeNotFound(c.root()))
        );
        assert_eq!(c.len(), 2);
        assert!(c.literals().is_empty());
    }

    #[test]
    fn fork_adopts_and_merges() {
        let f = filter();
        let mut origin = chain();
        origin.literals_mut().push_literal("a.User.getName");
        let g = origin
            .append(origin.root(), Step::new(StepKind::GET), &f)
            .expect("append");
        origin.literals_mut().push_literal("a.User.getAge");
        origin.append(g, Step::new(StepKind::BY), &f).expect("append");
        origin.close();

        let mut fork = Chain::new(CallToken(2), None, 50).fork_from(Arc::new(origin), ForkMode::Cached);
        assert!(fork.is_merging());
        let a = fork.append(fork.root(), Step::new(StepKind::GET), &f).expect("append");
        assert_eq!(fork.node(a).map(Node::elements), Some(&[lit("a.User.getName")][..]));

        fork.literals_mut().push_literal("a.User.getCity");
        let b = fork
            .append(a, Step::new(StepKind::BY).merge(MergeOperator::UnionOriginFirst), &f)
            .expect("append");
        assert_eq!(
            fork.node(b).map(Node::elements),
            Some(&[lit("a.User.getAge"), lit("a.User.getCity")][..])
        );
        assert!(!fork.is_merging());
        assert_eq!(fork.fork_mode(), Some(ForkMode::Cached));
    }
}
