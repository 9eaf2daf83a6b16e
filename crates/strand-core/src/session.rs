//! # Session Module
//!
//! Per-worker façade over the engine.
//!
//! A session owns one slot for its current chain. The slot holds either a
//! chain under construction, owned exclusively by the session, or a closed
//! chain shared as `Arc<Chain>`. Starting a new chain replaces the slot;
//! ending one closes it, publishes it to the shared cache once its root
//! reached `END`, and keeps the shared handle for execution.
//!
//! ## Literal capture
//!
//! Accessor interception feeds the current chain's literal buffer through
//! [`Session::capture_literal`]. The bracketed entry points
//! ([`Session::capture`], [`Session::capture_ternary`]) mark the tip with a
//! capture status while the callbacks run.
//!
//! ## Work batching
//!
//! Between [`Session::start_work`] and [`Session::end_work`] every ended
//! chain is also collected for bulk submission with [`Session::push`].

use crate::chain::Chain;
use crate::engine::Engine;
use crate::literal::{Capture, Recorder};
use crate::node::{ForkMode, Node};
use crate::primitives::{CACHED_FORK_TAG, FORK_TAG, NO_CACHED_FORK_TAG, NO_FORK_TAG};
use crate::registry::Registration;
use crate::repository::{Outcome, Repository};
use crate::result::PendingResult;
use crate::status::Status;
use crate::step::Step;
use crate::types::{Arg, NodeId, StepKind, StrandError};
use crate::values::BoundValue;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

/// The session's current chain.
#[derive(Debug)]
enum Current {
    /// Under construction; registered for `thread`.
    Building { chain: Chain, thread: ThreadId },
    /// Closed and shareable.
    Closed(Arc<Chain>),
}

/// A per-worker chain builder.
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    current: Option<Current>,
    work: Option<Vec<Arc<Chain>>>,
}

impl Session {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            engine,
            current: None,
            work: None,
        }
    }

    /// The engine this session belongs to.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The current chain, open or closed.
    #[must_use]
    pub fn current_chain(&self) -> Option<&Chain> {
        match self.current.as_ref()? {
            Current::Building { chain, .. } => Some(chain),
            Current::Closed(chain) => Some(chain),
        }
    }

    /// The current chain, if it has been closed.
    #[must_use]
    pub fn shared_chain(&self) -> Option<&Arc<Chain>> {
        match self.current.as_ref()? {
            Current::Closed(chain) => Some(chain),
            Current::Building { .. } => None,
        }
    }

    // =========================================================================
    // START / FORK / END
    // =========================================================================

    /// Start a new chain without an id.
    pub fn start(&mut self) -> Result<NodeId, StrandError> {
        self.begin(None, None)
    }

    /// Start a chain with a stable id.
    ///
    /// If a chain with this id is already published, that chain becomes
    /// current as is; appending to it fails with `ChainClosed`.
    pub fn start_with(&mut self, id: &str) -> Result<NodeId, StrandError> {
        validate_id(id)?;
        if let Some(cached) = self.engine.cache().get(id) {
            self.supersede();
            let root = cached.root();
            tracing::debug!(id, "reusing cached chain");
            self.current = Some(Current::Closed(cached));
            return Ok(root);
        }
        self.begin(Some(id.to_string()), None)
    }

    /// Start a fork of the published chain `id`.
    ///
    /// Forks are never published. Without a published origin this starts
    /// an ordinary chain under a derived id.
    pub fn fork(&mut self, id: &str) -> Result<NodeId, StrandError> {
        self.fork_with(id, ForkMode::Fork)
    }

    /// Start a fork of the published chain `id` that is published on end.
    pub fn fork_cached(&mut self, id: &str) -> Result<NodeId, StrandError> {
        self.fork_with(id, ForkMode::Cached)
    }

    fn fork_with(&mut self, id: &str, mode: ForkMode) -> Result<NodeId, StrandError> {
        validate_id(id)?;
        let origin = self.engine.cache().get(id);
        let tag = match (mode, origin.is_some()) {
            (ForkMode::Fork, true) => FORK_TAG,
            (ForkMode::Fork, false) => NO_FORK_TAG,
            (ForkMode::Cached, true) => CACHED_FORK_TAG,
            (ForkMode::Cached, false) => NO_CACHED_FORK_TAG,
        };
        let derived = format!("{id}{tag}{}", now_millis());
        self.begin(Some(derived), origin.map(|source| (source, mode)))
    }

    fn begin(
        &mut self,
        id: Option<String>,
        origin: Option<(Arc<Chain>, ForkMode)>,
    ) -> Result<NodeId, StrandError> {
        self.supersede();
        let token = self.engine.next_token();
        let mut chain = Chain::new(token, id, self.engine.config().literal_capacity);
        if let Some((source, mode)) = origin {
            chain = chain.fork_from(source, mode);
        }

        let thread = std::thread::current().id();
        let root = chain.root();
        let registry = &self.engine.inner.registry;
        let confirmed = registry.register(Registration {
            thread,
            token,
            root,
        })?;
        let waiting = chain.node(root).map(Node::status) == Some(Status::Wait);
        if confirmed != root || !waiting {
            registry.deregister(thread, token);
            tracing::warn!(chain = %token, "registry returned a different node");
            return Err(StrandError::RegistrationConflict { token });
        }

        tracing::debug!(chain = %token, id = ?chain.id(), fork = ?chain.fork_mode(), "chain started");
        self.current = Some(Current::Building { chain, thread });
        Ok(root)
    }

    /// Drop the current chain; an unfinished one is deregistered first.
    fn supersede(&mut self) {
        if let Some(Current::Building { chain, thread }) = self.current.take() {
            self.engine.inner.registry.deregister(thread, chain.token());
            tracing::debug!(chain = %chain.token(), "unfinished chain superseded");
        }
    }

    /// Close the current chain.
    ///
    /// A chain without an id receives a timestamp id. The chain is published
    /// under its id if its root reached `END` and it is not a plain fork, so
    /// locked or failed chains stay private. Ending twice is a no-op.
    pub fn end(&mut self) -> Result<Arc<Chain>, StrandError> {
        let current = self.current.take().ok_or(StrandError::NoActiveChain)?;
        let shared = match current {
            Current::Closed(chain) => chain,
            Current::Building { mut chain, thread } => {
                let closed = chain.close();
                self.engine.inner.registry.deregister(thread, chain.token());
                let reached_end =
                    chain.node(chain.root()).map(Node::status) == Some(Status::End);
                let publish = reached_end && chain.fork_mode() != Some(ForkMode::Fork);
                if chain.id().is_none() {
                    chain.set_id(now_millis().to_string());
                }
                tracing::debug!(chain = %chain.token(), nodes = closed, "chain closed");

                let chain = Arc::new(chain);
                if publish && let Some(id) = chain.id() {
                    self.engine.cache().publish(id, Arc::clone(&chain));
                    tracing::info!(id, "chain published");
                }
                chain
            }
        };

        if let Some(batch) = self.work.as_mut()
            && !batch.iter().any(|c| Arc::ptr_eq(c, &shared))
        {
            batch.push(Arc::clone(&shared));
        }
        self.current = Some(Current::Closed(Arc::clone(&shared)));
        Ok(shared)
    }

    // =========================================================================
    // BUILDING
    // =========================================================================

    fn building(&mut self) -> Result<&mut Chain, StrandError> {
        match self.current.as_mut() {
            Some(Current::Building { chain, .. }) => Ok(chain),
            Some(Current::Closed(chain)) => Err(StrandError::ChainClosed {
                kind: chain.node(chain.tip()).map_or(StepKind::ROOT, Node::kind),
            }),
            None => Err(StrandError::NoActiveChain),
        }
    }

    /// Append `step` after `prev`.
    pub fn append(&mut self, prev: NodeId, step: Step) -> Result<NodeId, StrandError> {
        if let Some(Current::Closed(chain)) = self.current.as_ref() {
            let node = chain.node(prev).ok_or(StrandError::NodeNotFound(prev))?;
            return Err(StrandError::ChainClosed { kind: node.kind() });
        }
        let filter = Arc::clone(&self.engine.inner.filter);
        self.building()?.append(prev, step, filter.as_ref())
    }

    /// Create a sub-condition head to pass to a later append.
    pub fn child(&mut self, step: Step) -> Result<NodeId, StrandError> {
        let filter = Arc::clone(&self.engine.inner.filter);
        self.building()?.child(step, filter.as_ref())
    }

    /// Create a `by` condition sub-node.
    pub fn condition<I, A>(&mut self, args: I) -> Result<NodeId, StrandError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.child(Step::new(StepKind::BY).args(args))
    }

    /// Create a `count` aggregate sub-node.
    pub fn count(&mut self, arg: impl Into<Arg>) -> Result<NodeId, StrandError> {
        self.child(Step::new(StepKind::COUNT).arg(arg))
    }

    /// Bind parameter values to a node of the current chain.
    pub fn set_values(&mut self, node: NodeId, values: Vec<BoundValue>) -> Result<(), StrandError> {
        self.building()?.set_values(node, values)
    }

    /// Override a node's status; ignored once the node is closed.
    pub fn set_status(&mut self, node: NodeId, status: Status) -> Result<bool, StrandError> {
        match self.current.as_mut() {
            Some(Current::Building { chain, .. }) => chain.set_status(node, status),
            Some(Current::Closed(chain)) => match chain.node(node) {
                Some(_) => Ok(false),
                None => Err(StrandError::NodeNotFound(node)),
            },
            None => Err(StrandError::NoActiveChain),
        }
    }

    /// Release `from` and the rest of its chain.
    ///
    /// A shared chain is only released if this session holds the last
    /// handle; otherwise the session just drops its handle.
    pub fn destroy(&mut self, from: NodeId) -> Result<usize, StrandError> {
        match self.current.as_mut() {
            Some(Current::Building { chain, .. }) => return chain.destroy_from(from),
            Some(Current::Closed(shared)) => {
                if let Some(chain) = Arc::get_mut(shared) {
                    return chain.destroy_from(from);
                }
            }
            None => return Err(StrandError::NoActiveChain),
        }
        self.current = None;
        Ok(0)
    }

    // =========================================================================
    // LITERAL CAPTURE
    // =========================================================================

    /// Discard stray captures. Returns the placeholder to pass on.
    pub fn discard_literals(&mut self) -> Result<Arg, StrandError> {
        self.building()?.literals_mut().clear_literals();
        Ok(Arg::Placeholder)
    }

    /// Run capture callbacks bracketed by `LAMBDA` → `METHOD`.
    ///
    /// A tip still at `WAIT` has its stray literals discarded first.
    pub fn capture(&mut self, captures: &[&dyn Capture]) -> Result<Arg, StrandError> {
        let chain = self.building()?;
        let tip = chain.tip();
        let status = open_status(chain, tip)?;
        if status == Status::Wait {
            chain.literals_mut().clear_literals();
        }
        chain.set_status(tip, Status::Lambda)?;
        {
            let mut recorder = Recorder::new(chain.literals_mut(), Status::Lambda);
            for capture in captures {
                capture.capture(&mut recorder);
            }
        }
        chain.set_status(tip, Status::Method)?;
        Ok(Arg::Placeholder)
    }

    /// Run a ternary capture bracketed by `LAMBDA_TE` → `TE`.
    ///
    /// The last captured literal moves to the ternary buffer and the one
    /// before it, produced by the ternary condition, is dropped.
    pub fn capture_ternary(&mut self, capture: &dyn Capture) -> Result<Arg, StrandError> {
        let chain = self.building()?;
        let tip = chain.tip();
        open_status(chain, tip)?;
        chain.set_status(tip, Status::LambdaTe)?;
        {
            let mut recorder = Recorder::new(chain.literals_mut(), Status::LambdaTe);
            capture.capture(&mut recorder);
        }
        chain.literals_mut().promote_ternary();
        chain.set_status(tip, Status::Te)?;
        Ok(Arg::Ternary)
    }

    /// Append an intercepted accessor token to the literal buffer.
    ///
    /// Returns `false` if the buffer was full and the token was dropped.
    pub fn capture_literal(&mut self, token: &str) -> Result<bool, StrandError> {
        Ok(self.building()?.literals_mut().push_literal(token))
    }

    /// Append a token to the ternary literal buffer.
    pub fn capture_ternary_literal(&mut self, token: &str) -> Result<bool, StrandError> {
        Ok(self.building()?.literals_mut().push_ternary(token))
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// End the current chain and run it as a query.
    pub fn execute(&mut self) -> Result<Outcome, StrandError> {
        let repository = self.engine.repository()?;
        let chain = self.end()?;
        repository.query(&chain)
    }

    /// End the current chain and commit it.
    pub fn commit(&mut self) -> Result<i32, StrandError> {
        let repository = self.engine.repository()?;
        let chain = self.end()?;
        repository.commit(&chain)
    }

    /// Run a published chain, as a query if its first step reads and as a
    /// commit otherwise.
    pub fn execute_cached(&self, id: &str) -> Result<Outcome, StrandError> {
        let repository = self.engine.repository()?;
        let chain = self
            .engine
            .cache()
            .get(id)
            .ok_or_else(|| StrandError::UnknownChain(id.to_string()))?;
        let reads = chain.first_step().is_some_and(|n| n.kind().is_query());
        if reads {
            repository.query(&chain)
        } else {
            repository.commit(&chain).map(Outcome::Affected)
        }
    }

    /// End the current chain and run the query in the background.
    ///
    /// The result is attached to the chain root once; later calls reuse it.
    pub fn execute_future(&mut self) -> Result<(), StrandError> {
        self.spawn_result(|repository, chain| repository.query(&chain))
    }

    /// End the current chain and commit it in the background.
    pub fn commit_future(&mut self) -> Result<(), StrandError> {
        self.spawn_result(|repository, chain| repository.commit(&chain).map(Outcome::Affected))
    }

    fn spawn_result<F>(&mut self, run: F) -> Result<(), StrandError>
    where
        F: FnOnce(Arc<dyn Repository>, Arc<Chain>) -> Result<Outcome, StrandError>
            + Send
            + 'static,
    {
        let repository = self.engine.repository()?;
        let chain = self.end()?;
        let root = chain
            .node(chain.root())
            .ok_or(StrandError::NodeNotFound(chain.root()))?;
        if root.result().is_some() {
            return Ok(());
        }
        let task_chain = Arc::clone(&chain);
        let pending = PendingResult::spawn(move || run(repository, task_chain))?;
        root.attach_result(|| pending);
        Ok(())
    }

    /// Wait for the attached result up to the configured timeout.
    pub async fn result(&self) -> Result<Outcome, StrandError> {
        self.result_with_timeout(self.engine.config().result_timeout())
            .await
    }

    /// Wait for the attached result up to `timeout`.
    pub async fn result_with_timeout(&self, timeout: Duration) -> Result<Outcome, StrandError> {
        let pending = self
            .shared_chain()
            .and_then(|chain| chain.node(chain.root()))
            .and_then(Node::result)
            .cloned()
            .ok_or(StrandError::NoResultAttached)?;
        pending.wait(timeout).await
    }

    // =========================================================================
    // WORK BATCH
    // =========================================================================

    /// Begin collecting ended chains.
    pub fn start_work(&mut self) {
        self.work = Some(Vec::with_capacity(self.engine.config().work_batch_capacity));
    }

    /// Stop collecting and release the batch. Returns the batch size.
    ///
    /// Chains still shared elsewhere (for example through the cache) are
    /// only dropped from the batch.
    pub fn end_work(&mut self) -> usize {
        let Some(batch) = self.work.take() else {
            return 0;
        };
        let size = batch.len();
        for mut chain in batch {
            if let Some(owned) = Arc::get_mut(&mut chain) {
                let root = owned.root();
                if let Err(e) = owned.destroy_from(root) {
                    tracing::warn!(error = %e, "failed to release batched chain");
                }
            }
        }
        tracing::info!(chains = size, "work batch released");
        size
    }

    /// Submit the current batch to the repository.
    pub fn push(&self) -> Result<i32, StrandError> {
        let repository = self.engine.repository()?;
        let batch = self.work_batch();
        tracing::info!(chains = batch.len(), "pushing work batch");
        repository.from_session(batch)
    }

    /// Chains collected so far.
    #[must_use]
    pub fn work_batch(&self) -> &[Arc<Chain>] {
        self.work.as_deref().unwrap_or_default()
    }

    /// Whether a work batch is being collected.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.work.is_some()
    }
}

fn open_status(chain: &Chain, tip: NodeId) -> Result<Status, StrandError> {
    let node = chain.node(tip).ok_or(StrandError::NodeNotFound(tip))?;
    if node.status().accepts_steps() {
        Ok(node.status())
    } else {
        Err(StrandError::ChainClosed { kind: node.kind() })
    }
}

/// Chain ids must be non-empty and free of whitespace.
fn validate_id(id: &str) -> Result<(), StrandError> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(StrandError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DomainService;
    use crate::types::Element;

    fn session() -> Session {
        Engine::builder()
            .domain(DomainService::new().with_entity("User"))
            .build()
            .session()
    }

    #[test]
    fn ids_are_validated() {
        let mut s = session();
        assert_eq!(s.start_with(""), Err(StrandError::InvalidId(String::new())));
        assert!(matches!(s.fork("a b"), Err(StrandError::InvalidId(_))));
        assert!(s.start_with("users").is_ok());
    }

    #[test]
    fn end_without_id_synthesizes_one() {
        let mut s = session();
        let root = s.start().expect("start");
        s.append(root, Step::new(StepKind::GET)).expect("append");
        let chain = s.end().expect("end");
        let id = chain.id().expect("synthesized id").to_string();
        assert!(id.parse::<i64>().is_ok());

        let again = s.start_with(&id).expect("start");
        assert_eq!(again, chain.root());
        assert!(s.shared_chain().is_some_and(|c| Arc::ptr_eq(c, &chain)));
    }

    #[test]
    fn end_twice_is_a_no_op() {
        let mut s = session();
        s.start_with("users").expect("start");
        let first = s.end().expect("end");
        let second = s.end().expect("end");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(s.engine().cache().len(), 1);
    }

    #[test]
    fn plain_forks_are_not_published() {
        let mut s = session();
        s.start_with("users").expect("start");
        s.end().expect("end");

        s.fork("users").expect("fork");
        let fork = s.end().expect("end");
        assert!(fork.id().is_some_and(|id| id.starts_with("users_F_")));
        assert_eq!(s.engine().cache().len(), 1);

        s.fork_cached("users").expect("fork");
        let cached = s.end().expect("end");
        assert!(cached.id().is_some_and(|id| id.starts_with("users_FM_")));
        assert_eq!(s.engine().cache().len(), 2);
    }

    #[test]
    fn fork_without_origin_is_ordinary() {
        let mut s = session();
        s.fork("missing").expect("fork");
        let chain = s.end().expect("end");
        assert_eq!(chain.fork_mode(), None);
        assert!(chain.id().is_some_and(|id| id.starts_with("missing_NF_")));
        assert!(s.engine().cache().contains(chain.id().unwrap_or_default()));
    }

    #[test]
    fn capture_brackets_status() {
        let mut s = session();
        let root = s.start().expect("start");
        s.capture_literal("stray.Thing.getX").expect("capture");

        let name = |r: &mut Recorder<'_>| r.record("a.User.getName");
        let arg = s.capture(&[&name]).expect("capture");
        assert_eq!(arg, Arg::Placeholder);
        let chain = s.current_chain().expect("chain");
        assert_eq!(chain.node(root).map(Node::status), Some(Status::Method));
        assert_eq!(chain.literals().literals(), ["a.User.getName"]);

        let get = s.append(root, Step::new(StepKind::GET).arg(arg)).expect("append");
        let chain = s.current_chain().expect("chain");
        assert_eq!(
            chain.node(get).map(Node::elements),
            Some(&[Element::literal("a.User.getName")][..])
        );
        assert_eq!(chain.node(root).map(Node::status), Some(Status::Wait));
    }

    #[test]
    fn ternary_capture() {
        let mut s = session();
        let root = s.start().expect("start");
        let pick = |r: &mut Recorder<'_>| {
            r.record("a.User.getActive");
            r.record("a.User.getName");
        };
        let arg = s.capture_ternary(&pick).expect("capture");
        assert_eq!(arg, Arg::Ternary);
        let chain = s.current_chain().expect("chain");
        assert_eq!(chain.node(root).map(Node::status), Some(Status::Te));
        assert!(chain.literals().literals().is_empty());
        assert_eq!(chain.literals().ternary(), ["a.User.getName"]);
    }

    #[test]
    fn locked_chains_refuse_steps() {
        let mut s = session();
        let root = s.start().expect("start");
        let get = s.append(root, Step::new(StepKind::GET)).expect("append");
        assert_eq!(s.set_status(get, Status::Locked), Ok(true));
        assert_eq!(
            s.append(get, Step::new(StepKind::BY)),
            Err(StrandError::ChainClosed {
                kind: StepKind::GET
            })
        );
        assert_eq!(s.capture_literal("a.User.getName"), Ok(true));
    }

    #[test]
    fn no_chain_errors() {
        let mut s = session();
        assert_eq!(s.end().map(|_| ()), Err(StrandError::NoActiveChain));
        assert_eq!(s.discard_literals(), Err(StrandError::NoActiveChain));
        assert_eq!(s.execute_cached("x").map(|_| ()), Err(StrandError::NoRepository));
    }

    #[test]
    fn superseded_chain_is_dropped() {
        let mut s = session();
        let first = s.start_with("first").expect("start");
        s.start_with("second").expect("start");
        assert!(s.current_chain().is_some_and(|c| c.id() == Some("second")));
        assert!(!s.engine().cache().contains("first"));
        assert!(s.current_chain().and_then(|c| c.node(first)).is_none());
    }

    #[test]
    fn work_batch_collects_ended_chains() {
        let mut s = session();
        s.start_work();
        assert!(s.is_working());
        for _ in 0..3 {
            let root = s.start().expect("start");
            s.append(root, Step::new(StepKind::ADD)).expect("append");
            s.end().expect("end");
        }
        s.end().expect("end again");
        assert_eq!(s.work_batch().len(), 3);
        assert_eq!(s.end_work(), 3);
        assert!(!s.is_working());
        assert!(s.work_batch().is_empty());
    }
}
