// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-thread engine context: node/edge storage, the tracking
//! stack, and the batch scheduler, tied together behind a single
//! `thread_local!` `RefCell`.
//!
//! Every public entry point borrows the thread-local engine only for
//! short, non-reentrant critical sections via [`Engine::with_current`].
//! Whenever a user compute/effect closure must run, the relevant
//! node's boxed payload is taken out of the arena first (see
//! [`Graph::take_payload`](crate::graph::Graph::take_payload)) and the
//! borrow is dropped *before* the closure is invoked, so a closure that
//! reads another signal re-enters `with_current` without ever
//! double-borrowing the same `RefCell`.

use std::cell::RefCell;

use crate::arena::{EdgeId, NodeId};
use crate::error::EngineError;
use crate::graph::Graph;
use crate::limits::Limits;
use crate::node::{DerivedNode, ErasedDerived, ErasedSource, ErasedWatcher, NodePayload, SourceNode, WatcherNode};
use crate::scheduler::Scheduler;
use crate::trace::{ScopeKind, TraceHooks};
use crate::tracker::TrackerFrame;
use crate::tracking::TrackingStack;
use crate::version::{Status, Version};

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::new(Limits::default()));
}

/// A node's shape, as seen by the push propagator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Source,
    Derived,
    Watcher,
}

pub(crate) struct Engine {
    graph: Graph,
    tracking: TrackingStack,
    /// Kept in lockstep with `tracking`'s stack: pushing an observer
    /// always opens exactly one frame, popping closes exactly one.
    frames: Vec<TrackerFrame>,
    scheduler: Scheduler,
    limits: Limits,
    poisoned: Option<&'static str>,
    hooks: Option<Box<dyn TraceHooks>>,
}

impl Engine {
    fn new(limits: Limits) -> Self {
        Self {
            graph: Graph::new(limits.initial_node_capacity, limits.initial_edge_pool_capacity),
            tracking: TrackingStack::default(),
            frames: Vec::new(),
            scheduler: Scheduler::default(),
            limits,
            poisoned: None,
            hooks: None,
        }
    }

    pub(crate) fn set_hooks(&mut self, hooks: Box<dyn TraceHooks>) {
        self.hooks = Some(hooks);
    }

    pub(crate) fn clear_hooks(&mut self) {
        self.hooks = None;
    }

    pub(crate) fn scope_enter(&mut self, kind: ScopeKind, node: Option<NodeId>) {
        if let Some(hooks) = &mut self.hooks {
            hooks.scope_enter(kind, node);
        }
    }

    pub(crate) fn scope_exit(&mut self, kind: ScopeKind, node: Option<NodeId>) {
        if let Some(hooks) = &mut self.hooks {
            hooks.scope_exit(kind, node);
        }
    }

    /// Borrows the calling thread's engine for the duration of `f`.
    ///
    /// `f` must not itself try to re-borrow the engine (directly or by
    /// invoking a user closure) — split any such call into two
    /// `with_current` calls around the closure invocation instead.
    pub(crate) fn with_current<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
        ENGINE.with(|cell| f(&mut cell.borrow_mut()))
    }

    /// Replaces the calling thread's engine with a fresh one configured
    /// with `limits`. Intended to be called before any signals are
    /// created on this thread; existing nodes are dropped.
    pub(crate) fn configure(limits: Limits) {
        Self::with_current(|e| *e = Engine::new(limits));
    }

    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    pub(crate) fn check_poisoned(&self) -> Result<(), EngineError> {
        match self.poisoned {
            Some(msg) => Err(EngineError::InvariantViolation(msg)),
            None => Ok(()),
        }
    }

    pub(crate) fn poison(&mut self, msg: &'static str) -> EngineError {
        self.poisoned = Some(msg);
        EngineError::InvariantViolation(msg)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // --- allocation -----------------------------------------------------

    pub(crate) fn allocate_source<T: 'static>(
        &mut self,
        value: T,
        eq: Box<dyn Fn(&T, &T) -> bool>,
    ) -> NodeId {
        self.graph
            .allocate_node(NodePayload::Source(Box::new(SourceNode::new(value, eq))))
    }

    pub(crate) fn allocate_derived<T, F, Eq>(&mut self, compute: F, eq: Eq) -> NodeId
    where
        T: 'static,
        F: FnMut() -> T + 'static,
        Eq: Fn(&T, &T) -> bool + 'static,
    {
        self.graph.allocate_node(NodePayload::Derived(Box::new(
            DerivedNode::new(compute, eq),
        )))
    }

    pub(crate) fn allocate_watcher<F, C>(&mut self, body: F) -> NodeId
    where
        F: FnMut() -> Option<C> + 'static,
        C: FnOnce() + 'static,
    {
        self.graph
            .allocate_node(NodePayload::Watcher(Box::new(WatcherNode::new(body))))
    }

    // --- sources ----------------------------------------------------------

    fn require_source(&self, id: NodeId) -> Result<&dyn ErasedSource, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Source(s)) => Ok(s.as_ref()),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn source_version(&self, id: NodeId) -> Result<Version, EngineError> {
        Ok(self.require_source(id)?.version())
    }

    pub(crate) fn source_value<T: Clone + 'static>(&self, id: NodeId) -> Result<T, EngineError> {
        Ok(self
            .require_source(id)?
            .value_any()
            .downcast_ref::<T>()
            .expect("signal type mismatch")
            .clone())
    }

    /// Writes a new value; returns whether it changed (and thus bumped
    /// version) under the node's equality predicate.
    pub(crate) fn write_source<T: 'static>(
        &mut self,
        id: NodeId,
        value: T,
    ) -> Result<bool, EngineError> {
        match self.graph.slot_mut(id).map(|s| &mut s.payload) {
            Some(NodePayload::Source(s)) => Ok(s.write_any(Box::new(value))),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    // --- derived ------------------------------------------------------

    /// Classifies a node for the push propagator, which needs to
    /// dispatch differently over `Derived` (has its own downstream, gets
    /// a `Status`) versus `Watcher` consumers (leaves: scheduled, never
    /// propagated through).
    pub(crate) fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Source(_)) => Some(NodeKind::Source),
            Some(NodePayload::Derived(_)) => Some(NodeKind::Derived),
            Some(NodePayload::Watcher(_)) => Some(NodeKind::Watcher),
            Some(NodePayload::Taken) | None => None,
        }
    }

    pub(crate) fn node_is_source(&self, id: NodeId) -> Result<bool, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Source(_)) => Ok(true),
            Some(NodePayload::Derived(_)) => Ok(false),
            Some(NodePayload::Watcher(_)) => Err(EngineError::InvariantViolation(
                "watchers never appear as an edge producer",
            )),
            Some(NodePayload::Taken) => Err(EngineError::InvariantViolation(
                "node queried while its own evaluation was in flight",
            )),
            None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn derived_status(&self, id: NodeId) -> Result<Status, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Derived(d)) => Ok(d.status()),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn set_derived_status(&mut self, id: NodeId, status: Status) {
        if let Some(NodePayload::Derived(d)) = self.graph.slot_mut(id).map(|s| &mut s.payload) {
            d.set_status(status);
        }
    }

    pub(crate) fn derived_version(&self, id: NodeId) -> Result<Version, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Derived(d)) => Ok(d.version()),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn derived_value<T: Clone + 'static>(&self, id: NodeId) -> Result<T, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Derived(d)) => Ok(d
                .value_any()
                .downcast_ref::<T>()
                .expect("computed type mismatch")
                .clone()),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn take_derived(&mut self, id: NodeId) -> Result<Box<dyn ErasedDerived>, EngineError> {
        match self.graph.take_payload(id) {
            Some(NodePayload::Derived(d)) => Ok(d),
            Some(other) => {
                self.graph.restore_payload(id, other);
                Err(EngineError::InvariantViolation(
                    "expected a derived node, found a different payload",
                ))
            }
            None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn restore_derived(&mut self, id: NodeId, d: Box<dyn ErasedDerived>) {
        self.graph.restore_payload(id, NodePayload::Derived(d));
    }

    // --- watchers -------------------------------------------------------

    pub(crate) fn watcher_disposed(&self, id: NodeId) -> Result<bool, EngineError> {
        match self.graph.slot(id).map(|s| &s.payload) {
            Some(NodePayload::Watcher(w)) => Ok(w.disposed()),
            Some(_) | None => Err(EngineError::DisposedError { node: id }),
        }
    }

    /// Unlinks `id`'s dependency edges, drops it from the schedule queue,
    /// and reclaims its arena slot. Called after the watcher's payload
    /// (already marked disposed, cleanup already run) has been restored;
    /// does not touch the payload itself.
    pub(crate) fn finish_dispose(&mut self, id: NodeId) {
        for edge in self.graph.incoming_edges(id) {
            self.graph.unlink_edge(edge);
        }
        self.scheduler.remove(id);
        // A watcher never produces a value, so no other node's edge can
        // ever name it as a producer; once its own incoming edges are
        // unlinked above it always has zero live edges, so the slot can
        // be freed immediately instead of leaking for the engine's
        // lifetime.
        let _ = self.graph.free_node(id);
    }

    pub(crate) fn take_watcher(&mut self, id: NodeId) -> Result<Box<dyn ErasedWatcher>, EngineError> {
        match self.graph.take_payload(id) {
            Some(NodePayload::Watcher(w)) => Ok(w),
            Some(other) => {
                self.graph.restore_payload(id, other);
                Err(EngineError::InvariantViolation(
                    "expected a watcher node, found a different payload",
                ))
            }
            None => Err(EngineError::DisposedError { node: id }),
        }
    }

    pub(crate) fn restore_watcher(&mut self, id: NodeId, w: Box<dyn ErasedWatcher>) {
        self.graph.restore_payload(id, NodePayload::Watcher(w));
    }

    pub(crate) fn clear_watcher_scheduled(&mut self, id: NodeId) {
        if let Some(NodePayload::Watcher(w)) = self.graph.slot_mut(id).map(|s| &mut s.payload) {
            w.set_scheduled(false);
        }
    }

    pub(crate) fn schedule_watcher(&mut self, id: NodeId) {
        if let Some(NodePayload::Watcher(w)) = self.graph.slot_mut(id).map(|s| &mut s.payload)
            && !w.scheduled()
        {
            w.set_scheduled(true);
            self.scheduler.schedule(id);
        }
    }

    // --- edges ------------------------------------------------------------

    pub(crate) fn incoming_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.graph.incoming_edges(id)
    }

    pub(crate) fn outgoing_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.graph.outgoing_edges(id)
    }

    pub(crate) fn edge_producer(&self, edge: EdgeId) -> NodeId {
        self.graph.edge(edge).producer
    }

    pub(crate) fn edge_consumer(&self, edge: EdgeId) -> NodeId {
        self.graph.edge(edge).consumer
    }

    pub(crate) fn edge_observed_version(&self, edge: EdgeId) -> Version {
        self.graph.edge(edge).observed_version
    }

    // --- tracking ---------------------------------------------------------

    pub(crate) fn push_observer(&mut self, id: NodeId) -> Result<(), EngineError> {
        if self.tracking.contains(id) {
            return Err(EngineError::CycleError { node: id });
        }
        self.tracking.push(id);
        self.frames.push(TrackerFrame::begin(&self.graph, id));
        Ok(())
    }

    pub(crate) fn pop_and_finish_observer(&mut self) {
        self.tracking.pop();
        if let Some(frame) = self.frames.pop() {
            frame.finish(&mut self.graph);
        }
    }

    /// Whether `id` is currently on the observer stack — i.e. its own
    /// evaluation is in progress somewhere up the call stack. Checked
    /// ahead of a revalidation so a self-referencing `Derived` reports
    /// [`EngineError::CycleError`] instead of finding its payload
    /// `Taken` and misreporting `DisposedError`.
    pub(crate) fn is_being_observed(&self, id: NodeId) -> bool {
        self.tracking.contains(id)
    }

    pub(crate) fn track_current(&mut self, producer: NodeId, producer_version: Version) {
        if self.tracking.current().is_some()
            && let Some(frame) = self.frames.last_mut()
        {
            frame.track(&mut self.graph, producer, producer_version);
        }
    }

    pub(crate) fn enter_untracked(&mut self) {
        self.tracking.enter_untracked();
    }

    pub(crate) fn exit_untracked(&mut self) {
        self.tracking.exit_untracked();
    }

    // --- batch scheduler ----------------------------------------------

    pub(crate) fn start_batch(&mut self) {
        self.scheduler.start_batch();
    }

    pub(crate) fn end_batch_should_drain(&mut self) -> bool {
        self.scheduler.end_batch_should_drain()
    }

    pub(crate) fn begin_drain(&mut self) {
        self.scheduler.begin_drain();
    }

    pub(crate) fn end_drain(&mut self) {
        self.scheduler.end_drain();
    }

    pub(crate) fn pop_scheduled(&mut self) -> Option<NodeId> {
        self.scheduler.pop()
    }
}

/// Returns the number of live nodes on the calling thread's engine.
#[must_use]
pub fn node_count() -> usize {
    Engine::with_current(Engine::node_count)
}

/// Returns the number of live dependency edges on the calling thread's
/// engine.
#[must_use]
pub fn edge_count() -> usize {
    Engine::with_current(Engine::edge_count)
}
