// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pull-based revalidation: brings a `Derived` node's cached value up to
//! date on read, recursing (or iterating) only as deep as its current
//! `Pending` chain actually requires.
//!
//! `Clean` nodes return immediately. `Dirty` nodes recompute
//! unconditionally. `Pending` nodes walk their incoming edges, comparing
//! each producer's version against the one observed when the edge was
//! last (re)established; the first mismatch stops the scan and forces a
//! recompute, while no mismatch demotes the node straight to `Clean`
//! without ever calling its compute closure. This is the short-circuit
//! that makes a `Pending` chain cheaper than blind re-evaluation.

use crate::arena::NodeId;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::limits::{Limits, RecursionStrategy};
use crate::node::ErasedDerived as _;
use crate::trace::ScopeKind;
use crate::version::{Status, Version};

/// Brings `id` up to date, recomputing it (and recursively, any
/// `Pending`/`Dirty` upstream `Derived` nodes whose freshness it
/// depends on) as needed.
pub(crate) fn validate(id: NodeId) -> Result<(), EngineError> {
    Engine::with_current(Engine::check_poisoned)?;
    validate_recursive(id, 0)
}

fn should_use_iterative(limits: &Limits, depth: u32) -> bool {
    match limits.recursion_strategy {
        RecursionStrategy::Iterative => true,
        RecursionStrategy::Recursive => false,
        RecursionStrategy::Auto => depth > limits.max_recursion_depth,
    }
}

fn validate_recursive(id: NodeId, depth: u32) -> Result<(), EngineError> {
    if Engine::with_current(|e| e.is_being_observed(id)) {
        return Err(EngineError::CycleError { node: id });
    }

    let limits = Engine::with_current(|e| e.limits().clone());
    if should_use_iterative(&limits, depth) {
        return validate_iterative(id);
    }

    let status = Engine::with_current(|e| e.derived_status(id))?;
    match status {
        Status::Clean => return Ok(()),
        Status::Dirty => return recompute(id),
        Status::Pending => {}
    }

    let edges = Engine::with_current(|e| e.incoming_edges(id));
    let mut found_change = false;
    for edge_id in edges {
        let (producer, observed_version) =
            Engine::with_current(|e| (e.edge_producer(edge_id), e.edge_observed_version(edge_id)));
        let current_version = current_producer_version(producer, depth)?;
        if current_version != observed_version {
            found_change = true;
            break;
        }
    }

    if found_change {
        Engine::with_current(|e| e.set_derived_status(id, Status::Dirty));
        recompute(id)
    } else {
        Engine::with_current(|e| e.set_derived_status(id, Status::Clean));
        Ok(())
    }
}

/// Iterative worklist variant of the same walk, used when the recursive
/// depth budget is exhausted (or the engine is configured to always use
/// it). Revalidates leaf-first by pushing unresolved upstream nodes onto
/// an explicit stack instead of the call stack.
fn validate_iterative(id: NodeId) -> Result<(), EngineError> {
    #[derive(Clone, Copy)]
    enum Frame {
        Enter(NodeId),
        Resolve(NodeId),
    }

    let mut work = vec![Frame::Enter(id)];
    // Per-node scan state: edges still to examine, and whether a change
    // was already found (so we can stop comparing once one is seen).
    let mut pending_edges: std::collections::HashMap<NodeId, (Vec<crate::arena::EdgeId>, bool)> =
        std::collections::HashMap::new();

    while let Some(frame) = work.pop() {
        match frame {
            Frame::Enter(node) => {
                if Engine::with_current(|e| e.is_being_observed(node)) {
                    return Err(EngineError::CycleError { node });
                }
                let status = Engine::with_current(|e| e.derived_status(node))?;
                match status {
                    Status::Clean => continue,
                    Status::Dirty => {
                        recompute(node)?;
                        continue;
                    }
                    Status::Pending => {}
                }
                let edges = Engine::with_current(|e| e.incoming_edges(node));
                pending_edges.insert(node, (edges, false));
                work.push(Frame::Resolve(node));
            }
            Frame::Resolve(node) => {
                let Some((mut edges, mut found_change)) = pending_edges.remove(&node) else {
                    continue;
                };
                let mut deferred = false;
                while let Some(&edge_id) = edges.last() {
                    let (producer, observed_version) = Engine::with_current(|e| {
                        (e.edge_producer(edge_id), e.edge_observed_version(edge_id))
                    });
                    let is_source = Engine::with_current(|e| e.node_is_source(producer))?;
                    if !is_source {
                        let producer_status = Engine::with_current(|e| e.derived_status(producer))?;
                        if !producer_status.is_clean() {
                            // Need producer resolved first: leave this
                            // edge on top so it is re-examined once the
                            // producer comes back `Clean`/`Dirty`-resolved.
                            work.push(Frame::Resolve(node));
                            work.push(Frame::Enter(producer));
                            deferred = true;
                            break;
                        }
                    }
                    let current_version = if is_source {
                        Engine::with_current(|e| e.source_version(producer))?
                    } else {
                        Engine::with_current(|e| e.derived_version(producer))?
                    };
                    edges.pop();
                    if current_version != observed_version {
                        found_change = true;
                        break;
                    }
                }
                if deferred {
                    pending_edges.insert(node, (edges, found_change));
                    continue;
                }

                if found_change {
                    Engine::with_current(|e| e.set_derived_status(node, Status::Dirty));
                    recompute(node)?;
                } else {
                    Engine::with_current(|e| e.set_derived_status(node, Status::Clean));
                }
            }
        }
    }
    Ok(())
}

fn current_producer_version(producer: NodeId, depth: u32) -> Result<Version, EngineError> {
    let is_source = Engine::with_current(|e| e.node_is_source(producer))?;
    if is_source {
        Engine::with_current(|e| e.source_version(producer))
    } else {
        validate_recursive(producer, depth + 1)?;
        Engine::with_current(|e| e.derived_version(producer))
    }
}

/// Re-invokes a `Derived` node's compute closure, tracking the
/// dependencies it touches this pass and propagating downstream if its
/// value changed.
///
/// The boxed closure is taken out of the arena and run with no engine
/// borrow held, so it may freely read other signals/computeds (which
/// re-enter [`Engine::with_current`]) without double-borrowing.
fn recompute(id: NodeId) -> Result<(), EngineError> {
    Engine::with_current(|e| e.push_observer(id))?;

    let mut payload = match Engine::with_current(|e| e.take_derived(id)) {
        Ok(p) => p,
        Err(err) => {
            Engine::with_current(Engine::pop_and_finish_observer);
            return Err(err);
        }
    };
    Engine::with_current(|e| e.scope_enter(ScopeKind::Recompute, Some(id)));
    let result = payload.recompute();
    Engine::with_current(|e| e.scope_exit(ScopeKind::Recompute, Some(id)));

    let outcome = Engine::with_current(|e| {
        e.restore_derived(id, payload);
        e.pop_and_finish_observer();
        match result {
            Ok(changed) => {
                e.set_derived_status(id, Status::Clean);
                Ok(changed)
            }
            Err(err) => {
                // A later read should retry rather than serve a stale
                // cached value.
                e.set_derived_status(id, Status::Dirty);
                Err(err)
            }
        }
    });

    let changed = outcome?;
    if changed {
        Engine::with_current(|e| crate::push::invalidate_from_recompute(e, id));
    }
    Ok(())
}
