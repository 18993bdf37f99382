// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running watchers: the batch drain loop, a single watcher's run, and
//! disposal.

use crate::arena::NodeId;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::node::ErasedWatcher as _;
use crate::report::{BatchReport, EffectOutcome, EffectRun};
use crate::trace::ScopeKind;

/// Runs every watcher currently queued, including ones newly scheduled
/// by effects that ran earlier in the same drain (a write inside an
/// effect body enqueues onto this same queue rather than recursing into
/// a nested drain, via [`crate::scheduler::Scheduler`]'s `draining`
/// guard). Returns a record of every watcher run, for callers that want
/// it (see [`crate::batch_with_report`]); a `UserClosureError` from one
/// watcher does not stop the others from running.
pub(crate) fn drain_queue() -> BatchReport {
    let mut report = BatchReport::default();
    Engine::with_current(Engine::begin_drain);
    Engine::with_current(|e| e.scope_enter(ScopeKind::BatchDrain, None));
    loop {
        let next = Engine::with_current(Engine::pop_scheduled);
        let Some(watcher) = next else { break };
        let outcome = match run_watcher(watcher) {
            Ok(()) => EffectOutcome::Ran,
            Err(err) => EffectOutcome::Errored(err),
        };
        report.runs.push(EffectRun { watcher, outcome });
    }
    Engine::with_current(|e| e.scope_exit(ScopeKind::BatchDrain, None));
    Engine::with_current(Engine::end_drain);
    report
}

/// Runs `watcher`'s body under observer tracking, first running any
/// cleanup captured from its previous run. Used both for an effect's
/// initial eager run and for every subsequent queued run.
pub(crate) fn run_watcher(watcher: NodeId) -> Result<(), EngineError> {
    let disposed = Engine::with_current(|e| e.watcher_disposed(watcher));
    if disposed.unwrap_or(true) {
        return Ok(());
    }

    // The watcher was scheduled as soon as some upstream `Derived` went
    // `Dirty`, before that node got a chance to recompute and find it
    // actually produced the same value (push cannot know this in
    // advance). Re-validate the watcher's own last-known dependencies
    // here, the same way a `Pending` `Derived` would, so a value that
    // round-trips back to equal never reaches the watcher's body.
    if !should_run(watcher)? {
        return Ok(());
    }

    // Cleanup is itself a user closure (it may read/write signals), so
    // it must run with no engine borrow held, same as the body below.
    if let Ok(mut w) = Engine::with_current(|e| e.take_watcher(watcher)) {
        w.run_cleanup();
        Engine::with_current(|e| e.restore_watcher(watcher, w));
    }

    Engine::with_current(|e| e.push_observer(watcher))?;

    let mut payload = match Engine::with_current(|e| e.take_watcher(watcher)) {
        Ok(p) => p,
        Err(err) => {
            Engine::with_current(Engine::pop_and_finish_observer);
            return Err(err);
        }
    };
    Engine::with_current(|e| e.scope_enter(ScopeKind::EffectRun, Some(watcher)));
    let result = payload.run_body();
    Engine::with_current(|e| e.scope_exit(ScopeKind::EffectRun, Some(watcher)));

    Engine::with_current(|e| {
        e.restore_watcher(watcher, payload);
        e.pop_and_finish_observer();
        // Clear the scheduled flag now that the run has actually
        // happened, so a write during this very run can re-queue it.
        e.clear_watcher_scheduled(watcher);
    });

    result
}

/// Mirrors a `Pending` `Derived`'s scan: walks `watcher`'s dependency
/// edges from its last run and compares each producer's current version
/// against the one observed then. Push schedules a watcher as soon as
/// *any* upstream might have changed, before the upstream `Derived`
/// chain has actually recomputed, so this is what turns that optimistic
/// schedule into an actual run only when something really changed.
/// A watcher with no tracked edges yet (its very first run) always runs.
fn should_run(watcher: NodeId) -> Result<bool, EngineError> {
    let edges = Engine::with_current(|e| e.incoming_edges(watcher));
    if edges.is_empty() {
        return Ok(true);
    }
    for edge_id in edges {
        let (producer, observed_version) =
            Engine::with_current(|e| (e.edge_producer(edge_id), e.edge_observed_version(edge_id)));
        let is_source = Engine::with_current(|e| e.node_is_source(producer))?;
        let current_version = if is_source {
            Engine::with_current(|e| e.source_version(producer))?
        } else {
            crate::pull::validate(producer)?;
            Engine::with_current(|e| e.derived_version(producer))?
        };
        if current_version != observed_version {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Disposes `watcher`: runs its final cleanup, unlinks its dependency
/// edges, and marks it so any already-queued run becomes a no-op.
/// Idempotent.
pub(crate) fn dispose(watcher: NodeId) {
    let Ok(mut w) = Engine::with_current(|e| e.take_watcher(watcher)) else {
        return;
    };
    // Cleanup is a user closure; run it with no engine borrow held, same
    // as every other watcher-body invocation.
    if !w.disposed() {
        w.set_disposed(true);
        w.run_cleanup();
    }
    Engine::with_current(|e| {
        e.restore_watcher(watcher, w);
        e.finish_dispose(watcher);
    });
}
