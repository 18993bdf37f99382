// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional profiling hook seam.
//!
//! Unlike a sink passed explicitly into a single call (as in a VM's
//! `run(..., Some(&mut sink))`), the engine here is an implicit
//! thread-local, so hooks are installed once per thread via
//! [`set_hooks`] rather than threaded through every public call. The
//! engine holds at most one boxed hook set; installing a new one
//! replaces the previous.

use crate::arena::NodeId;
use crate::engine::Engine;

/// Which part of a propagation pass a scope brackets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// A `Derived` node's compute closure is running.
    Recompute,
    /// A watcher's body is running.
    EffectRun,
    /// A batch's scheduled watchers are draining.
    BatchDrain,
}

/// Hook trait for observing engine activity, e.g. to emit profiler
/// spans. Implementations must not call back into the public API
/// (`signal`/`computed`/`effect`/...): hook calls happen with the
/// engine borrow already held.
pub trait TraceHooks: 'static {
    /// Called when entering a scope, with the node it concerns (if
    /// any — a batch drain has none).
    fn scope_enter(&mut self, kind: ScopeKind, node: Option<NodeId>);
    /// Called when leaving the most recently entered matching scope.
    fn scope_exit(&mut self, kind: ScopeKind, node: Option<NodeId>);
}

/// Installs `hooks` as the calling thread's trace hooks, replacing any
/// previously installed set.
pub fn set_hooks(hooks: impl TraceHooks) {
    Engine::with_current(|e| e.set_hooks(Box::new(hooks)));
}

/// Removes the calling thread's trace hooks, if any.
pub fn clear_hooks() {
    Engine::with_current(Engine::clear_hooks);
}
