// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `reactive_graph` (currently Tracy).
//!
//! This crate is `std`-only and keeps `reactive_graph` itself free of
//! profiling dependencies. Install it once per thread with
//! [`install`]; every `Derived` recompute, watcher run, and batch drain
//! on that thread then emits a matching Tracy span.
//!
//! ## Example
//! ```no_run
//! reactive_graph_profiling::install();
//! let a = reactive_graph::signal(1);
//! assert_eq!(a.get(), 1);
//! ```

use reactive_graph::trace::{ScopeKind, TraceHooks};

type BackendGuard = tracy_client::Span;

/// Installs a Tracy-backed [`TraceHooks`] on the calling thread,
/// replacing any previously installed hooks.
pub fn install() {
    reactive_graph::trace::set_hooks(TracyHooks::default());
}

/// Removes the calling thread's trace hooks.
pub fn uninstall() {
    reactive_graph::trace::clear_hooks();
}

#[derive(Default)]
struct TracyHooks {
    stack: Vec<Option<BackendGuard>>,
}

impl TracyHooks {
    fn start_scope(&self, kind: ScopeKind, label: &str) -> Option<BackendGuard> {
        let function_name = match kind {
            ScopeKind::Recompute => "reactive_graph.recompute",
            ScopeKind::EffectRun => "reactive_graph.effect_run",
            ScopeKind::BatchDrain => "reactive_graph.batch_drain",
        };
        let client = tracy_client::Client::running()?;
        Some(client.span_alloc(Some(label), function_name, "reactive_graph", 0, 0))
    }
}

impl TraceHooks for TracyHooks {
    fn scope_enter(&mut self, kind: ScopeKind, node: Option<reactive_graph::NodeId>) {
        let label = match node {
            Some(id) => format!("{id:?}"),
            None => "drain".to_string(),
        };
        self.stack.push(self.start_scope(kind, &label));
    }

    fn scope_exit(&mut self, _kind: ScopeKind, _node: Option<reactive_graph::NodeId>) {
        // Span guards close on drop; popping just keeps the stack
        // balanced with scope_enter.
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_scope_without_tracy_client_does_not_panic() {
        let hooks = TracyHooks::default();
        let _guard = hooks.start_scope(ScopeKind::Recompute, "test");
    }
}
