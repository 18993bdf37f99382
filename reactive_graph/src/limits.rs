// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration knobs for an [`Engine`](crate::engine::Engine).

/// How pull-validation walks a deep dependency chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecursionStrategy {
    /// Always use the plain recursive walk.
    Recursive,
    /// Always use the iterative worklist walk.
    Iterative,
    /// Use the recursive walk up to [`Limits::max_recursion_depth`],
    /// falling back to the iterative walk beyond it.
    Auto,
}

/// Tunable bounds and pre-allocation hints for an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Depth at which `Auto` switches from the recursive to the
    /// iterative pull-validation walk.
    pub max_recursion_depth: u32,
    /// Initial node-arena capacity hint.
    pub initial_node_capacity: usize,
    /// Initial edge-pool capacity hint.
    pub initial_edge_pool_capacity: usize,
    /// Which pull-validation walk to use.
    pub recursion_strategy: RecursionStrategy,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_recursion_depth: 256,
            initial_node_capacity: 64,
            initial_edge_pool_capacity: 128,
            recursion_strategy: RecursionStrategy::Auto,
        }
    }
}
