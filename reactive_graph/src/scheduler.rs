// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch depth counter and FIFO effect queue.
//!
//! Writes and derived recomputations happen inside an implicit batch, so
//! a non-batched write behaves identically to `start_batch(); write;
//! end_batch()`. Nested batches flatten: only the outermost `end_batch`
//! drains.

use std::collections::VecDeque;

use crate::arena::NodeId;

#[derive(Default)]
pub(crate) struct Scheduler {
    depth: u32,
    queue: VecDeque<NodeId>,
    /// Set for the duration of `effect::drain_queue`, so a write inside an
    /// effect body's implicit batch does not recursively drain — it
    /// just enqueues onto the same queue the outer drain is still
    /// consuming.
    draining: bool,
}

impl Scheduler {
    pub(crate) fn start_batch(&mut self) {
        self.depth += 1;
    }

    /// Decrements the batch depth and reports whether the caller should
    /// now drain the queue (depth reached zero and nobody outer is
    /// already draining).
    pub(crate) fn end_batch_should_drain(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0 && !self.draining
    }

    /// Appends `watcher` to the queue. Callers are responsible for
    /// checking (and setting) the watcher's own `scheduled` flag so a
    /// watcher is never queued twice concurrently.
    pub(crate) fn schedule(&mut self, watcher: NodeId) {
        self.queue.push_back(watcher);
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.queue.pop_front()
    }

    pub(crate) fn remove(&mut self, watcher: NodeId) {
        self.queue.retain(|&w| w != watcher);
    }

    pub(crate) fn begin_drain(&mut self) {
        self.draining = true;
    }

    pub(crate) fn end_drain(&mut self) {
        self.draining = false;
    }
}
