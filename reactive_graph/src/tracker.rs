// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic dependency tracking with per-evaluation reconciliation.
//!
//! A [`TrackerFrame`] is opened when a computed or watcher begins
//! evaluating, and closed when it finishes. Producers read during the
//! evaluation are reconciled against the observer's existing incoming
//! edges (the "candidate" set): edges touched this pass move to
//! "visited" and have their observed version refreshed or are newly
//! allocated; edges left in candidate belonged to a dependency this
//! evaluation did not touch and are dropped. This is what makes a
//! branch not taken this time stop propagating (conditional
//! dependencies), and it is mandatory, not an optimization: deferring it
//! is exactly the "stale edges accumulate" failure mode this design
//! exists to avoid.

use crate::arena::{EdgeId, NodeId};
use crate::graph::Graph;
use crate::version::Version;

pub(crate) struct TrackerFrame {
    observer: NodeId,
    candidate: Vec<EdgeId>,
    visited: Vec<EdgeId>,
}

impl TrackerFrame {
    /// Opens a frame for `observer`, snapshotting its current incoming
    /// edges as the candidate set.
    pub(crate) fn begin(graph: &Graph, observer: NodeId) -> Self {
        Self {
            observer,
            candidate: graph.incoming_edges(observer),
            visited: Vec::new(),
        }
    }

    /// Records a read of `producer` (at `producer_version`) during this
    /// evaluation.
    pub(crate) fn track(&mut self, graph: &mut Graph, producer: NodeId, producer_version: Version) {
        if self
            .visited
            .iter()
            .any(|&edge| graph.edge(edge).producer == producer)
        {
            // Already (re-)established earlier in this same evaluation
            // (the closure read the same producer twice); nothing to do.
            return;
        }

        if let Some(pos) = self
            .candidate
            .iter()
            .position(|&edge| graph.edge(edge).producer == producer)
        {
            let edge_id = self.candidate.remove(pos);
            graph.set_observed_version(edge_id, producer_version);
            self.visited.push(edge_id);
            return;
        }

        let edge_id = graph.link_edge(producer, self.observer, producer_version);
        self.visited.push(edge_id);
    }

    /// Closes the frame: any candidate edge never touched this pass is a
    /// dependency the observer no longer has, and is unlinked and
    /// recycled.
    pub(crate) fn finish(self, graph: &mut Graph) {
        for edge_id in self.candidate {
            graph.unlink_edge(edge_id);
        }
    }
}
