// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Push-based invalidation: eagerly walks downstream from a changed
//! `Source` or `Derived` node, downgrading direct consumers to `Dirty`
//! and transitive consumers to `Pending`, and scheduling any `Watcher`
//! it reaches along the way.
//!
//! A consumer already found non-`Clean` is never re-walked: its own
//! downstream was already downgraded the first time it was reached, so
//! continuing would only repeat work without changing anything (this is
//! also what keeps a diamond-shaped graph from walking the shared
//! bottom node's downstream twice per write).

use crate::engine::{Engine, NodeKind};
use crate::arena::NodeId;
use crate::version::Status;

/// Called right after a `Source` write that actually changed its value.
pub(crate) fn invalidate_from_write(e: &mut Engine, source: NodeId) {
    propagate(e, source);
}

/// Called right after a `Derived` recompute that actually changed its
/// value.
pub(crate) fn invalidate_from_recompute(e: &mut Engine, derived: NodeId) {
    propagate(e, derived);
}

fn propagate(e: &mut Engine, origin: NodeId) {
    // `(consumer, direct)`: `direct` is true only for nodes reached
    // straight from `origin`, which get `Dirty`; anything reached
    // through another `Derived` gets `Pending`.
    let mut worklist: Vec<(NodeId, bool)> = e
        .outgoing_edges(origin)
        .into_iter()
        .map(|edge| (e.edge_consumer(edge), true))
        .collect();

    while let Some((consumer, direct)) = worklist.pop() {
        match e.node_kind(consumer) {
            Some(NodeKind::Watcher) => {
                if !e.watcher_disposed(consumer).unwrap_or(true) {
                    e.schedule_watcher(consumer);
                }
            }
            Some(NodeKind::Derived) => {
                let status = e.derived_status(consumer).expect("classified as derived above");
                if status == Status::Dirty {
                    // Already fully downgraded (and its downstream
                    // already walked) on an earlier branch of this same
                    // propagation.
                    continue;
                }
                let already_pending = status == Status::Pending;
                let new_status = if direct { Status::Dirty } else { Status::Pending };
                e.set_derived_status(consumer, new_status);
                if already_pending && !direct {
                    // Re-marking Pending as Pending changes nothing
                    // downstream of it; avoid re-walking.
                    continue;
                }
                for edge in e.outgoing_edges(consumer) {
                    worklist.push((e.edge_consumer(edge), false));
                }
            }
            Some(NodeKind::Source) => {
                debug_assert!(false, "a source can never be a dependency edge's consumer");
            }
            None => {
                // Disposed since the edge was walked; nothing to do.
            }
        }
    }
}
