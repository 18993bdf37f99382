// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dependency edges: producer → consumer links carrying the producer
//! version observed when the edge was established.

use crate::arena::{EdgeId, NodeId};
use crate::version::Version;

/// A directed dependency edge, threaded into both endpoints' adjacency
/// lists via the `prev_out`/`next_out` (producer side) and
/// `prev_in`/`next_in` (consumer side) intrusive links.
pub(crate) struct Edge {
    pub(crate) producer: NodeId,
    pub(crate) consumer: NodeId,
    pub(crate) observed_version: Version,
    pub(crate) prev_out: Option<EdgeId>,
    pub(crate) next_out: Option<EdgeId>,
    pub(crate) prev_in: Option<EdgeId>,
    pub(crate) next_in: Option<EdgeId>,
}

impl Edge {
    pub(crate) fn new(producer: NodeId, consumer: NodeId, observed_version: Version) -> Self {
        Self {
            producer,
            consumer,
            observed_version,
            prev_out: None,
            next_out: None,
            prev_in: None,
            next_in: None,
        }
    }
}
