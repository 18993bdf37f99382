// Copyright 2026 the Reactive Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node arena, edge pool, and the intrusive adjacency-list splicing
//! between them.
//!
//! This module owns the only `unsafe`-free but borrow-ordering-sensitive
//! part of the engine: linking and unlinking edges touches both a node
//! slot and an edge slot at once, so every operation here takes `&mut
//! Graph` rather than split borrows of its two arenas.

use crate::arena::{EdgeId, GenArena, NodeId};
use crate::edge::Edge;
use crate::node::{NodePayload, NodeSlot};
use crate::version::Version;

/// Node storage plus the pooled, intrusively-linked edge list.
pub(crate) struct Graph {
    nodes: GenArena<NodeSlot>,
    edges: GenArena<Edge>,
}

impl Graph {
    pub(crate) fn new(initial_node_capacity: usize, initial_edge_capacity: usize) -> Self {
        Self {
            nodes: GenArena::with_capacity(initial_node_capacity),
            edges: GenArena::with_capacity(initial_edge_capacity),
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn allocate_node(&mut self, payload: NodePayload) -> NodeId {
        let (index, generation) = self.nodes.insert(NodeSlot::new(payload));
        NodeId { index, generation }
    }

    pub(crate) fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.index, id.generation)
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(id.index, id.generation)
    }

    pub(crate) fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(id.index, id.generation)
    }

    /// Frees `id`. Only legal when the node has no live edges, matching
    /// the arena contract: callers must unlink (or never have linked)
    /// before disposing.
    pub(crate) fn free_node(&mut self, id: NodeId) -> Result<(), &'static str> {
        match self.slot(id) {
            None => Err("freed a node id that does not resolve to a live node"),
            Some(slot) if slot.has_live_edges() => {
                Err("freed a node that still has live dependency edges")
            }
            Some(_) => {
                self.nodes.remove(id.index, id.generation);
                Ok(())
            }
        }
    }

    /// Takes a node's payload out, leaving `NodePayload::Taken` behind.
    /// The node's adjacency list heads remain in place and readable;
    /// only the boxed closure/value is removed, so it can run without
    /// the caller holding any arena borrow across it.
    pub(crate) fn take_payload(&mut self, id: NodeId) -> Option<NodePayload> {
        let slot = self.slot_mut(id)?;
        Some(std::mem::replace(&mut slot.payload, NodePayload::Taken))
    }

    pub(crate) fn restore_payload(&mut self, id: NodeId, payload: NodePayload) {
        if let Some(slot) = self.slot_mut(id) {
            slot.payload = payload;
        }
    }

    /// Links a new edge `producer -> consumer`, inserting it at the head
    /// of both adjacency lists. O(1), no allocation beyond the pooled
    /// edge slot itself.
    pub(crate) fn link_edge(
        &mut self,
        producer: NodeId,
        consumer: NodeId,
        observed_version: Version,
    ) -> EdgeId {
        let old_out_head = self.slot(producer).and_then(|s| s.outgoing_head);
        let old_in_head = self.slot(consumer).and_then(|s| s.incoming_head);

        let mut edge = Edge::new(producer, consumer, observed_version);
        edge.next_out = old_out_head;
        edge.next_in = old_in_head;
        let (index, generation) = self.edges.insert(edge);
        let edge_id = EdgeId { index, generation };

        if let Some(old_head) = old_out_head {
            self.edge_mut(old_head).prev_out = Some(edge_id);
        }
        if let Some(slot) = self.slot_mut(producer) {
            slot.outgoing_head = Some(edge_id);
        }

        if let Some(old_head) = old_in_head {
            self.edge_mut(old_head).prev_in = Some(edge_id);
        }
        if let Some(slot) = self.slot_mut(consumer) {
            slot.incoming_head = Some(edge_id);
        }

        edge_id
    }

    /// Unlinks and frees `edge_id`, returning it to the pooled free list.
    pub(crate) fn unlink_edge(&mut self, edge_id: EdgeId) {
        let Some(edge) = self.edges.get(edge_id.index, edge_id.generation) else {
            return;
        };
        let (producer, consumer, prev_out, next_out, prev_in, next_in) = (
            edge.producer,
            edge.consumer,
            edge.prev_out,
            edge.next_out,
            edge.prev_in,
            edge.next_in,
        );

        match prev_out {
            Some(prev) => self.edge_mut(prev).next_out = next_out,
            None => {
                if let Some(slot) = self.slot_mut(producer) {
                    slot.outgoing_head = next_out;
                }
            }
        }
        if let Some(next) = next_out {
            self.edge_mut(next).prev_out = prev_out;
        }

        match prev_in {
            Some(prev) => self.edge_mut(prev).next_in = next_in,
            None => {
                if let Some(slot) = self.slot_mut(consumer) {
                    slot.incoming_head = next_in;
                }
            }
        }
        if let Some(next) = next_in {
            self.edge_mut(next).prev_in = prev_in;
        }

        self.edges.remove(edge_id.index, edge_id.generation);
    }

    fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        self.edges
            .get_mut(id.index, id.generation)
            .expect("edge id referenced by an adjacency link must be live")
    }

    pub(crate) fn edge(&self, id: EdgeId) -> &Edge {
        self.edges
            .get(id.index, id.generation)
            .expect("edge id referenced by an adjacency link must be live")
    }

    pub(crate) fn set_observed_version(&mut self, id: EdgeId, version: Version) {
        self.edge_mut(id).observed_version = version;
    }

    /// Collects `consumer`'s incoming edges, in adjacency-list
    /// (most-recently-linked-first) order, without allocating beyond the
    /// returned `Vec` itself.
    pub(crate) fn incoming_edges(&self, consumer: NodeId) -> Vec<EdgeId> {
        let mut out = Vec::new();
        let mut cursor = self.slot(consumer).and_then(|s| s.incoming_head);
        while let Some(edge_id) = cursor {
            out.push(edge_id);
            cursor = self.edge(edge_id).next_in;
        }
        out
    }

    /// Collects `producer`'s outgoing edges the same way.
    pub(crate) fn outgoing_edges(&self, producer: NodeId) -> Vec<EdgeId> {
        let mut out = Vec::new();
        let mut cursor = self.slot(producer).and_then(|s| s.outgoing_head);
        while let Some(edge_id) = cursor {
            out.push(edge_id);
            cursor = self.edge(edge_id).next_out;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Graph;
    use crate::node::NodePayload;
    use crate::version::Version;

    fn dummy_node(graph: &mut Graph) -> crate::arena::NodeId {
        graph.allocate_node(NodePayload::Taken)
    }

    #[test]
    fn linking_an_edge_updates_both_adjacency_list_heads() {
        let mut graph = Graph::new(0, 0);
        let producer = dummy_node(&mut graph);
        let consumer = dummy_node(&mut graph);

        let edge = graph.link_edge(producer, consumer, Version::ZERO);

        assert_eq!(graph.outgoing_edges(producer), vec![edge]);
        assert_eq!(graph.incoming_edges(consumer), vec![edge]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn multiple_edges_link_at_the_head_in_most_recent_first_order() {
        let mut graph = Graph::new(0, 0);
        let producer = dummy_node(&mut graph);
        let c1 = dummy_node(&mut graph);
        let c2 = dummy_node(&mut graph);

        let e1 = graph.link_edge(producer, c1, Version::ZERO);
        let e2 = graph.link_edge(producer, c2, Version::ZERO);

        // Newest edge is spliced in at the head of the producer's list.
        assert_eq!(graph.outgoing_edges(producer), vec![e2, e1]);
        assert_eq!(graph.incoming_edges(c1), vec![e1]);
        assert_eq!(graph.incoming_edges(c2), vec![e2]);
    }

    #[test]
    fn unlinking_a_middle_edge_reconciles_its_neighbors() {
        let mut graph = Graph::new(0, 0);
        let p1 = dummy_node(&mut graph);
        let p2 = dummy_node(&mut graph);
        let p3 = dummy_node(&mut graph);
        let consumer = dummy_node(&mut graph);

        // Three producers feeding one consumer: consumer's incoming list
        // is [e3, e2, e1] (most-recently-linked first).
        let e1 = graph.link_edge(p1, consumer, Version::ZERO);
        let e2 = graph.link_edge(p2, consumer, Version::ZERO);
        let e3 = graph.link_edge(p3, consumer, Version::ZERO);
        assert_eq!(graph.incoming_edges(consumer), vec![e3, e2, e1]);

        graph.unlink_edge(e2);

        assert_eq!(
            graph.incoming_edges(consumer),
            vec![e3, e1],
            "unlinking a middle edge must splice its neighbors together"
        );
        assert_eq!(graph.outgoing_edges(p2), Vec::new());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn unlinking_the_head_edge_moves_the_list_head() {
        let mut graph = Graph::new(0, 0);
        let p1 = dummy_node(&mut graph);
        let p2 = dummy_node(&mut graph);
        let consumer = dummy_node(&mut graph);

        let e1 = graph.link_edge(p1, consumer, Version::ZERO);
        let e2 = graph.link_edge(p2, consumer, Version::ZERO);
        assert_eq!(graph.incoming_edges(consumer), vec![e2, e1]);

        graph.unlink_edge(e2);

        assert_eq!(graph.incoming_edges(consumer), vec![e1]);
    }

    #[test]
    fn free_node_rejects_a_node_with_live_edges_then_succeeds_once_unlinked() {
        let mut graph = Graph::new(0, 0);
        let producer = dummy_node(&mut graph);
        let consumer = dummy_node(&mut graph);
        let edge = graph.link_edge(producer, consumer, Version::ZERO);

        assert!(graph.free_node(producer).is_err());
        assert!(graph.free_node(consumer).is_err());

        graph.unlink_edge(edge);
        assert!(graph.free_node(producer).is_ok());
        assert!(graph.free_node(consumer).is_ok());
        assert!(!graph.contains_node(producer));
    }
}
