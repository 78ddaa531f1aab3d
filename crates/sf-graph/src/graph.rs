//! Core graph data structures.

use sf_core::{NodeId, StreamId};

/// A unit operation in the flow graph.
///
/// Port order is the order connections were declared: `ins[i]` is row `i` of
/// the unit's input matrix, `outs[j]` is its `j`-th branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: NodeId,
    pub name: String,
    pub ins: Vec<StreamId>,
    pub outs: Vec<StreamId>,
}

/// A material stream: written by at most one unit, read by any number.
///
/// A stream without a producer is a feed; one without consumers is a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    pub producer: Option<NodeId>,
    pub consumers: Vec<NodeId>,
}

impl Stream {
    pub fn is_feed(&self) -> bool {
        self.producer.is_none()
    }

    pub fn is_product(&self) -> bool {
        self.consumers.is_empty()
    }
}

/// Validated, immutable process flow graph. May contain recycle loops.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    pub(crate) units: Vec<Unit>,
    pub(crate) streams: Vec<Stream>,
}

impl FlowGraph {
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Get a unit by ID (returns None if ID out of bounds).
    pub fn unit(&self, id: NodeId) -> Option<&Unit> {
        self.units.get(id.idx())
    }

    /// Get a stream by ID (returns None if ID out of bounds).
    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id.idx())
    }

    /// Input streams of a unit, in port order.
    pub fn unit_ins(&self, id: NodeId) -> &[StreamId] {
        self.unit(id).map_or(&[], |u| u.ins.as_slice())
    }

    /// Output streams of a unit, in port order.
    pub fn unit_outs(&self, id: NodeId) -> &[StreamId] {
        self.unit(id).map_or(&[], |u| u.outs.as_slice())
    }

    pub fn find_unit(&self, name: &str) -> Option<NodeId> {
        self.units.iter().find(|u| u.name == name).map(|u| u.id)
    }

    pub fn find_stream(&self, name: &str) -> Option<StreamId> {
        self.streams.iter().find(|s| s.name == name).map(|s| s.id)
    }

    /// Streams entering the system (no producer).
    pub fn feeds(&self) -> Vec<StreamId> {
        self.streams
            .iter()
            .filter(|s| s.is_feed())
            .map(|s| s.id)
            .collect()
    }

    /// Streams leaving the system (no consumer).
    pub fn products(&self) -> Vec<StreamId> {
        self.streams
            .iter()
            .filter(|s| s.is_product())
            .map(|s| s.id)
            .collect()
    }

    /// Units reading any output of `id`.
    pub fn downstream(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.unit_outs(id)
            .iter()
            .filter_map(|s| self.stream(*s))
            .flat_map(|s| s.consumers.iter().copied())
    }
}
