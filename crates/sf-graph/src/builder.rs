//! Incremental graph builder.

use sf_core::{NodeId, StreamId};

use crate::error::GraphResult;
use crate::graph::{FlowGraph, Stream, Unit};
use crate::validate;

/// Builder for constructing a flow graph incrementally.
///
/// Use `add_unit` and `add_stream` to declare entities, wire them with
/// `set_producer` / `add_consumer`, then call `build()` to validate and freeze
/// the graph into an immutable `FlowGraph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    unit_names: Vec<String>,
    stream_names: Vec<String>,
    /// (unit, stream): unit writes stream. Declaration order is port order.
    outlets: Vec<(NodeId, StreamId)>,
    /// (stream, unit): unit reads stream. Declaration order is port order.
    inlets: Vec<(StreamId, NodeId)>,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit and return its ID.
    pub fn add_unit(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::from_index(self.unit_names.len() as u32);
        self.unit_names.push(name.into());
        id
    }

    /// Add a stream and return its ID.
    pub fn add_stream(&mut self, name: impl Into<String>) -> StreamId {
        let id = StreamId::from_index(self.stream_names.len() as u32);
        self.stream_names.push(name.into());
        id
    }

    /// Declare `unit` as the producer of `stream` (appends an outlet port).
    pub fn set_producer(&mut self, stream: StreamId, unit: NodeId) {
        self.outlets.push((unit, stream));
    }

    /// Declare `unit` as a consumer of `stream` (appends an inlet port).
    pub fn add_consumer(&mut self, stream: StreamId, unit: NodeId) {
        self.inlets.push((stream, unit));
    }

    /// Add a stream from `from` to `to` in one call.
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        from: Option<NodeId>,
        to: Option<NodeId>,
    ) -> StreamId {
        let stream = self.add_stream(name);
        if let Some(unit) = from {
            self.set_producer(stream, unit);
        }
        if let Some(unit) = to {
            self.add_consumer(stream, unit);
        }
        stream
    }

    /// Build and validate the graph, returning an immutable `FlowGraph`.
    pub fn build(self) -> GraphResult<FlowGraph> {
        validate::validate_names("unit", &self.unit_names)?;
        validate::validate_names("stream", &self.stream_names)?;
        validate::validate_refs(
            self.unit_names.len(),
            self.stream_names.len(),
            &self.outlets,
            &self.inlets,
        )?;

        let mut units: Vec<Unit> = self
            .unit_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Unit {
                id: NodeId::from_index(i as u32),
                name,
                ins: Vec::new(),
                outs: Vec::new(),
            })
            .collect();
        let mut streams: Vec<Stream> = self
            .stream_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Stream {
                id: StreamId::from_index(i as u32),
                name,
                producer: None,
                consumers: Vec::new(),
            })
            .collect();

        for (unit, stream) in self.outlets {
            units[unit.idx()].outs.push(stream);
            let slot = &mut streams[stream.idx()].producer;
            if slot.is_none() {
                *slot = Some(unit);
            }
        }
        for (stream, unit) in self.inlets {
            units[unit.idx()].ins.push(stream);
            streams[stream.idx()].consumers.push(unit);
        }

        validate::validate_ports(&units, &streams)?;

        Ok(FlowGraph { units, streams })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_basic() {
        let mut builder = GraphBuilder::new();
        let u1 = builder.add_unit("M1");
        let u2 = builder.add_unit("S1");
        let s = builder.connect("mixed", Some(u1), Some(u2));

        assert_eq!(u1.index(), 0);
        assert_eq!(u2.index(), 1);
        assert_eq!(s.index(), 0);
        assert_eq!(builder.outlets.len(), 1);
        assert_eq!(builder.inlets.len(), 1);
    }

    #[test]
    fn port_order_follows_declaration() {
        let mut builder = GraphBuilder::new();
        let mixer = builder.add_unit("M1");
        let a = builder.connect("a", None, Some(mixer));
        let b = builder.connect("b", None, Some(mixer));
        let c = builder.connect("c", None, Some(mixer));
        let out = builder.connect("out", Some(mixer), None);

        let graph = builder.build().unwrap();
        assert_eq!(graph.unit_ins(mixer), &[a, b, c]);
        assert_eq!(graph.unit_outs(mixer), &[out]);
        assert_eq!(graph.stream(out).unwrap().producer, Some(mixer));
    }

    #[test]
    fn second_producer_rejected() {
        let mut builder = GraphBuilder::new();
        let u1 = builder.add_unit("P1");
        let u2 = builder.add_unit("P2");
        let s = builder.add_stream("shared");
        builder.set_producer(s, u1);
        builder.set_producer(s, u2);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, crate::GraphError::MultipleProducers { .. }));
    }
}
