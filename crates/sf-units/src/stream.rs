//! Stream buffers: the slots through which a producing unit's state reaches
//! its consumers.
//!
//! A buffer is written by exactly one unit (its producer, enforced by the flow
//! graph) or, for feeds, by the surrounding simulation. Consumers only read.

use nalgebra::DMatrix;
use sf_core::{DerivativeVector, StateVector, StreamId};
use sf_graph::FlowGraph;

use crate::error::{UnitError, UnitResult};

/// Current state and derivative of one stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamBuffer {
    name: String,
    state: Option<StateVector>,
    dstate: Option<DerivativeVector>,
}

impl StreamBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            dstate: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> Option<&StateVector> {
        self.state.as_ref()
    }

    pub fn dstate(&self) -> Option<&DerivativeVector> {
        self.dstate.as_ref()
    }

    pub fn set_state(&mut self, state: StateVector) {
        self.state = Some(state);
    }

    pub fn set_dstate(&mut self, dstate: DerivativeVector) {
        self.dstate = Some(dstate);
    }

    /// Clear both slots.
    pub fn empty(&mut self) {
        self.state = None;
        self.dstate = None;
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.dstate.is_none()
    }
}

/// All stream buffers of one flow graph, indexed by `StreamId`.
#[derive(Debug, Clone, Default)]
pub struct StreamStore {
    buffers: Vec<StreamBuffer>,
}

impl StreamStore {
    /// One empty buffer per stream of the graph.
    pub fn for_graph(graph: &FlowGraph) -> Self {
        Self {
            buffers: graph
                .streams()
                .iter()
                .map(|s| StreamBuffer::new(s.name.clone()))
                .collect(),
        }
    }

    /// Buffers named in id order (id `i` gets `names[i]`).
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buffers: names.into_iter().map(StreamBuffer::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn get(&self, id: StreamId) -> UnitResult<&StreamBuffer> {
        self.buffers
            .get(id.idx())
            .ok_or(UnitError::UnknownStream { id: id.index() })
    }

    pub fn get_mut(&mut self, id: StreamId) -> UnitResult<&mut StreamBuffer> {
        self.buffers
            .get_mut(id.idx())
            .ok_or(UnitError::UnknownStream { id: id.index() })
    }

    pub fn iter(&self) -> impl Iterator<Item = (StreamId, &StreamBuffer)> + '_ {
        self.buffers
            .iter()
            .enumerate()
            .map(|(i, b)| (StreamId::from_index(i as u32), b))
    }

    pub fn empty(&mut self, id: StreamId) -> UnitResult<()> {
        self.get_mut(id)?.empty();
        Ok(())
    }

    pub fn empty_all(&mut self) {
        self.buffers.iter_mut().for_each(StreamBuffer::empty);
    }

    /// State of one stream; unset or mis-sized states are errors.
    pub fn state_of(&self, id: StreamId, len: usize) -> UnitResult<&StateVector> {
        let buf = self.get(id)?;
        let state = buf.state().ok_or_else(|| UnitError::UninitializedStream {
            stream: buf.name().to_string(),
        })?;
        if state.len() != len {
            return Err(UnitError::ShapeMismatch {
                expected: len,
                actual: state.len(),
            });
        }
        Ok(state)
    }

    /// Input states stacked as rows (`rows = ins`, `columns = len`).
    pub fn ins_state(&self, ins: &[StreamId], len: usize) -> UnitResult<DMatrix<f64>> {
        let mut m = DMatrix::zeros(ins.len(), len);
        for (row, &id) in ins.iter().enumerate() {
            m.row_mut(row).tr_copy_from(self.state_of(id, len)?);
        }
        Ok(m)
    }

    /// Input derivatives stacked as rows. A stream whose derivative has not
    /// been written yet in this run (e.g. a recycle stream on the very first
    /// evaluation) reads as zero.
    pub fn ins_dstate(&self, ins: &[StreamId], len: usize) -> UnitResult<DMatrix<f64>> {
        let mut m = DMatrix::zeros(ins.len(), len);
        for (row, &id) in ins.iter().enumerate() {
            if let Some(d) = self.get(id)?.dstate() {
                if d.len() != len {
                    return Err(UnitError::ShapeMismatch {
                        expected: len,
                        actual: d.len(),
                    });
                }
                m.row_mut(row).tr_copy_from(d);
            }
        }
        Ok(m)
    }
}
