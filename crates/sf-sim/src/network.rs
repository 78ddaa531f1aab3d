//! Dynamic network: unit nodes over a flow graph, integrated as one system.
//!
//! The global state is the concatenation of every unit's state in evaluation
//! order (`n_units * (n_components + 1)` entries). One right-hand-side
//! evaluation writes each unit's slice back into the unit (propagating it to
//! the stream buffers), then evaluates every unit's derivative function in
//! evaluation order so each consumer sees its producer's fresh derivative.
//!
//! Inside a recycle loop the first unit of the loop reads the derivative the
//! loop's last unit wrote in the previous evaluation (zero on the first one).

use std::sync::Arc;

use nalgebra::DVector;
use sf_core::{ComponentRegistry, StateVector, StreamId, check_shape, ensure_all_finite};
use sf_graph::{EvaluationOrder, FlowGraph};
use sf_units::{OutletReport, StreamStore, UnitNode};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::model::TransientModel;
use crate::sim::{SimOptions, SimProgress, SimRecord, run_sim_with_progress};

#[derive(Debug)]
pub struct DynamicNetwork {
    registry: Arc<ComponentRegistry>,
    graph: FlowGraph,
    order: EvaluationOrder,
    /// One node per graph unit, indexed by `NodeId::idx()`.
    units: Vec<Box<dyn UnitNode>>,
    streams: StreamStore,
    feeds: Vec<(StreamId, StateVector)>,
    guesses: Vec<(StreamId, StateVector)>,
    initialized: bool,
}

impl DynamicNetwork {
    /// Assemble a network from a flow graph and one node per graph unit.
    ///
    /// # Errors
    /// `NetworkMismatch` if a node is missing, duplicated, not part of the
    /// graph, wired differently from the graph, or built on another registry.
    pub fn new(
        registry: Arc<ComponentRegistry>,
        graph: FlowGraph,
        units: Vec<Box<dyn UnitNode>>,
    ) -> SimResult<Self> {
        let mut slots: Vec<Option<Box<dyn UnitNode>>> =
            (0..graph.units().len()).map(|_| None).collect();

        for unit in units {
            let core = unit.core();
            let id = core.id();
            let spec = graph.unit(id).ok_or_else(|| SimError::NetworkMismatch {
                what: format!("unit '{}' (id {id}) is not part of the flow graph", core.name()),
            })?;
            if spec.name != core.name()
                || spec.ins.as_slice() != core.ins()
                || spec.outs.as_slice() != core.outs()
            {
                return Err(SimError::NetworkMismatch {
                    what: format!("ports of unit '{}' do not match the flow graph", spec.name),
                });
            }
            if core.registry() != registry.as_ref() {
                return Err(SimError::NetworkMismatch {
                    what: format!("unit '{}' uses a different component registry", spec.name),
                });
            }
            let slot = slots.get_mut(id.idx()).ok_or_else(|| SimError::NetworkMismatch {
                what: format!("unit id {id} out of range"),
            })?;
            if slot.is_some() {
                return Err(SimError::NetworkMismatch {
                    what: format!("unit '{}' has more than one node", spec.name),
                });
            }
            *slot = Some(unit);
        }

        let units = slots
            .into_iter()
            .zip(graph.units())
            .map(|(slot, spec)| {
                slot.ok_or_else(|| SimError::NetworkMismatch {
                    what: format!("no node for unit '{}'", spec.name),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        let order = graph.evaluation_order();
        let streams = StreamStore::for_graph(&graph);
        debug!(
            units = units.len(),
            streams = streams.len(),
            recycles = order.recycles().len(),
            "assembled dynamic network"
        );

        Ok(Self {
            registry,
            graph,
            order,
            units,
            streams,
            feeds: Vec::new(),
            guesses: Vec::new(),
            initialized: false,
        })
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn order(&self) -> &EvaluationOrder {
        &self.order
    }

    pub fn streams(&self) -> &StreamStore {
        &self.streams
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Length of the global state vector.
    pub fn state_len(&self) -> usize {
        self.units.len() * self.registry.state_len()
    }

    /// Look up a unit node by name.
    pub fn unit(&self, name: &str) -> Option<&dyn UnitNode> {
        let id = self.graph.find_unit(name)?;
        self.units.get(id.idx()).map(|u| u.as_ref())
    }

    /// Unit nodes in evaluation order.
    pub fn units_in_order(&self) -> impl Iterator<Item = &dyn UnitNode> + '_ {
        self.order
            .units()
            .iter()
            .filter_map(|id| self.units.get(id.idx()).map(|u| u.as_ref()))
    }

    /// Feed streams with a fixed state, in the order they were set.
    pub fn feeds(&self) -> impl Iterator<Item = (&str, &StateVector)> + '_ {
        self.feeds.iter().filter_map(|(id, state)| {
            self.graph.stream(*id).map(|s| (s.name.as_str(), state))
        })
    }

    pub fn stream_id(&self, name: &str) -> SimResult<StreamId> {
        self.graph
            .find_stream(name)
            .ok_or_else(|| SimError::UnknownStream { name: name.to_string() })
    }

    /// Fix the state of a feed stream. Its derivative is zero.
    ///
    /// # Errors
    /// `StreamRole` if the stream has a producer; `ShapeMismatch`/`NonFinite`
    /// for a malformed state; `NonPhysical` for a negative flow.
    pub fn set_feed(&mut self, stream: &str, state: StateVector) -> SimResult<()> {
        let id = self.stream_id(stream)?;
        if self.graph.stream(id).is_some_and(|s| !s.is_feed()) {
            return Err(SimError::StreamRole {
                name: stream.to_string(),
                role: "not a feed",
            });
        }
        self.check_stream_state(&state)?;

        let buf = self.streams.get_mut(id)?;
        buf.set_dstate(DVector::zeros(state.len()));
        buf.set_state(state.clone());
        upsert(&mut self.feeds, id, state);
        Ok(())
    }

    /// Seed the state of a produced stream before initialization, as needed
    /// for the stream closing a recycle loop. Reapplied on every `initialize`.
    pub fn set_initial_guess(&mut self, stream: &str, state: StateVector) -> SimResult<()> {
        let id = self.stream_id(stream)?;
        if self.graph.stream(id).is_some_and(|s| s.is_feed()) {
            return Err(SimError::StreamRole {
                name: stream.to_string(),
                role: "a feed; use set_feed",
            });
        }
        self.check_stream_state(&state)?;
        upsert(&mut self.guesses, id, state);
        Ok(())
    }

    fn check_stream_state(&self, state: &StateVector) -> SimResult<()> {
        check_shape(&self.registry, state.len())?;
        ensure_all_finite(state.as_slice(), "stream state")?;
        if state[self.registry.flow_index()] < 0.0 {
            return Err(SimError::NonPhysical {
                what: "stream flow must be non-negative",
            });
        }
        Ok(())
    }

    /// Initialize every unit from its inputs, upstream first, and propagate
    /// the initial states downstream.
    pub fn initialize(&mut self) -> SimResult<()> {
        if !self.order.is_acyclic() {
            warn!(
                loops = self.order.recycles().len(),
                "network has recycle loops; loop inlets need an initial guess"
            );
        }
        for (id, state) in &self.guesses {
            let buf = self.streams.get_mut(*id)?;
            if buf.state().is_none() {
                buf.set_state(state.clone());
            }
        }

        for id in self.order.units() {
            let unit = &mut self.units[id.idx()];
            unit.init_state(&self.streams)?;
            let state = unit.state_vector().cloned().ok_or(SimError::NotInitialized)?;
            unit.update_state(state, &mut self.streams)?;
            debug!(unit = unit.name(), kind = %unit.kind(), "initialized unit state");
        }
        self.initialized = true;
        Ok(())
    }

    /// Clear all unit states and every non-feed stream. Feeds and initial
    /// guesses are kept, so `initialize` reproduces a fresh network.
    pub fn reset_cache(&mut self) -> SimResult<()> {
        for unit in &mut self.units {
            unit.reset_cache(&mut self.streams)?;
        }
        for stream in self.graph.streams() {
            if !stream.is_feed() {
                self.streams.empty(stream.id)?;
            }
        }
        for (id, state) in &self.feeds {
            let buf = self.streams.get_mut(*id)?;
            buf.set_dstate(DVector::zeros(state.len()));
            buf.set_state(state.clone());
        }
        self.initialized = false;
        debug!("reset dynamic network");
        Ok(())
    }

    /// Write a global state into the units and refresh every derivative, so
    /// unit states, stream buffers and reports reflect `x`.
    pub fn apply_state(&mut self, t: f64, x: &StateVector) -> SimResult<()> {
        self.rhs(t, x).map(|_| ())
    }

    /// Slice of a global state belonging to `unit`.
    pub fn unit_state_of(&self, x: &StateVector, unit: &str) -> Option<StateVector> {
        let id = self.graph.find_unit(unit)?;
        let pos = self.order.position(id)?;
        let len = self.registry.state_len();
        (x.len() == self.state_len()).then(|| x.rows(pos * len, len).into_owned())
    }

    /// `unit.label` for every entry of the global state.
    pub fn state_labels(&self) -> Vec<String> {
        let labels: Vec<&str> = self
            .registry
            .ids()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(sf_core::FLOW_LABEL))
            .collect();
        let labels = &labels;
        self.units_in_order()
            .flat_map(move |u| labels.iter().map(move |l| format!("{}.{l}", u.name())))
            .collect()
    }

    /// Reports of every unit output, in evaluation order.
    pub fn outlet_reports(&self) -> SimResult<Vec<OutletReport>> {
        let mut reports = Vec::new();
        for unit in self.units_in_order() {
            reports.extend(unit.finalize_outputs(&self.streams)?);
        }
        Ok(reports)
    }

    /// Reports of the streams leaving the network.
    pub fn product_reports(&self) -> SimResult<Vec<OutletReport>> {
        let len = self.registry.state_len();
        self.graph
            .products()
            .into_iter()
            .map(|id| -> SimResult<OutletReport> {
                let buf = self.streams.get(id)?;
                let state = self.streams.state_of(id, len)?;
                Ok(OutletReport::from_state(buf.name(), &self.registry, state)?)
            })
            .collect()
    }

    /// Initialize if needed, integrate, and leave the network at the final
    /// recorded state.
    pub fn simulate(&mut self, opts: &SimOptions) -> SimResult<SimRecord<StateVector>> {
        self.simulate_with_progress(opts, |_| {})
    }

    /// `simulate` with a callback at every recorded step.
    pub fn simulate_with_progress<F>(
        &mut self,
        opts: &SimOptions,
        on_progress: F,
    ) -> SimResult<SimRecord<StateVector>>
    where
        F: FnMut(&SimProgress),
    {
        if !self.initialized {
            self.initialize()?;
        }
        let record = run_sim_with_progress(self, opts, on_progress)?;
        if let Some((t, x)) = record.last() {
            let x = x.clone();
            self.apply_state(t, &x)?;
        }
        info!(
            units = self.units.len(),
            t_end = opts.t_end,
            records = record.len(),
            "network simulation finished"
        );
        Ok(record)
    }
}

impl TransientModel for DynamicNetwork {
    type State = StateVector;

    fn initial_state(&self) -> SimResult<StateVector> {
        if !self.initialized {
            return Err(SimError::NotInitialized);
        }
        let len = self.registry.state_len();
        let mut x = StateVector::zeros(self.state_len());
        for (pos, id) in self.order.units().iter().enumerate() {
            let state = self.units[id.idx()]
                .state_vector()
                .ok_or(SimError::NotInitialized)?;
            x.rows_mut(pos * len, len).copy_from(state);
        }
        Ok(x)
    }

    fn rhs(&mut self, t: f64, x: &StateVector) -> SimResult<StateVector> {
        if !self.initialized {
            return Err(SimError::NotInitialized);
        }
        if x.len() != self.state_len() {
            return Err(SimError::StateLength {
                expected: self.state_len(),
                actual: x.len(),
            });
        }
        let len = self.registry.state_len();

        for (pos, id) in self.order.units().iter().enumerate() {
            let slice = x.rows(pos * len, len).into_owned();
            self.units[id.idx()].update_state(slice, &mut self.streams)?;
        }
        for id in self.order.units() {
            self.units[id.idx()].eval_ode(t, &mut self.streams)?;
        }

        let mut dx = StateVector::zeros(x.len());
        for (pos, id) in self.order.units().iter().enumerate() {
            let dstate = self.units[id.idx()]
                .dstate_vector()
                .ok_or(SimError::NotInitialized)?;
            dx.rows_mut(pos * len, len).copy_from(dstate);
        }
        Ok(dx)
    }

    fn add(&self, a: &StateVector, b: &StateVector) -> StateVector {
        a + b
    }

    fn scale(&self, a: &StateVector, scale: f64) -> StateVector {
        a * scale
    }
}

fn upsert(entries: &mut Vec<(StreamId, StateVector)>, id: StreamId, state: StateVector) {
    match entries.iter_mut().find(|(s, _)| *s == id) {
        Some(entry) => entry.1 = state,
        None => entries.push((id, state)),
    }
}
