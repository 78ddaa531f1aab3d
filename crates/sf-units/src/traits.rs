//! The unit node contract.
//!
//! Every dynamic unit owns a `UnitCore` (state, derivative, cached derivative
//! function, port wiring) and implements three hooks: how to derive its
//! initial state from its inputs, how to compile its derivative function, and
//! how a state-layout vector maps onto each of its outputs. The lifecycle
//! operations are provided on top of those hooks.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;
use sf_core::{ComponentRegistry, DerivativeVector, NodeId, StateVector, StateView, StreamId, check_shape};
use sf_graph::FlowGraph;

use crate::error::{UnitError, UnitResult};
use crate::material::MaterialFlow;
use crate::ode::CompiledOde;
use crate::pump::PumpKind;
use crate::report::OutletReport;
use crate::stream::StreamStore;

/// Discriminator of the dynamic unit variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Mixer,
    Splitter,
    Pump(PumpKind),
    HydraulicDelay,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Mixer => write!(f, "Mixer"),
            UnitKind::Splitter => write!(f, "Splitter"),
            UnitKind::Pump(kind) => write!(f, "Pump ({kind})"),
            UnitKind::HydraulicDelay => write!(f, "HydraulicDelay"),
        }
    }
}

/// State shared by all unit variants.
#[derive(Debug, Clone)]
pub struct UnitCore {
    id: NodeId,
    name: String,
    registry: Arc<ComponentRegistry>,
    ins: Vec<StreamId>,
    outs: Vec<StreamId>,
    state: Option<StateVector>,
    dstate: Option<DerivativeVector>,
    ode: OnceCell<CompiledOde>,
}

impl UnitCore {
    pub fn new(
        id: NodeId,
        name: impl Into<String>,
        registry: Arc<ComponentRegistry>,
        ins: Vec<StreamId>,
        outs: Vec<StreamId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            registry,
            ins,
            outs,
            state: None,
            dstate: None,
            ode: OnceCell::new(),
        }
    }

    /// Take name and port wiring of `id` from a flow graph.
    pub fn from_graph(
        graph: &FlowGraph,
        id: NodeId,
        registry: Arc<ComponentRegistry>,
    ) -> UnitResult<Self> {
        let unit = graph.unit(id).ok_or_else(|| {
            UnitError::config(format!("unit id {id} is not part of the flow graph"))
        })?;
        Ok(Self::new(
            id,
            unit.name.clone(),
            registry,
            unit.ins.clone(),
            unit.outs.clone(),
        ))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn ins(&self) -> &[StreamId] {
        &self.ins
    }

    pub fn outs(&self) -> &[StreamId] {
        &self.outs
    }

    /// Validate port counts against a variant's needs.
    pub(crate) fn expect_ports(
        &self,
        expected: &'static str,
        ins_ok: impl Fn(usize) -> bool,
        outs_ok: impl Fn(usize) -> bool,
    ) -> UnitResult<()> {
        if ins_ok(self.ins.len()) && outs_ok(self.outs.len()) {
            Ok(())
        } else {
            Err(UnitError::PortCount {
                unit: self.name.clone(),
                expected,
                ins: self.ins.len(),
                outs: self.outs.len(),
            })
        }
    }
}

/// Dynamic unit node: state, derivative and their propagation downstream.
pub trait UnitNode: fmt::Debug {
    fn core(&self) -> &UnitCore;

    fn core_mut(&mut self) -> &mut UnitCore;

    fn kind(&self) -> UnitKind;

    /// Initial state from the stacked input states (one row per input).
    fn initial_state(&self, ins_state: &DMatrix<f64>) -> UnitResult<StateVector>;

    /// Build the derivative function. Called at most once per unit.
    fn compile_ode(&self) -> CompiledOde;

    /// Map a state-layout vector (state or derivative) onto output `branch`.
    fn branch_transform(&self, _branch: usize, arr: &StateVector) -> StateVector {
        arr.clone()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Drop state and derivative and empty every output buffer.
    ///
    /// Safe before initialization and idempotent. The compiled derivative
    /// function survives: it depends on parameters only.
    fn reset_cache(&mut self, streams: &mut StreamStore) -> UnitResult<()> {
        let core = self.core_mut();
        core.state = None;
        core.dstate = None;
        for &out in &core.outs {
            streams.empty(out)?;
        }
        Ok(())
    }

    /// Compute and store the initial state from the current input buffers and
    /// zero the derivative. Recomputes on every call.
    fn init_state(&mut self, streams: &StreamStore) -> UnitResult<()> {
        let len = self.core().registry.state_len();
        let ins_state = streams.ins_state(&self.core().ins, len)?;
        let state = self.initial_state(&ins_state)?;
        check_shape(&self.core().registry, state.len())?;

        let core = self.core_mut();
        core.dstate = Some(DerivativeVector::zeros(len));
        core.state = Some(state);
        Ok(())
    }

    /// Labeled state, `None` until initialized.
    fn state(&self) -> Option<StateView> {
        let core = self.core();
        core.state
            .as_ref()
            .and_then(|s| StateView::new(&core.registry, s).ok())
    }

    fn state_vector(&self) -> Option<&StateVector> {
        self.core().state.as_ref()
    }

    fn dstate_vector(&self) -> Option<&DerivativeVector> {
        self.core().dstate.as_ref()
    }

    /// Store a new state and write its transformation into every output.
    ///
    /// The length must be `n_components + 1`; otherwise nothing changes.
    fn update_state(&mut self, arr: StateVector, streams: &mut StreamStore) -> UnitResult<()> {
        check_shape(&self.core().registry, arr.len())?;
        for &out in &self.core().outs {
            streams.get(out)?;
        }

        for (branch, &out) in self.core().outs.iter().enumerate() {
            let transformed = self.branch_transform(branch, &arr);
            streams.get_mut(out)?.set_state(transformed);
        }
        self.core_mut().state = Some(arr);
        Ok(())
    }

    /// Write the transformation of the current derivative into every output.
    fn update_dstate(&self, streams: &mut StreamStore) -> UnitResult<()> {
        let core = self.core();
        let dstate = core.dstate.as_ref().ok_or_else(|| UnitError::Uninitialized {
            unit: core.name.clone(),
        })?;
        for (branch, &out) in core.outs.iter().enumerate() {
            let transformed = self.branch_transform(branch, dstate);
            streams.get_mut(out)?.set_dstate(transformed);
        }
        Ok(())
    }

    /// The derivative function, compiled on first access and cached.
    fn ode(&self) -> &CompiledOde {
        self.core().ode.get_or_init(|| self.compile_ode())
    }

    fn is_compiled(&self) -> bool {
        self.core().ode.get().is_some()
    }

    /// Evaluate the derivative function on explicit inputs, store the result
    /// as this unit's derivative and propagate it to the outputs.
    fn apply_ode(
        &mut self,
        t: f64,
        ins_state: &DMatrix<f64>,
        state: &StateVector,
        ins_dstate: &DMatrix<f64>,
        streams: &mut StreamStore,
    ) -> UnitResult<()> {
        check_shape(&self.core().registry, state.len())?;
        let dstate = self.ode().eval(t, ins_state, state, ins_dstate)?;
        self.core_mut().dstate = Some(dstate);
        self.update_dstate(streams)
    }

    /// `apply_ode` with inputs read from the stream buffers and the unit's
    /// own current state.
    fn eval_ode(&mut self, t: f64, streams: &mut StreamStore) -> UnitResult<()> {
        let core = self.core();
        let len = core.registry.state_len();
        let state = core.state.clone().ok_or_else(|| UnitError::Uninitialized {
            unit: core.name.clone(),
        })?;
        let ins_state = streams.ins_state(&core.ins, len)?;
        let ins_dstate = streams.ins_dstate(&core.ins, len)?;
        self.apply_ode(t, &ins_state, &state, &ins_dstate, streams)
    }

    /// Translate the current state into named quantities, one per output.
    ///
    /// Output buffers supply only the stream names; an initialized unit
    /// reports even before its first `update_state`.
    fn finalize_outputs(&self, streams: &StreamStore) -> UnitResult<Vec<OutletReport>> {
        let core = self.core();
        let state = core.state.as_ref().ok_or_else(|| UnitError::Uninitialized {
            unit: core.name.clone(),
        })?;
        core.outs
            .iter()
            .enumerate()
            .map(|(branch, &out)| {
                let outlet = self.branch_transform(branch, state);
                OutletReport::from_state(streams.get(out)?.name(), &core.registry, &outlet)
            })
            .collect()
    }
}

/// Steady-state routing of component mass flows.
pub trait SteadyUnit {
    /// Number of outputs `run` produces.
    fn n_outs(&self) -> usize;

    /// Route input mass flows to outputs.
    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>>;
}

/// Exactly one input, as steady pass-through units need.
pub(crate) fn single_input<'a>(unit: &str, ins: &'a [MaterialFlow]) -> UnitResult<&'a MaterialFlow> {
    match ins {
        [only] => Ok(only),
        _ => Err(UnitError::PortCount {
            unit: unit.to_string(),
            expected: "exactly one inlet",
            ins: ins.len(),
            outs: 1,
        }),
    }
}
