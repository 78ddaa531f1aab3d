//! Mixer: combines any number of inputs into one output.

use nalgebra::DMatrix;
use sf_core::StateVector;

use crate::error::UnitResult;
use crate::material::MaterialFlow;
use crate::ode::{CompiledOde, mix_state};
use crate::traits::{SteadyUnit, UnitCore, UnitKind, UnitNode};

/// Flow-weighted mixing of N inlets into one outlet.
///
/// ## Model
///
/// ```text
/// Q = Σ Q_i
/// C = Σ Q_i·C_i / Q
/// ```
///
/// With a single inlet the state is that inlet's state verbatim and the
/// derivative passes through unchanged.
#[derive(Debug, Clone)]
pub struct Mixer {
    core: UnitCore,
}

impl Mixer {
    /// # Errors
    /// Returns `PortCount` unless the unit has at least one inlet and exactly
    /// one outlet.
    pub fn new(core: UnitCore) -> UnitResult<Self> {
        core.expect_ports("at least one inlet and one outlet", |n| n >= 1, |n| n == 1)?;
        Ok(Self { core })
    }

    pub fn n_ins(&self) -> usize {
        self.core.ins().len()
    }
}

impl UnitNode for Mixer {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Mixer
    }

    fn initial_state(&self, ins_state: &DMatrix<f64>) -> UnitResult<StateVector> {
        if ins_state.nrows() == 1 {
            Ok(ins_state.row(0).transpose())
        } else {
            mix_state(ins_state)
        }
    }

    fn compile_ode(&self) -> CompiledOde {
        CompiledOde::Mixer {
            n_ins: self.n_ins(),
        }
    }
}

impl SteadyUnit for Mixer {
    fn n_outs(&self) -> usize {
        1
    }

    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>> {
        Ok(vec![MaterialFlow::mix(ins)?])
    }
}
