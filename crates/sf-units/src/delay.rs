//! Hydraulic delay: first-order lag (low-pass filter) on a single stream.

use nalgebra::{DMatrix, DVector};
use sf_core::{StateVector, ensure_finite};

use crate::error::{UnitError, UnitResult};
use crate::material::MaterialFlow;
use crate::ode::CompiledOde;
use crate::traits::{SteadyUnit, UnitCore, UnitKind, UnitNode, single_input};

/// Default time constant, in days.
pub const DEFAULT_T_DELAY: f64 = 1e-4;

/// First-order lag between one inlet and one outlet.
///
/// The outlet follows the inlet with time constant `t_delay`; see
/// `CompiledOde::FirstOrderLag` for the equations. In steady state the unit is
/// a pass-through.
#[derive(Debug, Clone)]
pub struct HydraulicDelay {
    core: UnitCore,
    t_delay: f64,
    init_conc: Option<DVector<f64>>,
}

impl HydraulicDelay {
    /// # Errors
    /// - `PortCount` unless one inlet and one outlet
    /// - `Configuration` if `t_delay` is not a positive finite number
    pub fn new(core: UnitCore, t_delay: f64) -> UnitResult<Self> {
        core.expect_ports("one inlet and one outlet", |n| n == 1, |n| n == 1)?;
        if !t_delay.is_finite() || t_delay <= 0.0 {
            return Err(UnitError::config(format!(
                "delay time constant must be positive, got {t_delay}"
            )));
        }
        Ok(Self {
            core,
            t_delay,
            init_conc: None,
        })
    }

    pub fn t_delay(&self) -> f64 {
        self.t_delay
    }

    /// Fix the initial concentrations used by `init_state` instead of the
    /// inlet's. Unlisted components start at zero. Unknown ids and non-finite
    /// values fail and leave any previous override in place.
    pub fn set_init_conc<'a, I>(&mut self, concs: I) -> UnitResult<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let registry = self.core.registry();
        let mut c = DVector::zeros(registry.len());
        for (id, v) in concs {
            c[registry.require_index(id)?] = ensure_finite(v, "initial concentration")?;
        }
        self.init_conc = Some(c);
        Ok(())
    }

    pub fn init_conc(&self) -> Option<&DVector<f64>> {
        self.init_conc.as_ref()
    }
}

impl UnitNode for HydraulicDelay {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn kind(&self) -> UnitKind {
        UnitKind::HydraulicDelay
    }

    fn initial_state(&self, ins_state: &DMatrix<f64>) -> UnitResult<StateVector> {
        let mut state: StateVector = ins_state.row(0).transpose();
        if let Some(c) = &self.init_conc {
            state.rows_mut(0, c.len()).copy_from(c);
        }
        Ok(state)
    }

    fn compile_ode(&self) -> CompiledOde {
        CompiledOde::FirstOrderLag {
            t_delay: self.t_delay,
        }
    }
}

impl SteadyUnit for HydraulicDelay {
    fn n_outs(&self) -> usize {
        1
    }

    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>> {
        Ok(vec![single_input(self.core.name(), ins)?.clone()])
    }
}
