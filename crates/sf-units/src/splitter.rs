//! Splitter: divides one input into two outputs with per-component split
//! fractions.

use nalgebra::{DMatrix, DVector};
use sf_core::{ComponentRegistry, StateVector, is_fraction};

use crate::error::{UnitError, UnitResult};
use crate::material::MaterialFlow;
use crate::ode::CompiledOde;
use crate::traits::{SteadyUnit, UnitCore, UnitKind, UnitNode, single_input};

/// Two-way splitter with a split ratio per component.
///
/// `split[i]` is the fraction of component `i` sent to branch 0; the rest goes
/// to branch 1. The reference component (the solvent by default) anchors the
/// flow allocation: branch 0 carries `s_ref · Q`, and each concentration is
/// rescaled by how far its split departs from the reference's:
///
/// ```text
/// branch 0:  C_i · s_i / s_ref,               Q · s_ref
/// branch 1:  C_i · (1 − s_i) / (1 − s_ref),   Q · (1 − s_ref)
/// ```
///
/// This conserves every component exactly and allows non-ideal separation
/// (e.g. a membrane retaining solids while passing liquid).
#[derive(Debug, Clone)]
pub struct Splitter {
    core: UnitCore,
    split: DVector<f64>,
    reference: usize,
    /// Elementwise scale of a state-layout vector for each branch.
    branch_scales: [StateVector; 2],
}

impl Splitter {
    /// Splitter anchored on the registry's solvent.
    pub fn new(core: UnitCore, split: DVector<f64>) -> UnitResult<Self> {
        let reference = core.registry().solvent_index();
        Self::with_reference(core, split, reference)
    }

    /// Splitter from `(component, fraction)` pairs; unlisted components split 0.
    pub fn from_pairs<'a, I>(core: UnitCore, pairs: I) -> UnitResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let registry = core.registry();
        let mut split = DVector::zeros(registry.len());
        for (id, s) in pairs {
            split[registry.require_index(id)?] = s;
        }
        Self::new(core, split)
    }

    /// Splitter anchored on component `reference` (index into the registry).
    ///
    /// # Errors
    /// - `PortCount` unless one inlet and two outlets
    /// - `Configuration` if the split length differs from the component count,
    ///   a fraction lies outside [0, 1], or the reference fraction is 0 or 1
    ///   (the branch scales divide by `s_ref` and `1 − s_ref`)
    pub fn with_reference(core: UnitCore, split: DVector<f64>, reference: usize) -> UnitResult<Self> {
        core.expect_ports("one inlet and two outlets", |n| n == 1, |n| n == 2)?;
        let branch_scales = branch_scales(core.registry(), &split, reference)?;
        Ok(Self {
            core,
            split,
            reference,
            branch_scales,
        })
    }

    pub fn split(&self) -> &DVector<f64> {
        &self.split
    }

    pub fn reference(&self) -> usize {
        self.reference
    }

    /// Precomputed scale vectors for branch 0 and branch 1.
    pub fn branch_scales(&self) -> &[StateVector; 2] {
        &self.branch_scales
    }
}

fn branch_scales(
    registry: &ComponentRegistry,
    split: &DVector<f64>,
    reference: usize,
) -> UnitResult<[StateVector; 2]> {
    let n = registry.len();
    if split.len() != n {
        return Err(UnitError::config(format!(
            "split must have one fraction per component ({n}), got {}",
            split.len()
        )));
    }
    if let Some((i, s)) = split.iter().enumerate().find(|(_, s)| !is_fraction(**s)) {
        return Err(UnitError::config(format!(
            "split fraction of '{}' must be in [0, 1], got {s}",
            registry.ids()[i]
        )));
    }
    let s_ref = *split.get(reference).ok_or_else(|| {
        UnitError::config(format!("reference component index {reference} out of range"))
    })?;
    if s_ref <= 0.0 || s_ref >= 1.0 {
        return Err(UnitError::config(format!(
            "split fraction of reference component '{}' must be strictly between 0 and 1, got {s_ref}",
            registry.ids()[reference]
        )));
    }

    let mut out0 = StateVector::zeros(n + 1);
    let mut out1 = StateVector::zeros(n + 1);
    for (i, s) in split.iter().enumerate() {
        out0[i] = s / s_ref;
        out1[i] = (1.0 - s) / (1.0 - s_ref);
    }
    out0[n] = s_ref;
    out1[n] = 1.0 - s_ref;
    Ok([out0, out1])
}

impl UnitNode for Splitter {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Splitter
    }

    fn initial_state(&self, ins_state: &DMatrix<f64>) -> UnitResult<StateVector> {
        Ok(ins_state.row(0).transpose())
    }

    fn compile_ode(&self) -> CompiledOde {
        CompiledOde::PassThrough
    }

    fn branch_transform(&self, branch: usize, arr: &StateVector) -> StateVector {
        match self.branch_scales.get(branch) {
            Some(scale) => scale.component_mul(arr),
            None => arr.clone(),
        }
    }
}

impl SteadyUnit for Splitter {
    fn n_outs(&self) -> usize {
        2
    }

    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>> {
        let feed = single_input(self.core.name(), ins)?;
        if feed.len() != self.split.len() {
            return Err(UnitError::ShapeMismatch {
                expected: self.split.len(),
                actual: feed.len(),
            });
        }
        let top = feed.as_vector().component_mul(&self.split);
        let bottom = feed.as_vector() - &top;
        Ok(vec![
            MaterialFlow::from_vector(top),
            MaterialFlow::from_vector(bottom),
        ])
    }
}
