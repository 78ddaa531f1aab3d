//! Per-component mass flows for steady-state routing.

use nalgebra::DVector;
use sf_core::{ComponentRegistry, StateVector, check_shape};

use crate::error::{UnitError, UnitResult};

/// Mass flow of every registered component, in registry order.
///
/// With flows in m3/d and concentrations in mg/L the entries are g/d.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFlow {
    mass: DVector<f64>,
}

impl MaterialFlow {
    pub fn zeros(n_components: usize) -> Self {
        Self {
            mass: DVector::zeros(n_components),
        }
    }

    pub fn from_vector(mass: DVector<f64>) -> Self {
        Self { mass }
    }

    /// Build from `(component, mass flow)` pairs; unlisted components are zero.
    pub fn from_pairs<'a, I>(registry: &ComponentRegistry, pairs: I) -> UnitResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut flow = Self::zeros(registry.len());
        for (id, m) in pairs {
            flow.mass[registry.require_index(id)?] = m;
        }
        Ok(flow)
    }

    /// Mass flows carried by a state: `Q · C_i` per component.
    pub fn from_state(registry: &ComponentRegistry, state: &StateVector) -> UnitResult<Self> {
        check_shape(registry, state.len())?;
        let n = registry.len();
        let q = state[n];
        Ok(Self {
            mass: state.rows(0, n) * q,
        })
    }

    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.mass
    }

    pub fn get(&self, index: usize) -> f64 {
        self.mass.get(index).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.mass.get_mut(index) {
            *slot = value;
        }
    }

    /// Lookup by component id.
    pub fn mass_of(&self, registry: &ComponentRegistry, id: &str) -> Option<f64> {
        registry.index_of(id).map(|i| self.get(i))
    }

    pub fn total(&self) -> f64 {
        self.mass.sum()
    }

    /// Sum of several flows; all must share one length.
    pub fn mix(flows: &[MaterialFlow]) -> UnitResult<Self> {
        let Some(first) = flows.first() else {
            return Err(UnitError::NonPhysical {
                what: "nothing to mix",
            });
        };
        let mut total = Self::zeros(first.len());
        for f in flows {
            if f.len() != total.len() {
                return Err(UnitError::ShapeMismatch {
                    expected: total.len(),
                    actual: f.len(),
                });
            }
            total.mass += &f.mass;
        }
        Ok(total)
    }
}
