//! State and derivative vectors.
//!
//! A state vector holds `n` component concentrations followed by the total
//! volumetric flow. Derivative vectors share the layout.

use nalgebra::DVector;

use crate::error::{SfError, SfResult};
use crate::registry::{ComponentRegistry, FLOW_LABEL};

pub type StateVector = DVector<f64>;
pub type DerivativeVector = DVector<f64>;

/// Fail with `ShapeMismatch` unless `len == n_components + 1`.
pub fn check_shape(registry: &ComponentRegistry, len: usize) -> SfResult<()> {
    let expected = registry.state_len();
    if len != expected {
        return Err(SfError::ShapeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Build a state vector from concentrations (by component id) and a flow.
///
/// Components not listed default to zero.
pub fn state_from_parts<'a, I>(
    registry: &ComponentRegistry,
    concentrations: I,
    flow: f64,
) -> SfResult<StateVector>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut state = StateVector::zeros(registry.state_len());
    for (id, c) in concentrations {
        let i = registry.require_index(id)?;
        state[i] = c;
    }
    state[registry.flow_index()] = flow;
    Ok(state)
}

/// Labeled read-only view of a state: component ids then `"Q"`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateView {
    entries: Vec<(String, f64)>,
}

impl StateView {
    pub fn new(registry: &ComponentRegistry, state: &StateVector) -> SfResult<Self> {
        check_shape(registry, state.len())?;
        let entries = registry
            .ids()
            .iter()
            .cloned()
            .chain(std::iter::once(FLOW_LABEL.to_string()))
            .zip(state.iter().copied())
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    /// Total flow (the trailing entry).
    pub fn flow(&self) -> f64 {
        self.entries.last().map_or(0.0, |(_, v)| *v)
    }

    /// Component concentrations, flow excluded.
    pub fn concentrations(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        let n = self.entries.len().saturating_sub(1);
        self.entries[..n].iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
