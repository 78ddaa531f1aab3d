//! Named output quantities of a finalized unit.

use sf_core::{ComponentRegistry, Concentration, StateVector, VolumeRate, check_shape, m3_per_day, mg_per_l};

use crate::error::UnitResult;

/// Flow and composition of one output stream.
///
/// The solvent is carried by the bulk flow and is not listed among the
/// component concentrations.
#[derive(Debug, Clone, PartialEq)]
pub struct OutletReport {
    pub stream: String,
    pub flow: VolumeRate,
    pub concentrations: Vec<(String, Concentration)>,
}

impl OutletReport {
    /// Interpret a state vector (mg/L, m3/d) as reported quantities.
    pub fn from_state(
        stream: impl Into<String>,
        registry: &ComponentRegistry,
        state: &StateVector,
    ) -> UnitResult<Self> {
        check_shape(registry, state.len())?;
        let solvent = registry.solvent_index();
        let concentrations = registry
            .ids()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != solvent)
            .map(|(i, id)| (id.clone(), mg_per_l(state[i])))
            .collect();
        Ok(Self {
            stream: stream.into(),
            flow: m3_per_day(state[registry.flow_index()]),
            concentrations,
        })
    }

    pub fn concentration(&self, id: &str) -> Option<Concentration> {
        self.concentrations
            .iter()
            .find(|(c, _)| c == id)
            .map(|(_, v)| *v)
    }
}
