//! Pump: single-input, single-output pass-through.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use sf_core::StateVector;

use crate::error::{UnitError, UnitResult};
use crate::material::MaterialFlow;
use crate::ode::CompiledOde;
use crate::traits::{SteadyUnit, UnitCore, UnitKind, UnitNode, single_input};

/// Service a pump is designed for.
///
/// The kind selects a hydraulic design/costing procedure in the equipment
/// layer; it does not change the dynamic behavior, which is always a pure
/// pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PumpKind {
    #[default]
    Default,
    PermeateCrossFlow,
    RetentateCstr,
    RetentateAf,
    RecirculationCstr,
    RecirculationAf,
    Lift,
    Sludge,
    Chemical,
}

impl PumpKind {
    pub const ALL: [PumpKind; 9] = [
        PumpKind::Default,
        PumpKind::PermeateCrossFlow,
        PumpKind::RetentateCstr,
        PumpKind::RetentateAf,
        PumpKind::RecirculationCstr,
        PumpKind::RecirculationAf,
        PumpKind::Lift,
        PumpKind::Sludge,
        PumpKind::Chemical,
    ];

    /// Canonical text form, as accepted by `from_str`.
    pub fn as_str(self) -> &'static str {
        match self {
            PumpKind::Default => "default",
            PumpKind::PermeateCrossFlow => "permeate_cross-flow",
            PumpKind::RetentateCstr => "retentate_CSTR",
            PumpKind::RetentateAf => "retentate_AF",
            PumpKind::RecirculationCstr => "recirculation_CSTR",
            PumpKind::RecirculationAf => "recirculation_AF",
            PumpKind::Lift => "lift",
            PumpKind::Sludge => "sludge",
            PumpKind::Chemical => "chemical",
        }
    }
}

impl fmt::Display for PumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PumpKind {
    type Err = UnitError;

    /// Case-insensitive match against the canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PumpKind::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| UnitError::UnknownVariant {
                kind: "pump type",
                value: s.to_string(),
            })
    }
}

/// Pure pass-through: state and derivative are forwarded unchanged.
#[derive(Debug, Clone)]
pub struct Pump {
    core: UnitCore,
    pump_kind: PumpKind,
}

impl Pump {
    /// # Errors
    /// Returns `PortCount` unless one inlet and one outlet.
    pub fn new(core: UnitCore, pump_kind: PumpKind) -> UnitResult<Self> {
        core.expect_ports("one inlet and one outlet", |n| n == 1, |n| n == 1)?;
        Ok(Self { core, pump_kind })
    }

    pub fn pump_kind(&self) -> PumpKind {
        self.pump_kind
    }
}

impl UnitNode for Pump {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UnitCore {
        &mut self.core
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Pump(self.pump_kind)
    }

    fn initial_state(&self, ins_state: &DMatrix<f64>) -> UnitResult<StateVector> {
        Ok(ins_state.row(0).transpose())
    }

    fn compile_ode(&self) -> CompiledOde {
        CompiledOde::PassThrough
    }
}

impl SteadyUnit for Pump {
    fn n_outs(&self) -> usize {
        1
    }

    fn run(&self, ins: &[MaterialFlow]) -> UnitResult<Vec<MaterialFlow>> {
        Ok(vec![single_input(self.core.name(), ins)?.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("lift".parse::<PumpKind>().unwrap(), PumpKind::Lift);
        assert_eq!(
            "Retentate_cstr".parse::<PumpKind>().unwrap(),
            PumpKind::RetentateCstr
        );
        assert_eq!(
            "RECIRCULATION_af".parse::<PumpKind>().unwrap(),
            PumpKind::RecirculationAf
        );
        assert_eq!(
            "permeate_cross-flow".parse::<PumpKind>().unwrap(),
            PumpKind::PermeateCrossFlow
        );
    }

    #[test]
    fn canonical_names_round_trip() {
        for kind in PumpKind::ALL {
            assert_eq!(kind.to_string().parse::<PumpKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_type_rejected() {
        let err = "centrifugal".parse::<PumpKind>().unwrap_err();
        assert!(matches!(err, UnitError::UnknownVariant { kind: "pump type", .. }));
    }
}
