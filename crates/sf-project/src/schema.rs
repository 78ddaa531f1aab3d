//! Project schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current project file version.
pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    /// Tracked component ids, in state-vector order.
    pub components: Vec<String>,
    /// Component carried by the bulk flow (usually `H2O`).
    pub solvent: String,
    #[serde(default)]
    pub streams: Vec<StreamDef>,
    #[serde(default)]
    pub units: Vec<UnitDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamDef {
    pub id: String,
    /// Fixed state of a feed stream (one without a producing unit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<StreamStateDef>,
    /// Initial guess for a produced stream that closes a recycle loop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<StreamStateDef>,
}

/// Flow (m3/d) and concentrations (mg/L); unlisted components are zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamStateDef {
    pub flow: f64,
    #[serde(default)]
    pub concentrations: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitDef {
    pub id: String,
    /// Inlet stream ids; order is the row order of the unit's inputs.
    pub ins: Vec<String>,
    /// Outlet stream ids; order is the branch order.
    pub outs: Vec<String>,
    pub kind: UnitKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum UnitKindDef {
    Mixer,
    Splitter {
        /// Fraction of each component sent to the first outlet; unlisted
        /// components split 0.
        split: BTreeMap<String, f64>,
        /// Component anchoring the flow split; defaults to the solvent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    Pump {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pump_type: Option<String>,
    },
    HydraulicDelay {
        /// Time constant in days.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        t_delay: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init_conc: Option<BTreeMap<String, f64>>,
    },
}

impl UnitKindDef {
    pub fn type_name(&self) -> &'static str {
        match self {
            UnitKindDef::Mixer => "Mixer",
            UnitKindDef::Splitter { .. } => "Splitter",
            UnitKindDef::Pump { .. } => "Pump",
            UnitKindDef::HydraulicDelay { .. } => "HydraulicDelay",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    /// Time step in days.
    pub dt: f64,
    /// Final time in days.
    pub t_end: f64,
    #[serde(default = "default_record_every")]
    pub record_every: usize,
    #[serde(default)]
    pub integrator: IntegratorDef,
}

fn default_record_every() -> usize {
    1
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntegratorDef {
    #[default]
    RK4,
    ForwardEuler,
}
