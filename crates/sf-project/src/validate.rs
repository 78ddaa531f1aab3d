//! Project validation logic.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use sf_core::FLOW_LABEL;
use sf_units::PumpKind;

use crate::schema::{PROJECT_VERSION, Project, SimulationDef, StreamStateDef, UnitDef, UnitKindDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version != PROJECT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let components = validate_components(project)?;

    let mut stream_ids = HashSet::new();
    for stream in &project.streams {
        if !stream_ids.insert(stream.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: stream.id.clone(),
                context: "streams".to_string(),
            });
        }
    }

    let mut unit_ids = HashSet::new();
    let mut producers: HashMap<&str, &str> = HashMap::new();
    let mut consumed = HashSet::new();
    for unit in &project.units {
        if !unit_ids.insert(unit.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: unit.id.clone(),
                context: "units".to_string(),
            });
        }
        validate_ports(unit, &stream_ids)?;
        for out in &unit.outs {
            if let Some(other) = producers.insert(out.as_str(), unit.id.as_str()) {
                return Err(invalid(
                    format!("stream '{out}' producer"),
                    format!("{other}, {}", unit.id),
                    "a stream has at most one producing unit",
                ));
            }
        }
        consumed.extend(unit.ins.iter().map(String::as_str));
        validate_unit_kind(unit, &components)?;
    }

    for stream in &project.streams {
        let context = format!("stream '{}'", stream.id);
        let produced = producers.contains_key(stream.id.as_str());
        match (&stream.feed, produced) {
            (Some(_), true) => {
                return Err(invalid(
                    format!("{context} feed"),
                    "set",
                    "a stream with a producing unit cannot be a feed",
                ));
            }
            (None, false) if consumed.contains(stream.id.as_str()) => {
                return Err(ValidationError::MissingReference {
                    id: "feed".to_string(),
                    context,
                });
            }
            _ => {}
        }
        if let Some(feed) = &stream.feed {
            validate_stream_state(feed, &components, &format!("{context} feed"))?;
        }
        if let Some(initial) = &stream.initial {
            validate_stream_state(initial, &components, &format!("{context} initial"))?;
        }
    }

    if let Some(sim) = &project.simulation {
        validate_simulation(sim)?;
    }

    Ok(())
}

fn validate_components(project: &Project) -> Result<HashSet<&str>, ValidationError> {
    if project.components.is_empty() {
        return Err(invalid("components", "[]", "at least one component is required"));
    }
    let mut components = HashSet::new();
    for id in &project.components {
        if id == FLOW_LABEL {
            return Err(invalid("components", id, "reserved for the flow entry"));
        }
        if !components.insert(id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: id.clone(),
                context: "components".to_string(),
            });
        }
    }
    if !components.contains(project.solvent.as_str()) {
        return Err(ValidationError::MissingReference {
            id: project.solvent.clone(),
            context: "solvent".to_string(),
        });
    }
    Ok(components)
}

fn validate_ports(unit: &UnitDef, stream_ids: &HashSet<&str>) -> Result<(), ValidationError> {
    for (side, ports) in [("ins", &unit.ins), ("outs", &unit.outs)] {
        let mut seen = HashSet::new();
        for port in ports {
            if !stream_ids.contains(port.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: port.clone(),
                    context: format!("unit '{}' {side}", unit.id),
                });
            }
            if !seen.insert(port.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: port.clone(),
                    context: format!("unit '{}' {side}", unit.id),
                });
            }
        }
    }

    let (ins, outs) = (unit.ins.len(), unit.outs.len());
    let ok = match unit.kind {
        UnitKindDef::Mixer => ins >= 1 && outs == 1,
        UnitKindDef::Splitter { .. } => ins == 1 && outs == 2,
        UnitKindDef::Pump { .. } | UnitKindDef::HydraulicDelay { .. } => ins == 1 && outs == 1,
    };
    if !ok {
        return Err(invalid(
            format!("unit '{}' ports", unit.id),
            format!("{ins} in / {outs} out"),
            "port count does not fit the unit type",
        ));
    }
    Ok(())
}

fn validate_unit_kind(unit: &UnitDef, components: &HashSet<&str>) -> Result<(), ValidationError> {
    let context = format!("unit '{}'", unit.id);
    match &unit.kind {
        UnitKindDef::Mixer => {}
        UnitKindDef::Splitter { split, reference } => {
            validate_component_map(split, components, &format!("{context} split"))?;
            if let Some((id, s)) = split.iter().find(|(_, s)| !(0.0..=1.0).contains(*s)) {
                return Err(invalid(format!("{context} split.{id}"), s, "must be in [0, 1]"));
            }
            if let Some(reference) = reference {
                if !components.contains(reference.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: reference.clone(),
                        context: format!("{context} reference"),
                    });
                }
            }
        }
        UnitKindDef::Pump { pump_type } => {
            if let Some(pump_type) = pump_type {
                PumpKind::from_str(pump_type)
                    .map_err(|_| invalid(format!("{context} pump_type"), pump_type, "unknown pump type"))?;
            }
        }
        UnitKindDef::HydraulicDelay { t_delay, init_conc } => {
            if let Some(t) = t_delay {
                if !t.is_finite() || *t <= 0.0 {
                    return Err(invalid(format!("{context} t_delay"), t, "must be positive"));
                }
            }
            if let Some(init_conc) = init_conc {
                validate_component_map(init_conc, components, &format!("{context} init_conc"))?;
            }
        }
    }
    Ok(())
}

fn validate_component_map(
    values: &BTreeMap<String, f64>,
    components: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    for (id, v) in values {
        if !components.contains(id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: id.clone(),
                context: context.to_string(),
            });
        }
        if !v.is_finite() {
            return Err(invalid(format!("{context}.{id}"), v, "must be finite"));
        }
    }
    Ok(())
}

fn validate_stream_state(
    state: &StreamStateDef,
    components: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    if !state.flow.is_finite() || state.flow < 0.0 {
        return Err(invalid(format!("{context} flow"), state.flow, "must be non-negative"));
    }
    validate_component_map(&state.concentrations, components, context)
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    if !sim.dt.is_finite() || sim.dt <= 0.0 {
        return Err(invalid("simulation.dt", sim.dt, "must be positive"));
    }
    if !sim.t_end.is_finite() || sim.t_end < 0.0 {
        return Err(invalid("simulation.t_end", sim.t_end, "must be non-negative"));
    }
    if sim.record_every == 0 {
        return Err(invalid("simulation.record_every", 0, "must be positive"));
    }
    Ok(())
}
