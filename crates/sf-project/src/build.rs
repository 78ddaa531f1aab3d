//! Construction of a dynamic network from a project definition.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::DVector;
use sf_core::{ComponentRegistry, StateVector, state_from_parts};
use sf_graph::{FlowGraph, GraphBuilder};
use sf_sim::{DynamicNetwork, IntegratorType, SimOptions};
use sf_units::{DEFAULT_T_DELAY, HydraulicDelay, Mixer, Pump, PumpKind, Splitter, UnitCore, UnitNode};
use tracing::debug;

use crate::ProjectResult;
use crate::schema::{IntegratorDef, Project, StreamStateDef, UnitDef, UnitKindDef};
use crate::validate::validate_project;

/// Component registry declared by a project.
pub fn build_registry(project: &Project) -> ProjectResult<Arc<ComponentRegistry>> {
    Ok(Arc::new(ComponentRegistry::new(
        project.components.iter().cloned(),
        &project.solvent,
    )?))
}

/// Flow graph of a project: one unit per unit definition, one stream per
/// stream definition, ports in declaration order.
pub fn build_graph(project: &Project) -> ProjectResult<FlowGraph> {
    let mut builder = GraphBuilder::new();
    let streams: HashMap<&str, _> = project
        .streams
        .iter()
        .map(|s| (s.id.as_str(), builder.add_stream(s.id.clone())))
        .collect();

    for unit in &project.units {
        let id = builder.add_unit(unit.id.clone());
        for (port, producer) in unit
            .ins
            .iter()
            .map(|s| (s, false))
            .chain(unit.outs.iter().map(|s| (s, true)))
        {
            let stream = *streams.get(port.as_str()).ok_or_else(|| {
                crate::ValidationError::MissingReference {
                    id: port.clone(),
                    context: format!("unit '{}'", unit.id),
                }
            })?;
            if producer {
                builder.set_producer(stream, id);
            } else {
                builder.add_consumer(stream, id);
            }
        }
    }
    Ok(builder.build()?)
}

fn build_unit(
    def: &UnitDef,
    graph: &FlowGraph,
    registry: &Arc<ComponentRegistry>,
) -> ProjectResult<Box<dyn UnitNode>> {
    let id = graph
        .find_unit(&def.id)
        .ok_or_else(|| crate::ValidationError::MissingReference {
            id: def.id.clone(),
            context: "flow graph".to_string(),
        })?;
    let core = UnitCore::from_graph(graph, id, registry.clone())?;

    let node: Box<dyn UnitNode> = match &def.kind {
        UnitKindDef::Mixer => Box::new(Mixer::new(core)?),
        UnitKindDef::Splitter { split, reference } => {
            let pairs = split.iter().map(|(id, s)| (id.as_str(), *s));
            match reference {
                None => Box::new(Splitter::from_pairs(core, pairs)?),
                Some(reference) => {
                    let mut fractions = DVector::zeros(registry.len());
                    for (id, s) in pairs {
                        fractions[registry.require_index(id)?] = s;
                    }
                    let reference = registry.require_index(reference)?;
                    Box::new(Splitter::with_reference(core, fractions, reference)?)
                }
            }
        }
        UnitKindDef::Pump { pump_type } => {
            let kind = match pump_type {
                Some(text) => PumpKind::from_str(text)?,
                None => PumpKind::default(),
            };
            Box::new(Pump::new(core, kind)?)
        }
        UnitKindDef::HydraulicDelay { t_delay, init_conc } => {
            let mut delay = HydraulicDelay::new(core, t_delay.unwrap_or(DEFAULT_T_DELAY))?;
            if let Some(init_conc) = init_conc {
                delay.set_init_conc(init_conc.iter().map(|(id, c)| (id.as_str(), *c)))?;
            }
            Box::new(delay)
        }
    };
    debug!(unit = %def.id, kind = %node.kind(), "built unit");
    Ok(node)
}

fn stream_state(registry: &ComponentRegistry, def: &StreamStateDef) -> ProjectResult<StateVector> {
    Ok(state_from_parts(
        registry,
        def.concentrations.iter().map(|(id, c)| (id.as_str(), *c)),
        def.flow,
    )?)
}

/// Validate a project and assemble its dynamic network with feeds and
/// initial guesses applied. The network is not initialized yet.
pub fn build_network(project: &Project) -> ProjectResult<DynamicNetwork> {
    validate_project(project)?;
    let registry = build_registry(project)?;
    let graph = build_graph(project)?;

    let units = project
        .units
        .iter()
        .map(|def| build_unit(def, &graph, &registry))
        .collect::<ProjectResult<Vec<_>>>()?;

    let mut network = DynamicNetwork::new(registry.clone(), graph, units)?;
    for stream in &project.streams {
        if let Some(feed) = &stream.feed {
            network.set_feed(&stream.id, stream_state(&registry, feed)?)?;
        }
        if let Some(initial) = &stream.initial {
            network.set_initial_guess(&stream.id, stream_state(&registry, initial)?)?;
        }
    }
    Ok(network)
}

/// Simulation options declared by the project, or the defaults.
pub fn sim_options(project: &Project) -> SimOptions {
    let Some(sim) = &project.simulation else {
        return SimOptions::default();
    };
    SimOptions {
        dt: sim.dt,
        t_end: sim.t_end,
        record_every: sim.record_every,
        integrator: match sim.integrator {
            IntegratorDef::RK4 => IntegratorType::RK4,
            IntegratorDef::ForwardEuler => IntegratorType::ForwardEuler,
        },
        ..SimOptions::default()
    }
}
