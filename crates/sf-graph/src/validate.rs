//! Graph validation logic.

use std::collections::HashSet;

use sf_core::{NodeId, StreamId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Stream, Unit};

/// Names must be unique within their kind.
pub(crate) fn validate_names(what: &'static str, names: &[String]) -> GraphResult<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(GraphError::DuplicateName {
                what,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Every connection must reference an existing unit and stream.
pub(crate) fn validate_refs(
    n_units: usize,
    n_streams: usize,
    outlets: &[(NodeId, StreamId)],
    inlets: &[(StreamId, NodeId)],
) -> GraphResult<()> {
    let pairs = outlets
        .iter()
        .copied()
        .chain(inlets.iter().map(|&(s, u)| (u, s)));
    for (unit, stream) in pairs {
        if unit.idx() >= n_units {
            return Err(GraphError::InvalidUnitRef { stream, unit });
        }
        if stream.idx() >= n_streams {
            return Err(GraphError::InvalidStreamRef { unit, stream });
        }
    }
    Ok(())
}

/// Single-writer streams, no repeated inlets on one unit.
pub(crate) fn validate_ports(units: &[Unit], streams: &[Stream]) -> GraphResult<()> {
    let mut written = HashSet::new();
    for unit in units {
        for &s in &unit.outs {
            if !written.insert(s) {
                return Err(GraphError::MultipleProducers {
                    stream: streams[s.idx()].name.clone(),
                });
            }
        }

        let mut read = HashSet::new();
        for &s in &unit.ins {
            if !read.insert(s) {
                return Err(GraphError::DuplicateInlet {
                    unit: unit.name.clone(),
                    stream: streams[s.idx()].name.clone(),
                });
            }
        }
    }
    Ok(())
}
