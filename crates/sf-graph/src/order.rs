//! Evaluation order for derivative composition.
//!
//! Units are ordered so that every producer precedes its consumers. Recycle
//! loops (strongly connected components) cannot be ordered that way; their
//! members are kept adjacent in declaration order and reported so the caller
//! can decide how to resolve them.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use sf_core::NodeId;

use crate::graph::FlowGraph;

/// Topological unit order plus the recycle loops found along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOrder {
    order: Vec<NodeId>,
    recycles: Vec<Vec<NodeId>>,
}

impl EvaluationOrder {
    /// Units in evaluation order.
    pub fn units(&self) -> &[NodeId] {
        &self.order
    }

    /// Each recycle loop as its member units, in declaration order.
    pub fn recycles(&self) -> &[Vec<NodeId>] {
        &self.recycles
    }

    pub fn is_acyclic(&self) -> bool {
        self.recycles.is_empty()
    }

    /// Position of a unit in the order.
    pub fn position(&self, unit: NodeId) -> Option<usize> {
        self.order.iter().position(|&u| u == unit)
    }
}

impl FlowGraph {
    /// Compute the evaluation order. Never fails: cycles are reported, not rejected.
    pub fn evaluation_order(&self) -> EvaluationOrder {
        let mut g: DiGraph<NodeId, ()> = DiGraph::with_capacity(self.units.len(), 0);
        let idx: Vec<NodeIndex> = self.units.iter().map(|u| g.add_node(u.id)).collect();
        for unit in &self.units {
            for consumer in self.downstream(unit.id) {
                g.update_edge(idx[unit.id.idx()], idx[consumer.idx()], ());
            }
        }

        // tarjan_scc yields components in reverse topological order.
        let mut sccs = tarjan_scc(&g);
        sccs.reverse();

        let mut order = Vec::with_capacity(self.units.len());
        let mut recycles = Vec::new();
        for mut scc in sccs {
            scc.sort_by_key(|n| n.index());
            let members: Vec<NodeId> = scc.iter().map(|n| g[*n]).collect();
            let self_loop = scc.len() == 1 && g.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                recycles.push(members.clone());
            }
            order.extend(members);
        }

        EvaluationOrder { order, recycles }
    }
}

#[cfg(test)]
mod tests {
    use crate::GraphBuilder;

    #[test]
    fn chain_is_ordered_upstream_first() {
        let mut b = GraphBuilder::new();
        // Declared out of flow order on purpose.
        let p2 = b.add_unit("P2");
        let p1 = b.add_unit("P1");
        b.connect("feed", None, Some(p1));
        b.connect("mid", Some(p1), Some(p2));
        b.connect("out", Some(p2), None);
        let graph = b.build().unwrap();

        let order = graph.evaluation_order();
        assert_eq!(order.units(), &[p1, p2]);
        assert!(order.is_acyclic());
    }

    #[test]
    fn recycle_loop_is_reported() {
        let mut b = GraphBuilder::new();
        let mixer = b.add_unit("M1");
        let delay = b.add_unit("D1");
        let splitter = b.add_unit("S1");
        let pump = b.add_unit("P1");
        b.connect("influent", None, Some(mixer));
        b.connect("mixed", Some(mixer), Some(delay));
        b.connect("delayed", Some(delay), Some(splitter));
        b.connect("effluent", Some(splitter), Some(pump));
        b.connect("recycle", Some(splitter), Some(mixer));
        b.connect("out", Some(pump), None);
        let graph = b.build().unwrap();

        let order = graph.evaluation_order();
        assert_eq!(order.recycles().len(), 1);
        assert_eq!(order.recycles()[0], vec![mixer, delay, splitter]);
        assert_eq!(order.units(), &[mixer, delay, splitter, pump]);
        assert!(order.position(pump) > order.position(splitter));
    }
}
