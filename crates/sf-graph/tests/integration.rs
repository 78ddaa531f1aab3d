//! Integration tests for sf-graph.

use sf_graph::{GraphBuilder, GraphError};

#[test]
fn splitter_with_shared_product_reader() {
    // influent -> [S1] -> a -> [P1] -> out
    //                 \-> b -> [P2] -> out2
    // `a` is also monitored by a second consumer.
    let mut b = GraphBuilder::new();
    let s1 = b.add_unit("S1");
    let p1 = b.add_unit("P1");
    let p2 = b.add_unit("P2");
    let monitor = b.add_unit("monitor");

    let influent = b.connect("influent", None, Some(s1));
    let a = b.connect("a", Some(s1), Some(p1));
    b.add_consumer(a, monitor);
    let branch_b = b.connect("b", Some(s1), Some(p2));
    let out = b.connect("out", Some(p1), None);
    let out2 = b.connect("out2", Some(p2), None);

    let graph = b.build().unwrap();

    assert_eq!(graph.units().len(), 4);
    assert_eq!(graph.streams().len(), 5);
    assert_eq!(graph.unit_outs(s1), &[a, branch_b]);
    assert_eq!(graph.stream(a).unwrap().consumers, vec![p1, monitor]);
    assert_eq!(graph.feeds(), vec![influent]);
    assert_eq!(graph.products(), vec![out, out2]);
    assert_eq!(graph.find_unit("P2"), Some(p2));
    assert_eq!(graph.find_stream("out2"), Some(out2));
    assert!(graph.find_unit("nope").is_none());

    let downstream: Vec<_> = graph.downstream(s1).collect();
    assert_eq!(downstream, vec![p1, monitor, p2]);

    let order = graph.evaluation_order();
    assert!(order.is_acyclic());
    assert_eq!(order.units()[0], s1);
}

#[test]
fn duplicate_names_rejected() {
    let mut b = GraphBuilder::new();
    b.add_unit("M1");
    b.add_unit("M1");
    assert!(matches!(
        b.build(),
        Err(GraphError::DuplicateName { what: "unit", .. })
    ));

    let mut b = GraphBuilder::new();
    b.add_stream("s");
    b.add_stream("s");
    assert!(matches!(
        b.build(),
        Err(GraphError::DuplicateName { what: "stream", .. })
    ));
}

#[test]
fn duplicate_inlet_rejected() {
    let mut b = GraphBuilder::new();
    let m = b.add_unit("M1");
    let s = b.add_stream("feed");
    b.add_consumer(s, m);
    b.add_consumer(s, m);
    assert!(matches!(b.build(), Err(GraphError::DuplicateInlet { .. })));
}

#[test]
fn dangling_reference_rejected() {
    let mut donor = GraphBuilder::new();
    let ghost = donor.add_unit("ghost");

    let mut b = GraphBuilder::new();
    let s = b.add_stream("s");
    b.add_consumer(s, ghost);
    assert!(matches!(b.build(), Err(GraphError::InvalidUnitRef { .. })));
}

#[test]
fn self_recycle_is_a_loop() {
    let mut b = GraphBuilder::new();
    let m = b.add_unit("M1");
    b.connect("feed", None, Some(m));
    b.connect("loop", Some(m), Some(m));
    let graph = b.build().unwrap();

    let order = graph.evaluation_order();
    assert_eq!(order.recycles(), &[vec![m]]);
}
