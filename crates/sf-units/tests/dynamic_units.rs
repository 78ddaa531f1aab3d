//! Integration tests for the unit node contract across variants.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, dvector};
use proptest::prelude::*;
use sf_core::{ComponentRegistry, FLOW_LABEL, Tolerances, nearly_equal};
use sf_graph::{FlowGraph, GraphBuilder};
use sf_units::{
    CompiledOde, HydraulicDelay, MaterialFlow, Mixer, Pump, PumpKind, Splitter, SteadyUnit, StreamStore,
    UnitCore, UnitError, UnitNode,
};

fn registry() -> Arc<ComponentRegistry> {
    Arc::new(ComponentRegistry::new(["S_S", "X_S", "H2O"], "H2O").unwrap())
}

/// feed -> [unit] -> out (or two outs for splitters).
fn single_unit_graph(n_ins: usize, n_outs: usize) -> FlowGraph {
    let mut b = GraphBuilder::new();
    let u = b.add_unit("U1");
    for i in 0..n_ins {
        b.connect(format!("in{i}"), None, Some(u));
    }
    for j in 0..n_outs {
        b.connect(format!("out{j}"), Some(u), None);
    }
    b.build().unwrap()
}

fn core(graph: &FlowGraph) -> UnitCore {
    let id = graph.find_unit("U1").unwrap();
    UnitCore::from_graph(graph, id, registry()).unwrap()
}

fn set_input(graph: &FlowGraph, streams: &mut StreamStore, name: &str, state: DVector<f64>, dstate: DVector<f64>) {
    let id = graph.find_stream(name).unwrap();
    let buf = streams.get_mut(id).unwrap();
    buf.set_state(state);
    buf.set_dstate(dstate);
}

fn out_state(graph: &FlowGraph, streams: &StreamStore, name: &str) -> DVector<f64> {
    let id = graph.find_stream(name).unwrap();
    streams.get(id).unwrap().state().unwrap().clone()
}

fn out_dstate(graph: &FlowGraph, streams: &StreamStore, name: &str) -> DVector<f64> {
    let id = graph.find_stream(name).unwrap();
    streams.get(id).unwrap().dstate().unwrap().clone()
}

#[test]
fn single_input_mixer_and_pump_pass_through() {
    let input = dvector![12.0, 40.0, 0.0, 800.0];
    let dinput = dvector![0.5, -1.0, 0.0, 3.0];

    let graph = single_unit_graph(1, 1);
    let units: Vec<Box<dyn UnitNode>> = vec![
        Box::new(Mixer::new(core(&graph)).unwrap()),
        Box::new(Pump::new(core(&graph), PumpKind::Default).unwrap()),
    ];

    for mut unit in units {
        let mut streams = StreamStore::for_graph(&graph);
        set_input(&graph, &mut streams, "in0", input.clone(), dinput.clone());

        unit.init_state(&streams).unwrap();
        assert_eq!(unit.state_vector().unwrap(), &input);

        let state = unit.state_vector().unwrap().clone();
        unit.update_state(state, &mut streams).unwrap();
        unit.eval_ode(0.0, &mut streams).unwrap();

        assert_eq!(unit.dstate_vector().unwrap(), &dinput);
        assert_eq!(out_state(&graph, &streams, "out0"), input);
        assert_eq!(out_dstate(&graph, &streams, "out0"), dinput);
    }
}

#[test]
fn mixer_two_inputs_initial_state() {
    let reg = Arc::new(ComponentRegistry::new(["C1", "C2"], "C2").unwrap());
    let mut b = GraphBuilder::new();
    let u = b.add_unit("M1");
    b.connect("a", None, Some(u));
    b.connect("b", None, Some(u));
    b.connect("out", Some(u), None);
    let graph = b.build().unwrap();

    let mut streams = StreamStore::for_graph(&graph);
    streams.get_mut(graph.find_stream("a").unwrap()).unwrap().set_state(dvector![100.0, 0.0, 10.0]);
    streams.get_mut(graph.find_stream("b").unwrap()).unwrap().set_state(dvector![0.0, 200.0, 5.0]);

    let mut mixer = Mixer::new(UnitCore::from_graph(&graph, u, reg).unwrap()).unwrap();
    mixer.init_state(&streams).unwrap();

    let view = mixer.state().unwrap();
    assert!((view.get("C1").unwrap() - 66.667).abs() < 1e-3);
    assert!((view.get("C2").unwrap() - 66.667).abs() < 1e-3);
    assert!((view.get(FLOW_LABEL).unwrap() - 15.0).abs() < 1e-12);
}

#[test]
fn update_state_rejects_wrong_length_without_mutation() {
    let graph = single_unit_graph(1, 2);
    let mut splitter = Splitter::new(core(&graph), dvector![0.5, 0.8, 0.5]).unwrap();
    let mut streams = StreamStore::for_graph(&graph);

    let err = splitter
        .update_state(dvector![1.0, 2.0], &mut streams)
        .unwrap_err();
    assert_eq!(
        err,
        UnitError::ShapeMismatch {
            expected: 4,
            actual: 2
        }
    );
    assert!(splitter.state().is_none());
    assert!(streams.iter().all(|(_, b)| b.is_empty()));
}

#[test]
fn eval_before_init_is_an_error() {
    let graph = single_unit_graph(1, 1);
    let mut pump = Pump::new(core(&graph), PumpKind::Sludge).unwrap();
    let mut streams = StreamStore::for_graph(&graph);
    assert!(matches!(
        pump.eval_ode(0.0, &mut streams),
        Err(UnitError::Uninitialized { .. })
    ));
    assert!(pump.update_dstate(&mut streams).is_err());
}

#[test]
fn init_without_upstream_state_fails() {
    let graph = single_unit_graph(1, 1);
    let mut delay = HydraulicDelay::new(core(&graph), 0.1).unwrap();
    let streams = StreamStore::for_graph(&graph);
    assert!(matches!(
        delay.init_state(&streams),
        Err(UnitError::UninitializedStream { .. })
    ));
}

#[test]
fn splitter_derivative_is_scaled_per_branch() {
    let graph = single_unit_graph(1, 2);
    let mut splitter = Splitter::new(core(&graph), dvector![0.9, 0.2, 0.6]).unwrap();
    let mut streams = StreamStore::for_graph(&graph);
    let dinput = dvector![1.0, 2.0, 0.0, 10.0];
    set_input(&graph, &mut streams, "in0", dvector![5.0, 50.0, 0.0, 100.0], dinput.clone());

    splitter.init_state(&streams).unwrap();
    assert_eq!(*splitter.ode(), CompiledOde::PassThrough);
    splitter.eval_ode(0.0, &mut streams).unwrap();

    let [b0, b1] = splitter.branch_scales().clone();
    assert_eq!(out_dstate(&graph, &streams, "out0"), b0.component_mul(&dinput));
    assert_eq!(out_dstate(&graph, &streams, "out1"), b1.component_mul(&dinput));
}

#[test]
fn reset_is_idempotent_and_reinit_matches_fresh() {
    let graph = single_unit_graph(2, 1);
    let feed_a = dvector![10.0, 5.0, 0.0, 100.0];
    let feed_b = dvector![0.0, 50.0, 0.0, 300.0];

    let prepare = |streams: &mut StreamStore| {
        set_input(&graph, streams, "in0", feed_a.clone(), DVector::zeros(4));
        set_input(&graph, streams, "in1", feed_b.clone(), DVector::zeros(4));
    };

    // fresh network
    let mut fresh = Mixer::new(core(&graph)).unwrap();
    let mut fresh_streams = StreamStore::for_graph(&graph);
    prepare(&mut fresh_streams);
    fresh.init_state(&fresh_streams).unwrap();

    // reused network
    let mut mixer = Mixer::new(core(&graph)).unwrap();
    let mut streams = StreamStore::for_graph(&graph);
    mixer.reset_cache(&mut streams).unwrap(); // before any init
    prepare(&mut streams);
    mixer.init_state(&streams).unwrap();
    let s = mixer.state_vector().unwrap().clone();
    mixer.update_state(s, &mut streams).unwrap();
    mixer.eval_ode(0.0, &mut streams).unwrap();

    for _ in 0..3 {
        mixer.reset_cache(&mut streams).unwrap();
        assert!(mixer.state().is_none());
        assert!(mixer.dstate_vector().is_none());
        assert!(streams.get(graph.find_stream("out0").unwrap()).unwrap().is_empty());
    }

    mixer.init_state(&streams).unwrap();
    assert_eq!(mixer.state_vector(), fresh.state_vector());
    assert_eq!(mixer.dstate_vector(), fresh.dstate_vector());
}

#[test]
fn finalize_reports_every_outlet_without_solvent() {
    let graph = single_unit_graph(1, 2);
    let mut splitter = Splitter::new(core(&graph), dvector![1.0, 0.5, 0.5]).unwrap();
    let mut streams = StreamStore::for_graph(&graph);
    set_input(&graph, &mut streams, "in0", dvector![10.0, 20.0, 0.0, 100.0], DVector::zeros(4));

    splitter.init_state(&streams).unwrap();
    let s = splitter.state_vector().unwrap().clone();
    splitter.update_state(s, &mut streams).unwrap();

    let reports = splitter.finalize_outputs(&streams).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].stream, "out0");
    assert_eq!(reports[0].concentrations.len(), 2);
    assert!(reports[0].concentration("H2O").is_none());
    assert!(reports[1].concentration("S_S").is_some());
}

#[test]
fn steady_and_dynamic_splits_agree() {
    let reg = registry();
    let graph = single_unit_graph(1, 2);
    let mut splitter = Splitter::new(core(&graph), dvector![0.7, 0.1, 0.4]).unwrap();
    let mut streams = StreamStore::for_graph(&graph);
    let state = dvector![30.0, 200.0, 0.0, 1000.0];
    splitter.update_state(state.clone(), &mut streams).unwrap();

    let dynamic: Vec<MaterialFlow> = ["out0", "out1"]
        .iter()
        .map(|n| MaterialFlow::from_state(&reg, &out_state(&graph, &streams, n)).unwrap())
        .collect();

    let steady = splitter
        .run(&[MaterialFlow::from_state(&reg, &state).unwrap()])
        .unwrap();

    for (d, s) in dynamic.iter().zip(&steady) {
        assert!((d.as_vector() - s.as_vector()).norm() < 1e-9);
    }
}

fn positive_rows(n_rows: usize, n_cols: usize) -> impl Strategy<Value = DMatrix<f64>> {
    proptest::collection::vec(0.1f64..1000.0, n_rows * n_cols)
        .prop_map(move |v| DMatrix::from_row_slice(n_rows, n_cols, &v))
}

fn any_rows(n_rows: usize, n_cols: usize) -> impl Strategy<Value = DMatrix<f64>> {
    proptest::collection::vec(-50.0f64..50.0, n_rows * n_cols)
        .prop_map(move |v| DMatrix::from_row_slice(n_rows, n_cols, &v))
}

proptest! {
    #[test]
    fn mixer_derivative_matches_quotient_rule(
        (ins, dins) in (2usize..5).prop_flat_map(|k| (positive_rows(k, 4), any_rows(k, 4)))
    ) {
        let n = 3;
        let ode = CompiledOde::Mixer { n_ins: ins.nrows() };
        let d = ode.eval(0.0, &ins, &DVector::zeros(4), &dins).unwrap();

        let q: f64 = (0..ins.nrows()).map(|r| ins[(r, n)]).sum();
        let dq: f64 = (0..ins.nrows()).map(|r| dins[(r, n)]).sum();
        prop_assert!((d[n] - dq).abs() <= 1e-9 * (1.0 + dq.abs()));

        for j in 0..n {
            let c: f64 = (0..ins.nrows()).map(|r| ins[(r, n)] * ins[(r, j)]).sum::<f64>() / q;
            let num: f64 = (0..ins.nrows())
                .map(|r| dins[(r, n)] * ins[(r, j)] + ins[(r, n)] * dins[(r, j)])
                .sum::<f64>()
                - dq * c;
            let expected = num / q;
            prop_assert!((d[j] - expected).abs() <= 1e-8 * (1.0 + expected.abs()));

            // Same value from a finite difference of the mixed state along (dQ, dC).
            let h = 1e-6;
            let mixed = sf_units::ode::mix_state(&ins).unwrap();
            let stepped = sf_units::ode::mix_state(&(&ins + &dins * h)).unwrap();
            let fd = (stepped[j] - mixed[j]) / h;
            prop_assert!((fd - d[j]).abs() <= 1e-3 * (1.0 + d[j].abs()));
        }
    }

    #[test]
    fn splitter_conserves_every_component(
        split in proptest::collection::vec(0.0f64..=1.0, 2),
        s_ref in 0.01f64..0.99,
        conc in proptest::collection::vec(0.0f64..500.0, 3),
        q in 1.0f64..10_000.0,
    ) {
        let graph = single_unit_graph(1, 2);
        let s = dvector![split[0], split[1], s_ref];
        let mut splitter = Splitter::new(core(&graph), s).unwrap();
        let mut streams = StreamStore::for_graph(&graph);
        let state = dvector![conc[0], conc[1], conc[2], q];
        splitter.update_state(state, &mut streams).unwrap();

        let b0 = out_state(&graph, &streams, "out0");
        let b1 = out_state(&graph, &streams, "out1");
        let tol = Tolerances::default();
        let tight = Tolerances { abs: 1e-9, rel: 1e-9 };
        prop_assert!(nearly_equal(b0[3] + b1[3], q, tol));
        for i in 0..3 {
            let total = q * conc[i];
            let split_total = b0[3] * b0[i] + b1[3] * b1[i];
            prop_assert!(nearly_equal(split_total, total, tight));
        }
    }
}
