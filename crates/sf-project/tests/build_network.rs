use std::path::Path;

use sf_core::{as_m3_per_day, as_mg_per_l};
use sf_project::{ProjectError, build_network, from_yaml_str, load, sim_options};
use sf_sim::{IntegratorType, SimError};
use sf_units::{PumpKind, UnitKind};

fn demo(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/projects")
        .join(name)
}

#[test]
fn demos_load_build_and_run() {
    for name in ["01_delay_line.yaml", "02_clarifier_line.yaml"] {
        let project = load(&demo(name)).unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        let mut network = build_network(&project).unwrap();
        let record = network.simulate(&sim_options(&project)).unwrap();
        let (_, x) = record.last().unwrap();
        assert!(x.iter().all(|v| v.is_finite()), "{name} produced a non-finite state");
    }
}

#[test]
fn delay_line_follows_influent() {
    let project = load(&demo("01_delay_line.yaml")).unwrap();
    let mut network = build_network(&project).unwrap();
    assert_eq!(
        network.unit("P_LIFT").unwrap().kind(),
        UnitKind::Pump(PumpKind::Lift)
    );

    network.simulate(&sim_options(&project)).unwrap();
    let effluent = network.product_reports().unwrap().remove(0);
    let s_s = as_mg_per_l(effluent.concentration("S_S").unwrap());
    let expected = 100.0 * (1.0 - (-5.0f64).exp());
    assert!((s_s - expected).abs() < 1e-3);
}

#[test]
fn clarifier_line_splits_solids() {
    let project = load(&demo("02_clarifier_line.yaml")).unwrap();
    let mut network = build_network(&project).unwrap();
    network.simulate(&sim_options(&project)).unwrap();

    let reports = network.product_reports().unwrap();
    let waste = reports.iter().find(|r| r.stream == "waste_sludge").unwrap();
    let effluent = reports.iter().find(|r| r.stream == "effluent").unwrap();

    assert!((as_m3_per_day(waste.flow) - 20.0).abs() < 1e-6);
    assert!((as_m3_per_day(effluent.flow) - 980.0).abs() < 1e-6);
    assert!((as_mg_per_l(waste.concentration("X_S").unwrap()) - 9975.0).abs() < 1e-3);
    assert!((as_mg_per_l(effluent.concentration("X_S").unwrap()) - 210.0 * 0.05 / 0.98).abs() < 1e-6);
}

#[test]
fn simulation_section_maps_to_options() {
    let project = load(&demo("02_clarifier_line.yaml")).unwrap();
    let opts = sim_options(&project);
    assert_eq!(opts.dt, 0.001);
    assert_eq!(opts.record_every, 50);
    assert_eq!(opts.integrator, IntegratorType::RK4);
}

#[test]
fn recycle_uses_initial_guess() {
    let yaml = r#"
version: 1
name: recycle
components: [X_S, H2O]
solvent: H2O
streams:
  - id: feed
    feed: { flow: 100.0, concentrations: { X_S: 50.0 } }
  - id: ras
    initial: { flow: 25.0, concentrations: { X_S: 50.0 } }
  - id: mixed
  - id: settled
  - id: effluent
units:
  - id: M1
    ins: [feed, ras]
    outs: [mixed]
    kind: { type: Mixer }
  - id: D1
    ins: [mixed]
    outs: [settled]
    kind: { type: HydraulicDelay, t_delay: 0.05 }
  - id: S1
    ins: [settled]
    outs: [ras, effluent]
    kind: { type: Splitter, split: { X_S: 0.2, H2O: 0.2 } }
"#;
    let project = from_yaml_str(yaml).unwrap();
    let mut network = build_network(&project).unwrap();
    assert_eq!(network.order().recycles().len(), 1);
    network.initialize().unwrap();
    let names: Vec<&str> = network.units_in_order().map(|u| u.name()).collect();
    assert_eq!(names, vec!["M1", "D1", "S1"]);
}

#[test]
fn recycle_without_guess_fails_to_initialize() {
    let yaml = r#"
version: 1
name: recycle
components: [X_S, H2O]
solvent: H2O
streams:
  - id: feed
    feed: { flow: 100.0 }
  - id: ras
  - id: mixed
  - id: effluent
units:
  - id: M1
    ins: [feed, ras]
    outs: [mixed]
    kind: { type: Mixer }
  - id: S1
    ins: [mixed]
    outs: [ras, effluent]
    kind: { type: Splitter, split: { H2O: 0.5 } }
"#;
    let project = from_yaml_str(yaml).unwrap();
    let mut network = build_network(&project).unwrap();
    assert!(matches!(network.initialize(), Err(SimError::Unit(_))));
}

#[test]
fn bad_reference_fraction_fails_at_build() {
    let yaml = r#"
version: 1
name: bad split
components: [X_S, H2O]
solvent: H2O
streams:
  - id: in
    feed: { flow: 1.0 }
  - id: a
  - id: b
units:
  - id: S1
    ins: [in]
    outs: [a, b]
    kind: { type: Splitter, split: { X_S: 0.5, H2O: 1.0 } }
"#;
    let project = from_yaml_str(yaml).unwrap();
    assert!(matches!(build_network(&project), Err(ProjectError::Unit(_))));
}
