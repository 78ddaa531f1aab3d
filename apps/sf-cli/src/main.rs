use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sf_core::{as_m3_per_day, as_mg_per_l};
use sf_project::{ProjectResult, build_network, sim_options};
use sf_sim::{IntegratorType, SimProgress};
use sf_units::OutletReport;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "SanFlow CLI - dynamic process network simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// List units, their ports and the evaluation order
    Units {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// Run a transient simulation
    Run {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
        /// Time step in days (overrides the project)
        #[arg(long)]
        dt: Option<f64>,
        /// End time in days (overrides the project)
        #[arg(long)]
        t_end: Option<f64>,
        /// Record every N-th step (overrides the project)
        #[arg(long)]
        record_every: Option<usize>,
        /// Integrator (overrides the project)
        #[arg(long, value_enum)]
        integrator: Option<IntegratorArg>,
        /// Write the recorded trajectory and final reports as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Rk4,
    Euler,
}

impl From<IntegratorArg> for IntegratorType {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Rk4 => IntegratorType::RK4,
            IntegratorArg::Euler => IntegratorType::ForwardEuler,
        }
    }
}

struct RunArgs {
    dt: Option<f64>,
    t_end: Option<f64>,
    record_every: Option<usize>,
    integrator: Option<IntegratorArg>,
    output: Option<PathBuf>,
}

fn main() -> ProjectResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Units { project_path } => cmd_units(&project_path),
        Commands::Run {
            project_path,
            dt,
            t_end,
            record_every,
            integrator,
            output,
        } => cmd_run(
            &project_path,
            RunArgs {
                dt,
                t_end,
                record_every,
                integrator,
                output,
            },
        ),
    }
}

fn cmd_validate(project_path: &Path) -> ProjectResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = sf_project::load(project_path)?;
    // Building catches what the schema cannot: bad split references, port
    // wiring that the unit types reject.
    build_network(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_units(project_path: &Path) -> ProjectResult<()> {
    let project = sf_project::load(project_path)?;
    let network = build_network(&project)?;

    println!(
        "Project '{}': {} components, {} units, {} streams",
        project.name,
        project.components.len(),
        project.units.len(),
        project.streams.len()
    );
    println!("\nUnits (evaluation order):");
    for unit in network.units_in_order() {
        let graph = network.graph();
        let names = |ids: &[sf_core::StreamId]| {
            ids.iter()
                .filter_map(|id| graph.stream(*id).map(|s| s.name.clone()))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {} - {}  ins=[{}]  outs=[{}]",
            unit.name(),
            unit.kind(),
            names(unit.core().ins()),
            names(unit.core().outs())
        );
    }

    let recycles = network.order().recycles();
    if !recycles.is_empty() {
        println!("\nRecycle loops:");
        for members in recycles {
            let names: Vec<&str> = members
                .iter()
                .filter_map(|id| network.graph().unit(*id).map(|u| u.name.as_str()))
                .collect();
            println!("  {}", names.join(" -> "));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RunExport {
    project: String,
    labels: Vec<String>,
    t: Vec<f64>,
    x: Vec<Vec<f64>>,
    products: Vec<ProductExport>,
}

#[derive(Serialize)]
struct ProductExport {
    stream: String,
    flow_m3_per_d: f64,
    concentrations_mg_per_l: BTreeMap<String, f64>,
}

impl From<&OutletReport> for ProductExport {
    fn from(report: &OutletReport) -> Self {
        Self {
            stream: report.stream.clone(),
            flow_m3_per_d: as_m3_per_day(report.flow),
            concentrations_mg_per_l: report
                .concentrations
                .iter()
                .map(|(id, c)| (id.clone(), as_mg_per_l(*c)))
                .collect(),
        }
    }
}

fn cmd_run(project_path: &Path, args: RunArgs) -> ProjectResult<()> {
    let project = sf_project::load(project_path)?;
    let mut opts = sim_options(&project);
    if let Some(dt) = args.dt {
        opts.dt = dt;
    }
    if let Some(t_end) = args.t_end {
        opts.t_end = t_end;
    }
    if let Some(n) = args.record_every {
        opts.record_every = n;
    }
    if let Some(integrator) = args.integrator {
        opts.integrator = integrator.into();
    }

    println!("Running transient simulation for project: {}", project.name);
    println!("  dt = {} d, t_end = {} d, integrator = {:?}", opts.dt, opts.t_end, opts.integrator);

    let started = Instant::now();
    let mut network = build_network(&project)?;
    let mut last_emit = Instant::now();
    let record = network.simulate_with_progress(&opts, |p| {
        if last_emit.elapsed().as_millis() >= 100 {
            render_progress(p, started);
            last_emit = Instant::now();
        }
    })?;
    clear_progress_line();
    info!(elapsed_s = started.elapsed().as_secs_f64(), "run finished");

    println!("✓ Simulation completed in {:.3}s", started.elapsed().as_secs_f64());
    println!("  Time points: {}", record.len());
    println!("  State size: {}", network.state_len());

    let products = network.product_reports()?;
    println!("\nProducts:");
    for report in &products {
        println!("  {}  Q = {:.4} m3/d", report.stream, as_m3_per_day(report.flow));
        for (id, c) in &report.concentrations {
            println!("    {:<10} {:>12.4} mg/L", id, as_mg_per_l(*c));
        }
    }

    if let Some(path) = args.output {
        let export = RunExport {
            project: project.name.clone(),
            labels: network.state_labels(),
            t: record.t.clone(),
            x: record.x.iter().map(|x| x.iter().copied().collect()).collect(),
            products: products.iter().map(ProductExport::from).collect(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&export)?)?;
        println!("\n✓ Exported {} time points to {}", record.len(), path.display());
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_progress(p: &SimProgress, started: Instant) {
    let width = 28usize;
    let filled = ((p.fraction() * width as f64).round() as usize).min(width);
    print!(
        "\r[{}{}] {:>6.2}%  t={:.4}/{:.4} d  step={}  elapsed={:.1}s",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled)),
        p.fraction() * 100.0,
        p.t,
        p.t_end,
        p.step,
        started.elapsed().as_secs_f64()
    );
    let _ = io::stdout().flush();
}
