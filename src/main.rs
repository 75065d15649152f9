use std::error::Error;
use std::fs;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use ufvm_rs::config::{CaseConfig, ChannelConfig};
use ufvm_rs::discretization::generator::Channel;
use ufvm_rs::discretization::mesh::Mesh;
use ufvm_rs::discretization::su2::read_su2;
use ufvm_rs::numerics::solver::SimpleSolver;
use ufvm_rs::processing::csv_writer;
use ufvm_rs::processing::summary::SimulationSummary;

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let case = match std::env::args().nth(1) {
        Some(path) => {
            info!(path, "Loading case");
            CaseConfig::from_file(&path)?
        }
        None => {
            info!("No case file given, using defaults");
            CaseConfig::default()
        }
    };

    let mesh = load_mesh(&case)?;

    let solver = SimpleSolver::new(case.solver.clone())?;
    let mut state = solver.initial_state(&mesh);
    let mut summary = SimulationSummary::from_problem(&mesh, &solver.config);

    let result = solver.solve(&mesh, &mut state)?;
    summary.add_solver_info(&result, &state);

    let out = &case.output;
    fs::create_dir_all(out)?;
    csv_writer::write_cell_fields(out.join("cells.csv"), &mesh, &state)?;
    csv_writer::write_history(out.join("history.csv"), &result.history)?;
    csv_writer::write_mesh(out.join("nodes.csv"), out.join("triangles.csv"), &mesh)?;
    summary.write_to_file(out.join("simulation_summary.txt"))?;

    info!("{}", summary.brief());
    info!(output = %out.display(), "Results written");
    Ok(())
}

fn load_mesh(case: &CaseConfig) -> Result<Mesh, Box<dyn Error>> {
    if case.mesh.exists() {
        info!(path = %case.mesh.display(), "Reading SU2 mesh");
        return Ok(read_su2(&case.mesh)?);
    }
    warn!(
        path = %case.mesh.display(),
        "Mesh file not found, generating a structured channel instead"
    );
    Ok(channel(&case.channel).build()?)
}

fn channel(cfg: &ChannelConfig) -> Channel {
    let channel = Channel::new(cfg.length, cfg.height, cfg.nx, cfg.ny);
    match cfg.block {
        Some([i0, i1, j0, j1]) => channel.with_block(i0..i1, j0..j1),
        None => channel,
    }
}

