use crate::config::SimpleConfig;
use crate::discretization::mesh::{FaceKind, Mesh};
use crate::numerics::solver::{SolverResult, Termination};
use crate::physics::state::FlowState;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub struct SimulationSummary {
    // Mesh info
    pub num_cells: usize,
    pub num_faces: usize,
    pub num_nodes: usize,
    pub faces_per_kind: [(FaceKind, usize); 4],
    pub domain_extent: ((f64, f64), (f64, f64)),
    pub min_cell_spacing: f64,
    pub max_cell_spacing: f64,
    pub total_area: f64,

    // Physics info
    pub inlet_velocity: f64,
    pub viscosity: f64,
    pub reynolds_number: f64,

    // Solver info
    pub iterations: Option<usize>,
    pub termination: Option<Termination>,
    pub final_imbalance: Option<f64>,
    pub max_speed: Option<f64>,
    pub pressure_range: Option<(f64, f64)>,
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

impl SimulationSummary {
    pub fn from_problem(mesh: &Mesh, config: &SimpleConfig) -> Self {
        let xs = min_max(mesh.nodes.iter().map(|n| n.position.x));
        let ys = min_max(mesh.nodes.iter().map(|n| n.position.y));
        let (min_spacing, max_spacing) = mesh.spacing().unwrap_or((0.0, 0.0));

        Self {
            num_cells: mesh.num_cells(),
            num_faces: mesh.num_faces(),
            num_nodes: mesh.nodes.len(),
            faces_per_kind: FaceKind::BOUNDARY.map(|k| (k, mesh.count_faces(k))),
            domain_extent: (xs, ys),
            min_cell_spacing: min_spacing,
            max_cell_spacing: max_spacing,
            total_area: mesh.total_area(),
            inlet_velocity: config.inlet_velocity,
            viscosity: config.viscosity,
            reynolds_number: config.reynolds_number(),
            iterations: None,
            termination: None,
            final_imbalance: None,
            max_speed: None,
            pressure_range: None,
        }
    }

    pub fn add_solver_info(&mut self, result: &SolverResult, state: &FlowState) {
        self.iterations = Some(result.iterations);
        self.termination = Some(result.termination);
        self.final_imbalance = result.final_imbalance();
        self.max_speed = (0..state.u.len())
            .map(|c| state.velocity(c).length())
            .reduce(f64::max);
        self.pressure_range = (!state.p.is_empty()).then(|| min_max(state.p.iter().copied()));
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.to_string())
    }

    /// One-line report for the log.
    pub fn brief(&self) -> String {
        let mut out = format!(
            "{} cells, {} nodes, Re = {:.1}",
            self.num_cells, self.num_nodes, self.reynolds_number
        );
        if let (Some(iterations), Some(termination)) = (self.iterations, self.termination) {
            out.push_str(&format!("; {iterations} iterations ({termination:?})"));
        }
        if let Some(imbalance) = self.final_imbalance {
            out.push_str(&format!("; mass imbalance {imbalance:.5}%"));
        }
        out
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let thin = "-".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "CHANNEL FLOW SIMULATION SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        writeln!(f, "MESH STATISTICS")?;
        writeln!(f, "{thin}")?;
        writeln!(f, "Number of cells:     {}", self.num_cells)?;
        writeln!(f, "Number of faces:     {}", self.num_faces)?;
        writeln!(f, "Number of nodes:     {}", self.num_nodes)?;
        for (kind, count) in self.faces_per_kind {
            writeln!(f, "  {:<18} {count}", format!("{kind:?} faces:"))?;
        }
        let ((x0, x1), (y0, y1)) = self.domain_extent;
        writeln!(f, "Domain extent:       [{x0:.4}, {x1:.4}] x [{y0:.4}, {y1:.4}]")?;
        writeln!(f, "Fluid area:          {:.6e}", self.total_area)?;
        writeln!(f, "Min cell spacing:    {:.6e}", self.min_cell_spacing)?;
        writeln!(f, "Max cell spacing:    {:.6e}", self.max_cell_spacing)?;
        writeln!(f)?;

        writeln!(f, "FLOW PARAMETERS")?;
        writeln!(f, "{thin}")?;
        writeln!(f, "Inlet velocity:      {:.4}", self.inlet_velocity)?;
        writeln!(f, "Viscosity:           {:.4e}", self.viscosity)?;
        writeln!(f, "Reynolds number:     {:.2}", self.reynolds_number)?;
        writeln!(f)?;

        if let (Some(iterations), Some(termination)) = (self.iterations, self.termination) {
            writeln!(f, "SOLVER PERFORMANCE")?;
            writeln!(f, "{thin}")?;
            writeln!(f, "Iterations:          {iterations}")?;
            writeln!(f, "Termination:         {termination:?}")?;
            if let Some(imbalance) = self.final_imbalance {
                writeln!(f, "Mass imbalance:      {imbalance:.6e} %")?;
            }
            if let Some(speed) = self.max_speed {
                writeln!(f, "Max speed:           {speed:.6e}")?;
            }
            if let Some((lo, hi)) = self.pressure_range {
                writeln!(f, "Pressure range:      {lo:.6e} to {hi:.6e}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "{rule}")
    }
}
