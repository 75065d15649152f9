use crate::config::{ConfigError, SimpleConfig};
use crate::discretization::mesh::Mesh;
use crate::numerics::system::LinearSystem;
use crate::numerics::timing::{
    finalize_and_log, record_gradients, record_momentum, record_pressure, reset_timing,
};
use crate::physics::bc::BoundaryConditions;
use crate::physics::momentum::MomentumAssembler;
use crate::physics::pressure::PressureCorrectionSolver;
use crate::physics::state::FlowState;
use nalgebra::DVector;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("field `{field}` became non-finite at iteration {iteration}")]
    NumericalDivergence { iteration: usize, field: &'static str },
    #[error("the mesh carries no inflow, mass imbalance is undefined")]
    NoInflow,
    #[error("invalid solver settings: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every enabled convergence criterion was met.
    Converged,
    /// The outer iteration budget ran out.
    BudgetExhausted,
}

/// Diagnostics of one outer iteration.
#[derive(Clone, Copy, Debug)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Global mass imbalance in percent.
    pub mass_imbalance: f64,
    /// Norm of the cell velocity change, worst component.
    pub update_norm: f64,
    pub pressure_sweeps: usize,
    pub pressure_residual: f64,
}

pub struct SolverResult {
    pub iterations: usize,
    pub termination: Termination,
    pub history: Vec<IterationRecord>,
}

impl SolverResult {
    pub fn final_imbalance(&self) -> Option<f64> {
        self.history.last().map(|r| r.mass_imbalance)
    }
}

/// Scratch storage reused across outer iterations.
pub struct Workspace {
    pub momentum: [LinearSystem; 2],
    pub pressure: LinearSystem,
    /// Predicted (not yet corrected) velocities of the latest iteration.
    pub u_star: DVector<f64>,
    pub v_star: DVector<f64>,
}

impl Workspace {
    pub fn new(num_cells: usize) -> Self {
        Self {
            momentum: [LinearSystem::new(num_cells), LinearSystem::new(num_cells)],
            pressure: LinearSystem::new(num_cells),
            u_star: DVector::zeros(num_cells),
            v_star: DVector::zeros(num_cells),
        }
    }
}

/// Segregated SIMPLE loop: gradients, momentum prediction, pressure
/// correction, diagnostics.
pub struct SimpleSolver {
    pub config: SimpleConfig,
    pub bc: BoundaryConditions,
    momentum: MomentumAssembler,
    pressure: PressureCorrectionSolver,
}

impl SimpleSolver {
    pub fn new(config: SimpleConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let bc = BoundaryConditions::channel(config.inlet_velocity);
        let momentum =
            MomentumAssembler::new(config.viscosity, config.limiter, config.limiter_epsilon);
        let pressure = PressureCorrectionSolver::new(
            config.pressure_relaxation,
            config.pressure_sweeps,
            config.pressure_tolerance,
        );
        Ok(Self {
            config,
            bc,
            momentum,
            pressure,
        })
    }

    /// Zero-velocity start with the inlet flux prescribed.
    pub fn initial_state(&self, mesh: &Mesh) -> FlowState {
        FlowState::new(mesh, &self.bc)
    }

    /// One outer iteration on `state`.
    pub fn step(
        &self,
        mesh: &Mesh,
        state: &mut FlowState,
        workspace: &mut Workspace,
        iteration: usize,
    ) -> Result<IterationRecord, SolverError> {
        let previous_u = state.u.clone();
        let previous_v = state.v.clone();

        record_gradients(|| state.update_gradients(mesh, &self.bc));

        let (u_star, v_star) = record_momentum(|| {
            self.momentum.predict(mesh, &self.bc, state, &mut workspace.momentum)
        });
        workspace.u_star = u_star;
        workspace.v_star = v_star;

        let correction = record_pressure(|| {
            self.pressure.correct(
                mesh,
                &self.bc,
                state,
                (&workspace.u_star, &workspace.v_star),
                &workspace.momentum,
                &mut workspace.pressure,
            )
        });

        if let Some(field) = state.non_finite_field() {
            warn!(iteration, field, "Solution diverged");
            return Err(SolverError::NumericalDivergence { iteration, field });
        }

        let mass_imbalance = state.mass_imbalance(mesh).ok_or(SolverError::NoInflow)?;
        let norm = |delta: DVector<f64>| self.config.convergence.norm(&delta);
        let update_norm = norm(&state.u - previous_u).max(norm(&state.v - previous_v));

        Ok(IterationRecord {
            iteration,
            mass_imbalance,
            update_norm,
            pressure_sweeps: correction.sweeps,
            pressure_residual: correction.residual,
        })
    }

    /// Iterate until the budget is spent or the convergence criteria hold.
    pub fn solve(&self, mesh: &Mesh, state: &mut FlowState) -> Result<SolverResult, SolverError> {
        if !(state.inflow(mesh) > 0.0) {
            return Err(SolverError::NoInflow);
        }
        let budget = self.config.iterations;
        info!(
            cells = mesh.num_cells(),
            faces = mesh.num_faces(),
            budget,
            reynolds = self.config.reynolds_number(),
            limiter = ?self.config.limiter,
            "Starting SIMPLE iterations"
        );

        reset_timing();
        let start = Instant::now();
        let mut workspace = Workspace::new(mesh.num_cells());
        let mut history = Vec::with_capacity(budget.min(10_000));
        let mut initial_update = None;
        let mut termination = Termination::BudgetExhausted;

        for iteration in 0..budget {
            let record = self.step(mesh, state, &mut workspace, iteration)?;
            let init = *initial_update.get_or_insert(record.update_norm);

            if iteration % self.config.log_interval == 0 {
                info!(
                    iteration,
                    imbalance = record.mass_imbalance,
                    update = record.update_norm,
                    "Outer iteration"
                );
            } else {
                debug!(
                    iteration,
                    imbalance = record.mass_imbalance,
                    update = record.update_norm,
                    pressure_residual = record.pressure_residual,
                    "Outer iteration"
                );
            }
            history.push(record);

            if self
                .config
                .convergence
                .check_convergence(record.mass_imbalance, record.update_norm, init)
            {
                termination = Termination::Converged;
                break;
            }
        }

        finalize_and_log(start.elapsed());
        let iterations = history.len();
        let imbalance = history.last().map(|r| r.mass_imbalance);
        match termination {
            Termination::Converged => info!(iterations, imbalance = ?imbalance, "Converged"),
            Termination::BudgetExhausted => {
                info!(iterations, imbalance = ?imbalance, "Iteration budget exhausted")
            }
        }

        Ok(SolverResult {
            iterations,
            termination,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_channel_mesh;

    fn config(iterations: usize) -> SimpleConfig {
        SimpleConfig {
            iterations,
            viscosity: 0.05,
            ..SimpleConfig::default()
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut cfg = config(10);
        cfg.pressure_relaxation = 0.0;
        assert!(matches!(SimpleSolver::new(cfg), Err(SolverError::InvalidConfig(_))));
    }

    #[test]
    fn runs_the_full_budget_without_criteria() {
        let mesh = create_channel_mesh(2.0, 1.0, 8, 4).unwrap();
        let solver = SimpleSolver::new(config(25)).unwrap();
        let mut state = solver.initial_state(&mesh);
        let result = solver.solve(&mesh, &mut state).unwrap();
        assert_eq!(result.iterations, 25);
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert_eq!(result.history.len(), 25);
        assert!(result.history.iter().all(|r| r.pressure_sweeps == 10));
    }

    #[test]
    fn missing_inflow_is_an_error() {
        let mesh = create_channel_mesh(2.0, 1.0, 4, 2).unwrap();
        let solver = SimpleSolver::new(config(5)).unwrap();
        let mut state = solver.initial_state(&mesh);
        state.mass_flux.fill(0.0);
        assert!(matches!(solver.solve(&mesh, &mut state), Err(SolverError::NoInflow)));
    }

    #[test]
    fn non_finite_state_is_reported() {
        let mesh = create_channel_mesh(2.0, 1.0, 4, 2).unwrap();
        let solver = SimpleSolver::new(config(5)).unwrap();
        let mut state = solver.initial_state(&mesh);
        state.p[0] = f64::NAN;
        let err = solver.solve(&mesh, &mut state).err().unwrap();
        assert!(matches!(err, SolverError::NumericalDivergence { iteration: 0, .. }));
    }
}
