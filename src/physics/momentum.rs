//! Discrete momentum equations.
//!
//! Convection is first-order upwind in the matrix with a TVD-limited
//! deferred correction in the source. Diffusion uses the orthogonal
//! conductance `nu E / d` implicitly and the cross-diffusion `nu grad.T`
//! explicitly. Boundary faces follow the rule of their condition.

use super::Component;
use super::bc::{BoundaryCondition, BoundaryConditions};
use super::state::FlowState;
use crate::discretization::mesh::Mesh;
use crate::numerics::limiter::FluxLimiter;
use crate::numerics::system::LinearSystem;
use glam::DVec2;
use nalgebra::DVector;

#[derive(Clone, Debug)]
pub struct MomentumAssembler {
    pub viscosity: f64,
    pub limiter: FluxLimiter,
    /// Relative tolerance under which two cell values count as equal and
    /// the limited correction is skipped.
    pub limiter_epsilon: f64,
}

impl MomentumAssembler {
    pub fn new(viscosity: f64, limiter: FluxLimiter, limiter_epsilon: f64) -> Self {
        Self {
            viscosity,
            limiter,
            limiter_epsilon,
        }
    }

    /// Fill `system` with the equation of one velocity component.
    pub fn assemble(
        &self,
        mesh: &Mesh,
        bc: &BoundaryConditions,
        state: &FlowState,
        component: Component,
        system: &mut LinearSystem,
    ) {
        system.reset();
        let nu = self.viscosity;
        let phi = state.cell_field(component);
        let phi_face = state.face_field(component);
        let grad = state.cell_gradient(component);
        let grad_face = state.face_gradient(component);
        let other = state.cell_field(component.other());

        for (c, cell) in mesh.cells.iter().enumerate() {
            let mut a_c = 0.0;
            let mut b_c = 0.0;

            for j in 0..3 {
                let f = cell.face_ids[j];
                let sign = cell.face_signs[j];
                let face = &mesh.faces[f];
                let m = sign * state.mass_flux[f];
                let n = face.normal * sign;
                let n_c = component.of(n);
                let pressure = state.p_face[f] * face.area * n_c;

                match bc.for_kind(face.kind) {
                    None => {
                        let Some(neighbour) = cell.neighbor_ids[j] else {
                            continue;
                        };
                        let conductance = nu * face.ortho_coeff / face.distance;
                        a_c += m.max(0.0) + conductance;
                        system.off[c][j] = -(-m).max(0.0) - conductance;
                        b_c += nu * grad_face[f].dot(face.cross_diffusion * sign) - pressure;
                        b_c += self.deferred_correction(
                            phi[c],
                            phi[neighbour],
                            grad[c],
                            grad[neighbour],
                            face.direction * (face.distance * sign),
                            m,
                        );
                    }
                    Some(BoundaryCondition::NoSlip) => {
                        let shear = nu * face.area / face.normal_distance;
                        a_c += shear * (1.0 - n_c * n_c);
                        b_c += shear * other[c] * n.x * n.y - pressure;
                    }
                    Some(BoundaryCondition::VelocityInlet(_)) => {
                        let conductance = nu * face.ortho_coeff / face.distance;
                        a_c += conductance;
                        b_c += -(m - conductance) * phi_face[f] - pressure;
                    }
                    Some(BoundaryCondition::PressureOutlet) => {
                        a_c += m;
                    }
                }
            }

            system.diag[c] = a_c;
            system.source[c] = b_c;
        }
    }

    /// Limited high-order part of the convective flux through one face,
    /// moved to the right-hand side. `d` points from `C` towards `F`.
    pub fn deferred_correction(
        &self,
        phi_c: f64,
        phi_f: f64,
        grad_c: DVec2,
        grad_f: DVec2,
        d: DVec2,
        m: f64,
    ) -> f64 {
        let jump = phi_f - phi_c;
        if jump.abs() <= self.limiter_epsilon * (1.0 + phi_c.abs().max(phi_f.abs())) {
            return 0.0;
        }
        let phi_upwind = phi_f - 2.0 * grad_c.dot(d);
        let phi_downwind = phi_c + 2.0 * grad_f.dot(d);
        let r_plus = (phi_c - phi_upwind) / jump;
        let r_minus = (phi_f - phi_downwind) / -jump;
        let forward = self.limiter.psi(r_plus) * m.max(0.0);
        let backward = self.limiter.psi(r_minus) * (-m).max(0.0);
        -0.5 * jump * (forward + backward)
    }

    /// Assemble both components and take one Jacobi step from the current
    /// velocities. `systems` keeps the coefficients for the pressure stage.
    pub fn predict(
        &self,
        mesh: &Mesh,
        bc: &BoundaryConditions,
        state: &FlowState,
        systems: &mut [LinearSystem; 2],
    ) -> (DVector<f64>, DVector<f64>) {
        let [system_u, system_v] = systems;
        self.assemble(mesh, bc, state, Component::U, system_u);
        self.assemble(mesh, bc, state, Component::V, system_v);
        (system_u.jacobi(mesh, &state.u), system_v.jacobi(mesh, &state.v))
    }
}
