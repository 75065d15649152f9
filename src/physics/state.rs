use super::Component;
use super::bc::{BoundaryCondition, BoundaryConditions};
use crate::discretization::mesh::{FaceKind, Mesh};
use crate::numerics::gradient::{cell_gradients, face_gradients, interpolate_to_faces};
use glam::DVec2;
use nalgebra::DVector;

/// All flow fields, owned by the iteration loop and updated in place.
///
/// Mass flux is signed along the stored face normal, i.e. positive when
/// leaving the face's first owner.
#[derive(Clone, Debug)]
pub struct FlowState {
    pub u: DVector<f64>,
    pub v: DVector<f64>,
    pub p: DVector<f64>,
    pub u_face: DVector<f64>,
    pub v_face: DVector<f64>,
    pub p_face: DVector<f64>,
    pub mass_flux: DVector<f64>,
    pub grad_u: Vec<DVec2>,
    pub grad_v: Vec<DVec2>,
    pub grad_p: Vec<DVec2>,
    pub grad_u_face: Vec<DVec2>,
    pub grad_v_face: Vec<DVec2>,
    pub grad_p_face: Vec<DVec2>,
}

impl FlowState {
    /// Fluid at rest; only the prescribed inlet fluxes are set.
    pub fn new(mesh: &Mesh, bc: &BoundaryConditions) -> Self {
        let (n_cells, n_faces) = (mesh.num_cells(), mesh.num_faces());
        let mass_flux =
            DVector::from_fn(n_faces, |f, _| bc.fixed_flux(&mesh.faces[f]).unwrap_or(0.0));
        Self {
            u: DVector::zeros(n_cells),
            v: DVector::zeros(n_cells),
            p: DVector::zeros(n_cells),
            u_face: DVector::zeros(n_faces),
            v_face: DVector::zeros(n_faces),
            p_face: DVector::zeros(n_faces),
            mass_flux,
            grad_u: vec![DVec2::ZERO; n_cells],
            grad_v: vec![DVec2::ZERO; n_cells],
            grad_p: vec![DVec2::ZERO; n_cells],
            grad_u_face: vec![DVec2::ZERO; n_faces],
            grad_v_face: vec![DVec2::ZERO; n_faces],
            grad_p_face: vec![DVec2::ZERO; n_faces],
        }
    }

    /// Uniform stream: every cell moves with `velocity`, fluxes follow it
    /// through all faces except no-slip ones, pressure is zero.
    pub fn uniform(mesh: &Mesh, bc: &BoundaryConditions, velocity: DVec2) -> Self {
        let mut state = Self::new(mesh, bc);
        state.u.fill(velocity.x);
        state.v.fill(velocity.y);
        for (f, face) in mesh.faces.iter().enumerate() {
            let condition = bc.for_kind(face.kind);
            state.mass_flux[f] = match condition {
                Some(BoundaryCondition::NoSlip) => 0.0,
                Some(BoundaryCondition::VelocityInlet(_)) => state.mass_flux[f],
                _ => velocity.dot(face.area_vector()),
            };
            let face_velocity = bc.face_velocity(face.kind, velocity);
            state.u_face[f] = face_velocity.x;
            state.v_face[f] = face_velocity.y;
        }
        state
    }

    #[inline]
    pub fn velocity(&self, cell: usize) -> DVec2 {
        DVec2::new(self.u[cell], self.v[cell])
    }

    pub fn cell_field(&self, component: Component) -> &DVector<f64> {
        match component {
            Component::U => &self.u,
            Component::V => &self.v,
        }
    }

    pub fn face_field(&self, component: Component) -> &DVector<f64> {
        match component {
            Component::U => &self.u_face,
            Component::V => &self.v_face,
        }
    }

    pub fn cell_gradient(&self, component: Component) -> &[DVec2] {
        match component {
            Component::U => &self.grad_u,
            Component::V => &self.grad_v,
        }
    }

    pub fn face_gradient(&self, component: Component) -> &[DVec2] {
        match component {
            Component::U => &self.grad_u_face,
            Component::V => &self.grad_v_face,
        }
    }

    /// Refresh face values and gradients of velocity and pressure from the
    /// current cell fields.
    pub fn update_gradients(&mut self, mesh: &Mesh, bc: &BoundaryConditions) {
        let u_interp = interpolate_to_faces(mesh, &self.u);
        let v_interp = interpolate_to_faces(mesh, &self.v);
        let p_interp = interpolate_to_faces(mesh, &self.p);
        for (f, face) in mesh.faces.iter().enumerate() {
            let velocity = bc.face_velocity(face.kind, DVec2::new(u_interp[f], v_interp[f]));
            self.u_face[f] = velocity.x;
            self.v_face[f] = velocity.y;
            self.p_face[f] = bc.face_pressure(face.kind, p_interp[f]);
        }

        self.grad_u = cell_gradients(mesh, &self.u_face);
        self.grad_v = cell_gradients(mesh, &self.v_face);
        self.grad_p = cell_gradients(mesh, &self.p_face);

        self.grad_u_face = face_gradients(mesh, &self.u, &self.u_face, &self.grad_u);
        self.grad_v_face = face_gradients(mesh, &self.v, &self.v_face, &self.grad_v);
        self.grad_p_face = face_gradients(mesh, &self.p, &self.p_face, &self.grad_p);
    }

    fn boundary_flux(&self, mesh: &Mesh, kind: FaceKind) -> f64 {
        mesh.faces_of_kind(kind).map(|f| self.mass_flux[f]).sum()
    }

    /// Volume flow entering through the inlet (positive).
    pub fn inflow(&self, mesh: &Mesh) -> f64 {
        -self.boundary_flux(mesh, FaceKind::Inlet)
    }

    pub fn outflow(&self, mesh: &Mesh) -> f64 {
        self.boundary_flux(mesh, FaceKind::Outlet)
    }

    /// Global mass imbalance `(out - in) / in` in percent; `None` without
    /// inflow.
    pub fn mass_imbalance(&self, mesh: &Mesh) -> Option<f64> {
        let inflow = self.inflow(mesh);
        (inflow > 0.0).then(|| (self.outflow(mesh) - inflow) / inflow * 100.0)
    }

    /// Name of the first solution field holding NaN or infinity.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("u", &self.u),
            ("v", &self.v),
            ("p", &self.p),
            ("mass_flux", &self.mass_flux),
        ]
        .into_iter()
        .find(|(_, field)| field.iter().any(|x| !x.is_finite()))
        .map(|(name, _)| name)
    }
}
