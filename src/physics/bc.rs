use crate::discretization::mesh::{Face, FaceKind};
use glam::DVec2;

/// Condition applied on one boundary class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryCondition {
    /// Zero velocity, zero normal flux, extrapolated pressure.
    NoSlip,
    /// Fixed velocity and therefore fixed mass flux.
    VelocityInlet(DVec2),
    /// Zero-gradient velocity, pressure (and its correction) pinned to zero.
    PressureOutlet,
}

/// Conditions for the four boundary classes of a channel case.
#[derive(Clone, Debug)]
pub struct BoundaryConditions {
    pub wall: BoundaryCondition,
    pub body: BoundaryCondition,
    pub inlet: BoundaryCondition,
    pub outlet: BoundaryCondition,
}

impl BoundaryConditions {
    /// No-slip walls and body, uniform inflow `(speed, 0)`, gauge outlet.
    pub fn channel(inlet_speed: f64) -> Self {
        Self {
            wall: BoundaryCondition::NoSlip,
            body: BoundaryCondition::NoSlip,
            inlet: BoundaryCondition::VelocityInlet(DVec2::new(inlet_speed, 0.0)),
            outlet: BoundaryCondition::PressureOutlet,
        }
    }

    /// `None` for interior faces.
    pub fn for_kind(&self, kind: FaceKind) -> Option<BoundaryCondition> {
        match kind {
            FaceKind::Wall => Some(self.wall),
            FaceKind::Body => Some(self.body),
            FaceKind::Inlet => Some(self.inlet),
            FaceKind::Outlet => Some(self.outlet),
            FaceKind::Interior => None,
        }
    }

    /// Face velocity given the interpolated cell value.
    pub fn face_velocity(&self, kind: FaceKind, interpolated: DVec2) -> DVec2 {
        match self.for_kind(kind) {
            Some(BoundaryCondition::NoSlip) => DVec2::ZERO,
            Some(BoundaryCondition::VelocityInlet(velocity)) => velocity,
            Some(BoundaryCondition::PressureOutlet) | None => interpolated,
        }
    }

    /// Face pressure (or pressure correction) given the interpolated value.
    pub fn face_pressure(&self, kind: FaceKind, interpolated: f64) -> f64 {
        match self.for_kind(kind) {
            Some(BoundaryCondition::PressureOutlet) => 0.0,
            _ => interpolated,
        }
    }

    /// Prescribed mass flux `V . S n` through an inlet face.
    pub fn fixed_flux(&self, face: &Face) -> Option<f64> {
        match self.for_kind(face.kind) {
            Some(BoundaryCondition::VelocityInlet(velocity)) => {
                Some(velocity.dot(face.area_vector()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_face_values() {
        let bc = BoundaryConditions::channel(2.0);
        let inner = DVec2::new(0.7, -0.1);
        assert_eq!(bc.face_velocity(FaceKind::Inlet, inner), DVec2::new(2.0, 0.0));
        assert_eq!(bc.face_velocity(FaceKind::Wall, inner), DVec2::ZERO);
        assert_eq!(bc.face_velocity(FaceKind::Body, inner), DVec2::ZERO);
        assert_eq!(bc.face_velocity(FaceKind::Outlet, inner), inner);
        assert_eq!(bc.face_velocity(FaceKind::Interior, inner), inner);

        assert_eq!(bc.face_pressure(FaceKind::Outlet, 5.0), 0.0);
        assert_eq!(bc.face_pressure(FaceKind::Wall, 5.0), 5.0);
        assert_eq!(bc.face_pressure(FaceKind::Inlet, 5.0), 5.0);
    }
}
