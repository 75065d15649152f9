pub mod bc;
pub mod momentum;
pub mod pressure;
pub mod state;

use glam::DVec2;

/// Cartesian velocity component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    U,
    V,
}

impl Component {
    #[inline]
    pub fn of(self, vector: DVec2) -> f64 {
        match self {
            Component::U => vector.x,
            Component::V => vector.y,
        }
    }

    #[inline]
    pub fn other(self) -> Component {
        match self {
            Component::U => Component::V,
            Component::V => Component::U,
        }
    }
}
