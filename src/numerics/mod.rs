pub mod gradient;
pub mod limiter;
pub mod solver;
pub mod system;
pub mod timing;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Threshold for a field-update norm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    Absolute(f64),
    /// Relative to the update norm of the first outer iteration.
    Relative(f64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMetric {
    L2Norm,
    #[default]
    MaxNorm,
}

/// Early-exit criteria of the outer loop. With both tolerances unset the
/// loop always runs its full iteration budget.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Convergence {
    /// Bound on |global mass imbalance| in percent.
    pub imbalance_tolerance: Option<f64>,
    /// Bound on the norm of the cell velocity change between iterations.
    pub update_tolerance: Option<Tolerance>,
    pub metric: ConvergenceMetric,
}

impl Convergence {
    pub fn is_enabled(&self) -> bool {
        self.imbalance_tolerance.is_some() || self.update_tolerance.is_some()
    }

    pub fn norm(&self, vector: &DVector<f64>) -> f64 {
        match self.metric {
            ConvergenceMetric::L2Norm => vector.norm(),
            ConvergenceMetric::MaxNorm => vector.amax(),
        }
    }

    pub fn check_tolerance(tolerance: Tolerance, norm: f64, initial_norm: f64) -> bool {
        match tolerance {
            Tolerance::Absolute(tol) => norm < tol,
            Tolerance::Relative(tol) => initial_norm > 0.0 && norm / initial_norm < tol,
        }
    }

    /// True when every enabled criterion holds; false when none is enabled.
    pub fn check_convergence(
        &self,
        imbalance: f64,
        update_norm: f64,
        initial_update_norm: f64,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let imbalance_ok = self
            .imbalance_tolerance
            .map_or(true, |tol| imbalance.abs() < tol);
        let update_ok = self
            .update_tolerance
            .map_or(true, |tol| Self::check_tolerance(tol, update_norm, initial_update_norm));
        imbalance_ok && update_ok
    }
}
