//! Solver and case settings, loadable from JSON.

use crate::numerics::Convergence;
use crate::numerics::Tolerance;
use crate::numerics::limiter::FluxLimiter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value {value} for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

fn invalid(key: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}

/// Parameters of the SIMPLE iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleConfig {
    /// Outer iteration budget.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Damping of the pressure update, in (0, 1].
    #[serde(default = "default_pressure_relaxation")]
    pub pressure_relaxation: f64,
    /// Kinematic viscosity.
    #[serde(default = "default_viscosity")]
    pub viscosity: f64,
    /// Inflow speed along +x.
    #[serde(default = "default_inlet_velocity")]
    pub inlet_velocity: f64,
    /// Gauss-Seidel sweeps on the pressure correction per outer iteration.
    #[serde(default = "default_pressure_sweeps")]
    pub pressure_sweeps: usize,
    #[serde(default)]
    pub pressure_tolerance: Option<f64>,
    #[serde(default)]
    pub limiter: FluxLimiter,
    #[serde(default = "default_limiter_epsilon")]
    pub limiter_epsilon: f64,
    #[serde(default)]
    pub convergence: Convergence,
    /// Body size used for the reported Reynolds number.
    #[serde(default = "default_reference_length")]
    pub reference_length: f64,
    /// Log every n-th iteration.
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
}

fn default_iterations() -> usize {
    5000
}
fn default_pressure_relaxation() -> f64 {
    1.0
}
fn default_viscosity() -> f64 {
    0.01
}
fn default_inlet_velocity() -> f64 {
    1.0
}
fn default_pressure_sweeps() -> usize {
    10
}
fn default_limiter_epsilon() -> f64 {
    1e-12
}
fn default_reference_length() -> f64 {
    0.2
}
fn default_log_interval() -> usize {
    100
}

impl Default for SimpleConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            pressure_relaxation: default_pressure_relaxation(),
            viscosity: default_viscosity(),
            inlet_velocity: default_inlet_velocity(),
            pressure_sweeps: default_pressure_sweeps(),
            pressure_tolerance: None,
            limiter: FluxLimiter::default(),
            limiter_epsilon: default_limiter_epsilon(),
            convergence: Convergence::default(),
            reference_length: default_reference_length(),
            log_interval: default_log_interval(),
        }
    }
}

impl SimpleConfig {
    /// Reynolds number `U D / nu`; infinite for inviscid runs.
    pub fn reynolds_number(&self) -> f64 {
        self.inlet_velocity * self.reference_length / self.viscosity
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(invalid("iterations", self.iterations, "must be at least 1"));
        }
        if !(self.pressure_relaxation > 0.0 && self.pressure_relaxation <= 1.0) {
            return Err(invalid(
                "pressure_relaxation",
                self.pressure_relaxation,
                "must lie in (0, 1]",
            ));
        }
        if !(self.viscosity >= 0.0 && self.viscosity.is_finite()) {
            return Err(invalid("viscosity", self.viscosity, "must be finite and non-negative"));
        }
        if !(self.inlet_velocity > 0.0 && self.inlet_velocity.is_finite()) {
            return Err(invalid(
                "inlet_velocity",
                self.inlet_velocity,
                "must be finite and positive",
            ));
        }
        if self.pressure_sweeps == 0 {
            return Err(invalid("pressure_sweeps", self.pressure_sweeps, "must be at least 1"));
        }
        if let Some(tol) = self.pressure_tolerance {
            if !(tol > 0.0) {
                return Err(invalid("pressure_tolerance", tol, "must be positive"));
            }
        }
        if !(self.limiter_epsilon >= 0.0) {
            return Err(invalid("limiter_epsilon", self.limiter_epsilon, "must be non-negative"));
        }
        if let Some(tol) = self.convergence.imbalance_tolerance {
            if !(tol > 0.0) {
                return Err(invalid("convergence.imbalance_tolerance", tol, "must be positive"));
            }
        }
        if let Some(Tolerance::Absolute(tol) | Tolerance::Relative(tol)) =
            self.convergence.update_tolerance
        {
            if !(tol > 0.0) {
                return Err(invalid("convergence.update_tolerance", tol, "must be positive"));
            }
        }
        if !(self.reference_length > 0.0) {
            return Err(invalid("reference_length", self.reference_length, "must be positive"));
        }
        if self.log_interval == 0 {
            return Err(invalid("log_interval", self.log_interval, "must be at least 1"));
        }
        Ok(())
    }
}

/// Structured channel used when no mesh file is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub length: f64,
    pub height: f64,
    pub nx: usize,
    pub ny: usize,
    /// Quad ranges `[i_start, i_end, j_start, j_end]` cut out as a body.
    pub block: Option<[usize; 4]>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            length: 3.0,
            height: 1.0,
            nx: 60,
            ny: 20,
            block: Some([10, 14, 8, 12]),
        }
    }
}

/// Everything the binary needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    #[serde(default = "default_mesh")]
    pub mesh: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub solver: SimpleConfig,
}

fn default_mesh() -> PathBuf {
    PathBuf::from("cylinder.su2")
}
fn default_output() -> PathBuf {
    PathBuf::from("output/main")
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            mesh: default_mesh(),
            output: default_output(),
            channel: ChannelConfig::default(),
            solver: SimpleConfig::default(),
        }
    }
}

impl CaseConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.solver.validate()?;
        let ch = &self.channel;
        if !(ch.length > 0.0 && ch.height > 0.0) {
            let extent = format!("{} x {}", ch.length, ch.height);
            return Err(invalid("channel", extent, "extent must be positive"));
        }
        if ch.nx == 0 || ch.ny == 0 {
            let grid = format!("{} x {}", ch.nx, ch.ny);
            return Err(invalid("channel", grid, "needs at least one quad per direction"));
        }
        if let Some([i0, i1, j0, j1]) = ch.block {
            if i0 == 0 || i1 >= ch.nx || j0 == 0 || j1 >= ch.ny || i0 >= i1 || j0 >= j1 {
                return Err(invalid(
                    "channel.block",
                    format!("{:?}", [i0, i1, j0, j1]),
                    "must be a non-empty range strictly inside the grid",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::ConvergenceMetric;

    #[test]
    fn defaults_are_valid() {
        let config = CaseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.iterations, 5000);
        assert_eq!(config.solver.pressure_sweeps, 10);
        assert_eq!(config.solver.limiter, FluxLimiter::MonotonizedCentral);
        assert!(!config.solver.convergence.is_enabled());
        assert!((config.solver.reynolds_number() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "solver": {
                "viscosity": 0.05,
                "limiter": "van_leer",
                "convergence": {
                    "imbalance_tolerance": 0.1,
                    "update_tolerance": { "absolute": 1e-3 }
                }
            }
        }"#;
        let config: CaseConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mesh, PathBuf::from("cylinder.su2"));
        assert_eq!(config.solver.viscosity, 0.05);
        assert_eq!(config.solver.limiter, FluxLimiter::VanLeer);
        assert_eq!(config.solver.iterations, 5000);
        assert_eq!(config.solver.convergence.update_tolerance, Some(Tolerance::Absolute(1e-3)));
        assert_eq!(config.solver.convergence.metric, ConvergenceMetric::MaxNorm);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut solver = SimpleConfig::default();
        solver.pressure_relaxation = 1.5;
        assert!(matches!(
            solver.validate(),
            Err(ConfigError::InvalidValue { key: "pressure_relaxation", .. })
        ));

        let mut solver = SimpleConfig::default();
        solver.viscosity = -0.1;
        assert!(solver.validate().is_err());

        let mut solver = SimpleConfig::default();
        solver.pressure_sweeps = 0;
        assert!(solver.validate().is_err());

        let mut case = CaseConfig::default();
        case.channel.block = Some([0, 3, 2, 4]);
        assert!(matches!(
            case.validate(),
            Err(ConfigError::InvalidValue { key: "channel.block", .. })
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("ufvm_config_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("case.json");

        let mut config = CaseConfig::default();
        config.solver.iterations = 250;
        config.save_to_file(&path).unwrap();
        let loaded = CaseConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);

        fs::remove_dir_all(&dir).ok();
    }
}
