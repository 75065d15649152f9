//! Steady incompressible flow on unstructured triangle meshes.
//!
//! A collocated finite-volume discretisation with a SIMPLE-type
//! pressure-velocity coupling: meshes come from SU2 files or the channel
//! generator, [`numerics::solver::SimpleSolver`] drives the outer loop and
//! [`physics::state::FlowState`] holds the fields.

pub mod config;
pub mod discretization;
pub mod numerics;
pub mod physics;
pub mod processing;
