//! Numerical backend abstraction layer.
//!
//! The Newmark integrator solves one dense system per time step through the
//! [`LinearSolver`] trait, so the elimination routine can be swapped without
//! touching the integrator.
//!
//! # Backends
//!
//! - **Gaussian elimination** (default): partial pivoting with an explicit
//!   relative singularity check.
//! - **Native LU**: nalgebra's dense LU decomposition.

pub mod gauss;
pub mod native;
pub mod traits;

use serde::{Deserialize, Serialize};

pub use gauss::GaussianElimination;
pub use native::{NativeLu, generalized_eigenvalues};
pub use traits::LinearSolver;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    Gauss,
    NativeLu,
}

impl BackendKind {
    pub fn build(self) -> Box<dyn LinearSolver> {
        match self {
            BackendKind::Gauss => Box::new(GaussianElimination::default()),
            BackendKind::NativeLu => Box::new(NativeLu),
        }
    }
}

/// Returns the default per-step solver.
pub fn default_backend() -> Box<dyn LinearSolver> {
    BackendKind::default().build()
}
