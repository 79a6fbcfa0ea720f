//! Backend trait definitions for the per-step linear solve.

use nalgebra::{DMatrix, DVector};

use crate::error::Result;

/// Trait for a dense linear solver backend.
///
/// Implementations solve `A·x = b` and must report singular or non-finite
/// systems as errors instead of returning Inf/NaN.
pub trait LinearSolver: Send + Sync {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>>;

    /// Human-readable name of this backend.
    fn name(&self) -> &str;
}
