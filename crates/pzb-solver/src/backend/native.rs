//! Native backend using nalgebra decompositions.
//!
//! It supports:
//! - Dense LU decomposition for the per-step linear solve
//! - Cholesky-transformed SymmetricEigen for the generalized eigenvalue problem

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::{DMatrix, DVector};

use super::traits::LinearSolver;
use crate::error::{Result, SolverError};

/// LU with partial pivoting from nalgebra.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLu;

impl LinearSolver for NativeLu {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
        if a.nrows() != a.ncols() || b.len() != a.nrows() {
            return Err(SolverError::config(format!(
                "cannot solve {}×{} system with right-hand side of length {}",
                a.nrows(),
                a.ncols(),
                b.len()
            )));
        }
        if let Some(column) = a.iter().position(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite {
                column: column / a.nrows(),
            });
        }

        let x = a
            .clone()
            .lu()
            .solve(b)
            .ok_or_else(|| SolverError::Numerical("singular matrix in LU decomposition".into()))?;

        if let Some(column) = x.iter().position(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite { column });
        }
        Ok(x)
    }

    fn name(&self) -> &str {
        "nalgebra-LU"
    }
}

/// Positive eigenvalues of `K·φ = λ·M·φ`, ascending.
///
/// `M` must be symmetric positive definite. Eigenvalues at or below
/// `1e-10·max|λ|` are treated as rigid-body modes and dropped.
pub fn generalized_eigenvalues(k: &DMatrix<f64>, m: &DMatrix<f64>) -> Result<Vec<f64>> {
    let n = k.nrows();
    if n == 0 {
        return Err(SolverError::config("no free DOFs for eigenvalue problem"));
    }

    // Cholesky decomposition: M = L * L^T
    let chol = Cholesky::new(m.clone())
        .ok_or_else(|| SolverError::Numerical("mass matrix not positive definite".into()))?;
    let l = chol.l();
    let l_inv = l
        .try_inverse()
        .ok_or_else(|| SolverError::Numerical("failed to invert Cholesky factor".into()))?;

    // K* = L^-1 * K * L^-T, symmetrized against round-off
    let k_star = &l_inv * k * l_inv.transpose();
    let k_star = (&k_star + k_star.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(k_star);
    let largest = eigen.eigenvalues.amax();
    let mut values: Vec<f64> = eigen
        .eigenvalues
        .iter()
        .copied()
        .filter(|lambda| *lambda > 1e-10 * largest)
        .collect();
    values.sort_by(f64::total_cmp);

    if values.is_empty() {
        return Err(SolverError::Numerical("no positive eigenvalues found".into()));
    }
    Ok(values)
}
