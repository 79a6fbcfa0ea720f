//! Gaussian elimination with partial pivoting.
//!
//! Forward elimination swaps the row with the largest magnitude in the
//! current column into the pivot position, then back substitution recovers
//! `x`. A pivot is rejected when it is not above `pivot_tolerance` times the
//! largest magnitude of its row in the original matrix.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::traits::LinearSolver;
use crate::error::{Result, SolverError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianElimination {
    /// Relative pivot threshold.
    pub pivot_tolerance: f64,
    /// Right-hand side entries below this magnitude are set to zero after
    /// every update.
    pub rhs_snap: f64,
}

impl Default for GaussianElimination {
    fn default() -> Self {
        Self {
            pivot_tolerance: 1e-13,
            rhs_snap: 1e-10,
        }
    }
}

impl GaussianElimination {
    fn snap(&self, value: f64) -> f64 {
        if value.abs() < self.rhs_snap { 0.0 } else { value }
    }
}

impl LinearSolver for GaussianElimination {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
        let n = a.nrows();
        if a.ncols() != n || b.len() != n {
            return Err(SolverError::config(format!(
                "cannot solve {}×{} system with right-hand side of length {}",
                a.nrows(),
                a.ncols(),
                b.len()
            )));
        }

        let mut m = a.clone();
        let mut rhs = b.clone();
        let mut row_scale: Vec<f64> = (0..n).map(|i| m.row(i).amax()).collect();

        for k in 0..n {
            let mut pivot_row = k;
            let mut pivot_mag = m[(k, k)].abs();
            for i in (k + 1)..n {
                let mag = m[(i, k)].abs();
                if mag > pivot_mag {
                    pivot_row = i;
                    pivot_mag = mag;
                }
            }

            if pivot_row != k {
                m.swap_rows(k, pivot_row);
                rhs.swap_rows(k, pivot_row);
                row_scale.swap(k, pivot_row);
            }

            let pivot = m[(k, k)];
            if !pivot.is_finite() {
                return Err(SolverError::NonFinite { column: k });
            }
            let threshold = self.pivot_tolerance * row_scale[k];
            if pivot.abs() <= threshold {
                return Err(SolverError::Singular {
                    column: k,
                    pivot,
                    threshold,
                });
            }

            for i in (k + 1)..n {
                let factor = m[(i, k)] / pivot;
                if factor == 0.0 {
                    continue;
                }
                m[(i, k)] = 0.0;
                for j in (k + 1)..n {
                    m[(i, j)] -= factor * m[(k, j)];
                }
                rhs[i] = self.snap(rhs[i] - factor * rhs[k]);
            }
        }

        let mut x = DVector::zeros(n);
        for i in (0..n).rev() {
            let mut sum = rhs[i];
            for j in (i + 1)..n {
                sum -= m[(i, j)] * x[j];
            }
            x[i] = sum / m[(i, i)];
        }

        if let Some(column) = x.iter().position(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite { column });
        }
        Ok(x)
    }

    fn name(&self) -> &str {
        "gauss-partial-pivot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_diagonal_system() {
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 3.0]));
        let b = DVector::from_vec(vec![4.0, 9.0]);
        let x = GaussianElimination::default().solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 2.0, max_relative = 1e-12);
        assert_relative_eq!(x[1], 3.0, max_relative = 1e-12);
    }

    #[test]
    fn recovers_known_solution_with_pivoting() {
        // Zero leading entry forces a row swap.
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 2.0, 1.0, -1.0, //
                3.0, 1.0, 0.0, 2.0, //
                1.0, -1.0, 4.0, 0.5, //
                2.0, 0.0, 1.0, 5.0,
            ],
        );
        let expected = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0]);
        let b = &a * &expected;
        let x = GaussianElimination::default().solve(&a, &b).unwrap();
        for i in 0..4 {
            assert_relative_eq!(x[i], expected[i], max_relative = 1e-8);
        }
    }

    #[test]
    fn rejects_singular_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let err = GaussianElimination::default().solve(&a, &b).unwrap_err();
        assert!(matches!(err, SolverError::Singular { column: 1, .. }), "{err}");
        assert!(err.is_numerical());
    }

    #[test]
    fn rejects_zero_row() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![1.0, 0.0]);
        assert!(GaussianElimination::default().solve(&a, &b).is_err());
    }

    #[test]
    fn rejects_non_finite_entries() {
        let a = DMatrix::from_row_slice(2, 2, &[f64::NAN, 0.0, 0.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        let err = GaussianElimination::default().solve(&a, &b).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn small_untouched_right_hand_side_survives() {
        let a = DMatrix::identity(2, 2);
        let b = DVector::from_vec(vec![5e-11, 1.0]);
        let x = GaussianElimination::default().solve(&a, &b).unwrap();
        assert_eq!(x[0], 5e-11);
        assert_eq!(x[1], 1.0);
    }

    #[test]
    fn eliminated_residue_snaps_to_zero() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0 + 5e-11]);
        let x = GaussianElimination::default().solve(&a, &b).unwrap();
        assert_eq!(x[0], 1.0);
        assert_eq!(x[1], 0.0);

        let exact = GaussianElimination {
            rhs_snap: 0.0,
            ..GaussianElimination::default()
        };
        assert!(exact.solve(&a, &b).unwrap()[1] > 0.0);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let a = DMatrix::identity(3, 3);
        let b = DVector::zeros(2);
        assert!(matches!(
            GaussianElimination::default().solve(&a, &b),
            Err(SolverError::Config(_))
        ));
    }
}
