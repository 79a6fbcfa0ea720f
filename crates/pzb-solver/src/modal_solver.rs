//! Natural frequencies of the reduced beam.
//!
//! Solves the undamped free vibration problem:
//! (K - λM)φ = 0
//!
//! where:
//! - K = reduced stiffness (potentials condensed out)
//! - M = reduced structural mass
//! - λ = ω² (squared angular frequency)
//!
//! # Workflow
//! 1. Split the reduced DOFs into structural (u) and potential (φ) sets
//! 2. Condense the potentials: K* = K_uu - K_uφ·K_φφ⁻¹·K_φu
//! 3. Solve K*·x = λ·M_uu·x through Cholesky and SymmetricEigen
//! 4. Convert eigenvalues to frequencies: ω = √λ, f = ω / (2π)
//!
//! Potentials carry no mass, so the condensation is exact for the
//! short-circuit-free (open electrode) configuration defined by the flags.

use std::f64::consts::PI;

use nalgebra::DMatrix;

use crate::backend::generalized_eigenvalues;
use crate::boundary_conditions::ReducedSystem;
use crate::error::{Result, SolverError};
use crate::mesh::DofKind;

/// Results from modal analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ModalResults {
    /// Eigenvalues (λ = ω²), ascending
    pub eigenvalues: Vec<f64>,
    /// Natural angular frequencies in rad/s
    pub angular_frequencies: Vec<f64>,
    /// Natural frequencies in Hz
    pub frequencies_hz: Vec<f64>,
}

impl ModalResults {
    pub fn num_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Angular frequency (rad/s) of a mode, 0-based.
    pub fn angular_frequency(&self, mode_index: usize) -> Option<f64> {
        self.angular_frequencies.get(mode_index).copied()
    }
}

/// Modal analysis solver
pub struct ModalSolver<'a> {
    system: &'a ReducedSystem,
}

impl<'a> ModalSolver<'a> {
    pub fn new(system: &'a ReducedSystem) -> Self {
        Self { system }
    }

    /// Lowest `num_modes` natural frequencies. Returns fewer when the system
    /// has fewer positive eigenvalues.
    ///
    /// # Errors
    /// - the potential block cannot be inverted
    /// - the structural mass is not positive definite
    pub fn solve(&self, num_modes: usize) -> Result<ModalResults> {
        let (stiffness, mass) = self.condensed_matrices()?;
        let mut eigenvalues = generalized_eigenvalues(&stiffness, &mass)?;
        eigenvalues.truncate(num_modes);

        let angular_frequencies: Vec<f64> = eigenvalues.iter().map(|l| l.sqrt()).collect();
        let frequencies_hz = angular_frequencies.iter().map(|w| w / (2.0 * PI)).collect();

        log::debug!(
            "modal analysis: {} modes from {} structural DOFs",
            eigenvalues.len(),
            mass.nrows()
        );

        Ok(ModalResults {
            eigenvalues,
            angular_frequencies,
            frequencies_hz,
        })
    }

    /// Structural stiffness with potentials condensed out, and structural mass.
    pub fn condensed_matrices(&self) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        let (structural, potential): (Vec<usize>, Vec<usize>) = (0..self.system.size())
            .partition(|&i| self.system.kinds[i] != DofKind::Potential);
        if structural.is_empty() {
            return Err(SolverError::config("no free structural DOFs for modal analysis"));
        }

        let k = &self.system.stiffness;
        let k_uu = k.select_rows(&structural).select_columns(&structural);
        let m_uu = self
            .system
            .mass
            .select_rows(&structural)
            .select_columns(&structural);
        if potential.is_empty() {
            return Ok((k_uu, m_uu));
        }

        let k_up = k.select_rows(&structural).select_columns(&potential);
        let k_pp = k.select_rows(&potential).select_columns(&potential);
        let k_pp_inv = k_pp.try_inverse().ok_or_else(|| {
            SolverError::Numerical("potential block of the stiffness is singular".into())
        })?;

        let condensed = &k_uu - &k_up * k_pp_inv * k_up.transpose();
        Ok((condensed, m_uu))
    }
}
