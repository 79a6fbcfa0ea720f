//! Piezoelectric patch bonded on a beam element.
//!
//! The patch adds its own bending stiffness and mass (same Hermite shape
//! functions as the host beam) and couples the structural DOFs to two
//! nodal electric potentials interpolated linearly along the element:
//!
//! ```text
//! θ_ij = n e31 bp z ∫ N_i''(x) L_j(x) dx          (4×2)
//! C_p  = n k33 bp / hp ∫ L_i(x) L_j(x) dx          (2×2)
//! ```
//!
//! The augmented element stiffness is `[[k, θ], [θᵀ, -C_p]]`; potentials
//! carry no mass.

use nalgebra::{Matrix2, Matrix4, Matrix4x2};

use crate::elements::Element;
use crate::elements::beam::{bending_stiffness, consistent_mass};
use crate::error::{Result, SolverError};
use crate::materials::PiezoProperties;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiezoPatch {
    pub length: f64,
    pub properties: PiezoProperties,
}

impl PiezoPatch {
    pub fn new(length: f64, properties: PiezoProperties) -> Result<Self> {
        if !length.is_finite() || length <= 0.0 {
            return Err(SolverError::config(format!(
                "piezo element length must be positive, got {length}"
            )));
        }
        if !(properties.permittivity.is_finite() && properties.permittivity > 0.0) {
            return Err(SolverError::config(
                "piezo permittivity must be positive".to_string(),
            ));
        }
        Ok(Self { length, properties })
    }

    /// Electromechanical coupling θ, rows are `[w1, θ1, w2, θ2]`, columns `[φ1, φ2]`.
    #[rustfmt::skip]
    pub fn coupling_matrix(&self) -> Matrix4x2<f64> {
        let l = self.length;
        Matrix4x2::new(
            -1.0 / l,  1.0 / l,
            -1.0,      0.0,
             1.0 / l, -1.0 / l,
             0.0,      1.0,
        ) * self.properties.coupling
    }

    /// Patch capacitance `C_p` (positive definite).
    pub fn capacitance_matrix(&self) -> Matrix2<f64> {
        let c = self.properties.permittivity * self.length / 6.0;
        Matrix2::new(2.0, 1.0, 1.0, 2.0) * c
    }
}

impl Element for PiezoPatch {
    fn stiffness_matrix(&self) -> Matrix4<f64> {
        bending_stiffness(self.properties.layer.flexural_rigidity, self.length)
    }

    fn mass_matrix(&self) -> Matrix4<f64> {
        consistent_mass(self.properties.layer.mass_per_length, self.length)
    }
}
