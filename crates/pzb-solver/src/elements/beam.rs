//! Euler-Bernoulli beam element with cubic Hermite shape functions.
//!
//! Two nodes, two DOFs per node (transverse displacement, rotation).
//!
//! References:
//! - Przemieniecki, "Theory of Matrix Structural Analysis"
//! - Cook et al., "Concepts and Applications of Finite Element Analysis"

use nalgebra::Matrix4;

use crate::elements::Element;
use crate::error::{Result, SolverError};
use crate::materials::SectionProperties;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerBernoulliBeam {
    pub length: f64,
    pub section: SectionProperties,
}

impl EulerBernoulliBeam {
    pub fn new(length: f64, section: SectionProperties) -> Result<Self> {
        if !length.is_finite() || length <= 0.0 {
            return Err(SolverError::config(format!(
                "beam element length must be positive, got {length}"
            )));
        }
        Ok(Self { length, section })
    }
}

/// `EI/l³ · [12 6l -12 6l; 6l 4l² -6l 2l²; -12 -6l 12 -6l; 6l 2l² -6l 4l²]`
#[rustfmt::skip]
pub fn bending_stiffness(flexural_rigidity: f64, l: f64) -> Matrix4<f64> {
    let l2 = l * l;
    let k = flexural_rigidity / (l2 * l);
    Matrix4::new(
        12.0, 6.0 * l, -12.0, 6.0 * l,
        6.0 * l, 4.0 * l2, -6.0 * l, 2.0 * l2,
        -12.0, -6.0 * l, 12.0, -6.0 * l,
        6.0 * l, 2.0 * l2, -6.0 * l, 4.0 * l2,
    ) * k
}

/// `ρA l/420 · [156 22l 54 -13l; 22l 4l² 13l -3l²; 54 13l 156 -22l; -13l -3l² -22l 4l²]`
#[rustfmt::skip]
pub fn consistent_mass(mass_per_length: f64, l: f64) -> Matrix4<f64> {
    let l2 = l * l;
    let m = mass_per_length * l / 420.0;
    Matrix4::new(
        156.0, 22.0 * l, 54.0, -13.0 * l,
        22.0 * l, 4.0 * l2, 13.0 * l, -3.0 * l2,
        54.0, 13.0 * l, 156.0, -22.0 * l,
        -13.0 * l, -3.0 * l2, -22.0 * l, 4.0 * l2,
    ) * m
}

impl Element for EulerBernoulliBeam {
    fn stiffness_matrix(&self) -> Matrix4<f64> {
        bending_stiffness(self.section.flexural_rigidity, self.length)
    }

    fn mass_matrix(&self) -> Matrix4<f64> {
        consistent_mass(self.section.mass_per_length, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    fn element() -> EulerBernoulliBeam {
        EulerBernoulliBeam::new(0.5, SectionProperties::new(2.0, 3.0)).unwrap()
    }

    #[test]
    fn rejects_non_positive_length() {
        let section = SectionProperties::new(1.0, 1.0);
        assert!(EulerBernoulliBeam::new(0.0, section).is_err());
        assert!(EulerBernoulliBeam::new(-0.1, section).is_err());
        assert!(EulerBernoulliBeam::new(f64::INFINITY, section).is_err());
    }

    #[test]
    fn matrices_are_symmetric() {
        let beam = element();
        let k = beam.stiffness_matrix();
        let m = beam.mass_matrix();
        assert_relative_eq!(k, k.transpose(), epsilon = 1e-12);
        assert_relative_eq!(m, m.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn stiffness_entries() {
        let k = element().stiffness_matrix();
        // EI/l³ = 2/0.125 = 16
        assert_relative_eq!(k[(0, 0)], 12.0 * 16.0, max_relative = 1e-14);
        assert_relative_eq!(k[(0, 1)], 6.0 * 0.5 * 16.0, max_relative = 1e-14);
        assert_relative_eq!(k[(1, 3)], 2.0 * 0.25 * 16.0, max_relative = 1e-14);
        assert_relative_eq!(k[(2, 3)], -6.0 * 0.5 * 16.0, max_relative = 1e-14);
    }

    #[test]
    fn rigid_body_modes_carry_no_strain_energy() {
        let k = element().stiffness_matrix();
        let translation = Vector4::new(1.0, 0.0, 1.0, 0.0);
        // Rotation about node 1: w = x, θ = 1.
        let rotation = Vector4::new(0.0, 1.0, 0.5, 1.0);
        assert!((k * translation).norm() < 1e-10);
        assert!((k * rotation).norm() < 1e-10);
    }

    #[test]
    fn translational_mass_sums_to_element_mass() {
        let beam = element();
        let m = beam.mass_matrix();
        let translation = Vector4::new(1.0, 0.0, 1.0, 0.0);
        let total = translation.dot(&(m * translation));
        assert_relative_eq!(total, 3.0 * 0.5, max_relative = 1e-14);
    }
}
