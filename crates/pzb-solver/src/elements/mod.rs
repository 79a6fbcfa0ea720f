//! Element library: Euler-Bernoulli beam and piezoelectric patch.

use nalgebra::Matrix4;

pub mod beam;
pub mod piezo;

pub use beam::EulerBernoulliBeam;
pub use piezo::PiezoPatch;

/// Local 4×4 matrices of a 2-node bending element.
///
/// Local DOF order is `[w1, θ1, w2, θ2]`.
pub trait Element {
    /// Element stiffness matrix k_e
    fn stiffness_matrix(&self) -> Matrix4<f64>;

    /// Consistent element mass matrix m_e
    fn mass_matrix(&self) -> Matrix4<f64>;
}
