//! Incremental Newmark time integration of the reduced system.
//!
//! Solves the forced transient problem:
//! M*ü + C*u̇ + K*u = F·sin(ωt)
//!
//! # Incremental form
//!
//! With constant `dt` the effective stiffness is built once and each step
//! solves for the displacement increment:
//!
//! ```text
//! PE  = a0·M + a1·C + K
//! ΔF  = (F_{n+1} - F_n) + (a2·M + a3·C)·v_n + (a4·M + a5·C)·a_n
//! PE·Δu = ΔF
//! Δa  = a0·Δu - a2·v_n - a4·a_n
//! Δv  = a1·Δu - a3·v_n - a5·a_n
//! ```
//!
//! where, for Newmark parameters α (β in some texts) and γ:
//!
//! ```text
//! a0 = 1/(α dt²)   a1 = γ/(α dt)   a2 = 1/(α dt)        a3 = γ/α
//! a4 = 1/(2α)      a5 = dt(γ/(2α) - 1)   a6 = dt(1 - γ)   a7 = γ dt
//! ```
//!
//! Standard parameter choices:
//! - **Average acceleration** (unconditionally stable): γ = 1/2, α = 1/4
//! - **Linear acceleration** (conditionally stable): γ = 1/2, α = 1/6

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use pzb_model::IntegrationMethod;
use serde::{Deserialize, Serialize};

use crate::backend::LinearSolver;
use crate::boundary_conditions::ReducedSystem;
use crate::error::{Result, SolverError};

/// Newmark time integration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewmarkConfig {
    /// Newmark α parameter (controls acceleration)
    pub alpha: f64,
    /// Newmark γ parameter (controls velocity)
    pub gamma: f64,
}

impl NewmarkConfig {
    /// Average acceleration method (unconditionally stable, 2nd order accurate)
    ///
    /// γ = 1/2, α = 1/4
    pub fn average_acceleration() -> Self {
        Self {
            alpha: 0.25,
            gamma: 0.5,
        }
    }

    /// Linear acceleration method (conditionally stable)
    ///
    /// γ = 1/2, α = 1/6
    pub fn linear_acceleration() -> Self {
        Self {
            alpha: 1.0 / 6.0,
            gamma: 0.5,
        }
    }

    pub fn from_method(method: IntegrationMethod) -> Self {
        match method {
            IntegrationMethod::AverageAcceleration => Self::average_acceleration(),
            IntegrationMethod::LinearAcceleration => Self::linear_acceleration(),
        }
    }
}

impl Default for NewmarkConfig {
    fn default() -> Self {
        Self::average_acceleration()
    }
}

/// Time step for a forcing frequency: `2π/(ω·nm)`, or `2π/nm` when `ω = 0`.
pub fn time_step(omega: f64, steps_per_period: usize) -> f64 {
    let nm = steps_per_period as f64;
    if omega == 0.0 {
        2.0 * PI / nm
    } else {
        2.0 * PI / (omega * nm)
    }
}

/// Integration constants a0..a7 for one `dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewmarkCoefficients {
    pub dt: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    pub a5: f64,
    pub a6: f64,
    pub a7: f64,
}

impl NewmarkCoefficients {
    pub fn new(dt: f64, config: &NewmarkConfig) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SolverError::config(format!("time step must be positive, got {dt}")));
        }
        let (alfa, gama) = (config.alpha, config.gamma);
        if !(alfa > 0.0 && gama > 0.0) {
            return Err(SolverError::config(format!(
                "Newmark parameters must be positive, got alpha={alfa} gamma={gama}"
            )));
        }
        Ok(Self {
            dt,
            a0: 1.0 / (alfa * dt * dt),
            a1: gama / (alfa * dt),
            a2: 1.0 / (alfa * dt),
            a3: gama / alfa,
            a4: 1.0 / (2.0 * alfa),
            a5: dt * (gama / (2.0 * alfa) - 1.0),
            a6: dt * (1.0 - gama),
            a7: gama * dt,
        })
    }
}

/// Displacement, velocity and acceleration of the reduced DOFs.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub displacement: DVector<f64>,
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,
}

impl State {
    pub fn zeros(n: usize) -> Self {
        Self {
            displacement: DVector::zeros(n),
            velocity: DVector::zeros(n),
            acceleration: DVector::zeros(n),
        }
    }
}

/// Steps the reduced system with a fixed `dt`.
///
/// The effective stiffness and the velocity/acceleration operators are built
/// once; every step performs a fresh solve of `PE·Δu = ΔF`.
pub struct NewmarkIntegrator<'a> {
    system: &'a ReducedSystem,
    solver: &'a dyn LinearSolver,
    coefficients: NewmarkCoefficients,
    effective_stiffness: DMatrix<f64>,
    velocity_operator: DMatrix<f64>,
    acceleration_operator: DMatrix<f64>,
}

impl<'a> NewmarkIntegrator<'a> {
    pub fn new(
        system: &'a ReducedSystem,
        coefficients: NewmarkCoefficients,
        solver: &'a dyn LinearSolver,
    ) -> Self {
        let c = &coefficients;
        let (m, k, d) = (&system.mass, &system.stiffness, &system.damping);
        let effective_stiffness = m * c.a0 + d * c.a1 + k;
        let velocity_operator = m * c.a2 + d * c.a3;
        let acceleration_operator = m * c.a4 + d * c.a5;

        Self {
            system,
            solver,
            coefficients,
            effective_stiffness,
            velocity_operator,
            acceleration_operator,
        }
    }

    pub fn coefficients(&self) -> &NewmarkCoefficients {
        &self.coefficients
    }

    pub fn effective_stiffness(&self) -> &DMatrix<f64> {
        &self.effective_stiffness
    }

    /// Advances `state` by one step given the loads at both ends of it.
    pub fn step(
        &self,
        state: &State,
        load_old: &DVector<f64>,
        load_new: &DVector<f64>,
    ) -> Result<State> {
        let c = &self.coefficients;
        let delta_f = (load_new - load_old)
            + &self.velocity_operator * &state.velocity
            + &self.acceleration_operator * &state.acceleration;

        let delta_u = self.solver.solve(&self.effective_stiffness, &delta_f)?;

        let delta_a = &delta_u * c.a0 - &state.velocity * c.a2 - &state.acceleration * c.a4;
        let delta_v = &delta_u * c.a1 - &state.velocity * c.a3 - &state.acceleration * c.a5;

        Ok(State {
            displacement: &state.displacement + delta_u,
            velocity: &state.velocity + delta_v,
            acceleration: &state.acceleration + delta_a,
        })
    }

    /// Advances under harmonic load `F·sin(ωt)` from `t` to `t + dt`.
    pub fn step_harmonic(&self, state: &State, omega: f64, t: f64) -> Result<State> {
        let load_old = self.system.force_at(omega, t);
        let load_new = self.system.force_at(omega, t + self.coefficients.dt);
        self.step(state, &load_old, &load_new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GaussianElimination;
    use approx::assert_relative_eq;

    fn oscillator(k: f64, c: f64) -> ReducedSystem {
        ReducedSystem::from_matrices(
            DMatrix::from_element(1, 1, 1.0),
            DMatrix::from_element(1, 1, k),
            DMatrix::from_element(1, 1, c),
            DVector::from_element(1, 1.0),
        )
        .unwrap()
    }

    #[test]
    fn average_acceleration_coefficients() {
        let c = NewmarkCoefficients::new(0.1, &NewmarkConfig::average_acceleration()).unwrap();
        assert_relative_eq!(c.a0, 400.0, max_relative = 1e-12);
        assert_relative_eq!(c.a1, 20.0, max_relative = 1e-12);
        assert_relative_eq!(c.a2, 40.0, max_relative = 1e-12);
        assert_relative_eq!(c.a3, 2.0, max_relative = 1e-12);
        assert_relative_eq!(c.a4, 2.0, max_relative = 1e-12);
        assert_eq!(c.a5, 0.0);
        assert_relative_eq!(c.a6, 0.05, max_relative = 1e-12);
        assert_relative_eq!(c.a7, 0.05, max_relative = 1e-12);
    }

    #[test]
    fn rejects_non_positive_time_step() {
        let config = NewmarkConfig::default();
        assert!(NewmarkCoefficients::new(0.0, &config).is_err());
        assert!(NewmarkCoefficients::new(-1e-3, &config).is_err());
        assert!(NewmarkCoefficients::new(f64::NAN, &config).is_err());
    }

    #[test]
    fn time_step_from_frequency() {
        assert_relative_eq!(time_step(2.0 * PI, 100), 0.01, max_relative = 1e-12);
        assert_relative_eq!(time_step(0.0, 64), 2.0 * PI / 64.0, max_relative = 1e-12);
    }

    #[test]
    fn effective_stiffness_combines_matrices() {
        let system = oscillator(4.0, 0.5);
        let coefficients = NewmarkCoefficients::new(0.1, &NewmarkConfig::default()).unwrap();
        let solver = GaussianElimination::default();
        let integrator = NewmarkIntegrator::new(&system, coefficients, &solver);
        assert_relative_eq!(
            integrator.effective_stiffness()[(0, 0)],
            400.0 + 20.0 * 0.5 + 4.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn static_load_settles_to_static_deflection() {
        // Heavily damped oscillator under a suddenly applied unit load.
        let system = oscillator(4.0, 4.0);
        let coefficients = NewmarkCoefficients::new(0.05, &NewmarkConfig::default()).unwrap();
        let solver = GaussianElimination::default();
        let integrator = NewmarkIntegrator::new(&system, coefficients, &solver);

        let zero = DVector::zeros(1);
        let unit = DVector::from_element(1, 1.0);
        let mut state = integrator.step(&State::zeros(1), &zero, &unit).unwrap();
        for _ in 0..400 {
            state = integrator.step(&state, &unit, &unit).unwrap();
        }
        assert_relative_eq!(state.displacement[0], 0.25, epsilon = 1e-6);
        assert!(state.velocity[0].abs() < 1e-6);
    }

    #[test]
    fn zero_load_from_rest_stays_at_rest() {
        let system = oscillator(4.0, 0.0);
        let coefficients = NewmarkCoefficients::new(0.01, &NewmarkConfig::default()).unwrap();
        let solver = GaussianElimination::default();
        let integrator = NewmarkIntegrator::new(&system, coefficients, &solver);
        let state = integrator.step_harmonic(&State::zeros(1), 0.0, 0.0).unwrap();
        assert_eq!(state, State::zeros(1));
    }
}
