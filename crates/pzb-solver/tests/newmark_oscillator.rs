//! Newmark integration of a single-DOF oscillator against the closed form.
//!
//! m ẍ + k x = 0 with x(0) = x0, ẋ(0) = 0 has x(t) = x0·cos(ωn t), ωn = √(k/m).

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use pzb_solver::{
    GaussianElimination, NewmarkCoefficients, NewmarkConfig, NewmarkIntegrator, ReducedSystem,
    State,
};

const STIFFNESS: f64 = 4.0;
const X0: f64 = 1.0;

fn oscillator() -> ReducedSystem {
    ReducedSystem::from_matrices(
        DMatrix::from_element(1, 1, 1.0),
        DMatrix::from_element(1, 1, STIFFNESS),
        DMatrix::zeros(1, 1),
        DVector::zeros(1),
    )
    .unwrap()
}

/// Largest deviation from x0·cos(ωn t) over `periods` periods.
fn max_error(config: NewmarkConfig, steps_per_period: usize, periods: usize) -> f64 {
    let system = oscillator();
    let omega_n = STIFFNESS.sqrt();
    let dt = 2.0 * PI / omega_n / steps_per_period as f64;
    let coefficients = NewmarkCoefficients::new(dt, &config).unwrap();
    let solver = GaussianElimination::default();
    let integrator = NewmarkIntegrator::new(&system, coefficients, &solver);

    let mut state = State::zeros(1);
    state.displacement[0] = X0;
    state.acceleration[0] = -STIFFNESS * X0;

    let zero = DVector::zeros(1);
    let mut error = 0.0_f64;
    for step in 1..=steps_per_period * periods {
        state = integrator.step(&state, &zero, &zero).unwrap();
        let t = step as f64 * dt;
        error = error.max((state.displacement[0] - X0 * (omega_n * t).cos()).abs());
    }
    error
}

/// Test 1: one period with 200 steps stays within 1e-3 of the exact solution.
#[test]
fn test_average_acceleration_tracks_cosine() {
    let error = max_error(NewmarkConfig::average_acceleration(), 200, 1);
    assert!(error < 1e-3, "max error {error}");
}

#[test]
fn test_linear_acceleration_tracks_cosine() {
    let error = max_error(NewmarkConfig::linear_acceleration(), 200, 1);
    assert!(error < 1e-3, "max error {error}");
}

/// Test 2: halving dt cuts the error by roughly four (second order).
#[test]
fn test_error_is_second_order_in_dt() {
    let coarse = max_error(NewmarkConfig::average_acceleration(), 50, 1);
    let fine = max_error(NewmarkConfig::average_acceleration(), 100, 1);
    let ratio = coarse / fine;
    assert!((3.0..5.0).contains(&ratio), "convergence ratio {ratio}");
}

/// Test 3: average acceleration conserves the amplitude of free vibration.
#[test]
fn test_average_acceleration_does_not_grow() {
    let system = oscillator();
    let coefficients =
        NewmarkCoefficients::new(0.05, &NewmarkConfig::average_acceleration()).unwrap();
    let solver = GaussianElimination::default();
    let integrator = NewmarkIntegrator::new(&system, coefficients, &solver);

    let mut state = State::zeros(1);
    state.displacement[0] = X0;
    state.acceleration[0] = -STIFFNESS * X0;
    let zero = DVector::zeros(1);
    for _ in 0..5000 {
        state = integrator.step(&state, &zero, &zero).unwrap();
        assert!(state.displacement[0].abs() <= X0 + 1e-9);
    }
    // Energy ½kx² + ½mv² is preserved exactly for the linear undamped case.
    let energy = 0.5 * STIFFNESS * state.displacement[0].powi(2) + 0.5 * state.velocity[0].powi(2);
    assert!((energy - 0.5 * STIFFNESS * X0 * X0).abs() < 1e-9, "energy {energy}");
}
