//! Frequency sweep over the harmonic forcing `F·sin(ωt)`.
//!
//! For every `ω = start + j·step` the state is reset to rest, `t` to the
//! start time, and `steps_per_period·periods` Newmark steps are run with
//! `dt = 2π/(ω·steps_per_period)`. Steps in the transient periods are
//! integrated but neither recorded nor counted in the peak.
//!
//! The reduced matrices do not depend on `ω` and are shared read-only by
//! every frequency; each frequency owns its integrator and state.

use pzb_io::{HistoryRow, ResponseRow, ResultSink};
use pzb_model::{BeamModel, SweepRange, TimeControl};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::LinearSolver;
use crate::boundary_conditions::ReducedSystem;
use crate::dynamic_solver::{NewmarkCoefficients, NewmarkConfig, NewmarkIntegrator, State, time_step};
use crate::error::{Result, SolverError};

/// What to do when one frequency fails numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// The first failure ends the sweep.
    #[default]
    Abort,
    /// Log the failing frequency and continue with the next one.
    SkipFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Rows are streamed to the sink as each frequency completes.
    #[default]
    Sequential,
    /// Frequencies run on the rayon pool; rows are emitted in sweep order
    /// once all have completed.
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub range: SweepRange,
    pub time: TimeControl,
    pub newmark: NewmarkConfig,
    /// Frequency whose history is recorded; every frequency when `None`.
    pub history_frequency: Option<f64>,
    /// Number of leading reduced DOFs per history row.
    pub history_dofs: usize,
    /// Reduced index of the DOF whose peak forms the response.
    pub monitored_dof: usize,
    pub policy: FailurePolicy,
    pub mode: ExecutionMode,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            range: SweepRange::single(1.0),
            time: TimeControl::default(),
            newmark: NewmarkConfig::default(),
            history_frequency: None,
            history_dofs: 4,
            monitored_dof: 0,
            policy: FailurePolicy::default(),
            mode: ExecutionMode::default(),
        }
    }
}

impl SweepConfig {
    /// Sweep controls of `model`, with the response DOF mapped into `system`.
    pub fn from_model(model: &BeamModel, system: &ReducedSystem) -> Result<Self> {
        let response = model.response_dof();
        let monitored_dof = system.reduced_index(response).ok_or_else(|| {
            SolverError::config(format!(
                "response DOF {} is fixed and cannot be monitored",
                response + 1
            ))
        })?;

        Ok(Self {
            range: model.sweep,
            time: model.time,
            newmark: NewmarkConfig::from_method(model.method),
            history_frequency: model.output.history_frequency,
            history_dofs: model.output.history_dofs,
            monitored_dof,
            ..Self::default()
        })
    }

    pub fn records_history(&self, omega: f64) -> bool {
        match self.history_frequency {
            None => true,
            Some(target) => (omega - target).abs() <= 1e-9 * target.abs().max(1.0),
        }
    }
}

/// Output of one forcing frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResult {
    pub frequency: f64,
    pub peak: f64,
    pub history: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub failed: Vec<f64>,
    pub peaks: Vec<ResponseRow>,
}

impl SweepSummary {
    /// Frequency with the largest peak response.
    pub fn peak_frequency(&self) -> Option<f64> {
        self.peaks
            .iter()
            .max_by(|a, b| a.peak.total_cmp(&b.peak))
            .map(|row| row.frequency)
    }
}

pub struct FrequencySweep<'a> {
    system: &'a ReducedSystem,
    solver: &'a dyn LinearSolver,
    config: SweepConfig,
}

impl<'a> FrequencySweep<'a> {
    pub fn new(
        system: &'a ReducedSystem,
        solver: &'a dyn LinearSolver,
        config: SweepConfig,
    ) -> Result<Self> {
        if config.monitored_dof >= system.size() {
            return Err(SolverError::config(format!(
                "monitored DOF {} is outside the {} free DOFs",
                config.monitored_dof,
                system.size()
            )));
        }
        config.time.check().map_err(SolverError::Config)?;
        config.range.check().map_err(SolverError::Config)?;
        Ok(Self {
            system,
            solver,
            config,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Integrates one forcing frequency from rest.
    pub fn run_frequency(&self, omega: f64) -> Result<FrequencyResult> {
        let time = &self.config.time;
        let dt = time_step(omega, time.steps_per_period);
        let coefficients = NewmarkCoefficients::new(dt, &self.config.newmark)?;
        let integrator = NewmarkIntegrator::new(self.system, coefficients, self.solver);

        let record = self.config.records_history(omega);
        let k = self.config.history_dofs.min(self.system.size());
        let r = self.config.monitored_dof;

        let mut state = State::zeros(self.system.size());
        let mut t = time.start_time;
        let mut peak = 0.0_f64;
        let mut history = Vec::new();

        for period in 0..time.periods {
            let steady = period >= time.transient_periods;
            for _ in 0..time.steps_per_period {
                state = integrator.step_harmonic(&state, omega, t)?;
                t += dt;
                log::trace!("ω={omega} t={t:.6e} u[{r}]={:.6e}", state.displacement[r]);

                if !steady {
                    continue;
                }
                peak = peak.max(state.displacement[r].abs());
                if record {
                    history.push(HistoryRow {
                        frequency: omega,
                        time: t,
                        displacement: state.displacement.rows(0, k).iter().copied().collect(),
                        velocity: state.velocity.rows(0, k).iter().copied().collect(),
                        acceleration: state.acceleration.rows(0, k).iter().copied().collect(),
                    });
                }
            }
        }

        log::debug!("ω={omega}: peak |u| = {peak:.6e} ({} history rows)", history.len());
        Ok(FrequencyResult {
            frequency: omega,
            peak,
            history,
        })
    }

    /// Runs every frequency of the range and writes rows to `sink`.
    pub fn run(&self, sink: &mut dyn ResultSink) -> Result<SweepSummary> {
        let frequencies = self.config.range.frequencies();
        log::info!(
            "sweeping {} frequencies from {} to {} rad/s ({:?})",
            frequencies.len(),
            self.config.range.start,
            self.config.range.end,
            self.config.mode
        );

        let mut summary = SweepSummary::default();
        match self.config.mode {
            ExecutionMode::Sequential => {
                for &omega in &frequencies {
                    let outcome = self.run_frequency(omega);
                    self.emit(sink, omega, outcome, &mut summary)?;
                }
            }
            ExecutionMode::Parallel => {
                let outcomes: Vec<_> = frequencies
                    .par_iter()
                    .map(|&omega| (omega, self.run_frequency(omega)))
                    .collect();
                for (omega, outcome) in outcomes {
                    self.emit(sink, omega, outcome, &mut summary)?;
                }
            }
        }
        sink.finish()?;

        log::info!(
            "sweep finished: {} evaluated, {} failed",
            summary.evaluated,
            summary.failed.len()
        );
        Ok(summary)
    }

    fn emit(
        &self,
        sink: &mut dyn ResultSink,
        omega: f64,
        outcome: Result<FrequencyResult>,
        summary: &mut SweepSummary,
    ) -> Result<()> {
        match outcome {
            Ok(result) => {
                for row in &result.history {
                    sink.write_history(row)?;
                }
                let row = ResponseRow {
                    frequency: result.frequency,
                    peak: result.peak,
                };
                sink.write_response(&row)?;
                summary.peaks.push(row);
                summary.evaluated += 1;
                Ok(())
            }
            Err(err) if err.is_numerical() && self.config.policy == FailurePolicy::SkipFailed => {
                log::warn!("skipping ω={omega} rad/s: {err}");
                summary.failed.push(omega);
                Ok(())
            }
            Err(err) => Err(SolverError::Frequency {
                frequency: omega,
                source: Box::new(err),
            }),
        }
    }
}
