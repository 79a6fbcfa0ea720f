//! Analysis pipeline: deck → model → assembled and reduced system → sweep.
//!
//! Assembly and reduction happen once in [`AnalysisPipeline::from_model`];
//! every later call (modes, sweeps) reuses the reduced matrices.

use std::path::Path;

use pzb_deck::Deck;
use pzb_io::{FileSink, REPORT_FILE, ResultSink, RunReport, RunStatus, save_report};
use pzb_model::{BeamModel, ModelError};
use serde::{Deserialize, Serialize};

use crate::assembly::GlobalSystem;
use crate::backend::BackendKind;
use crate::boundary_conditions::{BoundaryFlags, ReducedSystem};
use crate::error::Result;
use crate::modal_solver::{ModalResults, ModalSolver};
use crate::sweep::{ExecutionMode, FailurePolicy, FrequencySweep, SweepConfig, SweepSummary};

/// Run-level options that are not part of the deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub mode: ExecutionMode,
    pub policy: FailurePolicy,
    pub backend: BackendKind,
    /// Natural frequencies listed in the run report.
    pub num_modes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            policy: FailurePolicy::Abort,
            backend: BackendKind::Gauss,
            num_modes: 5,
        }
    }
}

/// A validated model with its assembled and reduced system.
pub struct AnalysisPipeline {
    model: BeamModel,
    system: GlobalSystem,
    flags: BoundaryFlags,
    reduced: ReducedSystem,
}

impl AnalysisPipeline {
    pub fn from_model(model: BeamModel) -> Result<Self> {
        let system = GlobalSystem::from_model(&model)?;
        let flags = BoundaryFlags::from_model(&model, &system.dof_map);
        let reduced = flags.reduce(&system)?;
        log::info!(
            "model: {} elements, {} DOFs, {} free ({} potentials)",
            model.num_elements,
            system.num_dofs,
            reduced.size(),
            reduced.potential_count()
        );
        Ok(Self {
            model,
            system,
            flags,
            reduced,
        })
    }

    /// Parses a deck file (following `*INCLUDE` cards) and builds the pipeline.
    pub fn from_deck_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("reading deck {}", path.display());
        let deck = Deck::parse_file_with_includes(path).map_err(ModelError::from)?;
        Self::from_deck(&deck)
    }

    pub fn from_deck(deck: &Deck) -> Result<Self> {
        let model = BeamModel::from_deck(deck)?;
        Self::from_model(model)
    }

    pub fn model(&self) -> &BeamModel {
        &self.model
    }

    pub fn system(&self) -> &GlobalSystem {
        &self.system
    }

    pub fn flags(&self) -> &BoundaryFlags {
        &self.flags
    }

    pub fn reduced(&self) -> &ReducedSystem {
        &self.reduced
    }

    pub fn modes(&self, num_modes: usize) -> Result<ModalResults> {
        ModalSolver::new(&self.reduced).solve(num_modes)
    }

    pub fn sweep_config(&self, config: &AnalysisConfig) -> Result<SweepConfig> {
        Ok(SweepConfig {
            mode: config.mode,
            policy: config.policy,
            ..SweepConfig::from_model(&self.model, &self.reduced)?
        })
    }

    /// Runs the deck's frequency sweep into `sink`.
    pub fn run(&self, sink: &mut dyn ResultSink, config: &AnalysisConfig) -> Result<SweepSummary> {
        let sweep_config = self.sweep_config(config)?;
        let solver = config.backend.build();
        log::debug!("per-step solver: {}", solver.name());
        let sweep = FrequencySweep::new(&self.reduced, solver.as_ref(), sweep_config)?;
        sweep.run(sink)
    }

    /// Runs the sweep into `history.dat`/`response.dat` under `dir` and
    /// writes `report.json` next to them, also when the sweep fails.
    pub fn run_to_directory(
        &self,
        dir: impl AsRef<Path>,
        job_name: &str,
        started_at: Option<String>,
        config: &AnalysisConfig,
    ) -> Result<RunReport> {
        let dir = dir.as_ref();
        let mut sink = FileSink::create(dir)?;

        let mut report = RunReport::from_model(job_name, &self.model, RunStatus::Failed, "");
        report.started_at = started_at;
        report.free_dofs = self.reduced.size();
        match self.modes(config.num_modes) {
            Ok(modes) => report.natural_frequencies = modes.angular_frequencies,
            Err(err) => log::warn!("modal analysis skipped in report: {err}"),
        }

        let report_path = dir.join(REPORT_FILE);
        let summary = match self.run(&mut sink, config) {
            Ok(summary) => summary,
            Err(err) => {
                report.message = err.to_string();
                if let Err(save_err) = save_report(&report_path, &report) {
                    log::error!("could not write {}: {save_err}", report_path.display());
                }
                return Err(err);
            }
        };

        report.failed_frequencies = summary.failed.clone();
        report.peak_frequency = summary.peak_frequency();
        (report.status, report.message) = if summary.failed.is_empty() {
            (
                RunStatus::Success,
                format!("{} frequencies evaluated", summary.evaluated),
            )
        } else if summary.evaluated > 0 {
            (
                RunStatus::Partial,
                format!(
                    "{} frequencies evaluated, {} skipped",
                    summary.evaluated,
                    summary.failed.len()
                ),
            )
        } else {
            (RunStatus::Failed, "every frequency failed".to_string())
        };

        save_report(&report_path, &report)?;
        log::info!("wrote results and {} to {}", REPORT_FILE, dir.display());
        Ok(report)
    }
}
