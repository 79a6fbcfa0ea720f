use std::fs;
use std::path::Path;

use pzb_model::BeamModel;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::output::ensure_parent_dir;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

/// Machine-readable record of one run, written next to the result files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub job_name: String,
    pub started_at: Option<String>,
    pub num_elements: usize,
    pub num_nodes: usize,
    pub num_dofs: usize,
    pub free_dofs: usize,
    pub has_piezo: bool,
    pub num_frequencies: usize,
    pub failed_frequencies: Vec<f64>,
    /// Lowest natural angular frequencies of the reduced system, rad/s.
    pub natural_frequencies: Vec<f64>,
    /// Sweep frequency with the largest peak response.
    pub peak_frequency: Option<f64>,
    pub status: RunStatus,
    pub message: String,
}

impl RunReport {
    pub fn from_model(
        job_name: impl Into<String>,
        model: &BeamModel,
        status: RunStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: 1,
            job_name: job_name.into(),
            started_at: None,
            num_elements: model.num_elements,
            num_nodes: model.num_nodes(),
            num_dofs: model.total_dofs(),
            free_dofs: 0,
            has_piezo: model.has_piezo(),
            num_frequencies: model.sweep.count(),
            failed_frequencies: Vec::new(),
            natural_frequencies: Vec::new(),
            peak_frequency: None,
            status,
            message: message.into(),
        }
    }
}

pub fn save_report(path: impl AsRef<Path>, report: &RunReport) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let bytes = serde_json::to_vec_pretty(report)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_report(path: impl AsRef<Path>) -> Result<RunReport> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use pzb_model::{BeamGeometry, ElementMaterial};

    fn model() -> BeamModel {
        BeamModel::uniform(
            3,
            BeamGeometry::rectangular(1.0, 0.02, 0.002),
            ElementMaterial {
                young_modulus: 2.1e11,
                density: 7850.0,
            },
        )
    }

    #[test]
    fn report_is_saved_and_loaded() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("out").join(REPORT_FILE);

        let mut report = RunReport::from_model("cantilever", &model(), RunStatus::Partial, "1 frequency skipped");
        report.free_dofs = 6;
        report.failed_frequencies = vec![12.5];
        report.natural_frequencies = vec![10.1, 63.0];
        report.started_at = Some("2026-01-01T00:00:00Z".to_string());

        save_report(&path, &report).expect("save should succeed");
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"status\": \"PARTIAL\""), "{raw}");

        let loaded = load_report(&path).expect("load should succeed");
        assert_eq!(loaded, report);
        assert_eq!(loaded.num_nodes, 4);
        assert_eq!(loaded.num_dofs, 8);
    }

    #[test]
    fn load_fails_for_invalid_payload() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_report(&path), Err(IoError::Json(_))));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let tmp = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            load_report(tmp.path().join("missing.json")),
            Err(IoError::Io(_))
        ));
    }
}
