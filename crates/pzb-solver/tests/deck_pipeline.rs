//! Deck files through the whole pipeline, including rejected input.

use std::fs;
use std::path::PathBuf;

use pzb_io::{MemorySink, REPORT_FILE, RunStatus, load_report};
use pzb_model::ModelError;
use pzb_solver::{AnalysisConfig, AnalysisPipeline, FailurePolicy, SolverError};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

const HEADER: &str = "\
*BEAM, ELEMENTS=2
1 1 1
*MATERIAL
1, 1, 1
2, 1, 1
";

const CONTROLS: &str = "\
*BOUNDARY
0 0 1 1 1 1
*TIME
0, 16, 4, 0
*SWEEP
1, 2, 1
";

#[test]
fn test_include_expands_beam_definition() {
    let pipeline = AnalysisPipeline::from_deck_file(fixture("short_circuit.inp")).unwrap();
    let model = pipeline.model();
    assert_eq!(model.num_elements, 4);
    assert!(model.has_piezo());
    assert!(model.potential_free.iter().all(|free| !free));
    assert_eq!(model.sweep.count(), 7);
}

#[test]
fn test_force_count_mismatch_reports_line() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("short_force.inp");
    fs::write(&path, format!("{HEADER}*FORCE\n0 0 0 0 1\n{CONTROLS}")).unwrap();

    let err = AnalysisPipeline::from_deck_file(&path)
        .err()
        .expect("five force values for three nodes must be rejected");
    match err {
        SolverError::Model(ModelError::Card { line, message }) => {
            assert_eq!(line, 7);
            assert!(message.contains("expects 6 nodal forces"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_number_reports_line() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("bad_number.inp");
    fs::write(&path, format!("{HEADER}*FORCE\n0 0 0 0 x 0\n{CONTROLS}")).unwrap();

    let err = AnalysisPipeline::from_deck_file(&path).err().unwrap();
    assert!(err.to_string().starts_with("line 7:"), "{err}");
}

#[test]
fn test_missing_deck_is_reported() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let err = AnalysisPipeline::from_deck_file(tmp.path().join("absent.inp"))
        .err()
        .unwrap();
    assert!(matches!(err, SolverError::Model(ModelError::Parse(_))), "{err}");
}

#[test]
fn test_transient_longer_than_run_is_rejected() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("transient.inp");
    let controls = CONTROLS.replace("0, 16, 4, 0", "0, 16, 4, 4");
    fs::write(&path, format!("{HEADER}*FORCE\n0 0 0 0 1 0\n{controls}")).unwrap();

    let err = AnalysisPipeline::from_deck_file(&path).err().unwrap();
    assert!(err.to_string().contains("transient periods"), "{err}");
}

#[test]
fn test_hand_written_deck_runs_end_to_end() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("beam.inp");
    fs::write(
        &path,
        format!("{HEADER}*SECTION, INERTIA=1.0\n*FORCE\n0 0 0 0 1 0\n{CONTROLS}*OUTPUT, DOFS=1\n"),
    )
    .unwrap();

    let pipeline = AnalysisPipeline::from_deck_file(&path).unwrap();
    let mut sink = MemorySink::new();
    let config = AnalysisConfig {
        policy: FailurePolicy::SkipFailed,
        ..AnalysisConfig::default()
    };
    let summary = pipeline.run(&mut sink, &config).unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(sink.history.len(), 2 * 16 * 4);
    assert_eq!(sink.history[0].acceleration.len(), 1);

    let out = tmp.path().join("out");
    let report = pipeline
        .run_to_directory(&out, "beam", None, &config)
        .unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(load_report(out.join(REPORT_FILE)).unwrap(), report);
}

#[test]
fn test_bad_time_and_sweep_controls_report_lines() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let cases = [
        ("0, 16, 4, 0", "0, 0, 4, 0", 11),
        ("0, 16, 4, 0", "0, 16, 0, 0", 11),
        ("1, 2, 1", "1, 2, 0", 13),
        ("1, 2, 1", "2, 1, 1", 13),
    ];
    for (i, (from, to, expected_line)) in cases.into_iter().enumerate() {
        let path = tmp.path().join(format!("controls_{i}.inp"));
        let controls = CONTROLS.replace(from, to);
        fs::write(&path, format!("{HEADER}*FORCE\n0 0 0 0 1 0\n{controls}")).unwrap();

        match AnalysisPipeline::from_deck_file(&path).err() {
            Some(SolverError::Model(ModelError::Card { line, .. })) => {
                assert_eq!(line, expected_line, "{to}");
            }
            other => panic!("{to}: unexpected result {other:?}"),
        }
    }
}

#[test]
fn test_circular_tube_deck_runs_modes() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("tube.inp");
    let header = HEADER.replace("1 1 1", "1, 0.05, 0.005");
    fs::write(
        &path,
        format!("{header}*SECTION, SHAPE=CIRCULAR\n*FORCE\n0 0 0 0 1 0\n{CONTROLS}"),
    )
    .unwrap();

    let pipeline = AnalysisPipeline::from_deck_file(&path).unwrap();
    let geometry = pipeline.model().geometry;
    assert!(!geometry.is_rectangular());

    // E = rho = 1, so omega_1 = 1.875^2 * sqrt(I / A) for a unit-length cantilever.
    let w1 = pipeline.modes(1).unwrap().angular_frequencies[0];
    let analytic = 1.875104_f64.powi(2) * (geometry.second_moment() / geometry.area()).sqrt();
    assert!((w1 - analytic).abs() < 0.01 * analytic, "{w1} vs {analytic}");
}
