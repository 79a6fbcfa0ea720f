use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pzb_deck::Deck;
use pzb_model::{BeamModel, ModelSummary};
use pzb_solver::{AnalysisConfig, AnalysisPipeline, ExecutionMode, FailurePolicy};

const DEFAULT_MODES: usize = 5;

fn usage() {
    eprintln!("usage: pzb-cli summary <deck.inp>");
    eprintln!("       pzb-cli modes <deck.inp> [count]");
    eprintln!("       pzb-cli run <deck.inp> [output_dir] [--parallel] [--skip-failed]");
}

fn print_summary(summary: &ModelSummary) {
    println!("total_cards: {}", summary.total_cards);
    println!("total_data_lines: {}", summary.total_data_lines);
    match summary.declared_elements {
        Some(n) => println!("declared_elements: {n}"),
        None => println!("declared_elements: -"),
    }
    println!("material_rows: {}", summary.material_rows);
    println!("has_piezo: {}", summary.has_piezo);
    println!("has_charge: {}", summary.has_charge);
    println!("has_time: {}", summary.has_time);
    println!("has_sweep: {}", summary.has_sweep);
    println!("has_output: {}", summary.has_output);
    for (keyword, count) in &summary.keyword_counts {
        println!("card {keyword}: {count}");
    }
}

fn print_model(model: &BeamModel) {
    println!("nodes: {}", model.num_nodes());
    println!("dofs: {}", model.total_dofs());
    println!("element_length: {:e}", model.element_length());
    println!(
        "sweep: {} frequencies, {}..{} step {} rad/s",
        model.sweep.count(),
        model.sweep.start,
        model.sweep.end,
        model.sweep.step
    );
    println!(
        "time: {} steps/period, {} periods ({} transient)",
        model.time.steps_per_period, model.time.periods, model.time.transient_periods
    );
}

fn summary(deck_path: &str) -> ExitCode {
    let deck = match Deck::parse_file_with_includes(deck_path) {
        Ok(deck) => deck,
        Err(err) => {
            eprintln!("parse error: {err}");
            return ExitCode::from(1);
        }
    };
    print_summary(&ModelSummary::from_deck(&deck));
    match BeamModel::from_deck(&deck) {
        Ok(model) => {
            print_model(&model);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("model error: {err}");
            ExitCode::from(1)
        }
    }
}

fn modes(deck_path: &str, count: usize) -> ExitCode {
    let pipeline = match AnalysisPipeline::from_deck_file(deck_path) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };
    match pipeline.modes(count) {
        Ok(results) => {
            for (i, (w, f)) in results
                .angular_frequencies
                .iter()
                .zip(&results.frequencies_hz)
                .enumerate()
            {
                println!("mode {}: {w:.6e} rad/s ({f:.6e} Hz)", i + 1);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("modal analysis failed: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(deck_path: &str, output_dir: &Path, config: &AnalysisConfig) -> ExitCode {
    let started_at = chrono::Utc::now().to_rfc3339();
    let job_name = Path::new(deck_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string());

    let pipeline = match AnalysisPipeline::from_deck_file(deck_path) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };

    match pipeline.run_to_directory(output_dir, &job_name, Some(started_at), config) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => log::warn!("could not render report: {err}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("run failed: {err}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("summary") if args.len() == 3 => summary(&args[2]),
        Some("modes") if args.len() == 3 || args.len() == 4 => {
            let count = match args.get(3).map(|raw| raw.parse::<usize>()) {
                None => DEFAULT_MODES,
                Some(Ok(count)) if count > 0 => count,
                Some(_) => {
                    usage();
                    return ExitCode::from(2);
                }
            };
            modes(&args[2], count)
        }
        Some("run") if args.len() >= 3 => {
            let mut config = AnalysisConfig::default();
            let mut output_dir: Option<PathBuf> = None;
            for arg in &args[3..] {
                match arg.as_str() {
                    "--parallel" => config.mode = ExecutionMode::Parallel,
                    "--skip-failed" => config.policy = FailurePolicy::SkipFailed,
                    flag if flag.starts_with("--") => {
                        usage();
                        return ExitCode::from(2);
                    }
                    dir if output_dir.is_none() => output_dir = Some(PathBuf::from(dir)),
                    _ => {
                        usage();
                        return ExitCode::from(2);
                    }
                }
            }
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
            run(&args[2], &output_dir, &config)
        }
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}
