// Runs the fertility analysis described by a TOML file and prints a summary.
//
//     RUST_LOG=info cargo run --example fertility_analysis -- analysis.toml

use fertility_pca::{analysis, AnalysisConfig, PcaError};
use std::env;
use std::process::ExitCode;

fn run() -> Result<(), PcaError> {
    let config = match env::args_os().nth(1) {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::default(),
    };
    let report = analysis::run(&config)?;

    println!(
        "{} countries x {} years",
        report.matrix.n_objects(),
        report.matrix.n_variables()
    );
    println!("component  eigenvalue  explained  cumulative");
    for entry in report.pca.scree().iter().take(10) {
        println!(
            "PC {:<7} {:>10.4} {:>9.2}% {:>10.2}%",
            entry.component + 1,
            entry.eigenvalue,
            100.0 * entry.ratio,
            100.0 * entry.cumulative
        );
    }
    println!("highest PC {} loadings: {}", report.extremes.component + 1, report.extremes.top.join(", "));
    println!("lowest PC {} loadings:  {}", report.extremes.component + 1, report.extremes.bottom.join(", "));
    if let Some(dir) = &config.output_dir {
        println!("plots written to {}", dir.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
