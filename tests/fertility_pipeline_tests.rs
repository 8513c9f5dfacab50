// End-to-end runs of the fertility analysis over synthetic CSV input.

use approx::assert_abs_diff_eq;
use fertility_pca::analysis;
use fertility_pca::{AnalysisConfig, DataError, ErrorKind, FertilityTable, LoaderConfig, Orientation, Pca, PcaError};
use float_cmp::approx_eq;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FIRST_YEAR: u32 = 1960;
const LAST_YEAR: u32 = 1969;

/// (country, total decline over the decade)
const COUNTRIES: &[(&str, f64)] = &[
    ("Flatland", 0.0),
    ("Aland", 0.5),
    ("Bland", 1.0),
    ("Cland", 1.5),
    ("Dland", 2.0),
    ("Eland", 2.5),
    ("Fland", 3.0),
    ("Steepland", 3.5),
];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fertility starts near 6 everywhere and falls linearly at a country-specific
/// rate, with a small deterministic wobble. Two extra rows have gaps.
fn synthetic_csv() -> String {
    let mut out = String::from("Country Name,Country Code");
    for year in FIRST_YEAR..=LAST_YEAR {
        write!(out, ",{}", year).unwrap();
    }
    out.push_str(",2012\n");

    let span = (LAST_YEAR - FIRST_YEAR) as f64;
    for (c, &(name, decline)) in COUNTRIES.iter().enumerate() {
        write!(out, "{},C{}", name, c).unwrap();
        for (t, _) in (FIRST_YEAR..=LAST_YEAR).enumerate() {
            let wobble = 0.01 * ((c * 7 + t * 3) as f64).sin();
            let value = 6.0 - decline * t as f64 / span + wobble;
            write!(out, ",{:.6}", value).unwrap();
        }
        out.push_str(",\n");
    }
    // Incomplete rows: dropped before the decomposition.
    out.push_str("Gapland,GAP,6,6,,6,6,6,6,6,6,6,\n");
    out.push_str("Dotland,DOT,6,6,6,6,6,6,6,6,6,..,\n");
    out
}

fn write_inputs(dir: &Path) -> AnalysisConfig {
    let csv_path = dir.join("fertility.csv");
    fs::write(&csv_path, synthetic_csv()).unwrap();
    let toml = format!(
        r#"
input = "fertility.csv"
output_dir = "out"
factor_curves = 2

[loader]
first_year = {}
last_year = {}

[selection]
component = 0
count = 2
"#,
        FIRST_YEAR, LAST_YEAR
    );
    let cfg_path = dir.join("analysis.toml");
    fs::write(&cfg_path, toml).unwrap();
    AnalysisConfig::from_path(&cfg_path).unwrap()
}

#[test]
fn loader_drops_incomplete_countries() {
    let cfg = LoaderConfig {
        first_year: FIRST_YEAR,
        last_year: LAST_YEAR,
        ..LoaderConfig::default()
    };
    let table = FertilityTable::from_reader(synthetic_csv().as_bytes(), &cfg).unwrap();
    assert_eq!(table.n_rows(), COUNTRIES.len() + 2);
    // 2012 is a year column but outside the configured range.
    assert_eq!(table.columns().len(), 11);

    let clean = table.select_years(&cfg).unwrap().dropna();
    assert_eq!(clean.n_rows(), COUNTRIES.len());
    assert!(clean.row("Gapland").is_err());
    assert_eq!(clean.columns().len(), 10);
}

#[test]
fn dominant_component_orders_countries_by_decline() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path());
    let report = analysis::run(&config).unwrap();

    assert_eq!(report.matrix.n_objects(), COUNTRIES.len());
    assert_eq!(report.matrix.n_variables(), 10);

    // Nearly all variance is the common declining trend.
    let ratio = report.pca.explained_variance_ratio();
    assert!(ratio[0] > 0.99, "PC 1 explains only {}", ratio[0]);

    // The factor rises over time, so the flattest country loads highest.
    let factor = report.pca.factor(0).unwrap();
    assert!(factor[9] > factor[0]);
    assert_eq!(report.extremes.top, vec!["Flatland", "Aland"]);
    assert_eq!(report.extremes.bottom, vec!["Steepland", "Fland"]);

    let sum: f64 = report.pca.eigenvalues().sum();
    assert!(approx_eq!(f64, sum, report.pca.total_variance(), epsilon = 1e-10));
}

#[test]
fn outputs_are_written_and_model_reloads() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path());
    let report = analysis::run(&config).unwrap();

    let out = dir.path().join("out");
    for name in [
        "mean_trend.csv",
        "factor_curves.csv",
        "top_trajectories.csv",
        "bottom_trajectories.csv",
        "loading_scatter.csv",
        "pca_model.bin",
    ] {
        assert!(out.join(name).exists(), "{} was not written", name);
    }

    let curves = fs::read_to_string(out.join("factor_curves.csv")).unwrap();
    assert!(curves.starts_with("series,x,y\nPC 1,1960,"));
    assert!(curves.contains("PC 2,1969,"));
    assert!(!curves.contains("PC 3"));

    let scatter = fs::read_to_string(out.join("loading_scatter.csv")).unwrap();
    assert_eq!(scatter.lines().count(), COUNTRIES.len() + 1);

    let model = Pca::load_model(out.join("pca_model.bin")).unwrap();
    let rescored = model.transform(report.matrix.values()).unwrap();
    for (a, b) in rescored.iter().zip(report.pca.loadings().iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-10);
    }
}

#[test]
fn trajectory_plots_carry_selected_countries_and_mean() {
    let dir = TempDir::new().unwrap();
    let mut config = write_inputs(dir.path());
    config.output_dir = None;
    let report = analysis::run(&config).unwrap();

    let top = &report.plots.top_trajectories;
    let names: Vec<&str> = top.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Flatland", "Aland", "mean"]);
    assert_eq!(top.x.first().map(String::as_str), Some("1960"));

    let mean = report.plots.mean_trend.series("mean").unwrap();
    assert_eq!(mean.values, top.series("mean").unwrap().values);
    assert_eq!(report.plots.loading_scatter.x_label, "PC 1");
    assert_eq!(report.plots.loading_scatter.y_label, "PC 2");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn oversized_selection_is_an_index_error() {
    let dir = TempDir::new().unwrap();
    let mut config = write_inputs(dir.path());
    config.output_dir = None;
    config.selection.count = COUNTRIES.len() + 1;
    let err = analysis::run(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);

    config.selection.count = 1;
    config.selection.component = 50;
    assert_eq!(analysis::run(&config).unwrap_err().kind(), ErrorKind::Index);
}

#[test]
fn missing_input_file_is_a_data_error() {
    let config = AnalysisConfig {
        input: "/nonexistent/fertility.csv".into(),
        ..AnalysisConfig::default()
    };
    assert_eq!(analysis::run(&config).unwrap_err().kind(), ErrorKind::Data);
}

#[test]
fn column_orientation_is_rejected_for_loaded_tables() {
    let dir = TempDir::new().unwrap();
    let mut config = write_inputs(dir.path());
    config.output_dir = None;
    config.pca.orientation = Orientation::ObjectsAsColumns;
    let err = analysis::run(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(matches!(err, PcaError::Data(DataError::InvalidConfig(_))));
    assert!(!dir.path().join("out").exists());
}
