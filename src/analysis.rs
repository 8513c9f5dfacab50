// src/analysis.rs

//! End-to-end fertility analysis: load, clean, decompose, rank, plot.
//!
//! Each step takes the previous step's value and the configuration
//! explicitly; nothing depends on execution order or shared state.

use crate::config::{AnalysisConfig, SelectionConfig};
use crate::error::{DataError, Result};
use crate::matrix::{ObservationMatrix, Orientation};
use crate::pca::Pca;
use crate::plot::{self, LinePlot, ScatterPlot};
use crate::ranking::LoadingRanking;
use crate::table::{FertilityTable, LoaderConfig};
use log::info;
use std::fs;
use std::path::Path;

/// Objects at both ends of one component's loading ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Extremes {
    pub component: usize,
    /// Largest loadings, descending.
    pub top: Vec<String>,
    /// Smallest loadings, ascending.
    pub bottom: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Plots {
    pub mean_trend: LinePlot,
    pub factor_curves: LinePlot,
    pub top_trajectories: LinePlot,
    pub bottom_trajectories: LinePlot,
    pub loading_scatter: ScatterPlot,
}

/// Everything the analysis produces, owned.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub matrix: ObservationMatrix,
    pub pca: Pca,
    pub extremes: Extremes,
    pub plots: Plots,
}

/// Loads the table, keeps the configured years and drops incomplete rows.
pub fn load_matrix<P: AsRef<Path>>(path: P, loader: &LoaderConfig) -> Result<ObservationMatrix> {
    let table = FertilityTable::load(path, loader)?;
    let cleaned = table.select_years(loader)?.dropna();
    cleaned.to_observation_matrix()
}

pub fn select_extremes(matrix: &ObservationMatrix, pca: &Pca, selection: &SelectionConfig) -> Result<Extremes> {
    let ranking = LoadingRanking::from_pca(matrix, pca)?;
    let to_owned = |v: Vec<&str>| v.into_iter().map(str::to_string).collect::<Vec<_>>();
    Ok(Extremes {
        component: selection.component,
        top: to_owned(ranking.top(selection.component, selection.count)?),
        bottom: to_owned(ranking.bottom(selection.component, selection.count)?),
    })
}

pub fn build_plots(
    matrix: &ObservationMatrix,
    pca: &Pca,
    extremes: &Extremes,
    config: &AnalysisConfig,
) -> Result<Plots> {
    let n_curves = config.factor_curves.min(pca.n_components());
    let (a, b) = config.scatter_components;
    let pc = plot::component_label(extremes.component);
    Ok(Plots {
        mean_trend: plot::mean_trend(matrix),
        factor_curves: plot::factor_curves(pca, matrix.variable_labels(), n_curves)?,
        top_trajectories: plot::trajectories(matrix, &extremes.top, &format!("Highest {} loadings", pc))?,
        bottom_trajectories: plot::trajectories(matrix, &extremes.bottom, &format!("Lowest {} loadings", pc))?,
        loading_scatter: plot::loading_scatter(matrix, pca, a, b)?,
    })
}

/// Analyzes an already-loaded matrix.
///
/// The matrix is canonical (objects as rows), so `config.pca.orientation`
/// must be `ObjectsAsRows`.
pub fn analyze(matrix: ObservationMatrix, config: &AnalysisConfig) -> Result<AnalysisReport> {
    if config.pca.orientation != Orientation::ObjectsAsRows {
        return Err(DataError::InvalidConfig(format!(
            "pca.orientation {:?} has no effect on a loaded table; objects are always rows",
            config.pca.orientation
        ))
        .into());
    }
    let pca = Pca::fit(&matrix, &config.pca)?;
    let extremes = select_extremes(&matrix, &pca, &config.selection)?;
    info!(
        "{}: top {:?}, bottom {:?}",
        plot::component_label(extremes.component),
        extremes.top,
        extremes.bottom
    );
    let plots = build_plots(&matrix, &pca, &extremes, config)?;
    Ok(AnalysisReport {
        matrix,
        pca,
        extremes,
        plots,
    })
}

/// Runs the whole analysis from `config.input`, writing artifacts to
/// `config.output_dir` when it is set.
pub fn run(config: &AnalysisConfig) -> Result<AnalysisReport> {
    let matrix = load_matrix(&config.input, &config.loader)?;
    info!(
        "Analysing {} objects over {} variables",
        matrix.n_objects(),
        matrix.n_variables()
    );
    let report = analyze(matrix, config)?;
    if let Some(dir) = &config.output_dir {
        report.write_outputs(dir)?;
    }
    Ok(report)
}

impl AnalysisReport {
    /// Writes every plot as CSV plus the bincode model into `dir`.
    pub fn write_outputs<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.plots.mean_trend.write_csv_file(dir.join("mean_trend.csv"))?;
        self.plots.factor_curves.write_csv_file(dir.join("factor_curves.csv"))?;
        self.plots.top_trajectories.write_csv_file(dir.join("top_trajectories.csv"))?;
        self.plots.bottom_trajectories.write_csv_file(dir.join("bottom_trajectories.csv"))?;
        self.plots.loading_scatter.write_csv_file(dir.join("loading_scatter.csv"))?;
        self.pca.save_model(dir.join("pca_model.bin"))?;
        info!("Wrote plots and model to {}", dir.display());
        Ok(())
    }
}
