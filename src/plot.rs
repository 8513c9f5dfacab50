// src/plot.rs

//! Plot-ready series built from a fitted [`Pca`] and its observation matrix.
//!
//! Nothing here feeds back into the engine; these are read-only consumers of
//! `factors`, `loadings` and the matrix itself. Each plot can be exported as a
//! long-format CSV so that any charting tool can render it.

use crate::error::{DataError, IndexError, Result};
use crate::matrix::ObservationMatrix;
use crate::pca::Pca;
use ndarray::{Array1, Axis};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Legend text for a zero-based component index: `"PC 1"`, `"PC 2"`, ...
pub fn component_label(component: usize) -> String {
    format!("PC {}", component + 1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    /// One value per entry of the owning plot's `x`.
    pub values: Vec<f64>,
}

/// Several series sharing one categorical x axis (years).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<String>,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Serialize)]
struct LineRecord<'a> {
    series: &'a str,
    x: &'a str,
    y: f64,
}

impl LinePlot {
    pub fn series(&self, name: &str) -> Option<&LineSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Writes `series,x,y` rows, one per point.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for s in &self.series {
            for (x, &y) in self.x.iter().zip(&s.values) {
                wtr.serialize(LineRecord { series: &s.name, x, y })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

impl ScatterPlot {
    /// Writes `label,x,y` rows, one per point.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for p in &self.points {
            wtr.serialize(p)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

fn column_mean(matrix: &ObservationMatrix) -> Array1<f64> {
    matrix
        .values()
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(matrix.n_variables()))
}

/// Mean value of every variable across objects, e.g. the average fertility
/// rate per year.
pub fn mean_trend(matrix: &ObservationMatrix) -> LinePlot {
    LinePlot {
        title: "Mean trend".to_string(),
        x_label: "year".to_string(),
        y_label: "value".to_string(),
        x: matrix.variable_labels().to_vec(),
        series: vec![LineSeries {
            name: "mean".to_string(),
            values: column_mean(matrix).to_vec(),
        }],
    }
}

/// The first `n` factor curves overlaid, labelled `"PC 1"`..`"PC n"`.
pub fn factor_curves(pca: &Pca, variable_labels: &[String], n: usize) -> Result<LinePlot> {
    if variable_labels.len() != pca.n_variables() {
        return Err(DataError::DimensionMismatch {
            what: "variable labels for factor curves",
            expected: pca.n_variables(),
            found: variable_labels.len(),
        }
        .into());
    }
    if n == 0 || n > pca.n_components() {
        return Err(IndexError::ComponentCountOutOfRange {
            requested: n,
            n_components: pca.n_components(),
        }
        .into());
    }
    let series = (0..n)
        .map(|c| LineSeries {
            name: component_label(c),
            values: pca.factors().column(c).to_vec(),
        })
        .collect();
    Ok(LinePlot {
        title: "Principal component factors".to_string(),
        x_label: "year".to_string(),
        y_label: "factor".to_string(),
        x: variable_labels.to_vec(),
        series,
    })
}

/// The rows of the chosen objects plus the mean curve (series `"mean"`).
pub fn trajectories<S: AsRef<str>>(matrix: &ObservationMatrix, labels: &[S], title: &str) -> Result<LinePlot> {
    let mut series = Vec::with_capacity(labels.len() + 1);
    for label in labels {
        let row = matrix.row(label.as_ref())?;
        series.push(LineSeries {
            name: label.as_ref().to_string(),
            values: row.to_vec(),
        });
    }
    series.push(LineSeries {
        name: "mean".to_string(),
        values: column_mean(matrix).to_vec(),
    });
    Ok(LinePlot {
        title: title.to_string(),
        x_label: "year".to_string(),
        y_label: "value".to_string(),
        x: matrix.variable_labels().to_vec(),
        series,
    })
}

/// Every object placed by its loadings on components `a` (x) and `b` (y).
pub fn loading_scatter(matrix: &ObservationMatrix, pca: &Pca, a: usize, b: usize) -> Result<ScatterPlot> {
    let xs = pca.loading(a)?;
    let ys = pca.loading(b)?;
    if matrix.n_objects() != pca.n_objects() {
        return Err(DataError::DimensionMismatch {
            what: "objects for loading scatter",
            expected: pca.n_objects(),
            found: matrix.n_objects(),
        }
        .into());
    }
    let points = matrix
        .object_labels()
        .iter()
        .zip(xs.iter().zip(ys.iter()))
        .map(|(label, (&x, &y))| ScatterPoint {
            label: label.clone(),
            x,
            y,
        })
        .collect();
    Ok(ScatterPlot {
        title: format!("Loadings: {} vs {}", component_label(a), component_label(b)),
        x_label: component_label(a),
        y_label: component_label(b),
        points,
    })
}
