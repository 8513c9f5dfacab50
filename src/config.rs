// src/config.rs

//! Analysis configuration, deserialized from TOML.
//!
//! Every section and field is optional; omitted values take the defaults
//! below. A minimal file only needs `input`:
//!
//! ```toml
//! input = "data/fertility.csv"
//! output_dir = "out"
//!
//! [loader]
//! label_column = "Country Name"
//! first_year = 1960
//! last_year = 2011
//!
//! [pca]
//! demean = true
//! standardize = false
//! method = "svd"
//!
//! [selection]
//! component = 0
//! count = 5
//! ```

use crate::error::{DataError, Result};
use crate::pca::PcaConfig;
use crate::table::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which component to rank objects by, and how many extremes to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub component: usize,
    pub count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { component: 0, count: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    /// Plot CSVs and the fitted model are written here when set.
    pub output_dir: Option<PathBuf>,
    pub loader: LoaderConfig,
    pub pca: PcaConfig,
    pub selection: SelectionConfig,
    /// Number of leading factor curves to plot.
    pub factor_curves: usize,
    /// Components shown on the loading scatter (x, y).
    pub scatter_components: (usize, usize),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("fertility.csv"),
            output_dir: None,
            loader: LoaderConfig::default(),
            pca: PcaConfig::default(),
            selection: SelectionConfig::default(),
            factor_curves: 3,
            scatter_components: (0, 1),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text).map_err(DataError::from)?)
    }

    /// Reads a TOML file. A relative `input` or `output_dir` is resolved
    /// against the directory containing the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            if config.input.is_relative() {
                config.input = base.join(&config.input);
            }
            if let Some(dir) = config.output_dir.as_mut() {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Orientation;
    use crate::pca::DecompositionMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert!(cfg.pca.demean);
        assert!(!cfg.pca.standardize);
        assert_eq!(cfg.selection.count, 5);
        assert_eq!(cfg.loader.year_columns().len(), 52);
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let text = r#"
            input = "rates.csv"

            [pca]
            standardize = true
            method = "covariance"
            orientation = "objects_as_columns"

            [selection]
            count = 3
        "#;
        let cfg = AnalysisConfig::from_toml_str(text).unwrap();
        assert_eq!(cfg.input, PathBuf::from("rates.csv"));
        assert!(cfg.pca.demean);
        assert!(cfg.pca.standardize);
        assert_eq!(cfg.pca.method, DecompositionMethod::Covariance);
        assert_eq!(cfg.pca.orientation, Orientation::ObjectsAsColumns);
        assert_eq!(cfg.selection, SelectionConfig { component: 0, count: 3 });
        assert_eq!(cfg.loader.first_year, 1960);
    }

    #[test]
    fn malformed_toml_is_a_data_error() {
        let err = AnalysisConfig::from_toml_str("input = [").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }

    #[test]
    fn relative_paths_resolve_against_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "input = \"data.csv\"\noutput_dir = \"plots\"").unwrap();
        let cfg = AnalysisConfig::from_path(file.path()).unwrap();
        let base = file.path().parent().unwrap();
        assert_eq!(cfg.input, base.join("data.csv"));
        assert_eq!(cfg.output_dir, Some(base.join("plots")));
    }
}
