// Principal component analysis of fertility-rate time series

#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod config;
pub mod error;
pub mod linalg_backends;
pub mod matrix;
pub mod pca;
pub mod plot;
pub mod ranking;
pub mod table;

pub use analysis::{AnalysisReport, Extremes};
pub use config::{AnalysisConfig, SelectionConfig};
pub use error::{DataError, ErrorKind, IndexError, NumericalError, PcaError};
pub use matrix::{ObservationMatrix, Orientation};
pub use pca::{DecompositionMethod, Pca, PcaConfig, ScreeEntry};
pub use ranking::LoadingRanking;
pub use table::{FertilityTable, LoaderConfig};
