// src/error.rs

//! Error kinds surfaced by the loader, the PCA engine and the ranking layer.
//!
//! Every failure falls into one of three kinds so that callers can react to
//! the category without matching on individual variants:
//!
//! - [`DataError`]: malformed or missing input (NaNs reaching the engine, too
//!   few objects or variables, unreadable CSV cells, bad config files).
//! - [`IndexError`]: an out-of-range component index or selection count.
//! - [`NumericalError`]: the decomposition backend failed or produced
//!   non-finite output.

use thiserror::Error;

/// Coarse category of a [`PcaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Data,
    Index,
    Numerical,
}

/// Malformed or missing input.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Model serialization failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Model deserialization failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("The required column '{0}' was not found in the input header.")]
    ColumnNotFound(String),
    #[error("Row {row} ('{label}'): cell in column '{column}' is not numeric: '{value}'")]
    UnparsableCell {
        row: usize,
        label: String,
        column: String,
        value: String,
    },
    #[error("Row {row} has {found} fields but the header declares {expected}.")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Object label '{0}' appears more than once; labels must be unique.")]
    DuplicateLabel(String),
    #[error("No row is labelled '{0}'.")]
    UnknownLabel(String),
    #[error("Missing or non-finite value for object '{object}' at variable '{variable}'.")]
    MissingValue { object: String, variable: String },
    #[error("At least {required} objects are required, found {found}.")]
    TooFewObjects { found: usize, required: usize },
    #[error("At least {required} variables are required, found {found}.")]
    TooFewVariables { found: usize, required: usize },
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}.")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Out-of-range component index or selection count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Component index {index} is out of range; only {n_components} components exist.")]
    ComponentOutOfRange { index: usize, n_components: usize },
    #[error("Selection count {k} is invalid; it must be between 1 and {n_objects}.")]
    CountOutOfRange { k: usize, n_objects: usize },
    #[error("Cannot use {requested} components; between 1 and {n_components} are available.")]
    ComponentCountOutOfRange { requested: usize, n_components: usize },
}

/// Failure inside the linear-algebra backend.
#[derive(Error, Debug)]
pub enum NumericalError {
    #[error("{stage} failed: {message}")]
    DecompositionFailed { stage: &'static str, message: String },
    #[error("{stage} produced non-finite values.")]
    NonFinite { stage: &'static str },
}

/// Top-level error for every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum PcaError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),
}

impl PcaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PcaError::Data(_) => ErrorKind::Data,
            PcaError::Index(_) => ErrorKind::Index,
            PcaError::Numerical(_) => ErrorKind::Numerical,
        }
    }
}

impl From<std::io::Error> for PcaError {
    fn from(e: std::io::Error) -> Self {
        PcaError::Data(DataError::Io(e))
    }
}

impl From<csv::Error> for PcaError {
    fn from(e: csv::Error) -> Self {
        PcaError::Data(DataError::Csv(e))
    }
}

pub type Result<T, E = PcaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_wrapped_variant() {
        let e: PcaError = DataError::TooFewObjects { found: 1, required: 2 }.into();
        assert_eq!(e.kind(), ErrorKind::Data);
        let e: PcaError = IndexError::CountOutOfRange { k: 0, n_objects: 4 }.into();
        assert_eq!(e.kind(), ErrorKind::Index);
        let e: PcaError = NumericalError::NonFinite { stage: "SVD" }.into();
        assert_eq!(e.kind(), ErrorKind::Numerical);
    }

    #[test]
    fn messages_name_the_failing_dimension() {
        let e: PcaError = DataError::MissingValue {
            object: "Chad".to_string(),
            variable: "1987".to_string(),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.contains("Chad") && msg.contains("1987"), "{}", msg);
    }
}
