// src/matrix.rs

//! Labelled observation matrix shared by the loader, the PCA engine and the
//! presentation layer.
//!
//! Canonical layout: objects (countries) are rows and variables (years) are
//! columns. Every downstream computation reads this value; nothing mutates it.

use crate::error::{DataError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which axis of an input matrix holds the objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Rows are objects (countries), columns are variables (years).
    #[default]
    ObjectsAsRows,
    /// Rows are variables (years), columns are objects (countries).
    ObjectsAsColumns,
}

/// An immutable object × variable matrix with row and column labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationMatrix {
    object_labels: Vec<String>,
    variable_labels: Vec<String>,
    values: Array2<f64>,
}

impl ObservationMatrix {
    /// Builds a matrix from data laid out according to `orientation`.
    ///
    /// `object_labels` and `variable_labels` are always given in the canonical
    /// sense: one label per object and one per variable, regardless of how the
    /// data is laid out. Object labels must be unique. Missing values are
    /// allowed here; the PCA engine rejects them.
    pub fn new(
        object_labels: Vec<String>,
        variable_labels: Vec<String>,
        data: Array2<f64>,
        orientation: Orientation,
    ) -> Result<Self> {
        let values = match orientation {
            Orientation::ObjectsAsRows => data,
            Orientation::ObjectsAsColumns => data.reversed_axes().as_standard_layout().into_owned(),
        };

        if values.nrows() != object_labels.len() {
            return Err(DataError::DimensionMismatch {
                what: "object labels",
                expected: values.nrows(),
                found: object_labels.len(),
            }
            .into());
        }
        if values.ncols() != variable_labels.len() {
            return Err(DataError::DimensionMismatch {
                what: "variable labels",
                expected: values.ncols(),
                found: variable_labels.len(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(object_labels.len());
        for label in &object_labels {
            if !seen.insert(label.as_str()) {
                return Err(DataError::DuplicateLabel(label.clone()).into());
            }
        }

        Ok(Self {
            object_labels,
            variable_labels,
            values,
        })
    }

    /// Convenience constructor with generated labels (`"obj0"`, `"var0"`, ...),
    /// mostly useful for tests and synthetic data.
    pub fn from_array(data: Array2<f64>, orientation: Orientation) -> Result<Self> {
        let (n_objects, n_variables) = match orientation {
            Orientation::ObjectsAsRows => data.dim(),
            Orientation::ObjectsAsColumns => (data.ncols(), data.nrows()),
        };
        let objects = (0..n_objects).map(|i| format!("obj{}", i)).collect();
        let variables = (0..n_variables).map(|j| format!("var{}", j)).collect();
        Self::new(objects, variables, data, orientation)
    }

    pub fn n_objects(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_variables(&self) -> usize {
        self.values.ncols()
    }

    pub fn object_labels(&self) -> &[String] {
        &self.object_labels
    }

    pub fn variable_labels(&self) -> &[String] {
        &self.variable_labels
    }

    /// The values in canonical (objects × variables) layout.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn object_index(&self, label: &str) -> Option<usize> {
        self.object_labels.iter().position(|l| l == label)
    }

    /// The measurement row for one object.
    pub fn row(&self, label: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .object_index(label)
            .ok_or_else(|| DataError::UnknownLabel(label.to_string()))?;
        Ok(self.values.index_axis(Axis(0), idx))
    }

    /// Fails with [`DataError::MissingValue`] on the first non-finite entry,
    /// naming the object and variable it belongs to.
    pub fn ensure_finite(&self) -> Result<()> {
        for ((i, j), v) in self.values.indexed_iter() {
            if !v.is_finite() {
                return Err(DataError::MissingValue {
                    object: self.object_labels[i].clone(),
                    variable: self.variable_labels[j].clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PcaError};
    use ndarray::array;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn objects_as_columns_is_transposed_to_canonical_layout() {
        // 3 years × 2 countries
        let data = array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]];
        let m = ObservationMatrix::new(
            labels(&["A", "B"]),
            labels(&["1960", "1961", "1962"]),
            data,
            Orientation::ObjectsAsColumns,
        )
        .unwrap();
        assert_eq!(m.n_objects(), 2);
        assert_eq!(m.n_variables(), 3);
        assert_eq!(m.row("B").unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let err = ObservationMatrix::new(
            labels(&["A", "A"]),
            labels(&["x"]),
            array![[1.0], [2.0]],
            Orientation::ObjectsAsRows,
        )
        .unwrap_err();
        assert!(matches!(err, PcaError::Data(DataError::DuplicateLabel(ref l)) if l == "A"));
    }

    #[test]
    fn label_count_must_match_shape() {
        let err = ObservationMatrix::new(
            labels(&["A"]),
            labels(&["x"]),
            array![[1.0], [2.0]],
            Orientation::ObjectsAsRows,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn ensure_finite_reports_location() {
        let m = ObservationMatrix::new(
            labels(&["A", "B"]),
            labels(&["1960", "1961"]),
            array![[1.0, 2.0], [f64::NAN, 3.0]],
            Orientation::ObjectsAsRows,
        )
        .unwrap();
        match m.ensure_finite() {
            Err(PcaError::Data(DataError::MissingValue { object, variable })) => {
                assert_eq!(object, "B");
                assert_eq!(variable, "1960");
            }
            other => panic!("expected MissingValue, got {:?}", other),
        }
    }

    #[test]
    fn unknown_row_label() {
        let m = ObservationMatrix::from_array(array![[1.0, 2.0]], Orientation::ObjectsAsRows).unwrap();
        assert!(m.row("nope").is_err());
        assert_eq!(m.row("obj0").unwrap().len(), 2);
    }
}
