//! # Fertility table loading and cleaning
//!
//! Reads a country-by-year CSV (World Bank layout: a label column such as
//! `Country Name`, a few descriptive text columns, then one column per year),
//! keeps the label column plus every column whose header is a year, and turns
//! the result into an [`ObservationMatrix`] once incomplete rows are dropped.
//!
//! Missing cells are empty or one of the markers in [`MISSING_MARKERS`]. Any
//! other cell that does not parse as a number is an error naming the row and
//! column, never a silent NaN.

use crate::error::{DataError, Result};
use crate::matrix::{ObservationMatrix, Orientation};
use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Cell contents treated as missing (compared after trimming, case-insensitive).
pub const MISSING_MARKERS: &[&str] = &["", "nan", "na", "n/a", "..", "null"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Header of the column holding the object (country) label.
    pub label_column: String,
    /// First year column kept by [`FertilityTable::select_years`].
    pub first_year: u32,
    /// Last year column kept by [`FertilityTable::select_years`], inclusive.
    pub last_year: u32,
    pub delimiter: u8,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            label_column: "Country Name".to_string(),
            first_year: 1960,
            last_year: 2011,
            delimiter: b',',
        }
    }
}

impl LoaderConfig {
    /// Year column headers from `first_year` to `last_year`, as strings.
    pub fn year_columns(&self) -> Vec<String> {
        (self.first_year..=self.last_year).map(|y| y.to_string()).collect()
    }
}

/// A labelled table of optional numeric cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FertilityTable {
    labels: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

fn is_year_header(header: &str) -> bool {
    let h = header.trim();
    !h.is_empty() && h.len() <= 4 && h.chars().all(|c| c.is_ascii_digit())
}

fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let trimmed = raw.trim();
    if MISSING_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    trimmed.parse::<f64>().map(Some).map_err(|_| ())
}

impl FertilityTable {
    /// Builds a table directly; rows must match `columns` in length and labels must be unique.
    pub fn new(labels: Vec<String>, columns: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Result<Self> {
        if labels.len() != rows.len() {
            return Err(DataError::DimensionMismatch {
                what: "row labels",
                expected: rows.len(),
                found: labels.len(),
            }
            .into());
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataError::RaggedRow {
                    row: i + 1,
                    found: row.len(),
                    expected: columns.len(),
                }
                .into());
            }
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(DataError::DuplicateLabel(label.clone()).into());
            }
        }
        Ok(Self { labels, columns, rows })
    }

    /// Opens and parses a CSV file.
    pub fn load<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        info!("Loading fertility table from {}", path.as_ref().display());
        Self::from_reader(file, config)
    }

    /// Parses CSV from any reader. The first record is the header.
    pub fn from_reader<R: Read>(reader: R, config: &LoaderConfig) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let label_idx = headers
            .iter()
            .position(|h| h.trim() == config.label_column)
            .ok_or_else(|| DataError::ColumnNotFound(config.label_column.clone()))?;

        let year_idx: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|&(i, h)| i != label_idx && is_year_header(h))
            .map(|(i, _)| i)
            .collect();
        let columns: Vec<String> = year_idx.iter().map(|&i| headers[i].trim().to_string()).collect();
        debug!(
            "Header has {} fields; {} year columns recognised",
            headers.len(),
            columns.len()
        );

        let mut labels = Vec::new();
        let mut rows = Vec::new();
        for (row_no, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row_no = row_no + 1;
            if record.len() != headers.len() {
                return Err(DataError::RaggedRow {
                    row: row_no,
                    found: record.len(),
                    expected: headers.len(),
                }
                .into());
            }
            let label = record[label_idx].trim().to_string();
            let mut values = Vec::with_capacity(year_idx.len());
            for (&idx, column) in year_idx.iter().zip(&columns) {
                let cell = parse_cell(&record[idx]).map_err(|_| DataError::UnparsableCell {
                    row: row_no,
                    label: label.clone(),
                    column: column.clone(),
                    value: record[idx].to_string(),
                })?;
                values.push(cell);
            }
            labels.push(label);
            rows.push(values);
        }

        info!("Read {} rows with {} year columns", rows.len(), columns.len());
        Self::new(labels, columns, rows)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// The cells of the row labelled `label`.
    pub fn row(&self, label: &str) -> Result<&[Option<f64>]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.rows[i].as_slice())
            .ok_or_else(|| DataError::UnknownLabel(label.to_string()).into())
    }

    /// A new table restricted to `columns`, in the given order.
    pub fn select_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let idx = columns
            .iter()
            .map(|c| {
                self.columns
                    .iter()
                    .position(|existing| existing == c.as_ref())
                    .ok_or_else(|| DataError::ColumnNotFound(c.as_ref().to_string()))
            })
            .collect::<std::result::Result<Vec<usize>, DataError>>()?;
        let rows: Vec<Vec<Option<f64>>> = self
            .rows
            .iter()
            .map(|row| idx.iter().map(|&j| row[j]).collect())
            .collect();
        Ok(Self {
            labels: self.labels.clone(),
            columns: idx.iter().map(|&j| self.columns[j].clone()).collect(),
            rows,
        })
    }

    /// Restricts to the configured year range.
    pub fn select_years(&self, config: &LoaderConfig) -> Result<Self> {
        self.select_columns(&config.year_columns())
    }

    /// A new table without the rows that have any missing cell.
    pub fn dropna(&self) -> Self {
        let (labels, rows): (Vec<String>, Vec<Vec<Option<f64>>>) = self
            .labels
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(label, row)| (label.clone(), row.clone()))
            .unzip();
        let dropped = self.rows.len() - rows.len();
        if dropped > 0 {
            info!("Dropped {} of {} rows with missing values", dropped, self.rows.len());
        }
        Self {
            labels,
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Converts to a canonical objects × variables matrix.
    ///
    /// Fails with [`DataError::MissingValue`] if any cell is still missing;
    /// call [`dropna`](Self::dropna) first.
    pub fn to_observation_matrix(&self) -> Result<ObservationMatrix> {
        let mut values = Array2::<f64>::zeros((self.rows.len(), self.columns.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                values[[i, j]] = cell.ok_or_else(|| DataError::MissingValue {
                    object: self.labels[i].clone(),
                    variable: self.columns[j].clone(),
                })?;
            }
        }
        ObservationMatrix::new(
            self.labels.clone(),
            self.columns.clone(),
            values,
            Orientation::ObjectsAsRows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcaError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Country Name,Country Code,1960,1961,1962,Notes
Aruba,ABW,4.8,4.6,4.4,x
Chad,TCD,6.2,,6.3,
Denmark,DNK,2.6,2.5,2.5,y
Japan,JPN,2.0,1.96,..,
";

    fn config() -> LoaderConfig {
        LoaderConfig {
            first_year: 1960,
            last_year: 1962,
            ..LoaderConfig::default()
        }
    }

    #[test]
    fn reads_year_columns_and_ignores_text_columns() {
        let table = FertilityTable::from_reader(SAMPLE.as_bytes(), &config()).unwrap();
        assert_eq!(table.columns(), &["1960", "1961", "1962"]);
        assert_eq!(table.n_rows(), 4);
        assert_eq!(table.row("Chad").unwrap(), &[Some(6.2), None, Some(6.3)]);
        assert_eq!(table.row("Japan").unwrap()[2], None);
    }

    #[test]
    fn dropna_removes_incomplete_rows() {
        let table = FertilityTable::from_reader(SAMPLE.as_bytes(), &config()).unwrap();
        let clean = table.dropna();
        assert_eq!(clean.labels(), &["Aruba", "Denmark"]);
        let matrix = clean.to_observation_matrix().unwrap();
        assert_eq!(matrix.n_objects(), 2);
        assert_eq!(matrix.row("Denmark").unwrap().to_vec(), vec![2.6, 2.5, 2.5]);
    }

    #[test]
    fn matrix_conversion_refuses_missing_cells() {
        let table = FertilityTable::from_reader(SAMPLE.as_bytes(), &config()).unwrap();
        let err = table.to_observation_matrix().unwrap_err();
        assert!(matches!(
            err,
            PcaError::Data(DataError::MissingValue { ref object, ref variable })
                if object == "Chad" && variable == "1961"
        ));
    }

    #[test]
    fn select_years_restricts_and_reports_missing_columns() {
        let table = FertilityTable::from_reader(SAMPLE.as_bytes(), &config()).unwrap();
        let narrow = table
            .select_years(&LoaderConfig {
                first_year: 1961,
                last_year: 1962,
                ..config()
            })
            .unwrap();
        assert_eq!(narrow.columns(), &["1961", "1962"]);
        assert_eq!(narrow.row("Aruba").unwrap(), &[Some(4.6), Some(4.4)]);

        let err = table.select_columns(&["1960", "1999"]).unwrap_err();
        assert!(matches!(err, PcaError::Data(DataError::ColumnNotFound(ref c)) if c == "1999"));
    }

    #[test]
    fn junk_cells_are_errors_not_nans() {
        let csv = "Country Name,1960,1961\nAruba,4.8,abc\n";
        let err = FertilityTable::from_reader(csv.as_bytes(), &config()).unwrap_err();
        match err {
            PcaError::Data(DataError::UnparsableCell { row, label, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(label, "Aruba");
                assert_eq!(column, "1961");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_label_column_and_duplicates() {
        let csv = "Name,1960\nAruba,4.8\n";
        assert!(matches!(
            FertilityTable::from_reader(csv.as_bytes(), &config()).unwrap_err(),
            PcaError::Data(DataError::ColumnNotFound(_))
        ));

        let csv = "Country Name,1960\nAruba,4.8\nAruba,4.9\n";
        assert!(matches!(
            FertilityTable::from_reader(csv.as_bytes(), &config()).unwrap_err(),
            PcaError::Data(DataError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let csv = "Country Name,1960,1961\nAruba,4.8\n";
        assert!(matches!(
            FertilityTable::from_reader(csv.as_bytes(), &config()).unwrap_err(),
            PcaError::Data(DataError::RaggedRow { row: 1, found: 2, expected: 3 })
        ));
    }

    #[test]
    fn load_from_file_with_custom_delimiter() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "country;1960;1961\nA;1.0;2.0\nB;3.0;4.0\n").unwrap();
        let cfg = LoaderConfig {
            label_column: "country".to_string(),
            delimiter: b';',
            first_year: 1960,
            last_year: 1961,
        };
        let table = FertilityTable::load(file.path(), &cfg).unwrap();
        assert_eq!(table.labels(), &["A", "B"]);
        assert_eq!(table.row("B").unwrap(), &[Some(3.0), Some(4.0)]);
    }
}
