// src/ranking.rs

//! Orders objects by their loading on a component and picks the extremes.
//!
//! Sorting is stable, so objects with equal loadings keep their original
//! order in every listing.

use crate::error::{DataError, IndexError, Result};
use crate::matrix::ObservationMatrix;
use crate::pca::Pca;
use ndarray::ArrayView2;
use std::cmp::Ordering;

/// Total order on loadings in which `-0.0` and `0.0` are equal.
fn cmp_loadings(a: f64, b: f64) -> Ordering {
    (a + 0.0).total_cmp(&(b + 0.0))
}

/// Read-only ranking view over a loadings matrix and its object labels.
#[derive(Debug, Clone, Copy)]
pub struct LoadingRanking<'a> {
    labels: &'a [String],
    loadings: ArrayView2<'a, f64>,
}

impl<'a> LoadingRanking<'a> {
    /// `loadings` has one row per label and one column per component.
    pub fn new(labels: &'a [String], loadings: ArrayView2<'a, f64>) -> Result<Self> {
        if labels.len() != loadings.nrows() {
            return Err(DataError::DimensionMismatch {
                what: "object labels for loadings",
                expected: loadings.nrows(),
                found: labels.len(),
            }
            .into());
        }
        Ok(Self { labels, loadings })
    }

    pub fn from_pca(matrix: &'a ObservationMatrix, pca: &'a Pca) -> Result<Self> {
        Self::new(matrix.object_labels(), pca.loadings().view())
    }

    pub fn n_objects(&self) -> usize {
        self.labels.len()
    }

    pub fn n_components(&self) -> usize {
        self.loadings.ncols()
    }

    fn check_component(&self, component: usize) -> Result<()> {
        if component >= self.n_components() {
            return Err(IndexError::ComponentOutOfRange {
                index: component,
                n_components: self.n_components(),
            }
            .into());
        }
        Ok(())
    }

    fn check_count(&self, k: usize) -> Result<()> {
        if k == 0 || k > self.n_objects() {
            return Err(IndexError::CountOutOfRange {
                k,
                n_objects: self.n_objects(),
            }
            .into());
        }
        Ok(())
    }

    /// Object indices in ascending loading order.
    fn ascending_indices(&self, component: usize) -> Vec<usize> {
        let column = self.loadings.column(component);
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        order.sort_by(|&a, &b| cmp_loadings(column[a], column[b]));
        order
    }

    /// Every object label, ascending by loading on `component`.
    pub fn sorted(&self, component: usize) -> Result<Vec<&'a str>> {
        self.check_component(component)?;
        let labels: &'a [String] = self.labels;
        Ok(self
            .ascending_indices(component)
            .into_iter()
            .map(|i| labels[i].as_str())
            .collect())
    }

    /// `(label, loading)` pairs, ascending by loading on `component`.
    pub fn ranked_values(&self, component: usize) -> Result<Vec<(&'a str, f64)>> {
        self.check_component(component)?;
        let labels: &'a [String] = self.labels;
        let column = self.loadings.column(component);
        Ok(self
            .ascending_indices(component)
            .into_iter()
            .map(|i| (labels[i].as_str(), column[i]))
            .collect())
    }

    /// The `k` labels with the largest loadings, in descending order.
    pub fn top(&self, component: usize, k: usize) -> Result<Vec<&'a str>> {
        self.check_component(component)?;
        self.check_count(k)?;
        let labels: &'a [String] = self.labels;
        let column = self.loadings.column(component);
        let mut order: Vec<usize> = (0..labels.len()).collect();
        order.sort_by(|&a, &b| cmp_loadings(column[b], column[a]));
        Ok(order.into_iter().take(k).map(|i| labels[i].as_str()).collect())
    }

    /// The `k` labels with the smallest loadings, in ascending order.
    pub fn bottom(&self, component: usize, k: usize) -> Result<Vec<&'a str>> {
        self.check_component(component)?;
        self.check_count(k)?;
        let labels: &'a [String] = self.labels;
        Ok(self
            .ascending_indices(component)
            .into_iter()
            .take(k)
            .map(|i| labels[i].as_str())
            .collect())
    }
}
