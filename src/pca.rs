// Principal component analysis (PCA)

use crate::error::{DataError, IndexError, NumericalError, Result};
use crate::linalg_backends::{BackendEigh, BackendSVD, EighOutput, LinAlgBackendProvider};
use crate::matrix::{ObservationMatrix, Orientation};
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Standard deviations at or below this value are treated as zero and
/// replaced by 1.0 when standardizing.
const SCALE_SANITIZATION_THRESHOLD: f64 = 1e-9;

/// How the principal axes are obtained from the prepared matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionMethod {
    /// Thin SVD of the prepared n × p matrix.
    #[default]
    Svd,
    /// Symmetric eigendecomposition of the p × p covariance (p <= n) or of the
    /// n × n Gram matrix (p > n).
    Covariance,
}

/// Options controlling how the observation matrix is prepared and decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    /// Subtract each variable's mean before decomposition. When false the
    /// decomposition is of the raw second-moment matrix.
    pub demean: bool,
    /// Divide each variable by its sample standard deviation (ddof = 1) after
    /// demeaning. Without demeaning, the divisor is the root second moment.
    pub standardize: bool,
    /// Layout of arrays passed to [`Pca::fit_array`]. [`Pca::fit`] takes an
    /// already canonical matrix and ignores it; the analysis pipeline rejects
    /// anything but `ObjectsAsRows`.
    pub orientation: Orientation,
    pub method: DecompositionMethod,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            demean: true,
            standardize: false,
            orientation: Orientation::ObjectsAsRows,
            method: DecompositionMethod::Svd,
        }
    }
}

impl PcaConfig {
    pub fn with_demean(mut self, demean: bool) -> Self {
        self.demean = demean;
        self
    }

    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_method(mut self, method: DecompositionMethod) -> Self {
        self.method = method;
        self
    }
}

/// One row of the scree table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreeEntry {
    /// Zero-based component index.
    pub component: usize,
    pub eigenvalue: f64,
    /// Fraction of the total variance explained by this component.
    pub ratio: f64,
    /// Fraction explained by this and all preceding components.
    pub cumulative: f64,
}

/// A fitted principal component decomposition.
///
/// Objects are rows and variables are columns throughout:
///
/// - `factors` has shape (n_variables, n_components); column `i` is the basis
///   curve of component `i` and the columns are orthonormal. With
///   [`DecompositionMethod::Covariance`] on wide data, null directions get a
///   zero column and a zero eigenvalue instead.
/// - `loadings` has shape (n_objects, n_components); column `i` holds every
///   object's coordinate along factor `i`.
/// - `eigenvalues` are the variances along each factor (`s_i^2 / (n - 1)`),
///   non-negative and descending.
///
/// `loadings · factorsᵀ`, multiplied by `scale` and shifted by `mean`
/// column-wise, reproduces the original matrix.
///
/// Sign convention: in every factor column the entry with the largest absolute
/// value (the first such entry on ties) is positive; the loading column is
/// flipped together with it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Pca {
    config: PcaConfig,
    /// Per-variable shift applied before decomposition (zeros when `demean` is off).
    mean: Array1<f64>,
    /// Per-variable divisor applied after shifting (ones when `standardize` is
    /// off). Always strictly positive.
    scale: Array1<f64>,
    eigenvalues: Array1<f64>,
    factors: Array2<f64>,
    loadings: Array2<f64>,
    /// Sum of squares of the prepared matrix divided by (n - 1).
    total_variance: f64,
}

impl Pca {
    /// Fits the decomposition to a labelled observation matrix.
    ///
    /// The matrix is already in canonical objects × variables layout, so
    /// `config.orientation` is not consulted here.
    ///
    /// # Errors
    /// - [`DataError`] if the matrix has fewer than 2 objects or 2 variables or
    ///   contains any missing/non-finite value.
    /// - [`NumericalError`] if the backend decomposition fails or produces
    ///   non-finite values.
    ///
    /// # Examples
    ///
    /// ```
    /// use fertility_pca::{ObservationMatrix, Orientation, Pca, PcaConfig};
    /// use ndarray::array;
    ///
    /// let data = array![[2.0, 2.0, 2.0], [1.0, 2.0, 3.0], [3.0, 2.0, 1.0], [2.0, 3.0, 4.0]];
    /// let matrix = ObservationMatrix::from_array(data, Orientation::ObjectsAsRows).unwrap();
    /// let pca = Pca::fit(&matrix, &PcaConfig::default()).unwrap();
    /// assert_eq!(pca.n_components(), 3);
    /// ```
    pub fn fit(matrix: &ObservationMatrix, config: &PcaConfig) -> Result<Self> {
        let n_objects = matrix.n_objects();
        let n_variables = matrix.n_variables();

        if n_objects < 2 {
            return Err(DataError::TooFewObjects { found: n_objects, required: 2 }.into());
        }
        if n_variables < 2 {
            return Err(DataError::TooFewVariables { found: n_variables, required: 2 }.into());
        }
        matrix.ensure_finite()?;

        let (prepared, mean, scale) = prepare(matrix, config);
        let dof = (n_objects - 1) as f64;
        let total_variance = prepared.iter().map(|v| v * v).sum::<f64>() / dof;

        debug!(
            "Decomposing {}x{} matrix with {:?} (demean={}, standardize={})",
            n_objects, n_variables, config.method, config.demean, config.standardize
        );

        let backend = LinAlgBackendProvider::new();
        let (eigenvalues, mut factors, mut loadings) = match config.method {
            DecompositionMethod::Svd => decompose_svd(&backend, prepared, dof)?,
            DecompositionMethod::Covariance => decompose_covariance(&backend, &prepared, dof)?,
        };

        apply_sign_convention(&mut factors, &mut loadings);

        if eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFinite { stage: "eigenvalue computation" }.into());
        }
        if factors.iter().chain(loadings.iter()).any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFinite { stage: "factor/loading computation" }.into());
        }

        info!(
            "PCA fitted: {} objects, {} variables, {} components, total variance {:.6}",
            n_objects,
            n_variables,
            eigenvalues.len(),
            total_variance
        );

        Ok(Self {
            config: *config,
            mean,
            scale,
            eigenvalues,
            factors,
            loadings,
            total_variance,
        })
    }

    /// Fits an unlabelled array laid out according to `config.orientation`.
    pub fn fit_array(data: ArrayView2<'_, f64>, config: &PcaConfig) -> Result<Self> {
        let matrix = ObservationMatrix::from_array(data.to_owned(), config.orientation)?;
        Self::fit(&matrix, config)
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn n_objects(&self) -> usize {
        self.loadings.nrows()
    }

    pub fn n_variables(&self) -> usize {
        self.factors.nrows()
    }

    /// Eigenvalues in descending order; this is the scree.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// Shape (n_variables, n_components).
    pub fn factors(&self) -> &Array2<f64> {
        &self.factors
    }

    /// Shape (n_objects, n_components).
    pub fn loadings(&self) -> &Array2<f64> {
        &self.loadings
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// The basis curve of one component.
    pub fn factor(&self, component: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_component(component)?;
        Ok(self.factors.column(component))
    }

    /// Every object's loading on one component.
    pub fn loading(&self, component: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_component(component)?;
        Ok(self.loadings.column(component))
    }

    pub(crate) fn check_component(&self, component: usize) -> Result<()> {
        if component >= self.n_components() {
            return Err(IndexError::ComponentOutOfRange {
                index: component,
                n_components: self.n_components(),
            }
            .into());
        }
        Ok(())
    }

    /// Eigenvalues divided by the total variance.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance <= 0.0 {
            return Array1::zeros(self.n_components());
        }
        self.eigenvalues.mapv(|v| v / self.total_variance)
    }

    /// Running sum of [`explained_variance_ratio`](Self::explained_variance_ratio).
    pub fn cumulative_variance_ratio(&self) -> Array1<f64> {
        let mut cumulative = self.explained_variance_ratio();
        let mut acc = 0.0;
        for r in cumulative.iter_mut() {
            acc += *r;
            *r = acc;
        }
        cumulative
    }

    pub fn scree(&self) -> Vec<ScreeEntry> {
        let ratios = self.explained_variance_ratio();
        let cumulative = self.cumulative_variance_ratio();
        self.eigenvalues
            .iter()
            .enumerate()
            .map(|(component, &eigenvalue)| ScreeEntry {
                component,
                eigenvalue,
                ratio: ratios[component],
                cumulative: cumulative[component],
            })
            .collect()
    }

    /// Approximates the original matrix from the leading `n_components`
    /// components, in the original units.
    pub fn project(&self, n_components: usize) -> Result<Array2<f64>> {
        if n_components == 0 || n_components > self.n_components() {
            return Err(IndexError::ComponentCountOutOfRange {
                requested: n_components,
                n_components: self.n_components(),
            }
            .into());
        }
        let scores = self.loadings.slice(s![.., ..n_components]);
        let basis = self.factors.slice(s![.., ..n_components]);
        let mut approx = scores.dot(&basis.t());
        approx *= &self.scale;
        approx += &self.mean;
        Ok(approx)
    }

    /// Reconstruction from every component; equal to the fitted matrix up to
    /// floating-point error.
    pub fn reconstruct(&self) -> Array2<f64> {
        let mut approx = self.loadings.dot(&self.factors.t());
        approx *= &self.scale;
        approx += &self.mean;
        approx
    }

    /// Projects new objects (rows, same variables as the fit) onto the factors,
    /// using the mean and scale learned during fitting.
    ///
    /// Applied to the fitted matrix this returns the loadings.
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.n_variables() {
            return Err(DataError::DimensionMismatch {
                what: "variables in transform input",
                expected: self.n_variables(),
                found: data.ncols(),
            }
            .into());
        }
        if let Some(((i, j), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(DataError::MissingValue {
                object: format!("row {}", i),
                variable: format!("column {}", j),
            }
            .into());
        }
        let mut x = data.to_owned();
        x -= &self.mean;
        x /= &self.scale;
        Ok(x.dot(&self.factors))
    }

    /// Saves the fitted model to a file using bincode.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(DataError::from)?;
        Ok(())
    }

    /// Loads a model previously written by [`save_model`](Self::save_model)
    /// and checks that its parts agree on dimensions.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let model: Pca = bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(DataError::from)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let p = self.factors.nrows();
        let k = self.factors.ncols();
        if self.mean.len() != p || self.scale.len() != p {
            return Err(DataError::InvalidModel(format!(
                "feature dimensions disagree: factors={}, mean={}, scale={}",
                p,
                self.mean.len(),
                self.scale.len()
            ))
            .into());
        }
        if self.eigenvalues.len() != k || self.loadings.ncols() != k {
            return Err(DataError::InvalidModel(format!(
                "component counts disagree: factors={}, eigenvalues={}, loadings={}",
                k,
                self.eigenvalues.len(),
                self.loadings.ncols()
            ))
            .into());
        }
        if self.scale.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(DataError::InvalidModel("scale must be finite and positive".to_string()).into());
        }
        if self.eigenvalues.iter().any(|&v| !v.is_finite() || v < 0.0) {
            return Err(DataError::InvalidModel("eigenvalues must be finite and non-negative".to_string()).into());
        }
        Ok(())
    }
}

/// Centers and scales a copy of the matrix according to `config`.
/// Returns the prepared matrix with the mean and scale vectors that were applied.
fn prepare(matrix: &ObservationMatrix, config: &PcaConfig) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let mut data = matrix.values().to_owned();
    let n_objects = data.nrows();
    let n_variables = data.ncols();

    let mean = if config.demean {
        data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_variables))
    } else {
        Array1::zeros(n_variables)
    };
    data -= &mean;

    let scale = if config.standardize {
        let dof = (n_objects - 1) as f64;
        let raw = data.map_axis(Axis(0), |column| (column.dot(&column) / dof).sqrt());
        let labels = matrix.variable_labels();
        raw.iter()
            .enumerate()
            .map(|(j, &sd)| {
                if sd <= SCALE_SANITIZATION_THRESHOLD {
                    warn!("Variable '{}' has zero variance; leaving it unscaled", labels[j]);
                    1.0
                } else {
                    sd
                }
            })
            .collect::<Array1<f64>>()
    } else {
        Array1::ones(n_variables)
    };
    data /= &scale;

    (data, mean, scale)
}

fn decompose_svd(
    backend: &impl BackendSVD,
    prepared: Array2<f64>,
    dof: f64,
) -> Result<(Array1<f64>, Array2<f64>, Array2<f64>)> {
    let svd = backend.thin_svd(prepared).map_err(|e| NumericalError::DecompositionFailed {
        stage: "SVD of prepared matrix",
        message: e.to_string(),
    })?;
    let eigenvalues = svd.s.mapv(|s_val| s_val * s_val / dof);
    let factors = svd.vt.t().to_owned();
    let loadings = &svd.u * &svd.s;
    Ok((eigenvalues, factors, loadings))
}

/// Eigenpairs sorted by descending eigenvalue.
fn sorted_eigenpairs(eig: EighOutput) -> Vec<(f64, Array1<f64>)> {
    let mut pairs: Vec<(f64, Array1<f64>)> = eig
        .eigenvalues
        .into_iter()
        .zip(eig.eigenvectors.columns().into_iter().map(|col| col.to_owned()))
        .collect();
    pairs.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    pairs
}

fn decompose_covariance(
    backend: &impl BackendEigh,
    prepared: &Array2<f64>,
    dof: f64,
) -> Result<(Array1<f64>, Array2<f64>, Array2<f64>)> {
    let (n_objects, n_variables) = prepared.dim();
    let k = n_objects.min(n_variables);
    let mut eigenvalues = Array1::<f64>::zeros(k);
    let mut factors = Array2::<f64>::zeros((n_variables, k));

    if n_variables <= n_objects {
        let cov = prepared.t().dot(prepared) / dof;
        let eig = backend.eigh_upper(&cov).map_err(|e| NumericalError::DecompositionFailed {
            stage: "eigendecomposition of covariance matrix",
            message: e.to_string(),
        })?;
        debug!("Covariance path: {}x{} eigenproblem", n_variables, n_variables);
        for (i, (val, mut vec)) in sorted_eigenpairs(eig).into_iter().take(k).enumerate() {
            let norm = vec.dot(&vec).sqrt();
            if norm > SCALE_SANITIZATION_THRESHOLD {
                vec /= norm;
            }
            eigenvalues[i] = val.max(0.0);
            factors.column_mut(i).assign(&vec);
        }
    } else {
        // Gram trick: eigenvectors u of X Xᵀ map to factors Xᵀ u / sqrt(λ (n - 1)).
        let gram = prepared.dot(&prepared.t()) / dof;
        let eig = backend.eigh_upper(&gram).map_err(|e| NumericalError::DecompositionFailed {
            stage: "eigendecomposition of Gram matrix",
            message: e.to_string(),
        })?;
        debug!("Gram path: {}x{} eigenproblem", n_objects, n_objects);
        let pairs = sorted_eigenpairs(eig);
        let largest = pairs.first().map_or(0.0, |(val, _)| val.max(0.0));
        // Eigenvalues below this are rounding noise around a null direction.
        let null_tolerance = f64::EPSILON * n_objects.max(n_variables) as f64 * largest;
        for (i, (val, u_col)) in pairs.into_iter().take(k).enumerate() {
            if val <= null_tolerance {
                // Null direction of the prepared data: zero eigenvalue, zero factor.
                continue;
            }
            let mut axis_i = prepared.t().dot(&u_col);
            let norm = axis_i.dot(&axis_i).sqrt();
            if norm <= 0.0 {
                continue;
            }
            axis_i /= norm;
            eigenvalues[i] = val;
            factors.column_mut(i).assign(&axis_i);
        }
    }

    let loadings = prepared.dot(&factors);
    Ok((eigenvalues, factors, loadings))
}

/// Flips each component so that its largest-magnitude factor entry is positive.
fn apply_sign_convention(factors: &mut Array2<f64>, loadings: &mut Array2<f64>) {
    for i in 0..factors.ncols() {
        let mut pivot = 0.0_f64;
        for &v in factors.column(i).iter() {
            if v.abs() > pivot.abs() {
                pivot = v;
            }
        }
        if pivot < 0.0 {
            factors.column_mut(i).mapv_inplace(|v| -v);
            loadings.column_mut(i).mapv_inplace(|v| -v);
        }
    }
}
