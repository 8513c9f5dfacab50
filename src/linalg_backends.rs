// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues, in the order the backend returns them (usually ascending).
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Symmetric eigendecomposition (LAPACK DSYEVD-like). `matrix` must be symmetric;
/// only its upper triangle is read.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>>;
}

/// Output of a singular value decomposition, trimmed to the thin shape:
/// `u` is m × k, `s` has length k, `vt` is k × n with k = min(m, n).
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

pub trait BackendSVD {
    fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput, Box<dyn Error + Send + Sync>>;
}

// --- ndarray-linalg (LAPACK) backend ---
use ndarray::s;
use ndarray_linalg::{Eigh as NdLinalgEigh, SVDInto as NdLinalgSVDInto, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
    Box::new(e)
}

impl BackendEigh for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

impl BackendSVD for NdarrayLinAlgBackend {
    fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput, Box<dyn Error + Send + Sync>> {
        let k = matrix.nrows().min(matrix.ncols());
        let (u, s, vt) = matrix.svd_into(true, true).map_err(to_dyn_error)?;
        let u = u.ok_or("LAPACK SVD did not return U")?;
        let vt = vt.ok_or("LAPACK SVD did not return V^T")?;
        // gesvd returns the full m × m and n × n factors.
        Ok(SVDOutput {
            u: u.slice(s![.., ..k]).to_owned(),
            s: s.slice(s![..k]).to_owned(),
            vt: vt.slice(s![..k, ..]).to_owned(),
        })
    }
}

// --- faer backend ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendEigh, BackendSVD, EighOutput, SVDOutput};
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use faer::MatRef;
    use ndarray::{Array1, Array2, ShapeBuilder};
    use std::error::Error;

    fn to_dyn_error_faer(msg: String) -> Box<dyn Error + Send + Sync> {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        let nrows = faer_mat.nrows();
        let ncols = faer_mat.ncols();
        Array2::from_shape_fn((nrows, ncols).f(), |(i, j)| unsafe { *faer_mat.get_unchecked(i, j) })
    }

    fn faer_col_to_ndarray_vec(faer_col: faer::ColRef<'_, f64>) -> Array1<f64> {
        Array1::from_shape_fn(faer_col.nrows(), |i| unsafe { *faer_col.get_unchecked(i) })
    }

    /// Borrows a contiguous ndarray matrix as a faer view without copying.
    fn as_faer_view(matrix: &Array2<f64>) -> Result<MatRef<'_, f64>, Box<dyn Error + Send + Sync>> {
        let (nrows, ncols) = matrix.dim();
        let slice = matrix.as_slice_memory_order().ok_or_else(|| {
            to_dyn_error_faer(format!(
                "Input ndarray matrix ({}x{}) is non-contiguous and cannot be viewed by faer.",
                nrows, ncols
            ))
        })?;
        if matrix.is_standard_layout() {
            Ok(MatRef::from_row_major_slice(slice, nrows, ncols))
        } else {
            Ok(MatRef::from_column_major_slice(slice, nrows, ncols))
        }
    }

    impl BackendEigh for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
            if matrix.nrows() != matrix.ncols() {
                return Err(to_dyn_error_faer("Matrix must be square for eigendecomposition.".to_string()));
            }
            if matrix.is_empty() {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            let contiguous = matrix.as_standard_layout().into_owned();
            let view = as_faer_view(&contiguous)?;
            let eig = view
                .self_adjoint_eigen(faer::Side::Upper)
                .map_err(|e| to_dyn_error_faer(format!("Faer eigendecomposition failed: {:?}", e)))?;
            Ok(EighOutput {
                eigenvalues: faer_col_to_ndarray_vec(eig.S().column_vector()),
                eigenvectors: faer_mat_to_ndarray(eig.U()),
            })
        }
    }

    impl BackendSVD for FaerLinAlgBackend {
        fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput, Box<dyn Error + Send + Sync>> {
            let (nrows, ncols) = matrix.dim();
            let k = nrows.min(ncols);
            if matrix.is_empty() {
                return Ok(SVDOutput {
                    u: Array2::zeros((nrows, k)),
                    s: Array1::zeros(k),
                    vt: Array2::zeros((k, ncols)),
                });
            }
            let contiguous = matrix.as_standard_layout().into_owned();
            let view = as_faer_view(&contiguous)?;
            let svd = FaerSolverSvd::new_thin(view)
                .map_err(|e| to_dyn_error_faer(format!("Faer SVD computation failed: {:?}", e)))?;
            let s = faer_col_to_ndarray_vec(svd.S().column_vector());
            let u = faer_mat_to_ndarray(svd.U().as_ref());
            let vt = faer_mat_to_ndarray(svd.V().as_ref()).t().into_owned();
            Ok(SVDOutput { u, s, vt })
        }
    }
}

/// Dispatches to the linear algebra backend selected by Cargo features.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, Box<dyn Error + Send + Sync>> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

impl BackendSVD for LinAlgBackendProvider {
    fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput, Box<dyn Error + Send + Sync>> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.thin_svd(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.thin_svd(matrix)
        }
    }
}
