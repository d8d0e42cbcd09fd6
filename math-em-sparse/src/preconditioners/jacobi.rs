//! Jacobi (diagonal) preconditioner
//!
//! Scales each residual component by the reciprocal of the matrix diagonal.
//! The only operation in `apply` is an element-wise product, so it is also
//! the cheapest preconditioner to parallelise.

use crate::error::{Result, SparseError};
use crate::sparse::{CsrMatrix, SymCsrMatrix};
use crate::traits::{ComplexField, Preconditioner, check_operands};
use ndarray::Array1;
use num_traits::{Float, One, Zero};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
const PARALLEL_LEN_THRESHOLD: usize = 1000;

/// Jacobi preconditioner: `z[i] = r[i] / max(|a_ii|, epsilon)`
///
/// Only the magnitude of each diagonal entry is used, so the scaling is real
/// and positive for real and complex matrices alike. The `epsilon` floor keeps
/// a zero or missing diagonal from producing infinities.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner<T: ComplexField> {
    inv_diag: Array1<T>,
    epsilon: T::Real,
}

impl<T: ComplexField> JacobiPreconditioner<T> {
    /// Build from the diagonal of a built square CSR matrix
    pub fn from_csr(matrix: &CsrMatrix<T>, epsilon: T::Real) -> Result<Self> {
        if matrix.rows() != matrix.cols() {
            return Err(SparseError::mismatch(
                "square matrix columns",
                matrix.rows(),
                matrix.cols(),
            ));
        }
        Self::from_diagonal(&matrix.get_diag()?, epsilon)
    }

    /// Build from the diagonal of a built symmetric matrix
    pub fn from_sym_csr(matrix: &SymCsrMatrix<T>, epsilon: T::Real) -> Result<Self> {
        Self::from_diagonal(&matrix.get_diag()?, epsilon)
    }

    /// Build from a diagonal vector
    pub fn from_diagonal(diag: &Array1<T>, epsilon: T::Real) -> Result<Self> {
        if !(epsilon > T::Real::zero() && epsilon.is_finite()) {
            return Err(SparseError::InvalidArgument(format!(
                "Jacobi epsilon must be positive and finite, got {epsilon}"
            )));
        }
        if diag.is_empty() {
            return Err(SparseError::InvalidDimensions { rows: 0, cols: 0 });
        }

        let mut floored = 0usize;
        let inv_diag = diag.mapv(|d| {
            let magnitude = d.norm();
            if magnitude < epsilon {
                floored += 1;
            }
            T::from_real(T::Real::one() / magnitude.max(epsilon))
        });

        if floored > 0 {
            log::warn!(
                "Jacobi: {} of {} diagonal entries below {}, floored",
                floored,
                diag.len(),
                epsilon
            );
        }
        log::debug!("Jacobi preconditioner of dimension {}", diag.len());
        Ok(Self { inv_diag, epsilon })
    }

    /// Scale factors `1 / max(|a_ii|, epsilon)` applied by `apply`
    pub fn inverse_diagonal(&self) -> &Array1<T> {
        &self.inv_diag
    }

    /// Floor used for small diagonal entries
    pub fn epsilon(&self) -> T::Real {
        self.epsilon
    }
}

impl<T: ComplexField> Preconditioner<T> for JacobiPreconditioner<T> {
    fn dim(&self) -> usize {
        self.inv_diag.len()
    }

    fn apply_into(&self, r: &Array1<T>, z: &mut Array1<T>) -> Result<()> {
        check_operands(self.inv_diag.len(), r, z)?;

        #[cfg(feature = "rayon")]
        {
            if r.len() >= PARALLEL_LEN_THRESHOLD {
                if let (Some(r_slice), Some(inv_slice), Some(z_slice)) = (
                    r.as_slice(),
                    self.inv_diag.as_slice(),
                    z.as_slice_mut(),
                ) {
                    z_slice
                        .par_iter_mut()
                        .zip(r_slice.par_iter().zip(inv_slice.par_iter()))
                        .for_each(|(zi, (&ri, &di))| *zi = ri * di);
                    return Ok(());
                }
            }
        }

        z.iter_mut()
            .zip(r.iter().zip(self.inv_diag.iter()))
            .for_each(|(zi, (&ri, &di))| *zi = ri * di);
        Ok(())
    }
}
