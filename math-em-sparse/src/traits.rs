//! Core traits for sparse storage and preconditioning
//!
//! This module defines the fundamental abstractions used throughout the crate:
//! - [`ComplexField`]: closed scalar trait implemented for `f64` and `Complex64`
//! - [`SparseMatrixBase`]: shape/nnz/clear/data-type contract shared by every format
//! - [`LinearOperator`]: matrix-vector product as consumed by an iterative solver loop
//! - [`Preconditioner`]: approximate inverse applied inside that loop

use crate::attribute::DataType;
use crate::error::{Result, SparseError};
use ndarray::Array1;
use num_complex::Complex64;
use num_traits::{Float, FromPrimitive, NumAssign, One, ToPrimitive, Zero};
use std::fmt::{Debug, Display};
use std::ops::Neg;

/// Trait for scalar types stored in sparse matrices.
///
/// Only two implementations exist: `f64` for real-valued problems
/// (electrostatics, magnetostatics) and `Complex64` for time-harmonic
/// problems (eddy currents, waves).
pub trait ComplexField:
    NumAssign
    + Clone
    + Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Zero
    + One
    + Neg<Output = Self>
    + 'static
{
    /// The real number type underlying this field
    type Real: Float
        + NumAssign
        + FromPrimitive
        + ToPrimitive
        + Send
        + Sync
        + Debug
        + Display
        + 'static;

    /// Data type tag reported by matrices holding this scalar
    const DATA_TYPE: DataType;

    /// Complex conjugate
    fn conj(&self) -> Self;

    /// Squared magnitude |z|²
    fn norm_sqr(&self) -> Self::Real;

    /// Magnitude |z|
    fn norm(&self) -> Self::Real {
        self.norm_sqr().sqrt()
    }

    /// Create from a real value
    fn from_real(r: Self::Real) -> Self;

    /// Create from real and imaginary parts (the imaginary part is dropped for reals)
    fn from_re_im(re: Self::Real, im: Self::Real) -> Self;

    /// Real part
    fn re(&self) -> Self::Real;

    /// Imaginary part
    fn im(&self) -> Self::Real;

    /// Check if this is approximately zero
    fn is_zero_approx(&self, tol: Self::Real) -> bool {
        self.norm_sqr() <= tol * tol
    }

    /// Multiplicative inverse (1/z)
    fn inv(&self) -> Self;
}

impl ComplexField for Complex64 {
    type Real = f64;

    const DATA_TYPE: DataType = DataType::Complex;

    #[inline]
    fn conj(&self) -> Self {
        Complex64::conj(self)
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        Complex64::new(r, 0.0)
    }

    #[inline]
    fn from_re_im(re: f64, im: f64) -> Self {
        Complex64::new(re, im)
    }

    #[inline]
    fn re(&self) -> f64 {
        self.re
    }

    #[inline]
    fn im(&self) -> f64 {
        self.im
    }

    #[inline]
    fn inv(&self) -> Self {
        let denom = ComplexField::norm_sqr(self);
        Complex64::new(self.re / denom, -self.im / denom)
    }
}

impl ComplexField for f64 {
    type Real = f64;

    const DATA_TYPE: DataType = DataType::Real;

    #[inline]
    fn conj(&self) -> Self {
        *self
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        *self * *self
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        r
    }

    #[inline]
    fn from_re_im(re: f64, _im: f64) -> Self {
        re
    }

    #[inline]
    fn re(&self) -> f64 {
        *self
    }

    #[inline]
    fn im(&self) -> f64 {
        0.0
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

/// Storage layout of a sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    /// Coordinate triplets
    Coo,
    /// Compressed sparse row
    Csr,
    /// Compressed sparse row over dense blocks
    BlockCsr,
    /// Compressed sparse row, lower triangle only
    SymCsr,
}

/// Read-only shape contract shared by every sparse format.
pub trait SparseMatrixBase {
    /// Number of logical (scalar) rows
    fn rows(&self) -> usize;

    /// Number of logical (scalar) columns
    fn cols(&self) -> usize;

    /// Number of stored scalar values
    fn nnz(&self) -> usize;

    /// Drop all stored entries, keeping the declared size
    fn clear(&mut self);

    /// Real or complex storage
    fn data_type(&self) -> DataType;

    /// Storage layout
    fn format(&self) -> SparseFormat;
}

/// Trait for operators that can perform matrix-vector products.
///
/// This is the surface an external Krylov loop consumes. Implementations are
/// statically dispatched; [`crate::sparse::AnySparseMatrix`] covers the case
/// where the format is only known at runtime.
pub trait LinearOperator<T: ComplexField>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator into a caller-provided buffer: y = A * x
    fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()>;

    /// Apply the operator: y = A * x
    fn mat_vec(&self, x: &Array1<T>) -> Result<Array1<T>> {
        let mut y = Array1::from_elem(self.num_rows(), T::zero());
        self.mat_vec_into(x, &mut y)?;
        Ok(y)
    }

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner M approximates A^(-1). It is built once from a matrix
/// snapshot and may then be applied any number of times.
pub trait Preconditioner<T: ComplexField>: Send + Sync {
    /// Dimension of the system the preconditioner was built for
    fn dim(&self) -> usize;

    /// Apply the preconditioner into a caller-provided buffer: z = M * r
    fn apply_into(&self, r: &Array1<T>, z: &mut Array1<T>) -> Result<()>;

    /// Apply the preconditioner: z = M * r
    fn apply(&self, r: &Array1<T>) -> Result<Array1<T>> {
        let mut z = Array1::from_elem(self.dim(), T::zero());
        self.apply_into(r, &mut z)?;
        Ok(z)
    }
}

/// Identity preconditioner (no preconditioning)
#[derive(Clone, Debug)]
pub struct IdentityPreconditioner {
    n: usize,
}

impl IdentityPreconditioner {
    /// Create an identity preconditioner for systems of dimension `n`
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl<T: ComplexField> Preconditioner<T> for IdentityPreconditioner {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply_into(&self, r: &Array1<T>, z: &mut Array1<T>) -> Result<()> {
        check_operands(self.n, r, z)?;
        z.assign(r);
        Ok(())
    }
}

/// Validate residual and output lengths against a preconditioner dimension.
pub(crate) fn check_operands<T>(n: usize, r: &Array1<T>, z: &Array1<T>) -> Result<()> {
    if r.len() != n {
        return Err(SparseError::mismatch("residual length", n, r.len()));
    }
    if z.len() != n {
        return Err(SparseError::mismatch("output length", n, z.len()));
    }
    Ok(())
}
