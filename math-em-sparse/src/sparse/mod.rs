//! Sparse matrix structures
//!
//! - [`CooMatrix`]: triplet accumulator used during assembly
//! - [`CsrMatrix`]: compressed rows, the general solve format
//! - [`BlockCsrMatrix`]: compressed rows over 1x1, 2x2 or 3x3 dense blocks
//! - [`SymCsrMatrix`]: lower-triangle storage of symmetric matrices
//!
//! [`AnySparseMatrix`] wraps the three solve formats when the layout is only
//! chosen at runtime.

mod block_csr;
mod coo;
mod csr;
mod pattern;
mod sym_csr;

pub use block_csr::{BlockCsrMatrix, MAX_BLOCK_DIM};
pub use coo::CooMatrix;
pub use csr::CsrMatrix;
pub use sym_csr::SymCsrMatrix;

use crate::attribute::{DataType, MatrixAttribute, Symmetry};
use crate::error::Result;
use crate::traits::{ComplexField, LinearOperator, SparseFormat, SparseMatrixBase};
use ndarray::Array1;

/// A built solve-format matrix whose layout was picked at runtime
#[derive(Debug, Clone)]
pub enum AnySparseMatrix<T: ComplexField> {
    /// General compressed rows
    Csr(CsrMatrix<T>),
    /// Block compressed rows
    BlockCsr(BlockCsrMatrix<T>),
    /// Lower-triangle symmetric storage
    SymCsr(SymCsrMatrix<T>),
}

impl<T: ComplexField> AnySparseMatrix<T> {
    /// Build the storage best suited to the attribute.
    ///
    /// Vector elements get block storage when the size divides evenly into
    /// blocks; symmetric matrices keep only their lower triangle; everything
    /// else becomes plain CSR. Upper-triangle entries of a symmetric input are
    /// dropped.
    pub fn from_coo(coo: &CooMatrix<T>, attr: &MatrixAttribute) -> Result<Self> {
        if let Some(bd) = attr.element_type().block_dim() {
            if coo.rows() % bd == 0 && coo.cols() % bd == 0 {
                return Ok(Self::BlockCsr(BlockCsrMatrix::from_coo(coo, bd)?));
            }
            log::warn!(
                "{}x{} system does not split into {}x{} blocks, using scalar storage",
                coo.rows(),
                coo.cols(),
                bd,
                bd
            );
        }

        let csr = CsrMatrix::from_coo(coo)?;
        if attr.symmetry() == Symmetry::Symmetric && coo.rows() == coo.cols() {
            return Ok(Self::SymCsr(SymCsrMatrix::from_csr(&csr)?));
        }
        Ok(Self::Csr(csr))
    }

    /// Matrix-vector product dispatched to the concrete format
    pub fn mat_vec(&self, x: &Array1<T>) -> Result<Array1<T>> {
        match self {
            Self::Csr(m) => m.mat_vec(x),
            Self::BlockCsr(m) => m.block_mat_vec(x),
            Self::SymCsr(m) => m.mat_vec(x),
        }
    }

    /// Full scalar CSR view of the matrix
    pub fn to_csr(&self) -> Result<CsrMatrix<T>> {
        match self {
            Self::Csr(m) => Ok(m.clone()),
            Self::BlockCsr(m) => m.to_csr(),
            Self::SymCsr(m) => m.to_csr(),
        }
    }
}

impl<T: ComplexField> SparseMatrixBase for AnySparseMatrix<T> {
    fn rows(&self) -> usize {
        match self {
            Self::Csr(m) => m.rows(),
            Self::BlockCsr(m) => m.rows(),
            Self::SymCsr(m) => m.rows(),
        }
    }

    fn cols(&self) -> usize {
        match self {
            Self::Csr(m) => m.cols(),
            Self::BlockCsr(m) => m.cols(),
            Self::SymCsr(m) => m.cols(),
        }
    }

    fn nnz(&self) -> usize {
        match self {
            Self::Csr(m) => m.nnz(),
            Self::BlockCsr(m) => m.nnz(),
            Self::SymCsr(m) => m.nnz(),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Csr(m) => m.clear(),
            Self::BlockCsr(m) => m.clear(),
            Self::SymCsr(m) => m.clear(),
        }
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn format(&self) -> SparseFormat {
        match self {
            Self::Csr(_) => SparseFormat::Csr,
            Self::BlockCsr(_) => SparseFormat::BlockCsr,
            Self::SymCsr(_) => SparseFormat::SymCsr,
        }
    }
}

impl<T: ComplexField> LinearOperator<T> for AnySparseMatrix<T> {
    fn num_rows(&self) -> usize {
        SparseMatrixBase::rows(self)
    }

    fn num_cols(&self) -> usize {
        SparseMatrixBase::cols(self)
    }

    fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        match self {
            Self::Csr(m) => m.mat_vec_into(x, y),
            Self::BlockCsr(m) => m.block_mat_vec_into(x, y),
            Self::SymCsr(m) => m.mat_vec_into(x, y),
        }
    }
}

impl<T: ComplexField> From<CsrMatrix<T>> for AnySparseMatrix<T> {
    fn from(m: CsrMatrix<T>) -> Self {
        Self::Csr(m)
    }
}

impl<T: ComplexField> From<BlockCsrMatrix<T>> for AnySparseMatrix<T> {
    fn from(m: BlockCsrMatrix<T>) -> Self {
        Self::BlockCsr(m)
    }
}

impl<T: ComplexField> From<SymCsrMatrix<T>> for AnySparseMatrix<T> {
    fn from(m: SymCsrMatrix<T>) -> Self {
        Self::SymCsr(m)
    }
}
