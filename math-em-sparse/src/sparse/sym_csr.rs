//! Symmetric CSR: lower-triangle half storage
//!
//! Only entries with `col <= row` are stored. The mat-vec folds the missing upper
//! triangle back in, so results match a full CSR product on the symmetric
//! expansion up to summation order. Complex values are treated as
//! complex-symmetric (A = A^T), not Hermitian.

use super::coo::CooMatrix;
use super::csr::CsrMatrix;
use super::pattern::compress_triplets;
use crate::attribute::DataType;
use crate::error::{Result, SparseError, check_dimensions};
use crate::traits::{ComplexField, LinearOperator, SparseFormat, SparseMatrixBase};
use ndarray::{Array1, Array2};
use std::ops::Range;

/// Symmetric matrix stored as its lower triangle in CSR layout
#[derive(Debug, Clone)]
pub struct SymCsrMatrix<T: ComplexField> {
    n: usize,
    row_ptrs: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
    built: bool,
}

impl<T: ComplexField> SymCsrMatrix<T> {
    /// Create an unbuilt `n x n` symmetric matrix
    pub fn new(n: usize) -> Result<Self> {
        check_dimensions(n, n)?;
        Ok(Self {
            n,
            row_ptrs: vec![0; n + 1],
            col_indices: Vec::new(),
            values: Vec::new(),
            built: false,
        })
    }

    /// Create and build from lower-triangular COO triplets
    pub fn from_coo(coo: &CooMatrix<T>) -> Result<Self> {
        if coo.rows() != coo.cols() {
            return Err(SparseError::mismatch("COO column count", coo.rows(), coo.cols()));
        }
        let mut m = Self::new(coo.rows())?;
        m.build_from_coo(coo)?;
        Ok(m)
    }

    /// Create and build from the lower triangle of a full CSR matrix
    pub fn from_csr(csr: &CsrMatrix<T>) -> Result<Self> {
        if csr.rows() != csr.cols() {
            return Err(SparseError::mismatch("CSR column count", csr.rows(), csr.cols()));
        }
        let mut m = Self::new(csr.rows())?;
        m.build_from_csr(csr)?;
        Ok(m)
    }

    /// Build from COO triplets that must all satisfy `col <= row`.
    pub fn build_from_coo(&mut self, coo: &CooMatrix<T>) -> Result<()> {
        if coo.rows() != self.n {
            return Err(SparseError::mismatch("COO row count", self.n, coo.rows()));
        }
        if coo.cols() != self.n {
            return Err(SparseError::mismatch("COO column count", self.n, coo.cols()));
        }
        if let Some((row, col, _)) = coo.iter().find(|&(r, c, _)| r < c) {
            return Err(SparseError::StrictUpperTriangle { row, col });
        }

        self.store(compress_triplets(
            self.n,
            coo.row_indices(),
            coo.col_indices(),
            coo.values(),
        ));
        Ok(())
    }

    /// Build from a full square CSR matrix, keeping entries with `col <= row`.
    ///
    /// The strict upper triangle is discarded without checking that it mirrors
    /// the lower one.
    pub fn build_from_csr(&mut self, csr: &CsrMatrix<T>) -> Result<()> {
        if !csr.is_built() {
            return Err(SparseError::NotBuilt {
                operation: "build_from_csr",
            });
        }
        if csr.rows() != self.n || csr.cols() != self.n {
            return Err(SparseError::mismatch("CSR dimension", self.n, csr.rows().max(csr.cols())));
        }

        let mut row_ptrs = Vec::with_capacity(self.n + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_ptrs.push(0);
        for i in 0..self.n {
            for (j, v) in csr.row_entries(i).take_while(|&(j, _)| j <= i) {
                col_indices.push(j);
                values.push(v);
            }
            row_ptrs.push(values.len());
        }

        self.row_ptrs = row_ptrs;
        self.col_indices = col_indices;
        self.values = values;
        self.built = true;
        log::debug!(
            "built symmetric CSR {}x{} from full CSR, {} of {} entries kept",
            self.n,
            self.n,
            self.values.len(),
            csr.nnz()
        );
        Ok(())
    }

    fn store(&mut self, compressed: super::pattern::CompressedRows<T>) {
        self.row_ptrs = compressed.row_ptrs;
        self.col_indices = compressed.col_indices;
        self.values = compressed.values;
        self.built = true;
        log::debug!(
            "built symmetric CSR {}x{} with {} lower-triangle entries",
            self.n,
            self.n,
            self.values.len()
        );
    }

    fn ensure_built(&self, operation: &'static str) -> Result<()> {
        if !self.built {
            return Err(SparseError::NotBuilt { operation });
        }
        Ok(())
    }

    /// Whether the compressed arrays are valid
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Matrix order
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of rows (equal to `cols`)
    pub fn rows(&self) -> usize {
        self.n
    }

    /// Number of columns (equal to `rows`)
    pub fn cols(&self) -> usize {
        self.n
    }

    /// Number of stored lower-triangle entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row pointer array
    pub fn row_ptrs(&self) -> &[usize] {
        &self.row_ptrs
    }

    /// Column index of each stored entry
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Stored lower-triangle values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Get the range of stored entries for a given row
    ///
    /// # Panics
    ///
    /// Panics if `row >= dim()`.
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// Matrix-vector product: y = A * x
    pub fn mat_vec(&self, x: &Array1<T>) -> Result<Array1<T>> {
        let mut y = Array1::from_elem(self.n, T::zero());
        self.mat_vec_into(x, &mut y)?;
        Ok(y)
    }

    /// Matrix-vector product into an existing buffer.
    ///
    /// An off-diagonal entry (r, c, v) contributes `v * x[c]` to `y[r]` and
    /// `v * x[r]` to `y[c]`; a diagonal entry contributes once.
    pub fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        self.ensure_built("mat_vec")?;
        if x.len() != self.n {
            return Err(SparseError::mismatch("input vector length", self.n, x.len()));
        }
        if y.len() != self.n {
            return Err(SparseError::mismatch("output vector length", self.n, y.len()));
        }

        y.fill(T::zero());
        for row in 0..self.n {
            let x_row = x[row];
            let mut sum = T::zero();
            for idx in self.row_range(row) {
                let col = self.col_indices[idx];
                let v = self.values[idx];
                sum += v * x[col];
                if col != row {
                    y[col] += v * x_row;
                }
            }
            y[row] += sum;
        }
        Ok(())
    }

    /// A symmetric matrix is its own transpose
    pub fn transpose(&self) -> Result<SymCsrMatrix<T>> {
        self.ensure_built("transpose")?;
        Ok(self.clone())
    }

    /// Diagonal entries (duplicates summed, missing read as zero)
    pub fn get_diag(&self) -> Result<Array1<T>> {
        self.ensure_built("get_diag")?;
        let mut diag = Array1::from_elem(self.n, T::zero());
        for i in 0..self.n {
            for idx in self.row_range(i) {
                if self.col_indices[idx] == i {
                    diag[i] += self.values[idx];
                }
            }
        }
        Ok(diag)
    }

    /// Scale all values by a scalar
    pub fn scale(&mut self, scalar: T) -> Result<()> {
        self.ensure_built("scale")?;
        for v in &mut self.values {
            *v *= scalar;
        }
        Ok(())
    }

    /// Expand to a full CSR matrix holding both triangles
    pub fn to_csr(&self) -> Result<CsrMatrix<T>> {
        self.ensure_built("to_csr")?;
        let mut coo = CooMatrix::with_capacity(self.n, self.n, 2 * self.nnz())?;
        for row in 0..self.n {
            for idx in self.row_range(row) {
                let col = self.col_indices[idx];
                let v = self.values[idx];
                coo.add_value(row, col, v)?;
                if col != row {
                    coo.add_value(col, row, v)?;
                }
            }
        }
        CsrMatrix::from_coo(&coo)
    }

    /// Lower-triangle entries as COO triplets
    pub fn to_coo(&self) -> Result<CooMatrix<T>> {
        self.ensure_built("to_coo")?;
        let mut row_indices = Vec::with_capacity(self.nnz());
        for i in 0..self.n {
            row_indices.extend(std::iter::repeat_n(i, self.row_range(i).len()));
        }
        Ok(CooMatrix::from_parts_unchecked(
            self.n,
            self.n,
            row_indices,
            self.col_indices.clone(),
            self.values.clone(),
        ))
    }

    /// Convert to dense matrix with both triangles filled
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.n, self.n), T::zero());
        for row in 0..self.n {
            for idx in self.row_range(row) {
                let col = self.col_indices[idx];
                dense[[row, col]] += self.values[idx];
                if col != row {
                    dense[[col, row]] += self.values[idx];
                }
            }
        }
        dense
    }

    /// Drop all entries, returning the matrix to the unbuilt state
    pub fn clear(&mut self) {
        self.row_ptrs = vec![0; self.n + 1];
        self.col_indices.clear();
        self.values.clear();
        self.built = false;
    }
}

impl<T: ComplexField> SparseMatrixBase for SymCsrMatrix<T> {
    fn rows(&self) -> usize {
        self.n
    }

    fn cols(&self) -> usize {
        self.n
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn clear(&mut self) {
        SymCsrMatrix::clear(self);
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn format(&self) -> SparseFormat {
        SparseFormat::SymCsr
    }
}

impl<T: ComplexField> LinearOperator<T> for SymCsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.n
    }

    fn num_cols(&self) -> usize {
        self.n
    }

    fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        SymCsrMatrix::mat_vec_into(self, x, y)
    }
}
