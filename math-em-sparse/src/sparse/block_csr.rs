//! Block Compressed Sparse Row format
//!
//! CSR over fixed-size dense `block_dim x block_dim` blocks, matching the
//! degrees of freedom of 2D/3D vector elements. Block `k` occupies
//! `values[k * bd² .. (k + 1) * bd²]` in row-major order.

use super::coo::CooMatrix;
use super::csr::CsrMatrix;
use super::pattern::{row_pointers, sorted_permutation};
use crate::attribute::DataType;
use crate::error::{Result, SparseError, check_dimensions};
use crate::traits::{ComplexField, LinearOperator, SparseFormat, SparseMatrixBase};
use ndarray::{Array1, Array2};
use std::ops::Range;

/// Largest supported block dimension
pub const MAX_BLOCK_DIM: usize = 3;

/// Block CSR matrix
#[derive(Debug, Clone)]
pub struct BlockCsrMatrix<T: ComplexField> {
    block_rows: usize,
    block_cols: usize,
    block_dim: usize,
    /// Block row pointers (length block_rows + 1)
    block_row_ptrs: Vec<usize>,
    /// Block column index of every stored block
    block_col_indices: Vec<usize>,
    /// Dense block values, `block_dim²` per block
    values: Vec<T>,
    built: bool,
}

impl<T: ComplexField> BlockCsrMatrix<T> {
    /// Create an unbuilt block matrix with `block_rows x block_cols` blocks
    pub fn new(block_rows: usize, block_cols: usize, block_dim: usize) -> Result<Self> {
        check_dimensions(block_rows, block_cols)?;
        if block_dim == 0 || block_dim > MAX_BLOCK_DIM {
            return Err(SparseError::InvalidArgument(format!(
                "block dimension {block_dim} not supported (expected 1, 2 or 3)"
            )));
        }
        Ok(Self {
            block_rows,
            block_cols,
            block_dim,
            block_row_ptrs: vec![0; block_rows + 1],
            block_col_indices: Vec::new(),
            values: Vec::new(),
            built: false,
        })
    }

    /// Create and build from scalar COO triplets
    pub fn from_coo(coo: &CooMatrix<T>, block_dim: usize) -> Result<Self> {
        let (block_rows, block_cols) = Self::block_shape(coo.rows(), coo.cols(), block_dim)?;
        let mut m = Self::new(block_rows, block_cols, block_dim)?;
        m.build_from_coo(coo)?;
        Ok(m)
    }

    /// Create and build from a scalar CSR matrix
    pub fn from_csr(csr: &CsrMatrix<T>, block_dim: usize) -> Result<Self> {
        let (block_rows, block_cols) = Self::block_shape(csr.rows(), csr.cols(), block_dim)?;
        let mut m = Self::new(block_rows, block_cols, block_dim)?;
        m.build_from_csr(csr)?;
        Ok(m)
    }

    fn block_shape(rows: usize, cols: usize, block_dim: usize) -> Result<(usize, usize)> {
        if block_dim == 0 || rows % block_dim != 0 || cols % block_dim != 0 {
            return Err(SparseError::InvalidArgument(format!(
                "{rows}x{cols} matrix cannot be split into {block_dim}x{block_dim} blocks"
            )));
        }
        Ok((rows / block_dim, cols / block_dim))
    }

    /// Offset of element `(i, j)` of block `block` in the value array
    #[inline]
    pub fn compute_element_index(&self, block: usize, i: usize, j: usize) -> usize {
        block * self.block_dim * self.block_dim + i * self.block_dim + j
    }

    /// Build from scalar triplets.
    ///
    /// The COO must be `block_rows * block_dim` by `block_cols * block_dim`.
    /// Scalar entries are grouped into blocks; absent positions inside a stored
    /// block are zero and duplicate scalar entries accumulate.
    pub fn build_from_coo(&mut self, coo: &CooMatrix<T>) -> Result<()> {
        self.build_from_triplets(
            coo.rows(),
            coo.cols(),
            coo.row_indices(),
            coo.col_indices(),
            coo.values(),
        )
    }

    /// Build from a scalar CSR matrix with the same logical size
    pub fn build_from_csr(&mut self, csr: &CsrMatrix<T>) -> Result<()> {
        if !csr.is_built() {
            return Err(SparseError::NotBuilt {
                operation: "build_from_csr",
            });
        }
        let mut rows = Vec::with_capacity(csr.nnz());
        for i in 0..csr.rows() {
            rows.extend(std::iter::repeat_n(i, csr.row_range(i).len()));
        }
        self.build_from_triplets(
            csr.rows(),
            csr.cols(),
            &rows,
            csr.col_indices(),
            csr.values(),
        )
    }

    fn build_from_triplets(
        &mut self,
        rows: usize,
        cols: usize,
        row_indices: &[usize],
        col_indices: &[usize],
        values: &[T],
    ) -> Result<()> {
        let bd = self.block_dim;
        if rows != self.block_rows * bd {
            return Err(SparseError::mismatch("scalar row count", self.block_rows * bd, rows));
        }
        if cols != self.block_cols * bd {
            return Err(SparseError::mismatch("scalar column count", self.block_cols * bd, cols));
        }

        let nnz = values.len();
        let perm = sorted_permutation(nnz, |k| (row_indices[k] / bd, col_indices[k] / bd));

        // One block per distinct (block_row, block_col) key; the sort makes them contiguous.
        let mut block_row_of = Vec::new();
        let mut block_col_indices = Vec::new();
        let mut block_values: Vec<T> = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for &k in &perm {
            let key = (row_indices[k] / bd, col_indices[k] / bd);
            if current != Some(key) {
                current = Some(key);
                block_row_of.push(key.0);
                block_col_indices.push(key.1);
                block_values.extend(std::iter::repeat_n(T::zero(), bd * bd));
            }
            let block = block_col_indices.len() - 1;
            let offset = block * bd * bd + (row_indices[k] % bd) * bd + col_indices[k] % bd;
            block_values[offset] += values[k];
        }

        self.block_row_ptrs = row_pointers(self.block_rows, block_row_of.into_iter());
        self.block_col_indices = block_col_indices;
        self.values = block_values;
        self.built = true;

        log::debug!(
            "built block CSR {}x{} blocks of {}x{} with {} blocks",
            self.block_rows,
            self.block_cols,
            bd,
            bd,
            self.block_nnz()
        );
        Ok(())
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

    /// Number of block rows
    pub fn block_rows(&self) -> usize {
        self.block_rows
    }

    /// Number of block columns
    pub fn block_cols(&self) -> usize {
        self.block_cols
    }

    /// Edge length of each block
    pub fn block_dim(&self) -> usize {
        self.block_dim
    }

    /// Number of logical rows (block_rows * block_dim)
    pub fn rows(&self) -> usize {
        self.block_rows * self.block_dim
    }

    /// Number of logical columns (block_cols * block_dim)
    pub fn cols(&self) -> usize {
        self.block_cols * self.block_dim
    }

    /// Number of stored blocks
    pub fn block_nnz(&self) -> usize {
        self.block_col_indices.len()
    }

    /// Number of stored scalars (`block_nnz * block_dim²`)
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Block row pointer array
    pub fn block_row_ptrs(&self) -> &[usize] {
        &self.block_row_ptrs
    }

    /// Block column index of each stored block
    pub fn block_col_indices(&self) -> &[usize] {
        &self.block_col_indices
    }

    /// All block values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Range of stored blocks belonging to a block row
    ///
    /// # Panics
    ///
    /// Panics if `block_row >= block_rows()`.
    pub fn block_row_range(&self, block_row: usize) -> Range<usize> {
        self.block_row_ptrs[block_row]..self.block_row_ptrs[block_row + 1]
    }

    /// Values of stored block `k`, row-major
    ///
    /// # Panics
    ///
    /// Panics if `k >= block_nnz()`.
    pub fn block(&self, k: usize) -> &[T] {
        let size = self.block_dim * self.block_dim;
        &self.values[k * size..(k + 1) * size]
    }

    fn diagonal_block_index(&self, block_row: usize) -> Option<usize> {
        self.block_row_range(block_row)
            .find(|&k| self.block_col_indices[k] == block_row)
    }

    /// Block matrix-vector product: y = A * x
    pub fn block_mat_vec(&self, x: &Array1<T>) -> Result<Array1<T>> {
        let mut y = Array1::from_elem(self.rows(), T::zero());
        self.block_mat_vec_into(x, &mut y)?;
        Ok(y)
    }

    /// Block matrix-vector product into an existing buffer
    pub fn block_mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        self.ensure_built("block_mat_vec")?;
        if x.len() != self.cols() {
            return Err(SparseError::mismatch("input vector length", self.cols(), x.len()));
        }
        if y.len() != self.rows() {
            return Err(SparseError::mismatch("output vector length", self.rows(), y.len()));
        }

        let bd = self.block_dim;
        y.fill(T::zero());
        for bi in 0..self.block_rows {
            let row_start = bi * bd;
            for k in self.block_row_range(bi) {
                let col_start = self.block_col_indices[k] * bd;
                let block = self.block(k);
                for i in 0..bd {
                    let mut sum = T::zero();
                    for j in 0..bd {
                        sum += block[i * bd + j] * x[col_start + j];
                    }
                    y[row_start + i] += sum;
                }
            }
        }
        Ok(())
    }

    /// Diagonal blocks, one `block_dim x block_dim` matrix per block row.
    /// Block rows without a stored diagonal block read as zero.
    pub fn get_block_diag(&self) -> Result<Vec<Array2<T>>> {
        self.ensure_built("get_block_diag")?;
        let bd = self.block_dim;
        let n = self.block_rows.min(self.block_cols);
        Ok((0..n)
            .map(|bi| match self.diagonal_block_index(bi) {
                Some(k) => Array2::from_shape_fn((bd, bd), |(i, j)| self.block(k)[i * bd + j]),
                None => Array2::from_elem((bd, bd), T::zero()),
            })
            .collect())
    }

    /// Overwrite the diagonal blocks. Each block row must already store one.
    pub fn set_block_diag(&mut self, blocks: &[Array2<T>]) -> Result<()> {
        self.ensure_built("set_block_diag")?;
        let bd = self.block_dim;
        let n = self.block_rows.min(self.block_cols);
        if blocks.len() != n {
            return Err(SparseError::mismatch("diagonal block count", n, blocks.len()));
        }

        let mut slots = Vec::with_capacity(n);
        for (bi, block) in blocks.iter().enumerate() {
            if block.dim() != (bd, bd) {
                return Err(SparseError::InvalidArgument(format!(
                    "diagonal block {bi} is {:?}, expected ({bd}, {bd})",
                    block.dim()
                )));
            }
            let k = self
                .diagonal_block_index(bi)
                .ok_or(SparseError::MissingDiagonal { index: bi })?;
            slots.push(k);
        }

        for (k, block) in slots.into_iter().zip(blocks) {
            for i in 0..bd {
                for j in 0..bd {
                    let idx = self.compute_element_index(k, i, j);
                    self.values[idx] = block[[i, j]];
                }
            }
        }
        Ok(())
    }

    /// Expand into a scalar CSR matrix, keeping every stored block position
    pub fn to_csr(&self) -> Result<CsrMatrix<T>> {
        self.ensure_built("to_csr")?;
        let bd = self.block_dim;
        let mut coo = CooMatrix::with_capacity(self.rows(), self.cols(), self.nnz())?;
        for bi in 0..self.block_rows {
            for k in self.block_row_range(bi) {
                let bj = self.block_col_indices[k];
                for i in 0..bd {
                    for j in 0..bd {
                        coo.add_value(bi * bd + i, bj * bd + j, self.block(k)[i * bd + j])?;
                    }
                }
            }
        }
        CsrMatrix::from_coo(&coo)
    }

    /// Convert to dense matrix (for debugging/small matrices)
    pub fn to_dense(&self) -> Array2<T> {
        let bd = self.block_dim;
        let mut dense = Array2::from_elem((self.rows(), self.cols()), T::zero());
        for bi in 0..self.block_rows {
            for k in self.block_row_range(bi) {
                let bj = self.block_col_indices[k];
                for i in 0..bd {
                    for j in 0..bd {
                        dense[[bi * bd + i, bj * bd + j]] += self.block(k)[i * bd + j];
                    }
                }
            }
        }
        dense
    }

    /// Drop all blocks, returning the matrix to the unbuilt state
    pub fn clear(&mut self) {
        self.block_row_ptrs = vec![0; self.block_rows + 1];
        self.block_col_indices.clear();
        self.values.clear();
        self.built = false;
    }
}

impl<T: ComplexField> SparseMatrixBase for BlockCsrMatrix<T> {
    fn rows(&self) -> usize {
        self.block_rows * self.block_dim
    }

    fn cols(&self) -> usize {
        self.block_cols * self.block_dim
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn clear(&mut self) {
        BlockCsrMatrix::clear(self);
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn format(&self) -> SparseFormat {
        SparseFormat::BlockCsr
    }
}

impl<T: ComplexField> LinearOperator<T> for BlockCsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.block_rows * self.block_dim
    }

    fn num_cols(&self) -> usize {
        self.block_cols * self.block_dim
    }

    fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        self.block_mat_vec_into(x, y)
    }
}
