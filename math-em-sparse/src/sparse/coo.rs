//! Coordinate (COO) triplet accumulator
//!
//! Used during assembly: entries are appended in any order, duplicates are kept,
//! and the whole set is later compressed by one of the CSR-family builders.

use super::pattern::{compress_triplets, merge_sorted_duplicates};
use crate::attribute::DataType;
use crate::error::{Result, SparseError, check_dimensions};
use crate::traits::{ComplexField, SparseFormat, SparseMatrixBase};
use ndarray::Array2;

/// Coordinate-format sparse matrix
#[derive(Debug, Clone)]
pub struct CooMatrix<T: ComplexField> {
    num_rows: usize,
    num_cols: usize,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: ComplexField> CooMatrix<T> {
    /// Create an empty `rows x cols` accumulator
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        check_dimensions(rows, cols)?;
        Ok(Self {
            num_rows: rows,
            num_cols: cols,
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Create an accumulator with room for `capacity` triplets
    pub fn with_capacity(rows: usize, cols: usize, capacity: usize) -> Result<Self> {
        let mut coo = Self::new(rows, cols)?;
        coo.reserve(capacity);
        Ok(coo)
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored triplets, duplicates included
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row index of every triplet
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    /// Column index of every triplet
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Value of every triplet
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Iterate over `(row, col, value)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.row_indices
            .iter()
            .zip(self.col_indices.iter())
            .zip(self.values.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }

    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.num_rows || col >= self.num_cols {
            return Err(SparseError::OutOfRange {
                row,
                col,
                rows: self.num_rows,
                cols: self.num_cols,
            });
        }
        Ok(())
    }

    /// Append a triplet. No deduplication is performed.
    pub fn add_value(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.check_index(row, col)?;
        self.row_indices.push(row);
        self.col_indices.push(col);
        self.values.push(value);
        Ok(())
    }

    /// Append a batch of triplets given as parallel slices.
    ///
    /// The whole batch is validated first; on error nothing is appended.
    pub fn add_values(&mut self, rows: &[usize], cols: &[usize], values: &[T]) -> Result<()> {
        if rows.len() != values.len() {
            return Err(SparseError::mismatch("row index count", values.len(), rows.len()));
        }
        if cols.len() != values.len() {
            return Err(SparseError::mismatch("column index count", values.len(), cols.len()));
        }
        for (&r, &c) in rows.iter().zip(cols) {
            self.check_index(r, c)?;
        }
        self.row_indices.extend_from_slice(rows);
        self.col_indices.extend_from_slice(cols);
        self.values.extend_from_slice(values);
        Ok(())
    }

    /// Scatter a dense element matrix through its global DOF numbering.
    ///
    /// `local[[a, b]]` is added at `(dofs[a], dofs[b])`.
    pub fn add_element_matrix(&mut self, dofs: &[usize], local: &Array2<T>) -> Result<()> {
        if local.nrows() != dofs.len() || local.ncols() != dofs.len() {
            return Err(SparseError::InvalidArgument(format!(
                "element matrix is {}x{} but {} dofs were given",
                local.nrows(),
                local.ncols(),
                dofs.len()
            )));
        }
        for &a in dofs {
            for &b in dofs {
                self.check_index(a, b)?;
            }
        }
        self.reserve(dofs.len() * dofs.len());
        for (a, &ga) in dofs.iter().enumerate() {
            for (b, &gb) in dofs.iter().enumerate() {
                self.row_indices.push(ga);
                self.col_indices.push(gb);
                self.values.push(local[[a, b]]);
            }
        }
        Ok(())
    }

    /// Resize the accumulator. All stored triplets are discarded.
    pub fn set_size(&mut self, rows: usize, cols: usize) -> Result<()> {
        check_dimensions(rows, cols)?;
        self.num_rows = rows;
        self.num_cols = cols;
        self.clear();
        Ok(())
    }

    /// Reserve room for `capacity` additional triplets
    pub fn reserve(&mut self, capacity: usize) {
        self.row_indices.reserve(capacity);
        self.col_indices.reserve(capacity);
        self.values.reserve(capacity);
    }

    /// Remove all triplets
    pub fn clear(&mut self) {
        self.row_indices.clear();
        self.col_indices.clear();
        self.values.clear();
    }

    /// Copy of this matrix with duplicate `(row, col)` pairs summed,
    /// ordered by row then column.
    pub fn sum_duplicates(&self) -> CooMatrix<T> {
        let compressed = compress_triplets(
            self.num_rows,
            &self.row_indices,
            &self.col_indices,
            &self.values,
        );
        let merged = merge_sorted_duplicates(
            &compressed.row_ptrs,
            &compressed.col_indices,
            &compressed.values,
        );

        let nnz = merged.values.len();
        let mut row_indices = Vec::with_capacity(nnz);
        for i in 0..self.num_rows {
            let count = merged.row_ptrs[i + 1] - merged.row_ptrs[i];
            row_indices.extend(std::iter::repeat_n(i, count));
        }

        CooMatrix {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            row_indices,
            col_indices: merged.col_indices,
            values: merged.values,
        }
    }

    /// Convert to dense matrix (duplicates summed; for debugging/small matrices)
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());
        for (r, c, v) in self.iter() {
            dense[[r, c]] += v;
        }
        dense
    }

    pub(crate) fn from_parts_unchecked(
        num_rows: usize,
        num_cols: usize,
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        Self {
            num_rows,
            num_cols,
            row_indices,
            col_indices,
            values,
        }
    }
}

impl<T: ComplexField> SparseMatrixBase for CooMatrix<T> {
    fn rows(&self) -> usize {
        self.num_rows
    }

    fn cols(&self) -> usize {
        self.num_cols
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn clear(&mut self) {
        CooMatrix::clear(self);
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn format(&self) -> SparseFormat {
        SparseFormat::Coo
    }
}
