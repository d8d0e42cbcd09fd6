//! Compressed Sparse Row (CSR) matrix format
//!
//! CSR format stores:
//! - `values`: Non-zero entries in row-major order
//! - `col_indices`: Column index for each value, ascending within a row
//! - `row_ptrs`: Index into values/col_indices where each row starts
//!
//! A `CsrMatrix` is created unbuilt and becomes usable after
//! [`CsrMatrix::build_from_coo`]. Once built, only values may change
//! ([`CsrMatrix::scale`], [`CsrMatrix::set_diag`]); the structure is fixed.

use super::coo::CooMatrix;
use super::pattern::{compress_triplets, merge_sorted_duplicates};
use crate::attribute::DataType;
use crate::error::{Result, SparseError, check_dimensions};
use crate::traits::{ComplexField, LinearOperator, SparseFormat, SparseMatrixBase};
use ndarray::{Array1, Array2};
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Row count above which the `rayon` feature switches SpMV to a parallel loop
#[cfg(feature = "rayon")]
const PARALLEL_ROW_THRESHOLD: usize = 246;

/// Compressed Sparse Row (CSR) matrix format
///
/// Memory-efficient storage for sparse matrices with O(nnz) space complexity.
/// Matrix-vector products are O(nnz) instead of O(n²) for dense matrices.
#[derive(Debug, Clone)]
pub struct CsrMatrix<T: ComplexField> {
    num_rows: usize,
    num_cols: usize,
    values: Vec<T>,
    col_indices: Vec<usize>,
    /// row_ptrs[num_rows] = nnz
    row_ptrs: Vec<usize>,
    built: bool,
}

impl<T: ComplexField> CsrMatrix<T> {
    /// Create a new unbuilt CSR matrix of the given size
    pub fn new(num_rows: usize, num_cols: usize) -> Result<Self> {
        check_dimensions(num_rows, num_cols)?;
        Ok(Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; num_rows + 1],
            built: false,
        })
    }

    /// Create and build a CSR matrix from COO triplets in one step
    pub fn from_coo(coo: &CooMatrix<T>) -> Result<Self> {
        let mut csr = Self::new(coo.rows(), coo.cols())?;
        csr.build_from_coo(coo)?;
        Ok(csr)
    }

    /// Create a built CSR matrix from raw components
    ///
    /// The arrays are validated: `row_ptrs` must have `num_rows + 1` non-decreasing
    /// entries starting at 0 and ending at nnz, and columns must be in range and
    /// ascending within each row.
    pub fn from_raw_parts(
        num_rows: usize,
        num_cols: usize,
        row_ptrs: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        check_dimensions(num_rows, num_cols)?;
        if row_ptrs.len() != num_rows + 1 {
            return Err(SparseError::mismatch(
                "row_ptrs length",
                num_rows + 1,
                row_ptrs.len(),
            ));
        }
        if col_indices.len() != values.len() {
            return Err(SparseError::mismatch(
                "col_indices length",
                values.len(),
                col_indices.len(),
            ));
        }
        if row_ptrs[0] != 0 || row_ptrs[num_rows] != values.len() {
            return Err(SparseError::InvalidArgument(
                "row_ptrs must start at 0 and end at nnz".to_string(),
            ));
        }
        for i in 0..num_rows {
            if row_ptrs[i] > row_ptrs[i + 1] {
                return Err(SparseError::InvalidArgument(format!(
                    "row_ptrs decreases at row {i}"
                )));
            }
            let cols = &col_indices[row_ptrs[i]..row_ptrs[i + 1]];
            if let Some(&j) = cols.iter().find(|&&j| j >= num_cols) {
                return Err(SparseError::OutOfRange {
                    row: i,
                    col: j,
                    rows: num_rows,
                    cols: num_cols,
                });
            }
            if cols.windows(2).any(|w| w[0] > w[1]) {
                return Err(SparseError::InvalidArgument(format!(
                    "columns of row {i} are not sorted"
                )));
            }
        }

        Ok(Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
            built: true,
        })
    }

    /// Create identity matrix in CSR format
    pub fn identity(n: usize) -> Result<Self> {
        check_dimensions(n, n)?;
        Ok(Self {
            num_rows: n,
            num_cols: n,
            values: vec![T::one(); n],
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
            built: true,
        })
    }

    /// Create diagonal matrix from vector
    pub fn from_diagonal(diag: &Array1<T>) -> Result<Self> {
        let n = diag.len();
        check_dimensions(n, n)?;
        Ok(Self {
            num_rows: n,
            num_cols: n,
            values: diag.to_vec(),
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
            built: true,
        })
    }

    /// Build the compressed structure from COO triplets.
    ///
    /// Triplets are ordered by (row, column) with a stable sort; duplicate pairs
    /// are not merged and occupy distinct slots. Any previous content is replaced.
    pub fn build_from_coo(&mut self, coo: &CooMatrix<T>) -> Result<()> {
        if coo.rows() != self.num_rows {
            return Err(SparseError::mismatch("COO row count", self.num_rows, coo.rows()));
        }
        if coo.cols() != self.num_cols {
            return Err(SparseError::mismatch(
                "COO column count",
                self.num_cols,
                coo.cols(),
            ));
        }

        let compressed = compress_triplets(
            self.num_rows,
            coo.row_indices(),
            coo.col_indices(),
            coo.values(),
        );
        self.row_ptrs = compressed.row_ptrs;
        self.col_indices = compressed.col_indices;
        self.values = compressed.values;
        self.built = true;

        log::debug!(
            "built CSR {}x{} with {} stored entries",
            self.num_rows,
            self.num_cols,
            self.values.len()
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

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row pointer array (length rows + 1)
    pub fn row_ptrs(&self) -> &[usize] {
        &self.row_ptrs
    }

    /// Column index of each stored entry
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Stored values in row-major order
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Sparsity ratio (fraction of non-zero entries)
    pub fn sparsity(&self) -> f64 {
        self.nnz() as f64 / (self.num_rows * self.num_cols) as f64
    }

    /// Get the range of indices in values/col_indices for a given row
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// Get the (col, value) pairs for a row
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Get element at (i, j); duplicates are summed, absent entries read as 0
    pub fn get(&self, i: usize, j: usize) -> T {
        if !self.built || i >= self.num_rows {
            return T::zero();
        }
        let range = self.row_range(i);
        let cols = &self.col_indices[range.clone()];
        let start = cols.partition_point(|&c| c < j);
        let mut sum = T::zero();
        for (offset, _) in cols[start..].iter().enumerate().take_while(|(_, c)| **c == j) {
            sum += self.values[range.start + start + offset];
        }
        sum
    }

    #[inline]
    fn row_dot(&self, i: usize, x: &Array1<T>) -> T {
        let mut sum = T::zero();
        for idx in self.row_range(i) {
            sum += self.values[idx] * x[self.col_indices[idx]];
        }
        sum
    }

    /// Matrix-vector product: y = A * x
    pub fn mat_vec(&self, x: &Array1<T>) -> Result<Array1<T>> {
        let mut y = Array1::from_elem(self.num_rows, T::zero());
        self.mat_vec_into(x, &mut y)?;
        Ok(y)
    }

    /// Matrix-vector product into an existing buffer: y = A * x
    ///
    /// Uses parallel processing when the `rayon` feature is enabled and the
    /// matrix is large enough to benefit from parallelization.
    pub fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        self.ensure_built("mat_vec")?;
        if x.len() != self.num_cols {
            return Err(SparseError::mismatch("input vector length", self.num_cols, x.len()));
        }
        if y.len() != self.num_rows {
            return Err(SparseError::mismatch("output vector length", self.num_rows, y.len()));
        }

        #[cfg(feature = "rayon")]
        {
            if self.num_rows >= PARALLEL_ROW_THRESHOLD {
                if let Some(y_slice) = y.as_slice_mut() {
                    y_slice
                        .par_iter_mut()
                        .enumerate()
                        .for_each(|(i, yi)| *yi = self.row_dot(i, x));
                    return Ok(());
                }
            }
        }

        for i in 0..self.num_rows {
            y[i] = self.row_dot(i, x);
        }
        Ok(())
    }

    /// Transpose by re-inserting every entry as (col, row, value) and rebuilding
    pub fn transpose(&self) -> Result<CsrMatrix<T>> {
        self.ensure_built("transpose")?;
        let coo = self.to_coo()?;
        let swapped = CooMatrix::from_parts_unchecked(
            self.num_cols,
            self.num_rows,
            coo.col_indices().to_vec(),
            coo.row_indices().to_vec(),
            coo.values().to_vec(),
        );
        CsrMatrix::from_coo(&swapped)
    }

    /// Convert to COO triplets in row-major order
    pub fn to_coo(&self) -> Result<CooMatrix<T>> {
        self.ensure_built("to_coo")?;
        let mut row_indices = Vec::with_capacity(self.nnz());
        for i in 0..self.num_rows {
            row_indices.extend(std::iter::repeat_n(i, self.row_range(i).len()));
        }
        Ok(CooMatrix::from_parts_unchecked(
            self.num_rows,
            self.num_cols,
            row_indices,
            self.col_indices.clone(),
            self.values.clone(),
        ))
    }

    /// Extract diagonal elements; missing slots read as zero
    pub fn get_diag(&self) -> Result<Array1<T>> {
        self.ensure_built("get_diag")?;
        let n = self.num_rows.min(self.num_cols);
        Ok(Array1::from_iter((0..n).map(|i| self.get(i, i))))
    }

    /// Overwrite the diagonal.
    ///
    /// Every diagonal slot must already exist in the pattern; no fill-in is
    /// performed. When a row stores the diagonal more than once, the first slot
    /// receives the value and the others are zeroed.
    pub fn set_diag(&mut self, diag: &Array1<T>) -> Result<()> {
        self.ensure_built("set_diag")?;
        let n = self.num_rows.min(self.num_cols);
        if diag.len() != n {
            return Err(SparseError::mismatch("diagonal length", n, diag.len()));
        }

        let mut slots = Vec::with_capacity(n);
        for i in 0..n {
            let range = self.row_range(i);
            let cols = &self.col_indices[range.clone()];
            let pos = cols.partition_point(|&c| c < i);
            if pos >= cols.len() || cols[pos] != i {
                return Err(SparseError::MissingDiagonal { index: i });
            }
            let end = pos + cols[pos..].iter().take_while(|&&c| c == i).count();
            slots.push((range.start + pos, range.start + end));
        }

        for (i, (first, end)) in slots.into_iter().enumerate() {
            self.values[first] = diag[i];
            for idx in (first + 1)..end {
                self.values[idx] = T::zero();
            }
        }
        Ok(())
    }

    /// Scale all values by a scalar
    pub fn scale(&mut self, scalar: T) -> Result<()> {
        self.ensure_built("scale")?;
        for val in &mut self.values {
            *val *= scalar;
        }
        Ok(())
    }

    /// Copy of this matrix with duplicate entries of each row summed
    pub fn sum_duplicates(&self) -> Result<CsrMatrix<T>> {
        self.ensure_built("sum_duplicates")?;
        let merged = merge_sorted_duplicates(&self.row_ptrs, &self.col_indices, &self.values);
        Ok(Self {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            values: merged.values,
            col_indices: merged.col_indices,
            row_ptrs: merged.row_ptrs,
            built: true,
        })
    }

    /// Check whether A == A^T within an absolute tolerance
    pub fn is_symmetric(&self, tol: T::Real) -> Result<bool> {
        self.ensure_built("is_symmetric")?;
        if self.num_rows != self.num_cols {
            return Ok(false);
        }
        let merged = self.sum_duplicates()?;
        for i in 0..merged.num_rows {
            for (j, v) in merged.row_entries(i) {
                if j != i && !(v - merged.get(j, i)).is_zero_approx(tol) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Resize, returning the matrix to the unbuilt state
    pub fn set_size(&mut self, num_rows: usize, num_cols: usize) -> Result<()> {
        check_dimensions(num_rows, num_cols)?;
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        self.clear();
        Ok(())
    }

    /// Drop all entries, returning the matrix to the unbuilt state
    pub fn clear(&mut self) {
        self.values.clear();
        self.col_indices.clear();
        self.row_ptrs = vec![0; self.num_rows + 1];
        self.built = false;
    }

    /// Convert to dense matrix (for debugging/small matrices)
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());

        for i in 0..self.num_rows {
            for idx in self.row_range(i) {
                let j = self.col_indices[idx];
                dense[[i, j]] += self.values[idx];
            }
        }

        dense
    }
}

impl<T: ComplexField> SparseMatrixBase for CsrMatrix<T> {
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
        CsrMatrix::clear(self);
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn format(&self) -> SparseFormat {
        SparseFormat::Csr
    }
}

impl<T: ComplexField> LinearOperator<T> for CsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn mat_vec_into(&self, x: &Array1<T>, y: &mut Array1<T>) -> Result<()> {
        CsrMatrix::mat_vec_into(self, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    fn sample_coo() -> CooMatrix<f64> {
        // [4 1 0]
        // [1 3 1]
        // [0 1 2]
        let mut coo = CooMatrix::new(3, 3).unwrap();
        for &(r, c, v) in &[
            (2, 2, 2.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 2, 1.0),
            (0, 0, 4.0),
            (2, 1, 1.0),
            (1, 1, 3.0),
        ] {
            coo.add_value(r, c, v).unwrap();
        }
        coo
    }

    #[test]
    fn test_build_from_coo_sorts_rows() {
        let csr = CsrMatrix::from_coo(&sample_coo()).unwrap();

        assert_eq!(csr.nnz(), 7);
        assert_eq!(csr.row_ptrs(), &[0, 2, 5, 7]);
        assert_eq!(csr.col_indices(), &[0, 1, 0, 1, 2, 1, 2]);
        assert_relative_eq!(csr.get(0, 0), 4.0);
        assert_relative_eq!(csr.get(1, 2), 1.0);
        assert_relative_eq!(csr.get(2, 0), 0.0);
    }

    #[test]
    fn test_build_size_mismatch() {
        let mut csr = CsrMatrix::<f64>::new(4, 3).unwrap();
        let err = csr.build_from_coo(&sample_coo()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(!csr.is_built());
    }

    #[test]
    fn test_duplicates_survive_in_distinct_slots() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, 1.0).unwrap();
        coo.add_value(0, 0, 2.0).unwrap();
        coo.add_value(1, 1, 3.0).unwrap();

        let csr = CsrMatrix::from_coo(&coo).unwrap();
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.values(), &[1.0, 2.0, 3.0]);
        assert_relative_eq!(csr.get(0, 0), 3.0);

        let y = csr.mat_vec(&array![1.0, 1.0]).unwrap();
        assert_relative_eq!(y[0], 3.0);

        let merged = csr.sum_duplicates().unwrap();
        assert_eq!(merged.nnz(), 2);
    }

    #[test]
    fn test_csr_mat_vec() {
        let csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let y = csr.mat_vec(&array![1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(y[0], 6.0);
        assert_relative_eq!(y[1], 10.0);
        assert_relative_eq!(y[2], 8.0);
    }

    #[test]
    fn test_mat_vec_errors() {
        let csr = CsrMatrix::<f64>::new(3, 3).unwrap();
        let err = csr.mat_vec(&array![1.0, 2.0, 3.0]).unwrap_err();
        assert!(err.is_precondition_violation());

        let csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let err = csr.mat_vec(&array![1.0, 2.0]).unwrap_err();
        assert!(err.is_invalid_argument());

        let mut y = Array1::zeros(2);
        let err = csr.mat_vec_into(&array![1.0, 2.0, 3.0], &mut y).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_unbuilt_operations_rejected() {
        let mut csr = CsrMatrix::<f64>::new(2, 2).unwrap();
        assert!(csr.scale(2.0).unwrap_err().is_precondition_violation());
        assert!(csr.transpose().unwrap_err().is_precondition_violation());
        assert!(csr.get_diag().unwrap_err().is_precondition_violation());
        assert!(
            csr.set_diag(&array![1.0, 1.0])
                .unwrap_err()
                .is_precondition_violation()
        );
    }

    #[test]
    fn test_transpose() {
        let mut coo = CooMatrix::new(2, 3).unwrap();
        coo.add_value(0, 2, 5.0).unwrap();
        coo.add_value(1, 0, -1.0).unwrap();
        coo.add_value(1, 1, 2.0).unwrap();
        let csr = CsrMatrix::from_coo(&coo).unwrap();

        let t = csr.transpose().unwrap();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 2);
        assert_relative_eq!(t.get(2, 0), 5.0);
        assert_relative_eq!(t.get(0, 1), -1.0);
        assert_relative_eq!(t.get(1, 1), 2.0);

        let tt = t.transpose().unwrap();
        let x = array![0.5, -2.0, 3.0];
        let y1 = csr.mat_vec(&x).unwrap();
        let y2 = tt.mat_vec(&x).unwrap();
        for i in 0..2 {
            assert_relative_eq!(y1[i], y2[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_get_and_set_diag() {
        let mut csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let d = csr.get_diag().unwrap();
        assert_eq!(d, array![4.0, 3.0, 2.0]);

        csr.set_diag(&array![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(csr.get_diag().unwrap(), array![1.0, 1.0, 1.0]);
        assert_relative_eq!(csr.get(0, 1), 1.0);

        let err = csr.set_diag(&array![1.0]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_set_diag_requires_existing_slot() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, 1.0).unwrap();
        coo.add_value(1, 0, 1.0).unwrap();
        let mut csr = CsrMatrix::from_coo(&coo).unwrap();

        assert_eq!(csr.get_diag().unwrap(), array![1.0, 0.0]);
        let err = csr.set_diag(&array![5.0, 5.0]).unwrap_err();
        assert!(matches!(err, SparseError::MissingDiagonal { index: 1 }));
        // untouched on failure
        assert_relative_eq!(csr.get(0, 0), 1.0);
    }

    #[test]
    fn test_scale_linearity() {
        let original = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let mut scaled = original.clone();
        scaled.scale(-2.5).unwrap();

        let x = array![0.3, -1.0, 2.0];
        let y0 = original.mat_vec(&x).unwrap();
        let y1 = scaled.mat_vec(&x).unwrap();
        for i in 0..3 {
            assert_relative_eq!(y1[i], -2.5 * y0[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clear_returns_to_unbuilt() {
        let mut csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        SparseMatrixBase::clear(&mut csr);
        assert!(!csr.is_built());
        assert_eq!(csr.nnz(), 0);
        assert_eq!(csr.rows(), 3);
        assert!(csr.mat_vec(&array![1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_from_raw_parts_validation() {
        let ok = CsrMatrix::from_raw_parts(2, 2, vec![0, 1, 2], vec![0, 1], vec![1.0, 2.0]);
        assert!(ok.is_ok());

        let unsorted =
            CsrMatrix::from_raw_parts(1, 2, vec![0, 2], vec![1, 0], vec![1.0, 2.0]).unwrap_err();
        assert!(unsorted.is_invalid_argument());

        let out_of_range =
            CsrMatrix::from_raw_parts(1, 2, vec![0, 1], vec![4], vec![1.0]).unwrap_err();
        assert!(out_of_range.is_out_of_range());
    }

    #[test]
    fn test_identity_and_symmetry() {
        let id: CsrMatrix<Complex64> = CsrMatrix::identity(3).unwrap();
        assert_eq!(id.nnz(), 3);
        assert!(id.is_symmetric(1e-14).unwrap());
        assert_eq!(id.data_type(), DataType::Complex);

        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 1, 1.0).unwrap();
        let csr = CsrMatrix::from_coo(&coo).unwrap();
        assert!(!csr.is_symmetric(1e-14).unwrap());
    }

    #[test]
    fn test_complex_mat_vec() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, Complex64::new(1.0, 1.0)).unwrap();
        coo.add_value(1, 0, Complex64::new(0.0, 2.0)).unwrap();
        let csr = CsrMatrix::from_coo(&coo).unwrap();

        let y = csr
            .mat_vec(&array![Complex64::new(2.0, 0.0), Complex64::new(5.0, 5.0)])
            .unwrap();
        assert_relative_eq!(y[0].re, 2.0);
        assert_relative_eq!(y[0].im, 2.0);
        assert_relative_eq!(y[1].re, 0.0);
        assert_relative_eq!(y[1].im, 4.0);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_mat_vec_matches_row_loop() {
        let n = 4 * PARALLEL_ROW_THRESHOLD;
        let mut coo = CooMatrix::new(n, n).unwrap();
        for i in 0..n {
            coo.add_value(i, i, 2.0 + (i % 7) as f64).unwrap();
            if i > 0 {
                coo.add_value(i, i - 1, -1.0).unwrap();
                coo.add_value(i - 1, i, -0.5).unwrap();
            }
        }
        let csr = CsrMatrix::from_coo(&coo).unwrap();
        let x = Array1::from_iter((0..n).map(|i| (i as f64 * 0.37).sin()));

        let y = csr.mat_vec(&x).unwrap();
        for i in 0..n {
            let expected: f64 = csr.row_entries(i).map(|(j, v)| v * x[j]).sum();
            assert_relative_eq!(y[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    #[should_panic]
    fn test_row_range_past_last_row_panics() {
        let csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let _ = csr.row_range(3);
    }

    #[test]
    fn test_to_dense_roundtrip() {
        let csr = CsrMatrix::from_coo(&sample_coo()).unwrap();
        let back = CsrMatrix::from_coo(&csr.to_coo().unwrap()).unwrap();
        assert_eq!(csr.to_dense(), back.to_dense());
    }
}
