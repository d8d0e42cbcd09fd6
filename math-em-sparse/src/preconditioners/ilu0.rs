//! ILU(0) preconditioner
//!
//! Incomplete LU factorization with no fill-in: `L` (unit lower) and `U`
//! (upper) keep exactly the sparsity pattern of the input matrix. Updates that
//! would land outside the pattern are dropped.

use crate::error::{Result, SparseError};
use crate::sparse::{CsrMatrix, SymCsrMatrix};
use crate::traits::{ComplexField, Preconditioner, check_operands};
use ndarray::Array1;

/// ILU(0) preconditioner
///
/// The factors are stored as two CSR halves: the strict lower part of `L`
/// (its unit diagonal is implicit) and `U` including its diagonal.
#[derive(Debug, Clone)]
pub struct Ilu0Preconditioner<T: ComplexField> {
    l_values: Vec<T>,
    l_col_indices: Vec<usize>,
    l_row_ptrs: Vec<usize>,
    u_values: Vec<T>,
    u_col_indices: Vec<usize>,
    u_row_ptrs: Vec<usize>,
    /// Diagonal of U (for fast access)
    u_diag: Vec<T>,
    n: usize,
}

impl<T: ComplexField> Ilu0Preconditioner<T> {
    /// Factor a built square CSR matrix.
    ///
    /// Duplicate entries are summed first. Every row must store its diagonal
    /// (`MissingDiagonal` otherwise) and every pivot must have magnitude of at
    /// least `pivot_tolerance` (`SingularPivot` otherwise).
    pub fn from_csr(matrix: &CsrMatrix<T>, pivot_tolerance: T::Real) -> Result<Self> {
        if matrix.rows() != matrix.cols() {
            return Err(SparseError::mismatch(
                "square matrix columns",
                matrix.rows(),
                matrix.cols(),
            ));
        }
        let a = matrix.sum_duplicates()?;
        let n = a.rows();
        let row_ptrs = a.row_ptrs();
        let col_indices = a.col_indices();

        let mut diag_indices = Vec::with_capacity(n);
        for i in 0..n {
            let cols = &col_indices[row_ptrs[i]..row_ptrs[i + 1]];
            let pos = cols.partition_point(|&c| c < i);
            if pos >= cols.len() || cols[pos] != i {
                return Err(SparseError::MissingDiagonal { index: i });
            }
            diag_indices.push(row_ptrs[i] + pos);
        }

        let mut values = a.values().to_vec();
        // marker[j] = slot of column j in the row being eliminated
        let mut marker = vec![usize::MAX; n];

        for i in 0..n {
            let row = row_ptrs[i]..row_ptrs[i + 1];
            for idx in row.clone() {
                marker[col_indices[idx]] = idx;
            }

            for idx in row.clone() {
                let k = col_indices[idx];
                if k >= i {
                    break;
                }
                let l_ik = values[idx] * values[diag_indices[k]].inv();
                values[idx] = l_ik;

                for kj in (diag_indices[k] + 1)..row_ptrs[k + 1] {
                    let slot = marker[col_indices[kj]];
                    if slot != usize::MAX {
                        let u_kj = values[kj];
                        values[slot] -= l_ik * u_kj;
                    }
                }
            }

            if values[diag_indices[i]].norm() < pivot_tolerance {
                return Err(SparseError::SingularPivot { row: i });
            }

            for idx in row {
                marker[col_indices[idx]] = usize::MAX;
            }
        }

        let mut l_values = Vec::new();
        let mut l_col_indices = Vec::new();
        let mut l_row_ptrs = vec![0];

        let mut u_values = Vec::new();
        let mut u_col_indices = Vec::new();
        let mut u_row_ptrs = vec![0];
        let mut u_diag = vec![T::one(); n];

        for i in 0..n {
            for idx in row_ptrs[i]..row_ptrs[i + 1] {
                let j = col_indices[idx];
                let val = values[idx];

                if j < i {
                    l_values.push(val);
                    l_col_indices.push(j);
                } else {
                    u_values.push(val);
                    u_col_indices.push(j);
                    if j == i {
                        u_diag[i] = val;
                    }
                }
            }
            l_row_ptrs.push(l_values.len());
            u_row_ptrs.push(u_values.len());
        }

        log::debug!(
            "ILU(0) of dimension {}: {} entries in L, {} in U",
            n,
            l_values.len(),
            u_values.len()
        );

        Ok(Self {
            l_values,
            l_col_indices,
            l_row_ptrs,
            u_values,
            u_col_indices,
            u_row_ptrs,
            u_diag,
            n,
        })
    }

    /// Factor a symmetric matrix through its full CSR expansion
    pub fn from_sym_csr(matrix: &SymCsrMatrix<T>, pivot_tolerance: T::Real) -> Result<Self> {
        Self::from_csr(&matrix.to_csr()?, pivot_tolerance)
    }

    /// Entries stored in the strict lower factor
    pub fn l_nnz(&self) -> usize {
        self.l_values.len()
    }

    /// Entries stored in the upper factor, diagonal included
    pub fn u_nnz(&self) -> usize {
        self.u_values.len()
    }
}

impl<T: ComplexField> Preconditioner<T> for Ilu0Preconditioner<T> {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply_into(&self, r: &Array1<T>, z: &mut Array1<T>) -> Result<()> {
        check_operands(self.n, r, z)?;
        z.assign(r);

        // Forward substitution: Ly = r (L has unit diagonal)
        for i in 0..self.n {
            let mut acc = z[i];
            for idx in self.l_row_ptrs[i]..self.l_row_ptrs[i + 1] {
                acc -= self.l_values[idx] * z[self.l_col_indices[idx]];
            }
            z[i] = acc;
        }

        // Backward substitution: Ux = y
        for i in (0..self.n).rev() {
            let mut acc = z[i];
            for idx in self.u_row_ptrs[i]..self.u_row_ptrs[i + 1] {
                let j = self.u_col_indices[idx];
                if j > i {
                    acc -= self.u_values[idx] * z[j];
                }
            }
            z[i] = acc * self.u_diag[i].inv();
        }

        Ok(())
    }
}
