//! Block ILU(0) preconditioner
//!
//! The ILU(0) recurrence carried out on `block_dim x block_dim` blocks of a
//! [`BlockCsrMatrix`]: products become small dense products and pivots become
//! inverted diagonal blocks. Fill is restricted to the block pattern.

use crate::error::{Result, SparseError};
use crate::sparse::{BlockCsrMatrix, MAX_BLOCK_DIM};
use crate::traits::{ComplexField, Preconditioner, check_operands};
use ndarray::Array1;

const BLOCK_CAP: usize = MAX_BLOCK_DIM * MAX_BLOCK_DIM;

/// Block ILU(0) preconditioner for vector-element systems
#[derive(Debug, Clone)]
pub struct BlockIlu0Preconditioner<T: ComplexField> {
    block_dim: usize,
    block_rows: usize,
    block_row_ptrs: Vec<usize>,
    block_col_indices: Vec<usize>,
    /// Strict lower blocks hold L, the rest hold U
    factors: Vec<T>,
    diag_indices: Vec<usize>,
    /// Inverted diagonal blocks of U, `block_dim²` each
    diag_inv: Vec<T>,
}

impl<T: ComplexField> BlockIlu0Preconditioner<T> {
    /// Factor a built square block matrix.
    ///
    /// Each block row must store its diagonal block (`MissingDiagonal`). A
    /// diagonal block whose Gauss-Jordan pivot falls below `pivot_tolerance`
    /// yields `SingularPivot` with the logical row of the failing pivot.
    pub fn from_block_csr(matrix: &BlockCsrMatrix<T>, pivot_tolerance: T::Real) -> Result<Self> {
        if !matrix.is_built() {
            return Err(SparseError::NotBuilt {
                operation: "block ILU(0) factorization",
            });
        }
        if matrix.block_rows() != matrix.block_cols() {
            return Err(SparseError::mismatch(
                "square block matrix columns",
                matrix.block_rows(),
                matrix.block_cols(),
            ));
        }

        let bd = matrix.block_dim();
        let bsize = bd * bd;
        let nb = matrix.block_rows();
        let row_ptrs = matrix.block_row_ptrs();
        let col_indices = matrix.block_col_indices();

        let mut diag_indices = Vec::with_capacity(nb);
        for i in 0..nb {
            let cols = &col_indices[row_ptrs[i]..row_ptrs[i + 1]];
            let pos = cols.partition_point(|&c| c < i);
            if pos >= cols.len() || cols[pos] != i {
                return Err(SparseError::MissingDiagonal { index: i });
            }
            diag_indices.push(row_ptrs[i] + pos);
        }

        let mut factors = matrix.values().to_vec();
        let mut diag_inv = vec![T::zero(); nb * bsize];
        let mut marker = vec![usize::MAX; nb];

        for i in 0..nb {
            let row = row_ptrs[i]..row_ptrs[i + 1];
            for k in row.clone() {
                marker[col_indices[k]] = k;
            }

            for idx in row.clone() {
                let k = col_indices[idx];
                if k >= i {
                    break;
                }
                // L_ik = A_ik * inv(U_kk)
                let a_ik = load_block(&factors, idx, bd);
                let l_ik = block_mul(&a_ik, &diag_inv[k * bsize..(k + 1) * bsize], bd);
                factors[idx * bsize..(idx + 1) * bsize].copy_from_slice(&l_ik[..bsize]);

                for kj in (diag_indices[k] + 1)..row_ptrs[k + 1] {
                    let slot = marker[col_indices[kj]];
                    if slot != usize::MAX {
                        let update = block_mul(&l_ik, &factors[kj * bsize..(kj + 1) * bsize], bd);
                        for (dst, &u) in factors[slot * bsize..(slot + 1) * bsize]
                            .iter_mut()
                            .zip(&update[..bsize])
                        {
                            *dst -= u;
                        }
                    }
                }
            }

            let u_ii = load_block(&factors, diag_indices[i], bd);
            let inv = invert_block(&u_ii, bd, pivot_tolerance)
                .map_err(|local| SparseError::SingularPivot { row: i * bd + local })?;
            diag_inv[i * bsize..(i + 1) * bsize].copy_from_slice(&inv[..bsize]);

            for k in row {
                marker[col_indices[k]] = usize::MAX;
            }
        }

        log::debug!(
            "block ILU(0): {} block rows of size {}, {} stored blocks",
            nb,
            bd,
            col_indices.len()
        );

        Ok(Self {
            block_dim: bd,
            block_rows: nb,
            block_row_ptrs: row_ptrs.to_vec(),
            block_col_indices: col_indices.to_vec(),
            factors,
            diag_indices,
            diag_inv,
        })
    }

    /// Edge length of the blocks
    pub fn block_dim(&self) -> usize {
        self.block_dim
    }

    #[inline]
    fn factor_block(&self, k: usize) -> &[T] {
        let bsize = self.block_dim * self.block_dim;
        &self.factors[k * bsize..(k + 1) * bsize]
    }
}

impl<T: ComplexField> Preconditioner<T> for BlockIlu0Preconditioner<T> {
    fn dim(&self) -> usize {
        self.block_rows * self.block_dim
    }

    fn apply_into(&self, r: &Array1<T>, z: &mut Array1<T>) -> Result<()> {
        check_operands(self.dim(), r, z)?;
        let bd = self.block_dim;
        let bsize = bd * bd;
        z.assign(r);

        // Forward: y_i = r_i - sum_{k<i} L_ik y_k
        for i in 0..self.block_rows {
            for idx in self.block_row_ptrs[i]..self.diag_indices[i] {
                let k = self.block_col_indices[idx];
                let l = self.factor_block(idx);
                for a in 0..bd {
                    let mut acc = T::zero();
                    for b in 0..bd {
                        acc += l[a * bd + b] * z[k * bd + b];
                    }
                    z[i * bd + a] -= acc;
                }
            }
        }

        // Backward: x_i = inv(U_ii) (y_i - sum_{j>i} U_ij x_j)
        let mut t = [T::zero(); MAX_BLOCK_DIM];
        for i in (0..self.block_rows).rev() {
            for a in 0..bd {
                t[a] = z[i * bd + a];
            }
            for idx in (self.diag_indices[i] + 1)..self.block_row_ptrs[i + 1] {
                let j = self.block_col_indices[idx];
                let u = self.factor_block(idx);
                for a in 0..bd {
                    let mut acc = T::zero();
                    for b in 0..bd {
                        acc += u[a * bd + b] * z[j * bd + b];
                    }
                    t[a] -= acc;
                }
            }
            let inv = &self.diag_inv[i * bsize..(i + 1) * bsize];
            for a in 0..bd {
                let mut acc = T::zero();
                for b in 0..bd {
                    acc += inv[a * bd + b] * t[b];
                }
                z[i * bd + a] = acc;
            }
        }

        Ok(())
    }
}

fn load_block<T: ComplexField>(values: &[T], k: usize, bd: usize) -> [T; BLOCK_CAP] {
    let bsize = bd * bd;
    let mut out = [T::zero(); BLOCK_CAP];
    out[..bsize].copy_from_slice(&values[k * bsize..(k + 1) * bsize]);
    out
}

/// Dense row-major product of two `bd x bd` blocks
fn block_mul<T: ComplexField>(a: &[T], b: &[T], bd: usize) -> [T; BLOCK_CAP] {
    let mut out = [T::zero(); BLOCK_CAP];
    for i in 0..bd {
        for j in 0..bd {
            let mut acc = T::zero();
            for m in 0..bd {
                acc += a[i * bd + m] * b[m * bd + j];
            }
            out[i * bd + j] = acc;
        }
    }
    out
}

/// Gauss-Jordan inverse with partial pivoting.
/// On failure returns the local column whose pivot was below `tol`.
fn invert_block<T: ComplexField>(
    block: &[T],
    bd: usize,
    tol: T::Real,
) -> std::result::Result<[T; BLOCK_CAP], usize> {
    let mut a = [T::zero(); BLOCK_CAP];
    a[..bd * bd].copy_from_slice(&block[..bd * bd]);
    let mut inv = [T::zero(); BLOCK_CAP];
    for i in 0..bd {
        inv[i * bd + i] = T::one();
    }

    for col in 0..bd {
        let mut pivot_row = col;
        for r in (col + 1)..bd {
            if a[r * bd + col].norm() > a[pivot_row * bd + col].norm() {
                pivot_row = r;
            }
        }
        if a[pivot_row * bd + col].norm() < tol {
            return Err(col);
        }
        if pivot_row != col {
            for j in 0..bd {
                a.swap(col * bd + j, pivot_row * bd + j);
                inv.swap(col * bd + j, pivot_row * bd + j);
            }
        }

        let p_inv = a[col * bd + col].inv();
        for j in 0..bd {
            a[col * bd + j] *= p_inv;
            inv[col * bd + j] *= p_inv;
        }
        for r in 0..bd {
            if r == col {
                continue;
            }
            let f = a[r * bd + col];
            if f == T::zero() {
                continue;
            }
            for j in 0..bd {
                let (ac, ic) = (a[col * bd + j], inv[col * bd + j]);
                a[r * bd + j] -= f * ac;
                inv[r * bd + j] -= f * ic;
            }
        }
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioners::Ilu0Preconditioner;
    use crate::sparse::{CooMatrix, CsrMatrix};
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    /// Block tridiagonal matrix with coupled 2x2 or 3x3 blocks
    fn block_tridiagonal(nb: usize, bd: usize) -> CooMatrix<f64> {
        let n = nb * bd;
        let mut coo = CooMatrix::new(n, n).unwrap();
        for bi in 0..nb {
            for a in 0..bd {
                for b in 0..bd {
                    let r = bi * bd + a;
                    let c = bi * bd + b;
                    let v = if a == b { 6.0 } else { 1.0 + 0.1 * (a + b) as f64 };
                    coo.add_value(r, c, v).unwrap();
                    if bi + 1 < nb {
                        coo.add_value(r, c + bd, -0.5 + 0.05 * a as f64).unwrap();
                        coo.add_value(r + bd, c, -0.5 + 0.05 * b as f64).unwrap();
                    }
                }
            }
        }
        coo
    }

    #[test]
    fn test_invert_block() {
        let m = [2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 4.0];
        let inv = invert_block(&m, 3, 1e-14).unwrap();
        let id = block_mul(&m, &inv, 3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(id[i * 3 + j], expected, epsilon = 1e-12);
            }
        }

        // needs a row swap
        let p = [0.0, 1.0, 1.0, 0.0];
        let inv = invert_block(&p, 2, 1e-14).unwrap();
        assert_eq!(&inv[..4], &[0.0, 1.0, 1.0, 0.0]);

        assert_eq!(invert_block(&[1.0, 2.0, 2.0, 4.0], 2, 1e-12), Err(1));
    }

    #[test]
    fn test_block_ilu0_exact_on_block_tridiagonal() {
        for bd in [2, 3] {
            let coo = block_tridiagonal(4, bd);
            let a = BlockCsrMatrix::from_coo(&coo, bd).unwrap();
            let precond = BlockIlu0Preconditioner::from_block_csr(&a, 1e-30).unwrap();
            assert_eq!(Preconditioner::<f64>::dim(&precond), 4 * bd);

            let r = Array1::from_iter((0..4 * bd).map(|i| 1.0 + (i as f64).cos()));
            let z = precond.apply(&r).unwrap();
            let back = a.block_mat_vec(&z).unwrap();
            for i in 0..4 * bd {
                assert_relative_eq!(back[i], r[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_block_dim_one_matches_scalar_ilu0() {
        let mut coo = CooMatrix::new(4, 4).unwrap();
        for &(r, c, v) in &[
            (0, 0, 4.0),
            (0, 2, 1.0),
            (1, 1, 5.0),
            (1, 3, -1.0),
            (2, 0, 1.0),
            (2, 1, 2.0),
            (2, 2, 6.0),
            (3, 1, -1.0),
            (3, 3, 3.0),
        ] {
            coo.add_value(r, c, v).unwrap();
        }
        let scalar =
            Ilu0Preconditioner::from_csr(&CsrMatrix::from_coo(&coo).unwrap(), 1e-30).unwrap();
        let block_matrix = BlockCsrMatrix::from_coo(&coo, 1).unwrap();
        let block = BlockIlu0Preconditioner::from_block_csr(&block_matrix, 1e-30).unwrap();

        let r = array![1.0, 2.0, -1.0, 0.5];
        let z1 = scalar.apply(&r).unwrap();
        let z2 = block.apply(&r).unwrap();
        for i in 0..4 {
            assert_relative_eq!(z1[i], z2[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_block_ilu0_complex_block_diagonal() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, Complex64::new(0.0, 1.0)).unwrap();
        coo.add_value(0, 1, Complex64::new(1.0, 0.0)).unwrap();
        coo.add_value(1, 0, Complex64::new(1.0, 0.0)).unwrap();
        coo.add_value(1, 1, Complex64::new(2.0, 0.0)).unwrap();
        let a = BlockCsrMatrix::from_coo(&coo, 2).unwrap();
        let precond = BlockIlu0Preconditioner::from_block_csr(&a, 1e-14).unwrap();

        let r = array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 1.0)];
        let z = precond.apply(&r).unwrap();
        let back = a.block_mat_vec(&z).unwrap();
        for i in 0..2 {
            assert_relative_eq!(back[i].re, r[i].re, epsilon = 1e-12);
            assert_relative_eq!(back[i].im, r[i].im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_block_ilu0_errors() {
        let mut coo = CooMatrix::new(4, 4).unwrap();
        coo.add_value(0, 0, 1.0).unwrap();
        coo.add_value(1, 1, 1.0).unwrap();
        coo.add_value(2, 0, 1.0).unwrap();
        let a = BlockCsrMatrix::from_coo(&coo, 2).unwrap();
        let err = BlockIlu0Preconditioner::from_block_csr(&a, 1e-14).unwrap_err();
        assert!(matches!(err, SparseError::MissingDiagonal { index: 1 }));

        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, 1.0).unwrap();
        coo.add_value(0, 1, 1.0).unwrap();
        coo.add_value(1, 0, 1.0).unwrap();
        coo.add_value(1, 1, 1.0).unwrap();
        let a = BlockCsrMatrix::from_coo(&coo, 2).unwrap();
        let err = BlockIlu0Preconditioner::from_block_csr(&a, 1e-12).unwrap_err();
        assert!(matches!(err, SparseError::SingularPivot { row: 1 }));

        let unbuilt = BlockCsrMatrix::<f64>::new(2, 2, 2).unwrap();
        assert!(
            BlockIlu0Preconditioner::from_block_csr(&unbuilt, 1e-14)
                .unwrap_err()
                .is_precondition_violation()
        );

        let a = BlockCsrMatrix::from_coo(&block_tridiagonal(2, 2), 2).unwrap();
        let ok = BlockIlu0Preconditioner::from_block_csr(&a, 1e-14).unwrap();
        assert!(ok.apply(&array![1.0, 2.0]).unwrap_err().is_invalid_argument());
    }
}
