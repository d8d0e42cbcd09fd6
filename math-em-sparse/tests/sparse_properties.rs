//! Integration tests for the sparse formats
//!
//! Cross-format properties: conversions preserve the operator, symmetric
//! half storage agrees with full storage, scaling is linear.

use approx::assert_relative_eq;
use math_em_sparse::{
    AnySparseMatrix, BlockCsrMatrix, CooMatrix, CsrMatrix, ElementType, LinearOperator,
    MatrixAttribute, SparseFormat, SparseMatrixBase, SymCsrMatrix,
};
use ndarray::{Array1, array};
use num_complex::Complex64;

/// Deterministic pseudo-random sequence in [-1, 1)
struct Lcg(u64);

impl Lcg {
    fn uniform(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }

    fn index(&mut self, n: usize) -> usize {
        (((self.uniform() + 1.0) * 0.5) * n as f64) as usize % n
    }
}

fn random_coo(n: usize, m: usize, nnz: usize, seed: u64) -> CooMatrix<f64> {
    let mut rng = Lcg(seed);
    let mut coo = CooMatrix::new(n, m).unwrap();
    for _ in 0..nnz {
        let (r, c) = (rng.index(n), rng.index(m));
        coo.add_value(r, c, rng.uniform()).unwrap();
    }
    coo
}

fn random_symmetric(n: usize, nnz: usize, seed: u64) -> CooMatrix<f64> {
    let mut rng = Lcg(seed);
    let mut coo = CooMatrix::new(n, n).unwrap();
    for i in 0..n {
        coo.add_value(i, i, 4.0 + rng.uniform()).unwrap();
    }
    for _ in 0..nnz {
        let (r, c) = (rng.index(n), rng.index(n));
        let v = rng.uniform();
        coo.add_value(r, c, v).unwrap();
        if r != c {
            coo.add_value(c, r, v).unwrap();
        }
    }
    coo
}

fn random_vector(n: usize, seed: u64) -> Array1<f64> {
    let mut rng = Lcg(seed);
    Array1::from_iter((0..n).map(|_| rng.uniform()))
}

#[test]
fn test_double_transpose_preserves_mat_vec() {
    for seed in 1..6 {
        let csr = CsrMatrix::from_coo(&random_coo(17, 11, 60, seed)).unwrap();
        let tt = csr.transpose().unwrap().transpose().unwrap();
        assert_eq!(tt.rows(), 17);
        assert_eq!(tt.cols(), 11);

        let x = random_vector(11, seed + 100);
        let y0 = csr.mat_vec(&x).unwrap();
        let y1 = tt.mat_vec(&x).unwrap();
        for i in 0..17 {
            assert_relative_eq!(y0[i], y1[i], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_coo_round_trip_preserves_mat_vec() {
    let csr = CsrMatrix::from_coo(&random_coo(20, 20, 90, 7)).unwrap();
    let again = CsrMatrix::from_coo(&csr.to_coo().unwrap()).unwrap();
    let x = random_vector(20, 8);
    let y0 = csr.mat_vec(&x).unwrap();
    let y1 = again.mat_vec(&x).unwrap();
    for i in 0..20 {
        assert_relative_eq!(y0[i], y1[i], epsilon = 1e-12);
    }
}

#[test]
fn test_symmetric_storage_matches_full() {
    for seed in 1..6 {
        let coo = random_symmetric(25, 70, seed);
        let full = CsrMatrix::from_coo(&coo).unwrap();
        let half = SymCsrMatrix::from_csr(&full).unwrap();
        assert!(half.nnz() < full.nnz());

        for k in 0..3 {
            let x = random_vector(25, seed * 10 + k);
            let y_full = full.mat_vec(&x).unwrap();
            let y_half = half.mat_vec(&x).unwrap();
            for i in 0..25 {
                assert_relative_eq!(y_full[i], y_half[i], epsilon = 1e-10);
            }
        }
    }
}

#[test]
fn test_sym_csr_concrete_scenario() {
    let mut lower = CooMatrix::new(3, 3).unwrap();
    for &(r, c, v) in &[
        (0, 0, 4.0),
        (1, 0, 1.0),
        (1, 1, 3.0),
        (2, 1, 1.0),
        (2, 2, 2.0),
    ] {
        lower.add_value(r, c, v).unwrap();
    }
    let sym = SymCsrMatrix::from_coo(&lower).unwrap();
    let y = sym.mat_vec(&array![1.0, 2.0, 3.0]).unwrap();

    // [[4,1,0],[1,3,1],[0,1,2]] * [1,2,3]
    assert_relative_eq!(y[0], 6.0);
    assert_relative_eq!(y[1], 10.0);
    assert_relative_eq!(y[2], 8.0);

    let full = sym.to_csr().unwrap();
    assert_eq!(full.mat_vec(&array![1.0, 2.0, 3.0]).unwrap(), y);
}

#[test]
fn test_sym_csr_rejects_upper_entries() {
    let mut coo = CooMatrix::new(3, 3).unwrap();
    coo.add_value(0, 0, 1.0).unwrap();
    coo.add_value(0, 2, 1.0).unwrap();
    let err = SymCsrMatrix::from_coo(&coo).unwrap_err();
    assert!(err.is_structural_violation());
}

#[test]
fn test_scale_linearity() {
    let csr = CsrMatrix::from_coo(&random_coo(15, 15, 50, 3)).unwrap();
    let x = random_vector(15, 4);
    let y0 = csr.mat_vec(&x).unwrap();

    for alpha in [0.0, -1.0, 0.5, 3.25] {
        let mut scaled = csr.clone();
        scaled.scale(alpha).unwrap();
        let y = scaled.mat_vec(&x).unwrap();
        for i in 0..15 {
            assert_relative_eq!(y[i], alpha * y0[i], epsilon = 1e-12);
        }
    }

    let full = CsrMatrix::from_coo(&random_symmetric(10, 20, 5)).unwrap();
    let mut sym = SymCsrMatrix::from_csr(&full).unwrap();
    let xs = random_vector(10, 6);
    let ys0 = sym.mat_vec(&xs).unwrap();
    sym.scale(-2.0).unwrap();
    let ys = sym.mat_vec(&xs).unwrap();
    for i in 0..10 {
        assert_relative_eq!(ys[i], -2.0 * ys0[i], epsilon = 1e-12);
    }
}

#[test]
fn test_block_formats_agree_with_csr() {
    for bd in 1..=3 {
        let n = 6 * bd;
        let coo = random_coo(n, n, 8 * n, 11 + bd as u64);
        let csr = CsrMatrix::from_coo(&coo).unwrap();
        let from_coo = BlockCsrMatrix::from_coo(&coo, bd).unwrap();
        let from_csr = BlockCsrMatrix::from_csr(&csr, bd).unwrap();
        assert_eq!(from_coo.rows(), n);
        assert_eq!(from_coo.block_rows(), 6);
        assert_eq!(from_coo.nnz(), from_coo.block_nnz() * bd * bd);

        let x = random_vector(n, 40);
        let y = csr.mat_vec(&x).unwrap();
        let y1 = from_coo.block_mat_vec(&x).unwrap();
        let y2 = from_csr.block_mat_vec(&x).unwrap();
        let y3 = from_coo.to_csr().unwrap().mat_vec(&x).unwrap();
        for i in 0..n {
            assert_relative_eq!(y[i], y1[i], epsilon = 1e-12);
            assert_relative_eq!(y[i], y2[i], epsilon = 1e-12);
            assert_relative_eq!(y[i], y3[i], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_block_index_out_of_range() {
    let mut coo = CooMatrix::<f64>::new(4, 4).unwrap();
    let err = coo.add_value(4, 0, 1.0).unwrap_err();
    assert!(err.is_out_of_range());
    assert!(BlockCsrMatrix::from_coo(&coo, 3).unwrap_err().is_invalid_argument());
    assert!(BlockCsrMatrix::<f64>::new(2, 2, 4).is_err());
}

#[test]
fn test_complex_symmetric_storage() {
    let mut coo = CooMatrix::new(3, 3).unwrap();
    let entries = [
        (0, 0, Complex64::new(2.0, 1.0)),
        (1, 0, Complex64::new(0.5, -0.5)),
        (0, 1, Complex64::new(0.5, -0.5)),
        (1, 1, Complex64::new(3.0, 0.0)),
        (2, 1, Complex64::new(0.0, 1.0)),
        (1, 2, Complex64::new(0.0, 1.0)),
        (2, 2, Complex64::new(1.0, -2.0)),
    ];
    for &(r, c, v) in &entries {
        coo.add_value(r, c, v).unwrap();
    }
    let full = CsrMatrix::from_coo(&coo).unwrap();
    let half = SymCsrMatrix::from_csr(&full).unwrap();

    let x = array![
        Complex64::new(1.0, 0.0),
        Complex64::new(-1.0, 2.0),
        Complex64::new(0.5, 0.5)
    ];
    let y_full = full.mat_vec(&x).unwrap();
    let y_half = half.mat_vec(&x).unwrap();
    for i in 0..3 {
        assert_relative_eq!(y_full[i].re, y_half[i].re, epsilon = 1e-12);
        assert_relative_eq!(y_full[i].im, y_half[i].im, epsilon = 1e-12);
    }
}

#[test]
fn test_runtime_format_dispatch() {
    let coo = random_symmetric(12, 30, 9);
    let reference = CsrMatrix::from_coo(&coo).unwrap();
    let x = random_vector(12, 10);
    let y_ref = reference.mat_vec(&x).unwrap();

    let cases = [
        (MatrixAttribute::electrostatic(), SparseFormat::SymCsr),
        (
            MatrixAttribute::magnetostatic(ElementType::Vector3D),
            SparseFormat::BlockCsr,
        ),
        (
            MatrixAttribute::vector_element(ElementType::Vector2D),
            SparseFormat::BlockCsr,
        ),
    ];
    for (attr, format) in cases {
        let m = AnySparseMatrix::from_coo(&coo, &attr).unwrap();
        assert_eq!(m.format(), format);
        assert_eq!(LinearOperator::num_rows(&m), 12);
        let y = LinearOperator::mat_vec(&m, &x).unwrap();
        for i in 0..12 {
            assert_relative_eq!(y[i], y_ref[i], epsilon = 1e-10);
        }
    }
}
