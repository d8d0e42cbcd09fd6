//! Sort-and-scatter compression shared by the CSR family
//!
//! Triplets are ordered through a stable permutation sort, row pointers come from a
//! counting pass followed by a prefix sum, and entries are scattered with a per-row
//! write cursor. Duplicate (row, col) pairs are kept in distinct slots.

use crate::traits::ComplexField;

/// Compressed row arrays produced from a set of triplets
#[derive(Debug, Clone)]
pub(crate) struct CompressedRows<T> {
    pub row_ptrs: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<T>,
}

/// Stable permutation of `0..n` ordered by `key`
pub(crate) fn sorted_permutation<K, F>(n: usize, key: F) -> Vec<usize>
where
    K: Ord,
    F: Fn(usize) -> K,
{
    let mut perm: Vec<usize> = (0..n).collect();
    // slice::sort_by_key is stable, so ties keep insertion order
    perm.sort_by_key(|&k| key(k));
    perm
}

/// Row pointers from per-entry row indices (counting pass + prefix sum)
pub(crate) fn row_pointers(num_rows: usize, rows: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut row_ptrs = vec![0usize; num_rows + 1];
    for r in rows {
        row_ptrs[r + 1] += 1;
    }
    for i in 0..num_rows {
        row_ptrs[i + 1] += row_ptrs[i];
    }
    row_ptrs
}

/// Compress triplets into CSR arrays. Indices must already be validated.
pub(crate) fn compress_triplets<T: ComplexField>(
    num_rows: usize,
    rows: &[usize],
    cols: &[usize],
    values: &[T],
) -> CompressedRows<T> {
    let nnz = values.len();
    let perm = sorted_permutation(nnz, |k| (rows[k], cols[k]));
    let row_ptrs = row_pointers(num_rows, rows.iter().copied());

    let mut cursor: Vec<usize> = row_ptrs[..num_rows].to_vec();
    let mut col_indices = vec![0usize; nnz];
    let mut out_values = vec![T::zero(); nnz];

    for &k in &perm {
        let r = rows[k];
        let dst = cursor[r];
        cursor[r] += 1;
        col_indices[dst] = cols[k];
        out_values[dst] = values[k];
    }

    CompressedRows {
        row_ptrs,
        col_indices,
        values: out_values,
    }
}

/// Sum adjacent duplicate columns inside each row of sorted CSR arrays.
pub(crate) fn merge_sorted_duplicates<T: ComplexField>(
    row_ptrs: &[usize],
    col_indices: &[usize],
    values: &[T],
) -> CompressedRows<T> {
    let num_rows = row_ptrs.len() - 1;
    let mut out_ptrs = Vec::with_capacity(num_rows + 1);
    let mut out_cols = Vec::with_capacity(col_indices.len());
    let mut out_vals: Vec<T> = Vec::with_capacity(values.len());
    out_ptrs.push(0);

    for i in 0..num_rows {
        let row_start = out_cols.len();
        for idx in row_ptrs[i]..row_ptrs[i + 1] {
            let j = col_indices[idx];
            if out_cols.len() > row_start && out_cols.last() == Some(&j) {
                if let Some(last) = out_vals.last_mut() {
                    *last += values[idx];
                }
            } else {
                out_cols.push(j);
                out_vals.push(values[idx]);
            }
        }
        out_ptrs.push(out_cols.len());
    }

    CompressedRows {
        row_ptrs: out_ptrs,
        col_indices: out_cols,
        values: out_vals,
    }
}
