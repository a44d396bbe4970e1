//! Layout packing into the kernel scratch buffer and copy-out of typed results.

use num_traits::{Float, NumCast, One, Zero};

use super::DenseMatrix;
use crate::element::FactorScalar;

/// Column-major `lda x cols` buffer the kernel factorizes in place. Owned by one pipeline call.
#[derive(Debug)]
pub struct ScratchBuffer<T> {
    data: Vec<T>,
    lda: usize,
    cols: usize,
}

impl<T: FactorScalar> ScratchBuffer<T> {
    /// Copy `input` so that element `(i, j)` lands at offset `j * lda + i`. Rows past the input
    /// and columns past the input stay zero.
    pub fn pack(input: &DenseMatrix<T>, lda: usize, cols: usize) -> Self {
        let mut data = vec![T::zero(); lda * cols];
        let rows = input.rows().min(lda);
        for col in 0..input.cols().min(cols) {
            let src = &input.data()[col * input.rows()..col * input.rows() + rows];
            data[col * lda..col * lda + rows].copy_from_slice(src);
        }
        ScratchBuffer { data, lda, cols }
    }

    pub fn lda(&self) -> usize {
        self.lda
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row + col * self.lda]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Upper-trapezoidal factor: `R(i, j) = S(i, j)` for `i <= min(j, min_mn - 1)`.
    pub fn upper(&self, rows: usize, cols: usize, min_mn: usize) -> DenseMatrix<T> {
        DenseMatrix::from_fn(rows, cols, |i, j| {
            if min_mn > 0 && i <= j.min(min_mn - 1) {
                self.get(i, j)
            } else {
                T::zero()
            }
        })
    }

    /// Lower-trapezoidal factor: `L(i, j) = S(i, j)` for `i >= j`.
    pub fn lower(&self, rows: usize, cols: usize) -> DenseMatrix<T> {
        DenseMatrix::from_fn(rows, cols, |i, j| if i >= j { self.get(i, j) } else { T::zero() })
    }

    /// Leading `rows x cols` block, used for the expanded orthogonal factor.
    pub fn block(&self, rows: usize, cols: usize) -> DenseMatrix<T> {
        DenseMatrix::from_fn(rows, cols, |i, j| self.get(i, j))
    }
}

/// Permutation as an `n x 1` vector of 1-based column indices.
pub fn permutation_vector<R: Float>(jpvt: &[i32]) -> DenseMatrix<R> {
    DenseMatrix::from_fn(jpvt.len(), 1, |i, _| {
        <R as NumCast>::from(jpvt[i]).unwrap_or_else(R::nan)
    })
}

/// Permutation as an `n x n` matrix with `P(jpvt[i] - 1, i) = 1`, so `A·P = Q·R`.
pub fn permutation_matrix<R: Copy + Zero + One>(jpvt: &[i32]) -> DenseMatrix<R> {
    let n = jpvt.len();
    let mut matrix = DenseMatrix::zeros(n, n);
    for (col, &index) in jpvt.iter().enumerate() {
        if index >= 1 && (index as usize) <= n {
            matrix.set(index as usize - 1, col, R::one());
        }
    }
    matrix
}

/// Whether `jpvt` holds each of `1..=n` exactly once.
pub fn is_permutation(jpvt: &[i32]) -> bool {
    let n = jpvt.len();
    let mut seen = vec![false; n];
    for &index in jpvt {
        let Some(slot) = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .filter(|&i| i < n)
        else {
            return false;
        };
        if std::mem::replace(&mut seen[slot], true) {
            return false;
        }
    }
    true
}

/// Identity permutation indices `1..=n`.
pub fn identity_pivots(n: usize) -> Vec<i32> {
    (1..=n).map(|i| i32::try_from(i).unwrap_or(i32::MAX)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseMatrix<f64> {
        // [[1, 2, 3], [4, 5, 6]]
        DenseMatrix::from_column_major(2, 3, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap()
    }

    #[test]
    fn pack_places_elements_at_leading_dimension_offsets() {
        let scratch = ScratchBuffer::pack(&sample(), 4, 4);
        assert_eq!(scratch.lda(), 4);
        assert_eq!(scratch.get(1, 2), 6.0);
        assert_eq!(scratch.get(3, 2), 0.0);
        assert_eq!(scratch.get(0, 3), 0.0);
    }

    #[test]
    fn upper_keeps_trapezoid() {
        let scratch = ScratchBuffer::pack(&sample(), 2, 3);
        let r = scratch.upper(2, 3, 2);
        assert_eq!(r.data(), &[1.0, 0.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn lower_keeps_trapezoid() {
        let scratch = ScratchBuffer::pack(&sample(), 2, 3);
        let l = scratch.lower(2, 3);
        assert_eq!(l.data(), &[1.0, 4.0, 0.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn permutation_forms_agree() {
        let jpvt = [3, 1, 2];
        let v: DenseMatrix<f64> = permutation_vector(&jpvt);
        assert_eq!(v.shape(), (3, 1));
        assert_eq!(v.data(), &[3.0, 1.0, 2.0]);
        let p: DenseMatrix<f32> = permutation_matrix(&jpvt);
        assert_eq!(p.get(2, 0), 1.0);
        assert_eq!(p.get(0, 1), 1.0);
        assert_eq!(p.get(1, 2), 1.0);
        assert_eq!(p.data().iter().filter(|&&x| x == 1.0).count(), 3);
    }

    #[test]
    fn permutation_check_rejects_repeats_and_out_of_range() {
        assert!(is_permutation(&[3, 1, 2]));
        assert!(is_permutation(&[]));
        assert!(!is_permutation(&[1, 1, 3]));
        assert!(!is_permutation(&[0, 1, 2]));
        assert!(!is_permutation(&[1, 2, 4]));
        assert!(!is_permutation(&[-1, 2, 3]));
    }
}
