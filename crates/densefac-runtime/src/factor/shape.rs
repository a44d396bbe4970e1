//! Working-buffer and output dimensions for the QR and LQ pipelines.

use super::FactorMode;
use crate::runtime_error::{FactorError, Result};

/// Dimensions for a QR call on an `m x n` input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QrShape {
    pub m: usize,
    pub n: usize,
    pub min_mn: usize,
    pub lda: usize,
    /// Scratch columns. Full-mode tall inputs get `m` so the full `Q` can be expanded in place.
    pub scratch_cols: usize,
    pub q_cols: usize,
    pub r_rows: usize,
    pub r_cols: usize,
}

impl QrShape {
    pub fn resolve(m: usize, n: usize, mode: FactorMode) -> Self {
        let economy = mode.is_economy();
        let min_mn = m.min(n);
        let scratch_cols = if m > n && !economy { m } else { n };
        let q_cols = if economy { min_mn } else { m };
        let (r_rows, r_cols) = if economy && m > n { (n, n) } else { (m, n) };
        QrShape {
            m,
            n,
            min_mn,
            lda: m,
            scratch_cols,
            q_cols,
            r_rows,
            r_cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.m == 0 || self.n == 0
    }

    pub(crate) fn kernel_dims(&self) -> Result<KernelDims> {
        KernelDims::new(self.m, self.n, self.lda, self.scratch_cols, self.min_mn)
    }
}

/// Dimensions for an LQ call on an `m x n` input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LqShape {
    pub m: usize,
    pub n: usize,
    pub min_mn: usize,
    /// Leading dimension. Full-mode wide inputs get `n` rows so the full `Q` fits in place.
    pub lda: usize,
    pub scratch_cols: usize,
    pub q_rows: usize,
    pub l_rows: usize,
    pub l_cols: usize,
}

impl LqShape {
    pub fn resolve(m: usize, n: usize, mode: FactorMode) -> Self {
        let economy = mode.is_economy();
        let min_mn = m.min(n);
        let lda = if m < n && !economy { n } else { m };
        let q_rows = if economy { min_mn } else { n };
        let (l_rows, l_cols) = if economy && m < n { (m, m) } else { (m, n) };
        LqShape {
            m,
            n,
            min_mn,
            lda,
            scratch_cols: n,
            q_rows,
            l_rows,
            l_cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.m == 0 || self.n == 0
    }

    pub(crate) fn kernel_dims(&self) -> Result<KernelDims> {
        KernelDims::new(self.m, self.n, self.lda, self.scratch_cols, self.min_mn)
    }
}

/// Dimensions converted to the kernel's `i32` arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KernelDims {
    pub m: i32,
    pub n: i32,
    pub lda: i32,
    pub k: i32,
}

impl KernelDims {
    fn new(m: usize, n: usize, lda: usize, cols: usize, k: usize) -> Result<Self> {
        // The scratch buffer is lda x cols; its element count must be addressable too.
        lda.checked_mul(cols)
            .ok_or(FactorError::DimensionOverflow { dim: lda.max(cols) })?;
        kernel_dim(cols)?;
        Ok(KernelDims {
            m: kernel_dim(m)?,
            n: kernel_dim(n)?,
            lda: kernel_dim(lda.max(1))?,
            k: kernel_dim(k)?,
        })
    }
}

pub(crate) fn kernel_dim(dim: usize) -> Result<i32> {
    i32::try_from(dim).map_err(|_| FactorError::DimensionOverflow { dim })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_full_tall_expands_scratch_to_square() {
        let s = QrShape::resolve(5, 3, FactorMode::Full);
        assert_eq!((s.lda, s.scratch_cols), (5, 5));
        assert_eq!(s.q_cols, 5);
        assert_eq!((s.r_rows, s.r_cols), (5, 3));
    }

    #[test]
    fn qr_economy_tall_truncates() {
        let s = QrShape::resolve(5, 3, FactorMode::Economy);
        assert_eq!(s.scratch_cols, 3);
        assert_eq!(s.q_cols, 3);
        assert_eq!((s.r_rows, s.r_cols), (3, 3));
    }

    #[test]
    fn qr_wide_is_mode_independent_except_q() {
        let full = QrShape::resolve(2, 4, FactorMode::Full);
        let econ = QrShape::resolve(2, 4, FactorMode::Economy);
        assert_eq!(full.scratch_cols, 4);
        assert_eq!((full.r_rows, full.r_cols), (econ.r_rows, econ.r_cols));
        assert_eq!((full.q_cols, econ.q_cols), (2, 2));
    }

    #[test]
    fn lq_full_wide_widens_leading_dimension() {
        let s = LqShape::resolve(2, 4, FactorMode::Full);
        assert_eq!((s.lda, s.scratch_cols), (4, 4));
        assert_eq!(s.q_rows, 4);
        assert_eq!((s.l_rows, s.l_cols), (2, 4));
    }

    #[test]
    fn lq_economy_wide_truncates() {
        let s = LqShape::resolve(2, 4, FactorMode::Economy);
        assert_eq!(s.lda, 2);
        assert_eq!(s.q_rows, 2);
        assert_eq!((s.l_rows, s.l_cols), (2, 2));
    }

    #[test]
    fn lq_tall_keeps_input_shape() {
        let s = LqShape::resolve(4, 2, FactorMode::Economy);
        assert_eq!((s.lda, s.scratch_cols, s.q_rows), (4, 2, 2));
        assert_eq!((s.l_rows, s.l_cols), (4, 2));
    }

    #[test]
    fn oversized_dimension_is_rejected() {
        let big = i32::MAX as usize + 1;
        assert_eq!(
            kernel_dim(big),
            Err(FactorError::DimensionOverflow { dim: big })
        );
    }
}
