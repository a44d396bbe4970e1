#![allow(dead_code)]

use std::sync::Mutex;

use densefac_runtime::kernel::{FactorKernel, Kernel, KernelEntry, KernelPhase, ReferenceKernel, Routine};
use densefac_runtime::{DenseMatrix, FactorScalar};
use num_traits::{Float, ToPrimitive, Zero};

/// Deterministic test matrix with entries in [-1, 1) (and imaginary parts for complex kinds).
pub fn sample<T: FactorScalar>(rows: usize, cols: usize, seed: u64) -> DenseMatrix<T> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    DenseMatrix::from_fn(rows, cols, |_, _| {
        let re = next();
        let im = next();
        T::from_f64_parts(re, im)
    })
}

pub fn matmul<T: FactorScalar>(a: &DenseMatrix<T>, b: &DenseMatrix<T>) -> DenseMatrix<T> {
    assert_eq!(a.cols(), b.rows(), "inner dimensions");
    DenseMatrix::from_fn(a.rows(), b.cols(), |i, j| {
        let mut sum = T::zero();
        for k in 0..a.cols() {
            sum += a.get(i, k) * b.get(k, j);
        }
        sum
    })
}

pub fn adjoint<T: FactorScalar>(a: &DenseMatrix<T>) -> DenseMatrix<T> {
    DenseMatrix::from_fn(a.cols(), a.rows(), |i, j| a.get(j, i).conj())
}

/// Columns of `a` selected by 1-based indices.
pub fn select_columns<T: FactorScalar>(a: &DenseMatrix<T>, indices: &[usize]) -> DenseMatrix<T> {
    DenseMatrix::from_fn(a.rows(), indices.len(), |i, j| a.get(i, indices[j] - 1))
}

/// Real permutation matrix lifted into `T`.
pub fn lift<T: FactorScalar>(p: &DenseMatrix<T::Real>) -> DenseMatrix<T> {
    DenseMatrix::from_fn(p.rows(), p.cols(), |i, j| T::from_real(p.get(i, j)))
}

pub fn max_abs_diff<T: FactorScalar>(a: &DenseMatrix<T>, b: &DenseMatrix<T>) -> f64 {
    assert_eq!(a.shape(), b.shape(), "shape mismatch");
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| (x - y).abs().to_f64().unwrap_or(f64::INFINITY))
        .fold(0.0, f64::max)
}

pub fn frobenius<T: FactorScalar>(a: &DenseMatrix<T>) -> f64 {
    a.data()
        .iter()
        .map(|x| x.abs().to_f64().unwrap_or(f64::INFINITY).powi(2))
        .sum::<f64>()
        .sqrt()
}

pub fn all_finite<T: FactorScalar>(a: &DenseMatrix<T>) -> bool {
    a.data().iter().all(|x| x.re().is_finite() && x.im().is_finite())
}

/// Like [`assert_close`], but relative to the largest entry of `expected`, for matrices whose
/// magnitudes sit near the ends of the exponent range.
pub fn assert_relative_close<T: FactorScalar>(actual: &DenseMatrix<T>, expected: &DenseMatrix<T>) {
    let eps = T::epsilon().to_f64().unwrap_or(f64::EPSILON);
    let n = expected.rows().max(expected.cols()).max(1) as f64;
    let largest = expected
        .data()
        .iter()
        .map(|x| x.abs().to_f64().unwrap_or(f64::INFINITY))
        .fold(0.0, f64::max);
    let diff = max_abs_diff(actual, expected);
    assert!(
        diff <= 50.0 * n * eps * largest,
        "max |diff| = {diff:e} against largest entry {largest:e}"
    );
}

/// Backward-error tolerance `c * max(m, n) * eps * max(‖A‖, 1)`.
pub fn tolerance<T: FactorScalar>(a: &DenseMatrix<T>) -> f64 {
    let eps = T::epsilon().to_f64().unwrap_or(f64::EPSILON);
    50.0 * a.rows().max(a.cols()).max(1) as f64 * eps * frobenius(a).max(1.0)
}

pub fn assert_close<T: FactorScalar>(actual: &DenseMatrix<T>, expected: &DenseMatrix<T>, tol: f64) {
    let diff = max_abs_diff(actual, expected);
    assert!(diff <= tol, "max |diff| = {diff:e} exceeds {tol:e}");
}

pub fn is_upper<T: FactorScalar>(a: &DenseMatrix<T>) -> bool {
    (0..a.cols()).all(|j| (j + 1..a.rows()).all(|i| a.get(i, j) == T::zero()))
}

pub fn is_lower<T: FactorScalar>(a: &DenseMatrix<T>) -> bool {
    (0..a.cols()).all(|j| (0..j.min(a.rows())).all(|i| a.get(i, j) == T::zero()))
}

pub fn is_zero<T: FactorScalar>(a: &DenseMatrix<T>) -> bool {
    a.data().iter().all(|x| x.is_zero())
}

/// Kernel call as seen by [`RecordingKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub entry: KernelEntry,
    pub phase: KernelPhase,
    pub lwork: i32,
}

/// Reference kernel wrapper that records every call and can fail one entry/phase.
#[derive(Debug, Default)]
pub struct RecordingKernel {
    calls: Mutex<Vec<Call>>,
    fail: Option<(Routine, KernelPhase, i32)>,
    /// Written over `jpvt` after a successful pivoting execute call.
    pivots: Option<Vec<i32>>,
}

impl RecordingKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(routine: Routine, phase: KernelPhase, info: i32) -> Self {
        RecordingKernel {
            fail: Some((routine, phase, info)),
            ..Self::default()
        }
    }

    pub fn reporting_pivots(pivots: Vec<i32>) -> Self {
        RecordingKernel {
            pivots: Some(pivots),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record<T: FactorScalar>(&self, routine: Routine, lwork: i32) -> Option<i32> {
        let phase = if lwork == -1 {
            KernelPhase::Query
        } else {
            KernelPhase::Execute
        };
        self.calls.lock().unwrap().push(Call {
            entry: KernelEntry::for_scalar::<T>(routine),
            phase,
            lwork,
        });
        match self.fail {
            Some((r, p, info)) if r == routine && p == phase => Some(info),
            _ => None,
        }
    }
}

impl<T: FactorScalar> FactorKernel<T> for RecordingKernel {
    fn geqrf(&self, m: i32, n: i32, a: &mut [T], lda: i32, tau: &mut [T], work: &mut [T], lwork: i32) -> i32 {
        self.record::<T>(Routine::Geqrf, lwork)
            .unwrap_or_else(|| ReferenceKernel.geqrf(m, n, a, lda, tau, work, lwork))
    }

    fn geqrfp(&self, m: i32, n: i32, a: &mut [T], lda: i32, tau: &mut [T], work: &mut [T], lwork: i32) -> i32 {
        self.record::<T>(Routine::Geqrfp, lwork)
            .unwrap_or_else(|| ReferenceKernel.geqrfp(m, n, a, lda, tau, work, lwork))
    }

    fn geqp3(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        jpvt: &mut [i32],
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
        rwork: &mut [T::Real],
    ) -> i32 {
        let info = self
            .record::<T>(Routine::Geqp3, lwork)
            .unwrap_or_else(|| ReferenceKernel.geqp3(m, n, a, lda, jpvt, tau, work, lwork, rwork));
        if let Some(pivots) = self.pivots.as_ref().filter(|_| info == 0 && lwork != -1) {
            jpvt.copy_from_slice(pivots);
        }
        info
    }

    fn orgqr(&self, m: i32, n: i32, k: i32, a: &mut [T], lda: i32, tau: &[T], work: &mut [T], lwork: i32) -> i32 {
        self.record::<T>(Routine::Orgqr, lwork)
            .unwrap_or_else(|| ReferenceKernel.orgqr(m, n, k, a, lda, tau, work, lwork))
    }

    fn gelqf(&self, m: i32, n: i32, a: &mut [T], lda: i32, tau: &mut [T], work: &mut [T], lwork: i32) -> i32 {
        self.record::<T>(Routine::Gelqf, lwork)
            .unwrap_or_else(|| ReferenceKernel.gelqf(m, n, a, lda, tau, work, lwork))
    }

    fn orglq(&self, m: i32, n: i32, k: i32, a: &mut [T], lda: i32, tau: &[T], work: &mut [T], lwork: i32) -> i32 {
        self.record::<T>(Routine::Orglq, lwork)
            .unwrap_or_else(|| ReferenceKernel.orglq(m, n, k, a, lda, tau, work, lwork))
    }
}

impl Kernel for RecordingKernel {
    fn name(&self) -> &'static str {
        "recording"
    }
}
