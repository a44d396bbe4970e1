//! QR pipeline: `A = Q·R`, `A·P = Q·R` with column pivoting.

use num_traits::Zero;
use tracing::debug_span;

use super::pack::{self, ScratchBuffer};
use super::shape::QrShape;
use super::{enter, query_then_execute, DenseMatrix, FactorMode, Round, Stage};
use crate::element::FactorScalar;
use crate::kernel::{FactorKernel, KernelEntry, Routine};
use crate::runtime_error::{FactorError, Result};

/// How a column permutation is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PermutationForm {
    /// `n x 1` vector of 1-based indices `e` with `A(:, e) = Q·R`.
    Vector,
    /// `n x n` matrix `P` with `A·P = Q·R`.
    #[default]
    Matrix,
}

/// QR variant. Column pivoting and the positive-diagonal variant are mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QrPivot {
    #[default]
    None,
    /// `R` has a real, non-negative diagonal.
    Positive,
    Pivoted(PermutationForm),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QrRequest {
    pub mode: FactorMode,
    pub pivot: QrPivot,
    pub want_q: bool,
}

impl QrRequest {
    fn entry_routine(&self) -> Routine {
        match self.pivot {
            QrPivot::None => Routine::Geqrf,
            QrPivot::Positive => Routine::Geqrfp,
            QrPivot::Pivoted(_) => Routine::Geqp3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QrFactors<T: FactorScalar> {
    pub q: Option<DenseMatrix<T>>,
    pub r: DenseMatrix<T>,
    /// Present for pivoted requests, in the requested form.
    pub permutation: Option<DenseMatrix<T::Real>>,
}

pub fn qr_factorize<T, K>(
    kernel: &K,
    input: &DenseMatrix<T>,
    request: &QrRequest,
) -> Result<QrFactors<T>>
where
    T: FactorScalar,
    K: FactorKernel<T> + ?Sized,
{
    let (m, n) = input.shape();
    let span = debug_span!(
        "qr",
        m,
        n,
        kind = %T::KIND.prefix(),
        mode = ?request.mode,
        pivot = ?request.pivot
    );
    let _enter = span.enter();
    enter(Stage::Init);

    let shape = QrShape::resolve(m, n, request.mode);
    let dims = shape.kernel_dims()?;
    enter(Stage::ShapeResolved);

    if shape.is_empty() {
        let factors = empty_factors(&shape, request);
        enter(Stage::ResultsExtracted);
        enter(Stage::Done);
        return Ok(factors);
    }

    let mut scratch = ScratchBuffer::pack(input, shape.lda, shape.scratch_cols);
    enter(Stage::Packed);

    let mut tau = vec![T::zero(); shape.min_mn];
    let entry = KernelEntry::for_scalar::<T>(request.entry_routine());
    let pivots = match request.pivot {
        QrPivot::None => {
            query_then_execute::<T, _>(entry, Round::Factorize, |work, lwork| {
                kernel.geqrf(dims.m, dims.n, scratch.as_mut_slice(), dims.lda, &mut tau, work, lwork)
            })?;
            None
        }
        QrPivot::Positive => {
            query_then_execute::<T, _>(entry, Round::Factorize, |work, lwork| {
                kernel.geqrfp(dims.m, dims.n, scratch.as_mut_slice(), dims.lda, &mut tau, work, lwork)
            })?;
            None
        }
        QrPivot::Pivoted(form) => {
            // All columns free.
            let mut jpvt = vec![0i32; n];
            let rwork_len = if T::KIND.is_complex() { 2 * n } else { 0 };
            let mut rwork = vec![T::Real::zero(); rwork_len];
            query_then_execute::<T, _>(entry, Round::Factorize, |work, lwork| {
                kernel.geqp3(
                    dims.m,
                    dims.n,
                    scratch.as_mut_slice(),
                    dims.lda,
                    &mut jpvt,
                    &mut tau,
                    work,
                    lwork,
                    &mut rwork,
                )
            })?;
            if !pack::is_permutation(&jpvt) {
                enter(Stage::Failed);
                tracing::debug!(entry = %entry, ?jpvt, "kernel returned invalid pivots");
                return Err(FactorError::InvalidPermutation { entry });
            }
            Some((jpvt, form))
        }
    };

    let r = scratch.upper(shape.r_rows, shape.r_cols, shape.min_mn);
    let permutation = pivots.map(|(jpvt, form)| permutation_in_form::<T>(&jpvt, form));

    let q = if request.want_q {
        let entry = KernelEntry::for_scalar::<T>(Routine::Orgqr);
        let q_cols = super::shape::kernel_dim(shape.q_cols)?;
        query_then_execute::<T, _>(entry, Round::Expand, |work, lwork| {
            kernel.orgqr(dims.m, q_cols, dims.k, scratch.as_mut_slice(), dims.lda, &tau, work, lwork)
        })?;
        Some(scratch.block(shape.m, shape.q_cols))
    } else {
        None
    };
    enter(Stage::ResultsExtracted);
    enter(Stage::Done);

    Ok(QrFactors { q, r, permutation })
}

fn permutation_in_form<T: FactorScalar>(jpvt: &[i32], form: PermutationForm) -> DenseMatrix<T::Real> {
    match form {
        PermutationForm::Vector => pack::permutation_vector(jpvt),
        PermutationForm::Matrix => pack::permutation_matrix(jpvt),
    }
}

/// Zero-size input: empty `m x n` R, identity `Q` of order `m`, identity permutation of order
/// `n`. No kernel call.
fn empty_factors<T: FactorScalar>(shape: &QrShape, request: &QrRequest) -> QrFactors<T> {
    let permutation = match request.pivot {
        QrPivot::Pivoted(form) => Some(permutation_in_form::<T>(&pack::identity_pivots(shape.n), form)),
        _ => None,
    };
    QrFactors {
        q: request.want_q.then(|| DenseMatrix::identity(shape.m)),
        r: DenseMatrix::zeros(shape.m, shape.n),
        permutation,
    }
}
