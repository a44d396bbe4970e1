//! LQ pipeline: `A = L·Q` with orthonormal rows in `Q`.

use tracing::debug_span;

use super::pack::ScratchBuffer;
use super::shape::{kernel_dim, LqShape};
use super::{enter, query_then_execute, DenseMatrix, FactorMode, Round, Stage};
use crate::element::FactorScalar;
use crate::kernel::{FactorKernel, KernelEntry, Routine};
use crate::runtime_error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LqRequest {
    pub mode: FactorMode,
    pub want_q: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LqFactors<T> {
    pub l: DenseMatrix<T>,
    pub q: Option<DenseMatrix<T>>,
}

pub fn lq_factorize<T, K>(
    kernel: &K,
    input: &DenseMatrix<T>,
    request: &LqRequest,
) -> Result<LqFactors<T>>
where
    T: FactorScalar,
    K: FactorKernel<T> + ?Sized,
{
    let (m, n) = input.shape();
    let span = debug_span!("lq", m, n, kind = %T::KIND.prefix(), mode = ?request.mode);
    let _enter = span.enter();
    enter(Stage::Init);

    let shape = LqShape::resolve(m, n, request.mode);
    let dims = shape.kernel_dims()?;
    enter(Stage::ShapeResolved);

    if shape.is_empty() {
        enter(Stage::ResultsExtracted);
        enter(Stage::Done);
        return Ok(LqFactors {
            l: DenseMatrix::zeros(m, n),
            q: request.want_q.then(|| DenseMatrix::identity(n)),
        });
    }

    let mut scratch = ScratchBuffer::pack(input, shape.lda, shape.scratch_cols);
    enter(Stage::Packed);

    let mut tau = vec![T::zero(); shape.min_mn];
    let entry = KernelEntry::for_scalar::<T>(Routine::Gelqf);
    query_then_execute::<T, _>(entry, Round::Factorize, |work, lwork| {
        kernel.gelqf(dims.m, dims.n, scratch.as_mut_slice(), dims.lda, &mut tau, work, lwork)
    })?;

    let l = scratch.lower(shape.l_rows, shape.l_cols);

    let q = if request.want_q {
        let entry = KernelEntry::for_scalar::<T>(Routine::Orglq);
        let q_rows = kernel_dim(shape.q_rows)?;
        query_then_execute::<T, _>(entry, Round::Expand, |work, lwork| {
            kernel.orglq(q_rows, dims.n, dims.k, scratch.as_mut_slice(), dims.lda, &tau, work, lwork)
        })?;
        Some(scratch.block(shape.q_rows, shape.n))
    } else {
        None
    };
    enter(Stage::ResultsExtracted);
    enter(Stage::Done);

    Ok(LqFactors { l, q })
}
