//! QR and LQ factorization pipelines.
//!
//! Each call runs four stages for one element type: shape resolution, layout packing into a
//! column-major scratch buffer, the kernel's query-then-execute factorization, and result
//! extraction (triangular factor, permutation, and optionally the expanded orthogonal factor).
//! Stage transitions are emitted as `trace` events inside a `qr`/`lq` span.

use num_traits::{One, Zero};
use tracing::trace;

use crate::element::FactorScalar;
use crate::kernel::{KernelEntry, KernelPhase};
use crate::runtime_error::{FactorError, Result};

pub mod lq;
pub mod pack;
pub mod qr;
pub mod shape;

pub use lq::{lq_factorize, LqFactors, LqRequest};
pub use qr::{qr_factorize, PermutationForm, QrFactors, QrPivot, QrRequest};

/// Size mode for the orthogonal factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FactorMode {
    #[default]
    Full,
    Economy,
}

impl FactorMode {
    pub fn is_economy(self) -> bool {
        matches!(self, FactorMode::Economy)
    }
}

/// Immutable column-major matrix handed to and returned from the pipelines.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> DenseMatrix<T> {
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, String> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| format!("matrix size {rows}x{cols} overflows"))?;
        if data.len() != expected {
            return Err(format!(
                "data length {} doesn't match dimensions {rows}x{cols}",
                data.len()
            ));
        }
        Ok(DenseMatrix { rows, cols, data })
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for col in 0..cols {
            for row in 0..rows {
                data.push(f(row, col));
            }
        }
        DenseMatrix { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row + col * self.rows]
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> DenseMatrix<U> {
        DenseMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().copied().map(f).collect(),
        }
    }
}

impl<T: Copy + Zero> DenseMatrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        DenseMatrix {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row + col * self.rows] = value;
    }
}

impl<T: Copy + Zero + One> DenseMatrix<T> {
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size);
        for i in 0..size {
            matrix.set(i, i, T::one());
        }
        matrix
    }
}

/// Per-call pipeline stage. `Failed` is reported when a kernel call aborts the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Init,
    ShapeResolved,
    Packed,
    FactorizeQueried,
    FactorizeExecuted,
    ExpandQueried,
    ExpandExecuted,
    ResultsExtracted,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::ShapeResolved => "shape_resolved",
            Stage::Packed => "packed",
            Stage::FactorizeQueried => "factorize_queried",
            Stage::FactorizeExecuted => "factorize_executed",
            Stage::ExpandQueried => "expand_queried",
            Stage::ExpandExecuted => "expand_executed",
            Stage::ResultsExtracted => "results_extracted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

pub(crate) fn enter(stage: Stage) {
    trace!(stage = stage.as_str(), "stage");
}

/// Which pair of stages a query/execute round belongs to.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Round {
    Factorize,
    Expand,
}

impl Round {
    fn stages(self) -> (Stage, Stage) {
        match self {
            Round::Factorize => (Stage::FactorizeQueried, Stage::FactorizeExecuted),
            Round::Expand => (Stage::ExpandQueried, Stage::ExpandExecuted),
        }
    }
}

/// Drive one kernel entry through the two-call workspace protocol.
///
/// `call(work, lwork)` invokes the entry. The first call passes a one-element buffer with
/// `lwork = -1`; the reported length sizes the workspace for the second call.
pub(crate) fn query_then_execute<T, F>(entry: KernelEntry, round: Round, mut call: F) -> Result<()>
where
    T: FactorScalar,
    F: FnMut(&mut [T], i32) -> i32,
{
    let (queried, executed) = round.stages();

    let mut query = [T::zero()];
    let info = call(&mut query, -1);
    trace!(entry = %entry, lwork = -1_i64, info, "kernel call");
    check_info(entry, KernelPhase::Query, info)?;
    enter(queried);

    let len = query[0].to_len().unwrap_or(1).max(1);
    let lwork = i32::try_from(len).map_err(|_| FactorError::DimensionOverflow { dim: len })?;
    let mut work = vec![T::zero(); len];
    let info = call(&mut work, lwork);
    trace!(entry = %entry, lwork, info, "kernel call");
    check_info(entry, KernelPhase::Execute, info)?;
    enter(executed);
    Ok(())
}

fn check_info(entry: KernelEntry, phase: KernelPhase, info: i32) -> Result<()> {
    if info == 0 {
        return Ok(());
    }
    enter(Stage::Failed);
    tracing::debug!(entry = %entry, phase = %phase, info, "kernel reported failure");
    Err(FactorError::KernelFailure { entry, phase, info })
}
