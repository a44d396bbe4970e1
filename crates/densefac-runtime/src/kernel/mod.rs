//! Factorization kernel capability.
//!
//! A kernel follows the LAPACK calling contract: column-major storage with an explicit leading
//! dimension, Householder generators packed into the input buffer plus a `tau` vector, 1-based
//! pivot indices, `lwork = -1` workspace queries that report the required length in `work[0]`,
//! and an `info` status (0 on success, `-i` when argument `i` is illegal).

use std::fmt;

use crate::config::{BackendChoice, KernelConfig};
use crate::element::{Complex32, Complex64, ElementKind, FactorScalar};

#[cfg(feature = "blas-lapack")]
pub mod lapack;
pub mod reference;

#[cfg(feature = "blas-lapack")]
pub use self::lapack::LapackKernel;
pub use self::reference::ReferenceKernel;

/// The kernel routines the pipelines call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    Geqrf,
    Geqrfp,
    Geqp3,
    Orgqr,
    Gelqf,
    Orglq,
}

/// A routine specialised to one element kind, named the way LAPACK names it (`DGEQRF`,
/// `ZUNGQR`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelEntry {
    pub routine: Routine,
    pub kind: ElementKind,
}

impl KernelEntry {
    pub const fn new(routine: Routine, kind: ElementKind) -> Self {
        KernelEntry { routine, kind }
    }

    pub fn for_scalar<T: FactorScalar>(routine: Routine) -> Self {
        KernelEntry::new(routine, T::KIND)
    }
}

impl fmt::Display for KernelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let complex = self.kind.is_complex();
        let stem = match self.routine {
            Routine::Geqrf => "GEQRF",
            Routine::Geqrfp => "GEQRFP",
            Routine::Geqp3 => "GEQP3",
            Routine::Orgqr if complex => "UNGQR",
            Routine::Orgqr => "ORGQR",
            Routine::Gelqf => "GELQF",
            Routine::Orglq if complex => "UNGLQ",
            Routine::Orglq => "ORGLQ",
        };
        write!(f, "{}{}", self.kind.prefix(), stem)
    }
}

/// Which half of the two-call workspace protocol a kernel call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelPhase {
    Query,
    Execute,
}

impl fmt::Display for KernelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelPhase::Query => write!(f, "query"),
            KernelPhase::Execute => write!(f, "execute"),
        }
    }
}

/// LAPACK-style factorization routines for one element type.
///
/// Arguments follow the reference LAPACK argument order so that `info = -i` identifies the
/// offending argument. Real kernels ignore `rwork`.
#[allow(clippy::too_many_arguments)]
pub trait FactorKernel<T: FactorScalar> {
    fn geqrf(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32;

    /// QR with a real non-negative diagonal in R.
    fn geqrfp(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32;

    /// QR with column pivoting. Columns with `jpvt[j] != 0` on entry are moved to the front and
    /// kept there; on exit `jpvt[j] = k` means column `j` of `A·P` was column `k` (1-based) of A.
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
    ) -> i32;

    /// Expand the first `n` columns of `Q = H(1)...H(k)` from QR generators.
    fn orgqr(
        &self,
        m: i32,
        n: i32,
        k: i32,
        a: &mut [T],
        lda: i32,
        tau: &[T],
        work: &mut [T],
        lwork: i32,
    ) -> i32;

    fn gelqf(
        &self,
        m: i32,
        n: i32,
        a: &mut [T],
        lda: i32,
        tau: &mut [T],
        work: &mut [T],
        lwork: i32,
    ) -> i32;

    /// Expand the first `m` rows of `Q = H(k)ᴴ...H(1)ᴴ` from LQ generators.
    fn orglq(
        &self,
        m: i32,
        n: i32,
        k: i32,
        a: &mut [T],
        lda: i32,
        tau: &[T],
        work: &mut [T],
        lwork: i32,
    ) -> i32;
}

/// A kernel usable for every element kind the pipelines accept.
pub trait Kernel:
    FactorKernel<f32> + FactorKernel<f64> + FactorKernel<Complex32> + FactorKernel<Complex64> + Send + Sync
{
    fn name(&self) -> &'static str;
}

/// Kernel selected at runtime from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelBackend {
    Reference(ReferenceKernel),
    #[cfg(feature = "blas-lapack")]
    Lapack(LapackKernel),
}

impl Default for KernelBackend {
    fn default() -> Self {
        KernelBackend::from_choice(BackendChoice::Auto)
    }
}

impl KernelBackend {
    pub fn from_config(config: &KernelConfig) -> Self {
        Self::from_choice(config.backend)
    }

    pub fn from_choice(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Reference => KernelBackend::Reference(ReferenceKernel),
            #[cfg(feature = "blas-lapack")]
            BackendChoice::Auto | BackendChoice::Lapack => KernelBackend::Lapack(LapackKernel),
            #[cfg(not(feature = "blas-lapack"))]
            BackendChoice::Auto => KernelBackend::Reference(ReferenceKernel),
            #[cfg(not(feature = "blas-lapack"))]
            BackendChoice::Lapack => {
                log::warn!(
                    "LAPACK kernel requested but densefac was built without the `blas-lapack` feature; using the reference kernel"
                );
                KernelBackend::Reference(ReferenceKernel)
            }
        }
    }
}

macro_rules! delegate {
    ($self:ident, $k:ident => $call:expr) => {
        match $self {
            KernelBackend::Reference($k) => $call,
            #[cfg(feature = "blas-lapack")]
            KernelBackend::Lapack($k) => $call,
        }
    };
}

macro_rules! impl_backend_kernel {
    ($($t:ty),*) => {$(
        #[allow(clippy::too_many_arguments)]
        impl FactorKernel<$t> for KernelBackend {
            fn geqrf(
                &self,
                m: i32,
                n: i32,
                a: &mut [$t],
                lda: i32,
                tau: &mut [$t],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                delegate!(self, k => k.geqrf(m, n, a, lda, tau, work, lwork))
            }

            fn geqrfp(
                &self,
                m: i32,
                n: i32,
                a: &mut [$t],
                lda: i32,
                tau: &mut [$t],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                delegate!(self, k => k.geqrfp(m, n, a, lda, tau, work, lwork))
            }

            fn geqp3(
                &self,
                m: i32,
                n: i32,
                a: &mut [$t],
                lda: i32,
                jpvt: &mut [i32],
                tau: &mut [$t],
                work: &mut [$t],
                lwork: i32,
                rwork: &mut [<$t as FactorScalar>::Real],
            ) -> i32 {
                delegate!(self, k => k.geqp3(m, n, a, lda, jpvt, tau, work, lwork, rwork))
            }

            fn orgqr(
                &self,
                m: i32,
                n: i32,
                k: i32,
                a: &mut [$t],
                lda: i32,
                tau: &[$t],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                delegate!(self, kern => kern.orgqr(m, n, k, a, lda, tau, work, lwork))
            }

            fn gelqf(
                &self,
                m: i32,
                n: i32,
                a: &mut [$t],
                lda: i32,
                tau: &mut [$t],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                delegate!(self, k => k.gelqf(m, n, a, lda, tau, work, lwork))
            }

            fn orglq(
                &self,
                m: i32,
                n: i32,
                k: i32,
                a: &mut [$t],
                lda: i32,
                tau: &[$t],
                work: &mut [$t],
                lwork: i32,
            ) -> i32 {
                delegate!(self, kern => kern.orglq(m, n, k, a, lda, tau, work, lwork))
            }
        }
    )*};
}

impl_backend_kernel!(f32, f64, Complex32, Complex64);

impl Kernel for KernelBackend {
    fn name(&self) -> &'static str {
        delegate!(self, k => k.name())
    }
}
