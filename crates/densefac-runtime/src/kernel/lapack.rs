//! LAPACK-backed kernel.
//!
//! Thin wrappers over the `lapack` crate. Buffers are handed through unchanged, so the adapter's
//! workspace queries and `info` handling apply to the native routines directly.

use lapack::{c32, c64};

use super::{FactorKernel, Kernel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapackKernel;

impl Kernel for LapackKernel {
    fn name(&self) -> &'static str {
        "lapack"
    }
}

macro_rules! real_kernel {
    ($t:ty, $geqrf:ident, $geqrfp:ident, $geqp3:ident, $orgqr:ident, $gelqf:ident, $orglq:ident) => {
        #[allow(clippy::too_many_arguments)]
        impl FactorKernel<$t> for LapackKernel {
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
                let mut info = 0;
                unsafe { lapack::$geqrf(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$geqrfp(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                _rwork: &mut [$t],
            ) -> i32 {
                let mut info = 0;
                unsafe { lapack::$geqp3(m, n, a, lda, jpvt, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$orgqr(m, n, k, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$gelqf(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$orglq(m, n, k, a, lda, tau, work, lwork, &mut info) };
                info
            }
        }
    };
}

macro_rules! complex_kernel {
    ($t:ty, $r:ty, $geqrf:ident, $geqrfp:ident, $geqp3:ident, $ungqr:ident, $gelqf:ident, $unglq:ident) => {
        #[allow(clippy::too_many_arguments)]
        impl FactorKernel<$t> for LapackKernel {
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
                let mut info = 0;
                unsafe { lapack::$geqrf(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$geqrfp(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                rwork: &mut [$r],
            ) -> i32 {
                let mut info = 0;
                unsafe {
                    lapack::$geqp3(m, n, a, lda, jpvt, tau, work, lwork, rwork, &mut info)
                };
                info
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
                let mut info = 0;
                unsafe { lapack::$ungqr(m, n, k, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$gelqf(m, n, a, lda, tau, work, lwork, &mut info) };
                info
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
                let mut info = 0;
                unsafe { lapack::$unglq(m, n, k, a, lda, tau, work, lwork, &mut info) };
                info
            }
        }
    };
}

real_kernel!(f32, sgeqrf, sgeqrfp, sgeqp3, sorgqr, sgelqf, sorglq);
real_kernel!(f64, dgeqrf, dgeqrfp, dgeqp3, dorgqr, dgelqf, dorglq);
complex_kernel!(c32, f32, cgeqrf, cgeqrfp, cgeqp3, cungqr, cgelqf, cunglq);
complex_kernel!(c64, f64, zgeqrf, zgeqrfp, zgeqp3, zungqr, zgelqf, zunglq);
