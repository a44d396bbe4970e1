//! Dense QR and LQ factorization over a LAPACK-style kernel.
//!
//! [`factor`] holds the generic pipelines, [`kernel`] the kernel capability and its backends,
//! and [`builtins`] the MATLAB-facing `qr`/`lq` entry points dispatched through
//! [`call_builtin`].

// Link the platform BLAS/LAPACK when the LAPACK kernel is compiled in.
#[cfg(all(feature = "blas-lapack", target_os = "macos"))]
#[link(name = "Accelerate", kind = "framework")]
extern "C" {}

#[cfg(all(feature = "blas-lapack", not(target_os = "macos")))]
extern crate openblas_src;

pub mod builtins;
pub mod config;
pub mod dispatcher;
pub mod element;
pub mod factor;
pub mod kernel;
pub mod runtime_error;

pub use densefac_builtins::Value;
pub use dispatcher::{call_builtin, default_runtime, FactorRuntime};
pub use element::{Complex32, Complex64, ElementKind, FactorScalar};
pub use factor::{
    lq_factorize, qr_factorize, DenseMatrix, FactorMode, LqFactors, LqRequest, PermutationForm,
    QrFactors, QrPivot, QrRequest,
};
pub use kernel::{FactorKernel, Kernel, KernelBackend, KernelEntry, KernelPhase, ReferenceKernel};
pub use runtime_error::{FactorError, Result};
