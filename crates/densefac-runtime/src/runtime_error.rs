use thiserror::Error;

use crate::kernel::{KernelEntry, KernelPhase};

pub type Result<T, E = FactorError> = std::result::Result<T, E>;

/// Errors surfaced by the factorization pipelines and the `qr`/`lq` builtins.
///
/// Every variant is terminal: the call that produced it released its buffers and returned no
/// outputs.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum FactorError {
    #[error("{builtin}: {message}")]
    #[diagnostic(code(densefac::invalid_argument_count))]
    InvalidArgumentCount {
        builtin: &'static str,
        message: String,
    },

    #[error("{builtin}: {message}")]
    #[diagnostic(
        code(densefac::unsupported_element_type),
        help("pass a full double or single matrix, real or complex")
    )]
    UnsupportedElementType {
        builtin: &'static str,
        message: String,
    },

    #[error("{builtin}: {message}")]
    #[diagnostic(code(densefac::invalid_option))]
    InvalidOption {
        builtin: &'static str,
        message: String,
    },

    #[error("undefined builtin '{name}'")]
    #[diagnostic(code(densefac::unknown_builtin))]
    UnknownBuiltin { name: String },

    /// A matrix dimension does not fit the kernel's 32-bit integer arguments.
    #[error("matrix dimension {dim} exceeds the kernel's integer range")]
    #[diagnostic(code(densefac::dimension_overflow))]
    DimensionOverflow { dim: usize },

    /// The kernel reported a non-zero status.
    #[error("{entry} not successful ({phase} call returned info = {info})")]
    #[diagnostic(code(densefac::kernel_failure))]
    KernelFailure {
        entry: KernelEntry,
        phase: KernelPhase,
        info: i32,
    },

    /// The pivoting entry reported success but its indices are not a permutation of `1..=n`.
    #[error("{entry} returned an invalid column permutation")]
    #[diagnostic(code(densefac::invalid_permutation))]
    InvalidPermutation { entry: KernelEntry },
}

impl FactorError {
    /// Stable MATLAB-style message identifier.
    pub fn identifier(&self) -> &'static str {
        match self {
            FactorError::InvalidArgumentCount { .. } => "densefac:InvalidArgumentCount",
            FactorError::UnsupportedElementType { .. } => "densefac:UnsupportedElementType",
            FactorError::InvalidOption { .. } => "densefac:InvalidOption",
            FactorError::UnknownBuiltin { .. } => "densefac:UnknownBuiltin",
            FactorError::DimensionOverflow { .. } => "densefac:DimensionOverflow",
            FactorError::KernelFailure { .. } => "densefac:KernelFailure",
            FactorError::InvalidPermutation { .. } => "densefac:InvalidPermutation",
        }
    }

    /// Builtin the error was raised from, when it came through a builtin.
    pub fn builtin(&self) -> Option<&'static str> {
        match self {
            FactorError::InvalidArgumentCount { builtin, .. }
            | FactorError::UnsupportedElementType { builtin, .. }
            | FactorError::InvalidOption { builtin, .. } => Some(builtin),
            FactorError::UnknownBuiltin { .. }
            | FactorError::DimensionOverflow { .. }
            | FactorError::KernelFailure { .. }
            | FactorError::InvalidPermutation { .. } => None,
        }
    }

    pub fn format_diagnostic(&self) -> String {
        let mut lines = vec![
            format!("error: {self}"),
            format!("id: {}", self.identifier()),
        ];
        if let Some(builtin) = self.builtin() {
            lines.push(format!("builtin: {builtin}"));
        }
        lines.join("\n")
    }

    pub(crate) fn argument_count(builtin: &'static str, message: impl Into<String>) -> Self {
        FactorError::InvalidArgumentCount {
            builtin,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(builtin: &'static str, message: impl Into<String>) -> Self {
        FactorError::UnsupportedElementType {
            builtin,
            message: message.into(),
        }
    }

    pub(crate) fn option(builtin: &'static str, message: impl Into<String>) -> Self {
        FactorError::InvalidOption {
            builtin,
            message: message.into(),
        }
    }
}
