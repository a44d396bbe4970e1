//! Builtin dispatch and the runtime that owns the selected kernel backend.

use densefac_builtins::Value;
use once_cell::sync::Lazy;

use crate::builtins::find_builtin;
use crate::config::{ConfigLoader, DensefacConfig};
use crate::kernel::{Kernel, KernelBackend};
use crate::runtime_error::{FactorError, Result};

/// Kernel backend plus the entry point the builtins are called through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactorRuntime {
    backend: KernelBackend,
}

impl FactorRuntime {
    pub fn new(backend: KernelBackend) -> Self {
        FactorRuntime { backend }
    }

    pub fn from_config(config: &DensefacConfig) -> Self {
        Self::new(KernelBackend::from_config(&config.kernel))
    }

    pub fn kernel(&self) -> &KernelBackend {
        &self.backend
    }

    /// Call a registered builtin. `nargout` is the number of requested outputs; 0 is treated
    /// as 1 so a bare call still yields its first output.
    pub fn call_builtin(&self, name: &str, args: &[Value], nargout: usize) -> Result<Vec<Value>> {
        let builtin = find_builtin(name).ok_or_else(|| FactorError::UnknownBuiltin {
            name: name.to_string(),
        })?;
        let nargout = nargout.max(1);
        tracing::debug!(
            builtin = builtin.name,
            nargin = args.len(),
            nargout,
            kernel = self.backend.name(),
            "dispatch"
        );
        (builtin.implementation)(self, args, nargout)
    }
}

static DEFAULT_RUNTIME: Lazy<FactorRuntime> = Lazy::new(|| {
    let config = ConfigLoader::load().unwrap_or_else(|err| {
        log::warn!("failed to load densefac configuration, using defaults: {err:#}");
        DensefacConfig::default()
    });
    FactorRuntime::from_config(&config)
});

/// Process-wide runtime, created on first use from the loaded configuration.
pub fn default_runtime() -> &'static FactorRuntime {
    &DEFAULT_RUNTIME
}

/// Call a builtin on the default runtime.
pub fn call_builtin(name: &str, args: &[Value], nargout: usize) -> Result<Vec<Value>> {
    default_runtime().call_builtin(name, args, nargout)
}
