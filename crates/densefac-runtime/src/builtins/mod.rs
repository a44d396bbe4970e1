//! MATLAB-facing `qr` and `lq` builtins and the registry they are collected in.

use densefac_builtins::Value;

use crate::dispatcher::FactorRuntime;
use crate::runtime_error::Result;

pub(crate) mod common;
pub mod lq;
pub mod qr;

/// Signature shared by registered builtins: runtime, input arguments, requested output count.
pub type BuiltinImpl = fn(&FactorRuntime, &[Value], usize) -> Result<Vec<Value>>;

/// A builtin registered with `inventory::submit!`.
#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub max_inputs: usize,
    pub max_outputs: usize,
    pub implementation: BuiltinImpl,
}

impl BuiltinFunction {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        category: &'static str,
        max_inputs: usize,
        max_outputs: usize,
        implementation: BuiltinImpl,
    ) -> Self {
        Self {
            name,
            description,
            category,
            max_inputs,
            max_outputs,
            implementation,
        }
    }
}

impl std::fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("max_inputs", &self.max_inputs)
            .field("max_outputs", &self.max_outputs)
            .finish()
    }
}

inventory::collect!(BuiltinFunction);

pub fn builtin_functions() -> Vec<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().collect()
}

pub fn find_builtin(name: &str) -> Option<&'static BuiltinFunction> {
    inventory::iter::<BuiltinFunction>().find(|b| b.name == name)
}
