//! MATLAB-compatible `qr` builtin with economy, positive-diagonal and pivoted forms.

use densefac_builtins::Value;

use super::common::{self, HostMatrix};
use super::BuiltinFunction;
use crate::dispatch_element;
use crate::dispatcher::{self, FactorRuntime};
use crate::element::FactorScalar;
use crate::factor::{qr_factorize, FactorMode, PermutationForm, QrPivot, QrRequest};
use crate::kernel::{FactorKernel, Kernel};
use crate::runtime_error::{FactorError, Result};

const NAME: &str = "qr";

fn qr_builtin(runtime: &FactorRuntime, args: &[Value], nargout: usize) -> Result<Vec<Value>> {
    let (value, rest) = args
        .split_first()
        .ok_or_else(|| FactorError::argument_count(NAME, "not enough input arguments"))?;
    let eval = evaluate_with(runtime.kernel(), value.clone(), rest, nargout)?;
    Ok(eval.into_outputs(nargout))
}

inventory::submit! {
    BuiltinFunction::new(
        NAME,
        "QR factorization with optional column pivoting and economy-size outputs.",
        "math/linalg/factor",
        3,
        3,
        qr_builtin,
    )
}

/// Output envelope for the `qr` builtin.
#[derive(Debug, Clone, PartialEq)]
pub struct QrEval {
    q: Option<Value>,
    r: Value,
    permutation: Option<Value>,
    mode: FactorMode,
    pivot: QrPivot,
}

impl QrEval {
    /// Orthogonal/unitary factor, present when two or more outputs were requested.
    pub fn q(&self) -> Option<Value> {
        self.q.clone()
    }

    /// Upper-triangular (or trapezoidal) factor.
    pub fn r(&self) -> Value {
        self.r.clone()
    }

    /// Column permutation in the requested form, present for three outputs.
    pub fn permutation(&self) -> Option<Value> {
        self.permutation.clone()
    }

    pub fn mode(&self) -> FactorMode {
        self.mode
    }

    pub fn pivot(&self) -> QrPivot {
        self.pivot
    }

    /// Outputs in MATLAB order: `R`; `Q, R`; or `Q, R, P`.
    pub fn into_outputs(self, nargout: usize) -> Vec<Value> {
        if nargout <= 1 {
            return vec![self.r];
        }
        let mut outputs = Vec::with_capacity(nargout);
        outputs.extend(self.q);
        outputs.push(self.r);
        if nargout >= 3 {
            outputs.extend(self.permutation);
        }
        outputs
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct QrOptions {
    mode: FactorMode,
    form: Option<PermutationForm>,
    positive: bool,
}

impl QrOptions {
    fn request(&self, nargout: usize) -> Result<QrRequest> {
        let pivot = if nargout >= 3 {
            if self.positive {
                return Err(FactorError::option(
                    NAME,
                    "'pos' cannot be combined with column pivoting",
                ));
            }
            // Economy calls report the permutation as a vector unless asked otherwise.
            let default_form = if self.mode.is_economy() {
                PermutationForm::Vector
            } else {
                PermutationForm::Matrix
            };
            QrPivot::Pivoted(self.form.unwrap_or(default_form))
        } else if self.positive {
            QrPivot::Positive
        } else {
            QrPivot::None
        };
        Ok(QrRequest {
            mode: self.mode,
            pivot,
            want_q: nargout >= 2,
        })
    }
}

/// Evaluate `qr` on the process-wide default runtime.
pub fn evaluate(value: Value, args: &[Value], nargout: usize) -> Result<QrEval> {
    evaluate_with(dispatcher::default_runtime().kernel(), value, args, nargout)
}

/// Evaluate `qr` with an explicit kernel. `args` are the option arguments after the matrix.
pub fn evaluate_with<K>(kernel: &K, value: Value, args: &[Value], nargout: usize) -> Result<QrEval>
where
    K: Kernel + ?Sized,
{
    common::check_arity(NAME, args.len() + 1, 3, nargout, 3)?;
    let options = parse_options(args)?;
    let request = options.request(nargout)?;
    let host = HostMatrix::from_value(NAME, value)?;
    dispatch_element!(host.kind(), T => run::<T, K>(kernel, &host, &request))
}

fn run<T, K>(kernel: &K, host: &HostMatrix, request: &QrRequest) -> Result<QrEval>
where
    T: FactorScalar,
    K: FactorKernel<T> + ?Sized,
{
    let input = host.to_dense::<T>();
    let factors = qr_factorize(kernel, &input, request)?;
    let dtype = T::KIND.dtype();
    Ok(QrEval {
        q: factors.q.as_ref().map(|q| common::matrix_to_value(q)),
        r: common::matrix_to_value(&factors.r),
        permutation: factors
            .permutation
            .as_ref()
            .map(|p| common::real_matrix_to_value(p, dtype)),
        mode: request.mode,
        pivot: request.pivot,
    })
}

fn parse_options(args: &[Value]) -> Result<QrOptions> {
    let mut opts = QrOptions::default();
    for arg in args {
        if let Some(number) = common::numeric_option(arg) {
            // Non-zero numeric flags select the full form.
            if number == 0.0 {
                opts.mode = FactorMode::Economy;
            }
            continue;
        }
        if let Some(text) = common::option_text(arg) {
            match text.trim().to_ascii_lowercase().as_str() {
                "0" | "econ" | "economy" => opts.mode = FactorMode::Economy,
                "vector" => opts.form = Some(PermutationForm::Vector),
                "matrix" => opts.form = Some(PermutationForm::Matrix),
                "pos" => opts.positive = true,
                _ => return Err(FactorError::option(NAME, format!("unknown option '{text}'"))),
            }
            continue;
        }
        return Err(FactorError::option(
            NAME,
            "option must be numeric zero or a string ('econ', 'vector', 'matrix', 'pos')",
        ));
    }
    Ok(opts)
}
