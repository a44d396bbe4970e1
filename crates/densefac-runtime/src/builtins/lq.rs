//! `lq` builtin: `[L, Q] = lq(A)` and the economy form `lq(A, 0)`.

use densefac_builtins::Value;

use super::common::{self, HostMatrix};
use super::BuiltinFunction;
use crate::dispatch_element;
use crate::dispatcher::{self, FactorRuntime};
use crate::element::FactorScalar;
use crate::factor::{lq_factorize, FactorMode, LqRequest};
use crate::kernel::{FactorKernel, Kernel};
use crate::runtime_error::{FactorError, Result};

const NAME: &str = "lq";

fn lq_builtin(runtime: &FactorRuntime, args: &[Value], nargout: usize) -> Result<Vec<Value>> {
    let (value, rest) = args
        .split_first()
        .ok_or_else(|| FactorError::argument_count(NAME, "not enough input arguments"))?;
    let eval = evaluate_with(runtime.kernel(), value.clone(), rest, nargout)?;
    Ok(eval.into_outputs(nargout))
}

inventory::submit! {
    BuiltinFunction::new(
        NAME,
        "LQ factorization with optional economy-size outputs.",
        "math/linalg/factor",
        2,
        2,
        lq_builtin,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct LqEval {
    l: Value,
    q: Option<Value>,
    mode: FactorMode,
}

impl LqEval {
    /// Lower-triangular (or trapezoidal) factor.
    pub fn l(&self) -> Value {
        self.l.clone()
    }

    /// Orthonormal-row factor, present when two outputs were requested.
    pub fn q(&self) -> Option<Value> {
        self.q.clone()
    }

    pub fn mode(&self) -> FactorMode {
        self.mode
    }

    pub fn into_outputs(self, nargout: usize) -> Vec<Value> {
        let mut outputs = vec![self.l];
        if nargout >= 2 {
            outputs.extend(self.q);
        }
        outputs
    }
}

pub fn evaluate(value: Value, args: &[Value], nargout: usize) -> Result<LqEval> {
    evaluate_with(dispatcher::default_runtime().kernel(), value, args, nargout)
}

pub fn evaluate_with<K>(kernel: &K, value: Value, args: &[Value], nargout: usize) -> Result<LqEval>
where
    K: Kernel + ?Sized,
{
    common::check_arity(NAME, args.len() + 1, 2, nargout, 2)?;
    let request = LqRequest {
        mode: parse_mode(args)?,
        want_q: nargout >= 2,
    };
    let host = HostMatrix::from_value(NAME, value)?;
    dispatch_element!(host.kind(), T => run::<T, K>(kernel, &host, &request))
}

fn run<T, K>(kernel: &K, host: &HostMatrix, request: &LqRequest) -> Result<LqEval>
where
    T: FactorScalar,
    K: FactorKernel<T> + ?Sized,
{
    let input = host.to_dense::<T>();
    let factors = lq_factorize(kernel, &input, request)?;
    Ok(LqEval {
        l: common::matrix_to_value(&factors.l),
        q: factors.q.as_ref().map(|q| common::matrix_to_value(q)),
        mode: request.mode,
    })
}

fn parse_mode(args: &[Value]) -> Result<FactorMode> {
    let mut mode = FactorMode::Full;
    for arg in args {
        if let Some(number) = common::numeric_option(arg) {
            if number == 0.0 {
                mode = FactorMode::Economy;
            }
            continue;
        }
        if let Some(text) = common::option_text(arg) {
            match text.trim().to_ascii_lowercase().as_str() {
                "0" | "econ" | "economy" => mode = FactorMode::Economy,
                _ => return Err(FactorError::option(NAME, format!("unknown option '{text}'"))),
            }
            continue;
        }
        return Err(FactorError::option(
            NAME,
            "option must be numeric zero or 'econ'",
        ));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ReferenceKernel;
    use densefac_builtins::{ComplexTensor, NumericDType, Tensor};

    fn wide() -> Value {
        Value::Tensor(Tensor::from_rows(&[&[1.0, 3.0, 5.0], &[2.0, 4.0, 6.0]]).unwrap())
    }

    #[test]
    fn full_lq_shapes() {
        let eval = evaluate_with(&ReferenceKernel, wide(), &[], 2).unwrap();
        let outputs = eval.into_outputs(2);
        assert_eq!(outputs.len(), 2);
        match (&outputs[0], &outputs[1]) {
            (Value::Tensor(l), Value::Tensor(q)) => {
                assert_eq!(l.shape, vec![2, 3]);
                assert_eq!(q.shape, vec![3, 3]);
                assert_eq!(l.get2(0, 1).unwrap(), 0.0);
                assert!((l.get2(0, 0).unwrap().abs() - 35f64.sqrt()).abs() < 1e-12);
            }
            other => panic!("unexpected outputs {other:?}"),
        }
    }

    #[test]
    fn economy_lq_truncates() {
        let eval = evaluate_with(&ReferenceKernel, wide(), &[Value::from("econ")], 2).unwrap();
        assert_eq!(eval.mode(), FactorMode::Economy);
        match (eval.l(), eval.q()) {
            (Value::Tensor(l), Some(Value::Tensor(q))) => {
                assert_eq!(l.shape, vec![2, 2]);
                assert_eq!(q.shape, vec![2, 3]);
            }
            other => panic!("unexpected outputs {other:?}"),
        }
    }

    #[test]
    fn single_output_skips_q() {
        let eval = evaluate_with(&ReferenceKernel, wide(), &[], 1).unwrap();
        assert!(eval.q().is_none());
        assert_eq!(eval.into_outputs(1).len(), 1);
    }

    #[test]
    fn complex_single_input_stays_complex_single() {
        let z = ComplexTensor::new_with_dtype(
            vec![(1.0, 1.0), (0.0, 2.0)],
            vec![1, 2],
            NumericDType::F32,
        )
        .unwrap();
        let eval = evaluate_with(&ReferenceKernel, Value::ComplexTensor(z), &[], 2).unwrap();
        match eval.q() {
            Some(Value::ComplexTensor(q)) => {
                assert_eq!(q.dtype, NumericDType::F32);
                assert_eq!(q.shape, vec![2, 2]);
            }
            other => panic!("expected complex Q, got {other:?}"),
        }
    }

    #[test]
    fn rejects_pivot_options_and_extra_outputs() {
        let err = evaluate_with(&ReferenceKernel, wide(), &[Value::from("vector")], 2).unwrap_err();
        assert_eq!(err.identifier(), "densefac:InvalidOption");
        let err = evaluate_with(&ReferenceKernel, wide(), &[], 3).unwrap_err();
        assert_eq!(err.identifier(), "densefac:InvalidArgumentCount");
        let err =
            evaluate_with(&ReferenceKernel, wide(), &[Value::Num(0.0), Value::Num(0.0)], 2).unwrap_err();
        assert_eq!(err.identifier(), "densefac:InvalidArgumentCount");
    }
}
