//! Argument validation and host value conversion shared by the `qr` and `lq` builtins.

use densefac_builtins::{ComplexTensor, NumericDType, Tensor, Value};
use num_traits::Float;

use crate::element::{ElementKind, FactorScalar};
use crate::factor::DenseMatrix;
use crate::runtime_error::{FactorError, Result};

/// Column-major host matrix whose element kind was detected once from the input value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HostMatrix {
    rows: usize,
    cols: usize,
    kind: ElementKind,
    data: HostData,
}

#[derive(Debug, Clone, PartialEq)]
enum HostData {
    Real(Vec<f64>),
    Complex(Vec<(f64, f64)>),
}

impl HostMatrix {
    pub(crate) fn from_value(builtin: &'static str, value: Value) -> Result<Self> {
        match value {
            Value::Tensor(tensor) => {
                let (rows, cols) = matrix_dims(builtin, &tensor.shape)?;
                check_storage(builtin, rows, cols, tensor.data.len())?;
                Ok(HostMatrix {
                    rows,
                    cols,
                    kind: ElementKind::from_dtype(tensor.dtype, false),
                    data: HostData::Real(tensor.data),
                })
            }
            Value::ComplexTensor(tensor) => {
                let (rows, cols) = matrix_dims(builtin, &tensor.shape)?;
                check_storage(builtin, rows, cols, tensor.data.len())?;
                Ok(HostMatrix {
                    rows,
                    cols,
                    kind: ElementKind::from_dtype(tensor.dtype, true),
                    data: HostData::Complex(tensor.data),
                })
            }
            Value::Num(n) => Ok(HostMatrix {
                rows: 1,
                cols: 1,
                kind: ElementKind::F64,
                data: HostData::Real(vec![n]),
            }),
            Value::Sparse(_) => Err(FactorError::unsupported(
                builtin,
                "sparse matrices are not supported; convert with full() first",
            )),
            other => Err(FactorError::unsupported(
                builtin,
                format!(
                    "expected a double or single matrix, got {}",
                    other.class_name()
                ),
            )),
        }
    }

    pub(crate) fn kind(&self) -> ElementKind {
        self.kind
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    /// Typed copy for the pipeline. `T` must match [`HostMatrix::kind`].
    pub(crate) fn to_dense<T: FactorScalar>(&self) -> DenseMatrix<T> {
        let rows = self.rows;
        match &self.data {
            HostData::Real(data) => {
                DenseMatrix::from_fn(rows, self.cols, |i, j| T::from_f64_parts(data[i + j * rows], 0.0))
            }
            HostData::Complex(data) => DenseMatrix::from_fn(rows, self.cols, |i, j| {
                let (re, im) = data[i + j * rows];
                T::from_f64_parts(re, im)
            }),
        }
    }
}

/// Rows and columns of a value that must be a matrix. Trailing singleton dimensions are allowed.
fn matrix_dims(builtin: &'static str, shape: &[usize]) -> Result<(usize, usize)> {
    if shape.iter().skip(2).any(|&d| d != 1) {
        return Err(FactorError::unsupported(
            builtin,
            format!("input must be 2-D, got {} dimensions", shape.len()),
        ));
    }
    let rows = shape.first().copied().unwrap_or(1);
    let cols = shape.get(1).copied().unwrap_or(1);
    Ok((rows, cols))
}

fn check_storage(builtin: &'static str, rows: usize, cols: usize, len: usize) -> Result<()> {
    if rows.checked_mul(cols) != Some(len) {
        return Err(FactorError::unsupported(
            builtin,
            format!("tensor holds {len} elements but its shape is {rows}x{cols}"),
        ));
    }
    Ok(())
}

/// Factor output as a host value: complex iff `T` is complex, same precision as `T`.
pub(crate) fn matrix_to_value<T: FactorScalar>(matrix: &DenseMatrix<T>) -> Value {
    let (rows, cols) = matrix.shape();
    let dtype = T::KIND.dtype();
    if T::KIND.is_complex() {
        Value::ComplexTensor(ComplexTensor {
            data: matrix.data().iter().map(|z| z.to_f64_parts()).collect(),
            shape: vec![rows, cols],
            rows,
            cols,
            dtype,
        })
    } else {
        Value::Tensor(Tensor {
            data: matrix.data().iter().map(|x| x.to_f64_parts().0).collect(),
            shape: vec![rows, cols],
            rows,
            cols,
            dtype,
        })
    }
}

/// Real output (permutations) with the given precision.
pub(crate) fn real_matrix_to_value<R: Float>(matrix: &DenseMatrix<R>, dtype: NumericDType) -> Value {
    let (rows, cols) = matrix.shape();
    Value::Tensor(Tensor {
        data: matrix
            .data()
            .iter()
            .map(|x| x.to_f64().unwrap_or(f64::NAN))
            .collect(),
        shape: vec![rows, cols],
        rows,
        cols,
        dtype,
    })
}

pub(crate) fn check_arity(
    builtin: &'static str,
    nargin: usize,
    max_in: usize,
    nargout: usize,
    max_out: usize,
) -> Result<()> {
    if nargin == 0 {
        return Err(FactorError::argument_count(builtin, "not enough input arguments"));
    }
    if nargin > max_in {
        return Err(FactorError::argument_count(builtin, "too many input arguments"));
    }
    if nargout > max_out {
        return Err(FactorError::argument_count(builtin, "too many output arguments"));
    }
    Ok(())
}

/// Text of a string or single-row char array option.
pub(crate) fn option_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::CharArray(ca) if ca.rows <= 1 => Some(ca.data.iter().collect()),
        _ => None,
    }
}

pub(crate) fn numeric_option(value: &Value) -> Option<f64> {
    match value {
        Value::Num(n) => Some(*n),
        Value::Int(i) => Some(f64::from(*i)),
        Value::Tensor(t) if t.data.len() == 1 => Some(t.data[0]),
        _ => None,
    }
}
