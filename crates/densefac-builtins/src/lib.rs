//! Host value model for the densefac builtins.
//!
//! Values mirror the MATLAB array classes the factorization builtins can receive. Dense
//! numeric arrays are stored column-major with an explicit [`NumericDType`] so single
//! precision inputs stay single precision through the factorization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Num(f64),
    Bool(bool),
    String(String),
    // MATLAB char array (single-quoted): 2-D character array (rows x cols)
    CharArray(CharArray),
    Tensor(Tensor),
    ComplexTensor(ComplexTensor),
    IntArray(IntArray),
    LogicalArray(LogicalArray),
    Sparse(SparseMatrix),
}

/// Floating-point storage class of a dense numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericDType {
    #[default]
    F64,
    F32,
}

impl NumericDType {
    /// MATLAB class name for the dtype.
    pub fn class_name(self) -> &'static str {
        match self {
            NumericDType::F64 => "double",
            NumericDType::F32 => "single",
        }
    }
}

/// Integer storage class of an [`IntArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntClass {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl IntClass {
    pub fn class_name(self) -> &'static str {
        match self {
            IntClass::Int8 => "int8",
            IntClass::Int16 => "int16",
            IntClass::Int32 => "int32",
            IntClass::Int64 => "int64",
            IntClass::UInt8 => "uint8",
            IntClass::UInt16 => "uint16",
            IntClass::UInt32 => "uint32",
            IntClass::UInt64 => "uint64",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f64>,
    pub shape: Vec<usize>, // Column-major layout
    pub rows: usize,
    pub cols: usize,
    pub dtype: NumericDType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexTensor {
    pub data: Vec<(f64, f64)>,
    pub shape: Vec<usize>,
    pub rows: usize,
    pub cols: usize,
    pub dtype: NumericDType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntArray {
    pub data: Vec<i64>,
    pub shape: Vec<usize>,
    pub class: IntClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalArray {
    pub data: Vec<u8>,
    pub shape: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharArray {
    pub data: Vec<char>,
    pub rows: usize,
    pub cols: usize,
}

/// Compressed sparse column matrix. The builtins only need to recognise it.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pub rows: usize,
    pub cols: usize,
    pub col_ptr: Vec<usize>,
    pub row_idx: Vec<usize>,
    pub values: Vec<f64>,
}

fn rows_cols(shape: &[usize]) -> (usize, usize) {
    if shape.len() >= 2 {
        (shape[0], shape[1])
    } else if shape.len() == 1 {
        (1, shape[0])
    } else {
        (1, 1)
    }
}

fn check_len(kind: &str, len: usize, shape: &[usize]) -> Result<(), String> {
    let expected: usize = shape.iter().product();
    if len != expected {
        return Err(format!(
            "{kind} data length {len} doesn't match shape {shape:?} ({expected} elements)"
        ));
    }
    Ok(())
}

impl CharArray {
    pub fn new_row(s: &str) -> Self {
        CharArray {
            data: s.chars().collect(),
            rows: 1,
            cols: s.chars().count(),
        }
    }

    pub fn new(data: Vec<char>, rows: usize, cols: usize) -> Result<Self, String> {
        if rows * cols != data.len() {
            return Err(format!(
                "Char data length {} doesn't match dimensions {}x{}",
                data.len(),
                rows,
                cols
            ));
        }
        Ok(CharArray { data, rows, cols })
    }
}

impl Tensor {
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Result<Self, String> {
        Self::new_with_dtype(data, shape, NumericDType::F64)
    }

    pub fn new_with_dtype(
        data: Vec<f64>,
        shape: Vec<usize>,
        dtype: NumericDType,
    ) -> Result<Self, String> {
        check_len("Tensor", data.len(), &shape)?;
        let (rows, cols) = rows_cols(&shape);
        Ok(Tensor {
            data,
            shape,
            rows,
            cols,
            dtype,
        })
    }

    pub fn new_2d(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, String> {
        Self::new(data, vec![rows, cols])
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        let (rows, cols) = rows_cols(&shape);
        Tensor {
            data: vec![0.0; size],
            shape,
            rows,
            cols,
            dtype: NumericDType::F64,
        }
    }

    /// Build a 2-D tensor from row-major nested rows, converting to column-major storage.
    pub fn from_rows(rows: &[&[f64]]) -> Result<Self, String> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = vec![0.0; nrows * ncols];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(format!(
                    "row {i} has {} columns, expected {ncols}",
                    row.len()
                ));
            }
            for (j, &v) in row.iter().enumerate() {
                data[i + j * nrows] = v;
            }
        }
        Self::new_2d(data, nrows, ncols)
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    pub fn get2(&self, row: usize, col: usize) -> Result<f64, String> {
        let rows = self.rows();
        let cols = self.cols();
        if row >= rows || col >= cols {
            return Err(format!(
                "Index ({row}, {col}) out of bounds for {rows}x{cols} tensor"
            ));
        }
        Ok(self.data[row + col * rows])
    }
}

impl ComplexTensor {
    pub fn new(data: Vec<(f64, f64)>, shape: Vec<usize>) -> Result<Self, String> {
        Self::new_with_dtype(data, shape, NumericDType::F64)
    }

    pub fn new_with_dtype(
        data: Vec<(f64, f64)>,
        shape: Vec<usize>,
        dtype: NumericDType,
    ) -> Result<Self, String> {
        check_len("ComplexTensor", data.len(), &shape)?;
        let (rows, cols) = rows_cols(&shape);
        Ok(ComplexTensor {
            data,
            shape,
            rows,
            cols,
            dtype,
        })
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    pub fn get2(&self, row: usize, col: usize) -> Result<(f64, f64), String> {
        let rows = self.rows();
        let cols = self.cols();
        if row >= rows || col >= cols {
            return Err(format!(
                "Index ({row}, {col}) out of bounds for {rows}x{cols} complex tensor"
            ));
        }
        Ok(self.data[row + col * rows])
    }
}

impl IntArray {
    pub fn new(data: Vec<i64>, shape: Vec<usize>, class: IntClass) -> Result<Self, String> {
        check_len("IntArray", data.len(), &shape)?;
        Ok(IntArray { data, shape, class })
    }
}

impl LogicalArray {
    pub fn new(data: Vec<u8>, shape: Vec<usize>) -> Result<Self, String> {
        check_len("LogicalArray", data.len(), &shape)?;
        Ok(LogicalArray { data, shape })
    }
}

impl SparseMatrix {
    /// Sparse matrix with no stored entries.
    pub fn empty(rows: usize, cols: usize) -> Self {
        SparseMatrix {
            rows,
            cols,
            col_ptr: vec![0; cols + 1],
            row_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl Value {
    /// MATLAB class name of the value, used in diagnostics.
    pub fn class_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int32",
            Value::Num(_) => "double",
            Value::Bool(_) | Value::LogicalArray(_) => "logical",
            Value::String(_) => "string",
            Value::CharArray(_) => "char",
            Value::Tensor(t) => t.dtype.class_name(),
            Value::ComplexTensor(t) => t.dtype.class_name(),
            Value::IntArray(a) => a.class.class_name(),
            Value::Sparse(_) => "double",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
