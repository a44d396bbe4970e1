//! Element scalars accepted by the factorization pipelines.
//!
//! A pipeline runs for exactly one [`ElementKind`]: real or complex, narrow (`f32`) or wide
//! (`f64`). [`FactorScalar`] is the arithmetic the adapters and the reference kernel need on top
//! of `num_traits`, and [`dispatch_element!`](crate::dispatch_element) turns a runtime kind into
//! a concrete type once per call.

use std::fmt::Debug;
use std::ops::Neg;

use densefac_builtins::NumericDType;
pub use num_complex::{Complex32, Complex64};
use num_traits::{Float, NumAssign, NumCast, One, ToPrimitive, Zero};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Real,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 32-bit components.
    Narrow,
    /// 64-bit components.
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKind {
    pub domain: Domain,
    pub width: Width,
}

impl ElementKind {
    pub const F32: ElementKind = ElementKind::new(Domain::Real, Width::Narrow);
    pub const F64: ElementKind = ElementKind::new(Domain::Real, Width::Wide);
    pub const C32: ElementKind = ElementKind::new(Domain::Complex, Width::Narrow);
    pub const C64: ElementKind = ElementKind::new(Domain::Complex, Width::Wide);

    pub const fn new(domain: Domain, width: Width) -> Self {
        ElementKind { domain, width }
    }

    pub fn from_dtype(dtype: NumericDType, complex: bool) -> Self {
        let width = match dtype {
            NumericDType::F32 => Width::Narrow,
            NumericDType::F64 => Width::Wide,
        };
        let domain = if complex { Domain::Complex } else { Domain::Real };
        ElementKind { domain, width }
    }

    pub fn dtype(self) -> NumericDType {
        match self.width {
            Width::Narrow => NumericDType::F32,
            Width::Wide => NumericDType::F64,
        }
    }

    pub fn is_complex(self) -> bool {
        self.domain == Domain::Complex
    }

    /// LAPACK routine prefix: `S`, `D`, `C` or `Z`.
    pub fn prefix(self) -> char {
        match (self.domain, self.width) {
            (Domain::Real, Width::Narrow) => 'S',
            (Domain::Real, Width::Wide) => 'D',
            (Domain::Complex, Width::Narrow) => 'C',
            (Domain::Complex, Width::Wide) => 'Z',
        }
    }
}

pub trait FactorScalar:
    Copy + Debug + PartialEq + Send + Sync + NumAssign + Neg<Output = Self> + 'static
{
    type Real: Float + NumAssign + Debug + Send + Sync + 'static;

    const KIND: ElementKind;

    fn from_parts(re: Self::Real, im: Self::Real) -> Self;
    fn re(self) -> Self::Real;
    fn im(self) -> Self::Real;
    fn conj(self) -> Self;

    fn from_real(re: Self::Real) -> Self {
        Self::from_parts(re, Self::Real::zero())
    }

    fn abs(self) -> Self::Real {
        self.re().hypot(self.im())
    }

    fn scale(self, factor: Self::Real) -> Self {
        Self::from_parts(self.re() * factor, self.im() * factor)
    }

    /// `1 / self` without forming `|self|²` (Smith's algorithm).
    fn inv(self) -> Self {
        let (a, b) = (self.re(), self.im());
        let one = Self::Real::one();
        if b == Self::Real::zero() {
            Self::from_parts(one / a, b)
        } else if a.abs() >= b.abs() {
            let r = b / a;
            let d = a + b * r;
            Self::from_parts(one / d, -r / d)
        } else {
            let r = a / b;
            let d = a * r + b;
            Self::from_parts(r / d, -one / d)
        }
    }

    /// Machine epsilon of the component type.
    fn epsilon() -> Self::Real {
        Self::Real::epsilon()
    }

    /// Encode a workspace length the way a query call reports it in `work[0]`.
    fn from_len(len: usize) -> Self {
        Self::from_real(<Self::Real as NumCast>::from(len).unwrap_or_else(Self::Real::max_value))
    }

    /// Decode the workspace length reported by a query call.
    fn to_len(self) -> Option<usize> {
        let re = self.re();
        if !re.is_finite() || re < Self::Real::zero() {
            return None;
        }
        re.ceil().to_usize()
    }

    fn from_f64_parts(re: f64, im: f64) -> Self {
        let re = <Self::Real as NumCast>::from(re).unwrap_or_else(Self::Real::nan);
        let im = <Self::Real as NumCast>::from(im).unwrap_or_else(Self::Real::nan);
        Self::from_parts(re, im)
    }

    fn to_f64_parts(self) -> (f64, f64) {
        (
            self.re().to_f64().unwrap_or(f64::NAN),
            self.im().to_f64().unwrap_or(f64::NAN),
        )
    }
}

macro_rules! impl_real_scalar {
    ($t:ty, $kind:expr) => {
        impl FactorScalar for $t {
            type Real = $t;
            const KIND: ElementKind = $kind;

            fn from_parts(re: $t, _im: $t) -> Self {
                re
            }
            fn re(self) -> $t {
                self
            }
            fn im(self) -> $t {
                0.0
            }
            fn conj(self) -> Self {
                self
            }
            fn abs(self) -> $t {
                <$t>::abs(self)
            }
            fn inv(self) -> $t {
                1.0 / self
            }
        }
    };
}

macro_rules! impl_complex_scalar {
    ($t:ty, $r:ty, $kind:expr) => {
        impl FactorScalar for $t {
            type Real = $r;
            const KIND: ElementKind = $kind;

            fn from_parts(re: $r, im: $r) -> Self {
                <$t>::new(re, im)
            }
            fn re(self) -> $r {
                self.re
            }
            fn im(self) -> $r {
                self.im
            }
            fn conj(self) -> Self {
                <$t>::conj(&self)
            }
        }
    };
}

impl_real_scalar!(f32, ElementKind::F32);
impl_real_scalar!(f64, ElementKind::F64);
impl_complex_scalar!(Complex32, f32, ElementKind::C32);
impl_complex_scalar!(Complex64, f64, ElementKind::C64);

/// Bind `$T` to the concrete scalar for an [`ElementKind`] and evaluate `$body` with it.
///
/// ```ignore
/// let bytes = dispatch_element!(kind, T => std::mem::size_of::<T>());
/// ```
#[macro_export]
macro_rules! dispatch_element {
    ($kind:expr, $T:ident => $body:expr) => {{
        use $crate::element::{Domain, Width};
        let kind: $crate::element::ElementKind = $kind;
        match (kind.domain, kind.width) {
            (Domain::Real, Width::Narrow) => {
                type $T = f32;
                $body
            }
            (Domain::Real, Width::Wide) => {
                type $T = f64;
                $body
            }
            (Domain::Complex, Width::Narrow) => {
                type $T = $crate::element::Complex32;
                $body
            }
            (Domain::Complex, Width::Wide) => {
                type $T = $crate::element::Complex64;
                $body
            }
        }
    }};
}
