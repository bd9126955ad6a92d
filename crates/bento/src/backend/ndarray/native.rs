//! The ndarray adapter's native array.
//!
//! `ndarray` arrays carry their element type statically, so the runtime dtype
//! lives in the enum tag. The `visit!`/`same!`/`with_dtype!` macros expand one
//! arm per element type, letting generic array code run on whichever array the
//! tag selects.

use std::fmt;
use ndarray::ArrayD;
use num_traits::{Float, Num, WrappingAdd, WrappingMul, WrappingSub};

/// Native dtype tags of the ndarray backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NdDType {
    Bool,
    I32,
    I64,
    F32,
    F64,
}

impl NdDType {
    pub fn is_float(self) -> bool {
        matches!(self, NdDType::F32 | NdDType::F64)
    }

    pub fn is_int(self) -> bool {
        matches!(self, NdDType::I32 | NdDType::I64)
    }

    fn slot(self) -> usize {
        match self {
            NdDType::Bool => 0,
            NdDType::I32 => 1,
            NdDType::I64 => 2,
            NdDType::F32 => 3,
            NdDType::F64 => 4,
        }
    }
}

impl fmt::Display for NdDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NdDType::Bool => "bool",
            NdDType::I32 => "int32",
            NdDType::I64 => "int64",
            NdDType::F32 => "float32",
            NdDType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Common dtype of two operands, NumPy rules.
/// Rows and columns follow `Bool, I32, I64, F32, F64`.
const PROMOTION: [[NdDType; 5]; 5] = {
    use NdDType::*;
    [
        [Bool, I32, I64, F32, F64],
        [I32, I32, I64, F64, F64],
        [I64, I64, I64, F64, F64],
        [F32, F64, F64, F32, F64],
        [F64, F64, F64, F64, F64],
    ]
};

pub fn promote(lhs: NdDType, rhs: NdDType) -> NdDType {
    PROMOTION[lhs.slot()][rhs.slot()]
}

/// Dtype of `tensor <op> scalar`. A scalar never widens a float tensor, and an
/// integral scalar never widens an integer tensor.
pub fn promote_scalar(dtype: NdDType, value: f64) -> NdDType {
    let integral = value.fract() == 0.0;
    match dtype {
        NdDType::F32 | NdDType::F64 => dtype,
        NdDType::I32 | NdDType::I64 if integral => dtype,
        NdDType::Bool if integral => NdDType::I64,
        _ => NdDType::F64,
    }
}

/// Element types an [`NdArray`] can hold
pub trait Element: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: NdDType;
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    fn from_i64(v: i64) -> Self;
    fn to_i64(self) -> i64;
    fn into_native(a: ArrayD<Self>) -> NdArray;
}

/// Elements with arithmetic. Integer arithmetic wraps on overflow, as NumPy's does.
pub trait Numeric: Element + Num + std::ops::Neg<Output = Self> {
    fn add_wrapping(self, rhs: Self) -> Self;
    fn sub_wrapping(self, rhs: Self) -> Self;
    fn mul_wrapping(self, rhs: Self) -> Self;
    fn pow_wrapping(self, rhs: Self) -> Self;
}

/// Floating point elements
pub trait FloatElement: Element + Float {}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DTYPE: NdDType = NdDType::$variant;
            fn from_f64(v: f64) -> Self { v as $t }
            fn to_f64(self) -> f64 { self as f64 }
            fn from_i64(v: i64) -> Self { v as $t }
            fn to_i64(self) -> i64 { self as i64 }
            fn into_native(a: ArrayD<Self>) -> NdArray { NdArray::$variant(a) }
        }
    };
}

impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(f32, F32);
impl_element!(f64, F64);

macro_rules! impl_numeric {
    (int $t:ty) => {
        impl Numeric for $t {
            fn add_wrapping(self, rhs: Self) -> Self { WrappingAdd::wrapping_add(&self, &rhs) }
            fn sub_wrapping(self, rhs: Self) -> Self { WrappingSub::wrapping_sub(&self, &rhs) }
            fn mul_wrapping(self, rhs: Self) -> Self { WrappingMul::wrapping_mul(&self, &rhs) }
            fn pow_wrapping(self, rhs: Self) -> Self {
                // negative integer powers have no integer result
                match u32::try_from(rhs) {
                    Ok(e) => self.wrapping_pow(e),
                    Err(_) if rhs < 0 => Self::from_f64(self.to_f64().powf(rhs.to_f64())),
                    Err(_) => self.wrapping_pow(u32::MAX),
                }
            }
        }
    };
    (float $t:ty) => {
        impl Numeric for $t {
            fn add_wrapping(self, rhs: Self) -> Self { self + rhs }
            fn sub_wrapping(self, rhs: Self) -> Self { self - rhs }
            fn mul_wrapping(self, rhs: Self) -> Self { self * rhs }
            fn pow_wrapping(self, rhs: Self) -> Self { self.powf(rhs) }
        }
    };
}

impl_numeric!(int i32);
impl_numeric!(int i64);
impl_numeric!(float f32);
impl_numeric!(float f64);

impl FloatElement for f32 {}
impl FloatElement for f64 {}

impl Element for bool {
    const DTYPE: NdDType = NdDType::Bool;
    fn from_f64(v: f64) -> Self { v != 0.0 }
    fn to_f64(self) -> f64 { if self { 1.0 } else { 0.0 } }
    fn from_i64(v: i64) -> Self { v != 0 }
    fn to_i64(self) -> i64 { self as i64 }
    fn into_native(a: ArrayD<Self>) -> NdArray { NdArray::Bool(a) }
}

/// Native array of the ndarray backend
#[derive(Clone, Debug, PartialEq)]
pub enum NdArray {
    Bool(ArrayD<bool>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Float-only view of an [`NdArray`], for math that has no integer form
pub enum Floating {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// Evaluate `$body` with `$a` bound to the inner array, whatever its type
macro_rules! visit {
    ($x:expr, $a:ident => $body:expr) => {
        match $x {
            $crate::backend::ndarray::NdArray::Bool($a) => $body,
            $crate::backend::ndarray::NdArray::I32($a) => $body,
            $crate::backend::ndarray::NdArray::I64($a) => $body,
            $crate::backend::ndarray::NdArray::F32($a) => $body,
            $crate::backend::ndarray::NdArray::F64($a) => $body,
        }
    };
}

/// Like `visit!`, rewrapping an array of the same element type
macro_rules! same {
    ($x:expr, $a:ident => $body:expr) => {
        match $x {
            $crate::backend::ndarray::NdArray::Bool($a) => $crate::backend::ndarray::NdArray::Bool($body),
            $crate::backend::ndarray::NdArray::I32($a) => $crate::backend::ndarray::NdArray::I32($body),
            $crate::backend::ndarray::NdArray::I64($a) => $crate::backend::ndarray::NdArray::I64($body),
            $crate::backend::ndarray::NdArray::F32($a) => $crate::backend::ndarray::NdArray::F32($body),
            $crate::backend::ndarray::NdArray::F64($a) => $crate::backend::ndarray::NdArray::F64($body),
        }
    };
}

/// Like `same!` for numeric arrays; a boolean array returns an error from the caller
macro_rules! numeric {
    ($op:expr, $x:expr, $a:ident => $body:expr) => {
        match $x {
            $crate::backend::ndarray::NdArray::Bool(_) => {
                return Err($crate::error::TensorError::invalid($op, "operation requires a numeric tensor"))
            }
            $crate::backend::ndarray::NdArray::I32($a) => $crate::backend::ndarray::NdArray::I32($body),
            $crate::backend::ndarray::NdArray::I64($a) => $crate::backend::ndarray::NdArray::I64($body),
            $crate::backend::ndarray::NdArray::F32($a) => $crate::backend::ndarray::NdArray::F32($body),
            $crate::backend::ndarray::NdArray::F64($a) => $crate::backend::ndarray::NdArray::F64($body),
        }
    };
}

/// Like `same!` over a [`Floating`] array
macro_rules! float {
    ($x:expr, $a:ident => $body:expr) => {
        match $x {
            $crate::backend::ndarray::Floating::F32($a) => $crate::backend::ndarray::NdArray::F32($body),
            $crate::backend::ndarray::Floating::F64($a) => $crate::backend::ndarray::NdArray::F64($body),
        }
    };
}

/// Evaluate `$body` with `$t` aliased to the element type of `$dtype`
macro_rules! with_dtype {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::backend::ndarray::NdDType::Bool => { type $t = bool; $body }
            $crate::backend::ndarray::NdDType::I32 => { type $t = i32; $body }
            $crate::backend::ndarray::NdDType::I64 => { type $t = i64; $body }
            $crate::backend::ndarray::NdDType::F32 => { type $t = f32; $body }
            $crate::backend::ndarray::NdDType::F64 => { type $t = f64; $body }
        }
    };
}

pub(crate) use float;
pub(crate) use numeric;
pub(crate) use same;
pub(crate) use visit;
pub(crate) use with_dtype;

impl NdArray {
    pub fn dtype(&self) -> NdDType {
        match self {
            NdArray::Bool(_) => NdDType::Bool,
            NdArray::I32(_) => NdDType::I32,
            NdArray::I64(_) => NdDType::I64,
            NdArray::F32(_) => NdDType::F32,
            NdArray::F64(_) => NdDType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        visit!(self, a => a.shape())
    }

    /// Element-wise conversion. Integer to integer conversions are exact.
    pub fn cast<T: Element>(&self) -> ArrayD<T> {
        let exact = !T::DTYPE.is_float() && !self.dtype().is_float();
        visit!(self, a => if exact {
            a.mapv(|v| T::from_i64(v.to_i64()))
        } else {
            a.mapv(|v| T::from_f64(v.to_f64()))
        })
    }

    pub fn astype(&self, dtype: NdDType) -> NdArray {
        if dtype == self.dtype() {
            return self.clone();
        }
        with_dtype!(dtype, T => NdArray::from(self.cast::<T>()))
    }

    /// Float view; integers and booleans become `F64`
    pub fn floating(&self) -> Floating {
        match self {
            NdArray::F32(a) => Floating::F32(a.clone()),
            NdArray::F64(a) => Floating::F64(a.clone()),
            other => Floating::F64(other.cast()),
        }
    }

    /// Numeric view; booleans become `I64`
    pub fn numeric(&self) -> NdArray {
        match self {
            NdArray::Bool(_) => self.astype(NdDType::I64),
            other => other.clone(),
        }
    }
}

impl<T: Element> From<ArrayD<T>> for NdArray {
    fn from(a: ArrayD<T>) -> Self {
        T::into_native(a)
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit!(self, a => write!(f, "{a}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, IxDyn};

    #[test]
    fn test_promotion_table_is_symmetric() {
        let all = [NdDType::Bool, NdDType::I32, NdDType::I64, NdDType::F32, NdDType::F64];
        for a in all {
            assert_eq!(promote(a, a), a);
            for b in all {
                assert_eq!(promote(a, b), promote(b, a));
            }
        }
        assert_eq!(promote(NdDType::I32, NdDType::F32), NdDType::F64);
        assert_eq!(promote(NdDType::Bool, NdDType::F32), NdDType::F32);
    }

    #[test]
    fn test_promote_scalar() {
        assert_eq!(promote_scalar(NdDType::I32, 2.0), NdDType::I32);
        assert_eq!(promote_scalar(NdDType::I32, 2.5), NdDType::F64);
        assert_eq!(promote_scalar(NdDType::F32, 2.5), NdDType::F32);
        assert_eq!(promote_scalar(NdDType::Bool, 1.0), NdDType::I64);
    }

    #[test]
    fn test_cast() {
        let a = NdArray::from(arr1(&[0.0f64, 1.5, -2.0]).into_dyn());
        assert_eq!(a.astype(NdDType::Bool), NdArray::Bool(arr1(&[false, true, true]).into_dyn()));
        assert_eq!(a.astype(NdDType::I64), NdArray::I64(arr1(&[0i64, 1, -2]).into_dyn()));

        let big = NdArray::I64(ArrayD::from_elem(IxDyn(&[1]), i64::MAX));
        assert_eq!(big.astype(NdDType::I64), big);
        assert_eq!(big.astype(NdDType::I32).dtype(), NdDType::I32);
    }
}
