//! Vector norms written once against [`Tensor`], for every backend.

use crate::backend::Tensor;
use crate::error::Result;
use crate::shape::Axes;

/// Number of non-zero entries, in the dtype of `x`
pub fn l0<T: Tensor>(x: &T, axis: impl Into<Axes>, keepdims: bool) -> Result<T> {
    x.ne(0.0)?.sum(axis, keepdims)?.astype(x.dtype())
}

pub fn l1<T: Tensor>(x: &T, axis: impl Into<Axes>, keepdims: bool) -> Result<T> {
    x.abs()?.sum(axis, keepdims)
}

pub fn l2<T: Tensor>(x: &T, axis: impl Into<Axes>, keepdims: bool) -> Result<T> {
    x.square()?.sum(axis, keepdims)?.sqrt()
}

pub fn linf<T: Tensor>(x: &T, axis: impl Into<Axes>, keepdims: bool) -> Result<T> {
    x.abs()?.max(axis, keepdims)
}

/// The `p`-norm; `0`, `1`, `2` and infinity use the dedicated functions
pub fn lp<T: Tensor>(x: &T, p: f64, axis: impl Into<Axes>, keepdims: bool) -> Result<T> {
    if p == 0.0 {
        return l0(x, axis, keepdims);
    }
    if p == 1.0 {
        return l1(x, axis, keepdims);
    }
    if p == 2.0 {
        return l2(x, axis, keepdims);
    }
    if p.is_infinite() && p > 0.0 {
        return linf(x, axis, keepdims);
    }
    x.abs()?.pow(p)?.sum(axis, keepdims)?.pow(1.0 / p)
}
