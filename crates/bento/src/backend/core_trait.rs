use std::fmt::Debug;
use ndarray::ArrayD;
use crate::error::{Result, TensorError};
use crate::index::Index;
use crate::shape::Axes;
use super::Wrap;

/// The right-hand side of a binary operation: another tensor or a plain number
pub enum Operand<'a, T> {
    Tensor(&'a T),
    Scalar(f64),
}

impl<T> Clone for Operand<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Operand<'_, T> {}

impl<T: Debug> Debug for Operand<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Tensor(t) => f.debug_tuple("Tensor").field(t).finish(),
            Operand::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
        }
    }
}

impl<'a, T> From<&'a T> for Operand<'a, T> {
    fn from(t: &'a T) -> Self {
        Operand::Tensor(t)
    }
}

impl<T> From<f64> for Operand<'_, T> {
    fn from(v: f64) -> Self {
        Operand::Scalar(v)
    }
}

/// The canonical tensor API every adapter implements.
///
/// A value of an implementing type owns exactly one native array. Operations
/// never mutate it; they return a new wrapper around a new native array.
/// Factory methods (`zeros`, `arange`, `uniform`, ...) take `&self` as the
/// backend reference, so the result lands on the same backend, with the same
/// dtype where the operation keeps one and on the same device where the
/// framework has devices.
pub trait Tensor: Wrap + Clone + Debug {
    /// The backend's native dtype tag
    type DType: Copy + PartialEq + Debug;

    /// The dtype boolean-only operations accept
    const BOOL: Self::DType;

    /// Backend name used in error messages
    const BACKEND: &'static str;

    // === Introspection ===

    /// Shape of the native array
    fn shape(&self) -> Vec<usize>;

    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements
    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// Length of the first dimension, `0` for scalars
    fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn dtype(&self) -> Self::DType;

    /// Copy the values out as a plain `f64` array
    fn numpy(&self) -> Result<ArrayD<f64>>;

    /// The single value of a one-element tensor
    fn item(&self) -> Result<f64>;

    /// Create a tensor on this tensor's backend from a plain array
    fn from_numpy(&self, array: &ArrayD<f64>) -> Result<Self>;

    // === Conversion ===

    /// Reshape; one entry may be `-1`
    fn reshape(&self, shape: &[isize]) -> Result<Self>;

    fn astype(&self, dtype: Self::DType) -> Result<Self>;

    fn bool(&self) -> Result<Self> {
        self.astype(Self::BOOL)
    }

    // === Elementwise unary ===

    fn clip(&self, min: f64, max: f64) -> Result<Self>;
    fn square(&self) -> Result<Self>;
    fn arctanh(&self) -> Result<Self>;
    fn exp(&self) -> Result<Self>;
    fn log(&self) -> Result<Self>;
    fn log2(&self) -> Result<Self>;
    fn log10(&self) -> Result<Self>;
    fn log1p(&self) -> Result<Self>;
    fn sqrt(&self) -> Result<Self>;
    fn tanh(&self) -> Result<Self>;
    fn abs(&self) -> Result<Self>;
    fn neg(&self) -> Result<Self>;
    fn isnan(&self) -> Result<Self>;
    fn isinf(&self) -> Result<Self>;

    // === Elementwise binary ===

    fn add<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn sub<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn mul<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn div<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn pow<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn minimum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn maximum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;

    fn lt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn le<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn eq<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn ne<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn gt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn ge<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;

    // === Boolean ===

    fn all(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;
    fn any(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;
    fn logical_and<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn logical_or<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a;
    fn logical_not(&self) -> Result<Self>;

    // === Reductions ===

    fn sum(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;
    fn mean(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;
    fn min(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;
    fn max(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self>;

    /// Index of the minimum; `None` searches the flattened tensor
    fn argmin(&self, axis: Option<isize>) -> Result<Self>;

    /// Index of the maximum; `None` searches the flattened tensor
    fn argmax(&self, axis: Option<isize>) -> Result<Self>;

    fn argsort(&self, axis: isize) -> Result<Self>;

    /// Running sum; `None` runs over the flattened tensor
    fn cumsum(&self, axis: Option<isize>) -> Result<Self>;

    // === Construction ===

    fn ones(&self, shape: &[usize]) -> Result<Self>;
    fn zeros(&self, shape: &[usize]) -> Result<Self>;
    fn full(&self, shape: &[usize], value: f64) -> Result<Self>;
    fn ones_like(&self) -> Result<Self>;
    fn zeros_like(&self) -> Result<Self>;
    fn full_like(&self, value: f64) -> Result<Self>;

    /// Evenly spaced values in `[start, stop)`; integral arguments give an integer tensor
    fn arange(&self, start: f64, stop: f64, step: f64) -> Result<Self>;

    fn uniform(&self, shape: &[usize], low: f64, high: f64) -> Result<Self>;
    fn normal(&self, shape: &[usize], mean: f64, stddev: f64) -> Result<Self>;

    /// Zeros shaped like `self` (rank 2) with `value` at `(row, indices[row])`
    fn onehot_like(&self, indices: &Self, value: f64) -> Result<Self>;

    // === Structural ===

    /// Permute axes; `None` reverses them
    fn transpose(&self, axes: Option<&[usize]>) -> Result<Self>;
    fn squeeze(&self, axis: impl Into<Axes>) -> Result<Self>;
    fn expand_dims(&self, axis: isize) -> Result<Self>;
    fn tile(&self, multiples: &[usize]) -> Result<Self>;
    fn flip(&self, axis: impl Into<Axes>) -> Result<Self>;

    /// Pad with one `(before, after)` pair per dimension; `mode` is `"constant"` or `"reflect"`
    fn pad(&self, paddings: &[(usize, usize)], mode: &str, value: f64) -> Result<Self>;

    fn concatenate(tensors: &[Self], axis: isize) -> Result<Self>;
    fn stack(tensors: &[Self], axis: isize) -> Result<Self>;

    /// Coordinate grids from `self` followed by `others`; `indexing` is `"xy"` or `"ij"`
    fn meshgrid(&self, others: &[Self], indexing: &str) -> Result<Vec<Self>>;

    // === Indexing ===

    fn index(&self, index: &Index<Self>) -> Result<Self>;

    /// A copy of `self` with `values` written at `index`
    fn index_update<'a>(&self, index: &Index<Self>, values: impl Into<Operand<'a, Self>>) -> Result<Self>
    where
        Self: 'a;

    // === Numerically stable ===

    fn softmax(&self, axis: isize) -> Result<Self>;
    fn log_softmax(&self, axis: isize) -> Result<Self>;

    /// Per-row cross-entropy of rank-2 logits against rank-1 integer labels
    fn crossentropy(&self, labels: &Self) -> Result<Self>;

    // === Gradients ===

    /// Evaluate `f` at `self` and its gradient with respect to `self`
    fn value_and_grad<F>(&self, f: F) -> Result<(Self, Self)>
    where
        F: FnOnce(&Self) -> Result<Self>;

    /// Like `value_and_grad` for functions that also return auxiliary data
    fn value_aux_and_grad<A, F>(&self, f: F) -> Result<(Self, A, Self)>
    where
        F: FnOnce(&Self) -> Result<(Self, A)>;
}

/// Turn `f` into a reusable function returning `(f(x), df/dx)`
pub fn value_and_grad_fn<T, F>(f: F) -> impl Fn(&T) -> Result<(T, T)>
where
    T: Tensor,
    F: Fn(&T) -> Result<T>,
{
    move |x| x.value_and_grad(&f)
}

pub(crate) fn assert_bool<T: Tensor>(op: &'static str, t: &T) -> Result<()> {
    if t.dtype() != T::BOOL {
        return Err(TensorError::NotBool { op, dtype: format!("{:?}", t.dtype()) });
    }
    Ok(())
}

/// Scalars pass; tensors must be boolean
pub(crate) fn assert_bool_operand<T: Tensor>(op: &'static str, other: Operand<'_, T>) -> Result<()> {
    match other {
        Operand::Tensor(t) => assert_bool(op, t),
        Operand::Scalar(_) => Ok(()),
    }
}

pub(crate) fn check_onehot<T: Tensor>(target: &T, indices: &T) -> Result<()> {
    if target.ndim() != 2 {
        return Err(TensorError::invalid("onehot_like", "onehot_like only supported for 2D tensors"));
    }
    if indices.ndim() != 1 {
        return Err(TensorError::invalid("onehot_like", "onehot_like requires 1D indices"));
    }
    if indices.len() != target.len() {
        return Err(TensorError::invalid("onehot_like", "length of indices must match length of tensor"));
    }
    Ok(())
}

pub(crate) fn check_crossentropy<T: Tensor>(logits: &T, labels: &T) -> Result<()> {
    if logits.ndim() != 2 {
        return Err(TensorError::invalid("crossentropy", "crossentropy only supported for 2D logits tensors"));
    }
    if labels.shape() != logits.shape()[..1] {
        return Err(TensorError::invalid(
            "crossentropy",
            "labels must be 1D and must match the length of logits",
        ));
    }
    Ok(())
}

pub(crate) fn check_tile<T: Tensor>(t: &T, multiples: &[usize]) -> Result<()> {
    if multiples.len() != t.ndim() {
        return Err(TensorError::invalid("tile", "multiples requires one entry for each dimension"));
    }
    Ok(())
}

pub(crate) fn check_nonempty<T>(op: &'static str, tensors: &[T]) -> Result<()> {
    if tensors.is_empty() {
        return Err(TensorError::invalid(op, "need at least one tensor"));
    }
    Ok(())
}
