//! NumPy-style eager backend over `ndarray`.
//!
//! Dtype promotion follows NumPy: integer division yields `float64`, sums of
//! booleans and integers yield `int64`, and comparisons between mixed dtypes
//! compare in the common dtype. There is no automatic differentiation, so the
//! gradient entry points return [`TensorError::NotImplemented`].

mod array;
mod native;

use std::fmt;
use ndarray::{ArrayD, Axis, IxDyn};
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::Normal;
use tracing::{debug, trace};

use crate::error::{Result, TensorError};
use crate::index::{normalize_index, Index, IndexItem};
use crate::pad::check_pad;
use crate::shape::{broadcast_shapes, check_permutation, infer_reshape, normalize_axis, Axes, Indexing};
use super::core_trait::{
    assert_bool, assert_bool_operand, check_crossentropy, check_nonempty, check_onehot, check_tile,
};
use super::{Operand, Tensor, Wrap};
use array::AxisSelect;

pub use native::{promote, promote_scalar, Element, FloatElement, Floating, NdArray, NdDType, Numeric};
use native::{float, numeric, same, visit, with_dtype};

/// Pairwise `$body` over two arrays of one dtype, limited to the listed dtypes.
/// `keep` wraps the result in the input dtype, `mask` in `Bool`.
macro_rules! zip_arms {
    ($op:expr, $lhs:expr, $rhs:expr, [$($v:ident),*], $out:ident, |$x:ident, $y:ident| $body:expr) => {
        match (&$lhs, &$rhs) {
            $(
                (NdArray::$v(l), NdArray::$v(r)) => {
                    zip_arms!(@wrap $out $v, array::zip_with($op, l, r, |$x, $y| $body)?)
                }
            )*
            (l, r) => {
                return Err(TensorError::invalid(
                    $op,
                    format!("unsupported dtypes {} and {}", l.dtype(), r.dtype()),
                ))
            }
        }
    };
    (@wrap keep $v:ident, $e:expr) => { NdArray::$v($e) };
    (@wrap mask $v:ident, $e:expr) => { NdArray::Bool($e) };
}

/// Elementwise float function through `delegate`; integers become `float64`
macro_rules! float_map {
    ($self:ident, |$v:ident| $body:expr) => {
        $self.delegate(|x| -> Result<NdArray> { Ok(float!(x.floating(), a => a.mapv(|$v| $body))) })
    };
}

/// A tensor backed by an `ndarray` array
#[derive(Clone, Debug)]
pub struct NdArrayTensor {
    native: NdArray,
}

impl Wrap for NdArrayTensor {
    type Native = NdArray;

    fn wrap(native: NdArray) -> Self {
        Self { native }
    }

    fn native(&self) -> &NdArray {
        &self.native
    }

    fn into_native(self) -> NdArray {
        self.native
    }
}

impl From<NdArray> for NdArrayTensor {
    fn from(native: NdArray) -> Self {
        Self::wrap(native)
    }
}

impl<T: Element> From<ArrayD<T>> for NdArrayTensor {
    fn from(a: ArrayD<T>) -> Self {
        Self::wrap(NdArray::from(a))
    }
}

impl fmt::Display for NdArrayTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NdArrayTensor({})", self.native)
    }
}

fn filled(dtype: NdDType, shape: &[usize], value: f64) -> NdArray {
    with_dtype!(dtype, T => NdArray::from(array::filled::<T>(shape, T::from_f64(value))))
}

/// Integer contents of an index-like tensor
fn int_values(op: &'static str, t: &NdArrayTensor) -> Result<ArrayD<i64>> {
    if !t.dtype().is_int() {
        return Err(TensorError::invalid(op, format!("expected an integer tensor, got {}", t.dtype())));
    }
    Ok(t.native.cast::<i64>())
}

/// Boolean right-hand side; a scalar is true when non-zero
fn bool_operand(other: Operand<'_, NdArrayTensor>) -> NdArray {
    match other {
        Operand::Tensor(t) => t.native.clone(),
        Operand::Scalar(v) => NdArray::from(ArrayD::from_elem(IxDyn(&[]), v != 0.0)),
    }
}

/// How an index expression addresses the tensor
enum Selection {
    Basic(Vec<AxisSelect>),
    Points(Vec<ArrayD<usize>>),
}

impl NdArrayTensor {
    /// Both operands converted to their common dtype
    fn promoted(&self, other: Operand<'_, Self>) -> (NdArray, NdArray) {
        let rhs = match other {
            Operand::Tensor(t) => t.native.clone(),
            Operand::Scalar(v) => filled(promote_scalar(self.dtype(), v), &[], v),
        };
        let dtype = promote(self.dtype(), rhs.dtype());
        (self.native.astype(dtype), rhs.astype(dtype))
    }

    fn flattened(&self) -> Result<NdArray> {
        Ok(same!(&self.native, a => array::reshape(a, &[a.len()])?))
    }

    /// Flattened tensor and axis 0 for `None`, otherwise the resolved axis
    fn lanes(&self, op: &'static str, axis: Option<isize>) -> Result<(NdArray, usize)> {
        match axis {
            None => Ok((self.flattened()?, 0)),
            Some(axis) => Ok((self.native.clone(), normalize_axis(op, axis, self.ndim())?)),
        }
    }

    fn reduce_extreme(&self, op: &'static str, axis: Axes, keepdims: bool, smaller: bool) -> Result<Self> {
        let axes = axis.resolve(op, self.ndim())?;
        let shape = self.shape();
        if axes.iter().any(|&d| shape[d] == 0) {
            return Err(TensorError::invalid(op, "zero-size array to reduction operation which has no identity"));
        }
        Ok(Self::wrap(same!(&self.native, a => {
            array::reduce(a, &axes, keepdims, |lane| {
                array::lane_extreme(lane, |x, y| if smaller { x < y } else { x > y })
            })?
        })))
    }

    fn arg_extreme(&self, op: &'static str, axis: Option<isize>, smaller: bool) -> Result<Self> {
        let (a, axis) = self.lanes(op, axis)?;
        if a.shape()[axis] == 0 {
            return Err(TensorError::invalid(op, format!("attempt to get {op} of an empty sequence")));
        }
        let out = visit!(&a, a => array::reduce(a, &[axis], false, |lane| {
            array::first_extreme(lane, |x, y| if smaller { x < y } else { x > y })
        })?);
        Ok(Self::from(out))
    }

    fn select(&self, op: &'static str, index: &Index<Self>) -> Result<Selection> {
        let shape = self.shape();
        let Some(items) = index.items() else {
            let Index::Tensor(t) = index else {
                return Err(TensorError::invalid(op, "unsupported index"));
            };
            return self.tensor_points(op, t).map(Selection::Points);
        };
        if items.len() > shape.len() {
            return Err(TensorError::invalid(
                op,
                format!("too many indices: tensor is {}-dimensional, but {} were indexed", shape.len(), items.len()),
            ));
        }

        if !items.iter().any(IndexItem::is_tensor) {
            let selection = items
                .iter()
                .zip(&shape)
                .map(|(item, &len)| match item {
                    IndexItem::Int(i) => normalize_index(op, *i, len).map(AxisSelect::At),
                    IndexItem::Slice(s) => s.indices(op, len).map(AxisSelect::Take),
                    IndexItem::Tensor(_) => Err(TensorError::invalid(op, "unexpected tensor index")),
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Selection::Basic(selection));
        }

        debug!(op, axes = items.len(), "advanced indexing");
        let mut raw = Vec::with_capacity(items.len());
        for item in &items {
            raw.push(match item {
                IndexItem::Int(i) => ArrayD::from_elem(IxDyn(&[]), *i as i64),
                IndexItem::Tensor(t) => int_values(op, t)?,
                IndexItem::Slice(_) => {
                    return Err(TensorError::not_implemented(
                        op,
                        Self::BACKEND,
                        "mixing slices with tensor indices",
                    ));
                }
            });
        }
        let mut common: Vec<usize> = Vec::new();
        for r in &raw {
            common = broadcast_shapes(op, &common, r.shape())?;
        }
        raw.iter()
            .zip(&shape)
            .map(|(r, &len)| -> Result<ArrayD<usize>> {
                let r = r.broadcast(IxDyn(&common)).ok_or_else(|| {
                    TensorError::invalid(op, "index arrays could not be broadcast together")
                })?;
                let mut out = ArrayD::from_elem(IxDyn(&common), 0usize);
                for (dst, &v) in out.iter_mut().zip(r.iter()) {
                    *dst = normalize_index(op, v as isize, len)?;
                }
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()
            .map(Selection::Points)
    }

    /// Coordinates addressed by a single integer or boolean tensor
    fn tensor_points(&self, op: &'static str, t: &Self) -> Result<Vec<ArrayD<usize>>> {
        let shape = self.shape();
        if let NdArray::Bool(mask) = &t.native {
            if mask.ndim() == 0 {
                return Err(TensorError::not_implemented(op, Self::BACKEND, "0-d boolean index"));
            }
            if mask.ndim() > shape.len() || mask.shape() != &shape[..mask.ndim()] {
                return Err(TensorError::invalid(
                    op,
                    format!("boolean index of shape {:?} does not match tensor of shape {shape:?}", mask.shape()),
                ));
            }
            return Ok(array::mask_coords(mask));
        }
        let Some(&len) = shape.first() else {
            return Err(TensorError::invalid(op, "cannot index a 0-d tensor with a tensor"));
        };
        let values = int_values(op, t)?;
        let mut coords = ArrayD::from_elem(IxDyn(values.shape()), 0usize);
        for (dst, &v) in coords.iter_mut().zip(values.iter()) {
            *dst = normalize_index(op, v as isize, len)?;
        }
        Ok(vec![coords])
    }

    fn softmax_with(&self, op: &'static str, axis: isize, log: bool) -> Result<Self> {
        let axis = normalize_axis(op, axis, self.ndim())?;
        let out = float!(self.native.floating(), a => if log {
            array::map_lanes(&a, axis, |lane| array::log_softmax_lane(lane))?
        } else {
            array::map_lanes(&a, axis, |lane| array::softmax_lane(lane))?
        });
        Ok(Self::wrap(out))
    }
}

impl Tensor for NdArrayTensor {
    type DType = NdDType;

    const BOOL: NdDType = NdDType::Bool;

    const BACKEND: &'static str = "ndarray";

    fn shape(&self) -> Vec<usize> {
        self.native.shape().to_vec()
    }

    fn dtype(&self) -> NdDType {
        self.native.dtype()
    }

    fn numpy(&self) -> Result<ArrayD<f64>> {
        Ok(self.native.cast::<f64>())
    }

    fn item(&self) -> Result<f64> {
        if self.size() != 1 {
            return Err(TensorError::invalid("item", "can only convert a tensor of size 1 to a scalar"));
        }
        Ok(visit!(&self.native, a => a.iter().next().map_or(f64::NAN, |v| v.to_f64())))
    }

    fn from_numpy(&self, array: &ArrayD<f64>) -> Result<Self> {
        Ok(Self::from(array.clone()))
    }

    fn reshape(&self, shape: &[isize]) -> Result<Self> {
        let dims = infer_reshape(self.size(), shape)?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::reshape(a, &dims)?)) })
    }

    fn astype(&self, dtype: NdDType) -> Result<Self> {
        self.delegate(|x| Ok::<_, TensorError>(x.astype(dtype)))
    }

    fn clip(&self, min: f64, max: f64) -> Result<Self> {
        Ok(Self::wrap(numeric!("clip", self.native.numeric(), a => array::clip(&a, min, max))))
    }

    fn square(&self) -> Result<Self> {
        Ok(Self::wrap(numeric!("square", self.native.numeric(), a => a.mapv(|v| v.mul_wrapping(v)))))
    }

    fn arctanh(&self) -> Result<Self> {
        float_map!(self, |v| v.atanh())
    }

    fn exp(&self) -> Result<Self> {
        float_map!(self, |v| v.exp())
    }

    fn log(&self) -> Result<Self> {
        float_map!(self, |v| v.ln())
    }

    fn log2(&self) -> Result<Self> {
        float_map!(self, |v| v.log2())
    }

    fn log10(&self) -> Result<Self> {
        float_map!(self, |v| v.log10())
    }

    fn log1p(&self) -> Result<Self> {
        float_map!(self, |v| v.ln_1p())
    }

    fn sqrt(&self) -> Result<Self> {
        float_map!(self, |v| v.sqrt())
    }

    fn tanh(&self) -> Result<Self> {
        float_map!(self, |v| v.tanh())
    }

    fn abs(&self) -> Result<Self> {
        Ok(Self::wrap(numeric!("abs", self.native.numeric(), a => a.mapv(|v| num_traits::Signed::abs(&v)))))
    }

    fn neg(&self) -> Result<Self> {
        Ok(Self::wrap(numeric!("neg", &self.native, a => a.mapv(|v| -v))))
    }

    fn isnan(&self) -> Result<Self> {
        let out = match &self.native {
            NdArray::F32(a) => a.mapv(f32::is_nan),
            NdArray::F64(a) => a.mapv(f64::is_nan),
            other => array::filled(other.shape(), false),
        };
        Ok(Self::from(out))
    }

    fn isinf(&self) -> Result<Self> {
        let out = match &self.native {
            NdArray::F32(a) => a.mapv(f32::is_infinite),
            NdArray::F64(a) => a.mapv(f64::is_infinite),
            other => array::filled(other.shape(), false),
        };
        Ok(Self::from(out))
    }

    fn add<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("add", l.numeric(), r.numeric(), [I32, I64, F32, F64], keep, |x, y| x.add_wrapping(y))))
    }

    fn sub<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("sub", l.numeric(), r.numeric(), [I32, I64, F32, F64], keep, |x, y| x.sub_wrapping(y))))
    }

    fn mul<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("mul", l.numeric(), r.numeric(), [I32, I64, F32, F64], keep, |x, y| x.mul_wrapping(y))))
    }

    fn div<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        // true division
        let dtype = if l.dtype().is_float() { l.dtype() } else { NdDType::F64 };
        let (l, r) = (l.astype(dtype), r.astype(dtype));
        Ok(Self::wrap(zip_arms!("div", l, r, [F32, F64], keep, |x, y| x / y)))
    }

    fn pow<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("pow", l.numeric(), r.numeric(), [I32, I64, F32, F64], keep, |x, y| x.pow_wrapping(y))))
    }

    fn minimum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("minimum", l, r, [Bool, I32, I64, F32, F64], keep, |x, y| {
            array::pick(x, y, |a, b| a <= b)
        })))
    }

    fn maximum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("maximum", l, r, [Bool, I32, I64, F32, F64], keep, |x, y| {
            array::pick(x, y, |a, b| a >= b)
        })))
    }

    fn lt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("lt", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x < y)))
    }

    fn le<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("le", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x <= y)))
    }

    fn eq<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("eq", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x == y)))
    }

    fn ne<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("ne", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x != y)))
    }

    fn gt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("gt", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x > y)))
    }

    fn ge<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let (l, r) = self.promoted(other.into());
        Ok(Self::wrap(zip_arms!("ge", l, r, [Bool, I32, I64, F32, F64], mask, |x, y| x >= y)))
    }

    fn all(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        assert_bool("all", self)?;
        let axes = axis.into().resolve("all", self.ndim())?;
        let out = visit!(&self.native, a => array::reduce(a, &axes, keepdims, |lane| lane.iter().all(|v| v.to_f64() != 0.0))?);
        Ok(Self::from(out))
    }

    fn any(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        assert_bool("any", self)?;
        let axes = axis.into().resolve("any", self.ndim())?;
        let out = visit!(&self.native, a => array::reduce(a, &axes, keepdims, |lane| lane.iter().any(|v| v.to_f64() != 0.0))?);
        Ok(Self::from(out))
    }

    fn logical_and<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let other = other.into();
        assert_bool("logical_and", self)?;
        assert_bool_operand("logical_and", other)?;
        let rhs = bool_operand(other);
        Ok(Self::wrap(zip_arms!("logical_and", self.native, rhs, [Bool], keep, |x, y| x && y)))
    }

    fn logical_or<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let other = other.into();
        assert_bool("logical_or", self)?;
        assert_bool_operand("logical_or", other)?;
        let rhs = bool_operand(other);
        Ok(Self::wrap(zip_arms!("logical_or", self.native, rhs, [Bool], keep, |x, y| x || y)))
    }

    fn logical_not(&self) -> Result<Self> {
        assert_bool("logical_not", self)?;
        match &self.native {
            NdArray::Bool(a) => Ok(Self::from(a.mapv(|v| !v))),
            other => Err(TensorError::NotBool { op: "logical_not", dtype: other.dtype().to_string() }),
        }
    }

    fn sum(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let axes = axis.into().resolve("sum", self.ndim())?;
        let a = if self.dtype().is_float() { self.native.clone() } else { self.native.astype(NdDType::I64) };
        Ok(Self::wrap(numeric!("sum", a, a => array::reduce(&a, &axes, keepdims, |lane| array::sum_lane(lane))?)))
    }

    fn mean(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let axes = axis.into().resolve("mean", self.ndim())?;
        Ok(Self::wrap(float!(self.native.floating(), a => {
            array::reduce(&a, &axes, keepdims, |lane| array::mean_lane(lane))?
        })))
    }

    fn min(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        self.reduce_extreme("min", axis.into(), keepdims, true)
    }

    fn max(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        self.reduce_extreme("max", axis.into(), keepdims, false)
    }

    fn argmin(&self, axis: Option<isize>) -> Result<Self> {
        self.arg_extreme("argmin", axis, true)
    }

    fn argmax(&self, axis: Option<isize>) -> Result<Self> {
        self.arg_extreme("argmax", axis, false)
    }

    fn argsort(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis("argsort", axis, self.ndim())?;
        let out = visit!(&self.native, a => array::map_lanes(a, axis, |lane| array::argsort_lane(lane))?);
        Ok(Self::from(out))
    }

    fn cumsum(&self, axis: Option<isize>) -> Result<Self> {
        let (a, axis) = self.lanes("cumsum", axis)?;
        let a = if a.dtype().is_float() { a } else { a.astype(NdDType::I64) };
        Ok(Self::wrap(numeric!("cumsum", a, a => array::map_lanes(&a, axis, |lane| array::cumsum_lane(lane))?)))
    }

    fn ones(&self, shape: &[usize]) -> Result<Self> {
        self.full(shape, 1.0)
    }

    fn zeros(&self, shape: &[usize]) -> Result<Self> {
        self.full(shape, 0.0)
    }

    fn full(&self, shape: &[usize], value: f64) -> Result<Self> {
        Ok(Self::wrap(filled(self.dtype(), shape, value)))
    }

    fn ones_like(&self) -> Result<Self> {
        self.full(&self.shape(), 1.0)
    }

    fn zeros_like(&self) -> Result<Self> {
        self.full(&self.shape(), 0.0)
    }

    fn full_like(&self, value: f64) -> Result<Self> {
        self.full(&self.shape(), value)
    }

    fn arange(&self, start: f64, stop: f64, step: f64) -> Result<Self> {
        if step == 0.0 || !step.is_finite() {
            return Err(TensorError::invalid("arange", "step must be a finite, non-zero number"));
        }
        let n = ((stop - start) / step).ceil().max(0.0) as usize;
        let integral = [start, stop, step].iter().all(|v| v.fract() == 0.0);
        let values = (0..n).map(|i| start + i as f64 * step);
        if integral {
            Ok(Self::from(ArrayD::from_shape_vec(IxDyn(&[n]), values.map(|v| v as i64).collect())?))
        } else {
            Ok(Self::from(ArrayD::from_shape_vec(IxDyn(&[n]), values.collect())?))
        }
    }

    fn uniform(&self, shape: &[usize], low: f64, high: f64) -> Result<Self> {
        if !(low < high) || !(high - low).is_finite() {
            return Err(TensorError::invalid("uniform", format!("invalid range [{low}, {high})")));
        }
        let dist = Uniform::new(low, high);
        let mut rng = rand::thread_rng();
        let n: usize = shape.iter().product();
        let values: Vec<f64> = (0..n).map(|_| rng.sample(&dist)).collect();
        Ok(Self::from(ArrayD::from_shape_vec(IxDyn(shape), values)?))
    }

    fn normal(&self, shape: &[usize], mean: f64, stddev: f64) -> Result<Self> {
        let dist = Normal::new(mean, stddev)
            .map_err(|e| TensorError::invalid("normal", format!("invalid parameters: {e}")))?;
        let mut rng = rand::thread_rng();
        let n: usize = shape.iter().product();
        let values: Vec<f64> = (0..n).map(|_| rng.sample(&dist)).collect();
        Ok(Self::from(ArrayD::from_shape_vec(IxDyn(shape), values)?))
    }

    fn onehot_like(&self, indices: &Self, value: f64) -> Result<Self> {
        check_onehot(self, indices)?;
        let columns = self.shape()[1];
        let indices = int_values("onehot_like", indices)?;
        let mut out = filled(self.dtype(), &self.shape(), 0.0);
        visit!(&mut out, a => {
            for (row, &col) in indices.iter().enumerate() {
                if col < 0 || col as usize >= columns {
                    return Err(TensorError::invalid(
                        "onehot_like",
                        format!("index {col} is out of bounds for {columns} columns"),
                    ));
                }
                a[&[row, col as usize][..]] = Element::from_f64(value);
            }
        });
        Ok(Self::wrap(out))
    }

    fn transpose(&self, axes: Option<&[usize]>) -> Result<Self> {
        let perm: Vec<usize> = match axes {
            Some(axes) => axes.to_vec(),
            None => (0..self.ndim()).rev().collect(),
        };
        check_permutation("transpose", &perm, self.ndim())?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::permute(a, &perm))) })
    }

    fn squeeze(&self, axis: impl Into<Axes>) -> Result<Self> {
        let shape = self.shape();
        let drop: Vec<usize> = match axis.into() {
            Axes::All => (0..shape.len()).filter(|&d| shape[d] == 1).collect(),
            axes => {
                let axes = axes.resolve("squeeze", shape.len())?;
                if axes.iter().any(|&d| shape[d] != 1) {
                    return Err(TensorError::invalid(
                        "squeeze",
                        "cannot select an axis to squeeze out which has size not equal to one",
                    ));
                }
                axes
            }
        };
        let dims: Vec<usize> = (0..shape.len()).filter(|d| !drop.contains(d)).map(|d| shape[d]).collect();
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::reshape(a, &dims)?)) })
    }

    fn expand_dims(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis("expand_dims", axis, self.ndim() + 1)?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => a.clone().insert_axis(Axis(axis)))) })
    }

    fn tile(&self, multiples: &[usize]) -> Result<Self> {
        check_tile(self, multiples)?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::tile(a, multiples))) })
    }

    fn flip(&self, axis: impl Into<Axes>) -> Result<Self> {
        let axes = axis.into().resolve("flip", self.ndim())?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::flip(a, &axes))) })
    }

    fn pad(&self, paddings: &[(usize, usize)], mode: &str, value: f64) -> Result<Self> {
        let mode = check_pad(Self::BACKEND, &self.shape(), paddings, mode)?;
        self.delegate(|x| -> Result<NdArray> { Ok(same!(x, a => array::pad(a, paddings, mode, Element::from_f64(value)))) })
    }

    fn concatenate(tensors: &[Self], axis: isize) -> Result<Self> {
        check_nonempty("concatenate", tensors)?;
        let axis = normalize_axis("concatenate", axis, tensors[0].ndim())?;
        let dtype = tensors.iter().map(Tensor::dtype).fold(tensors[0].dtype(), promote);
        let out = with_dtype!(dtype, T => {
            let arrays: Vec<ArrayD<T>> = tensors.iter().map(|t| t.native.cast::<T>()).collect();
            let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
            NdArray::from(ndarray::concatenate(Axis(axis), &views)?)
        });
        Ok(Self::wrap(out))
    }

    fn stack(tensors: &[Self], axis: isize) -> Result<Self> {
        check_nonempty("stack", tensors)?;
        let axis = normalize_axis("stack", axis, tensors[0].ndim() + 1)?;
        let dtype = tensors.iter().map(Tensor::dtype).fold(tensors[0].dtype(), promote);
        let out = with_dtype!(dtype, T => {
            let arrays: Vec<ArrayD<T>> = tensors.iter().map(|t| t.native.cast::<T>()).collect();
            let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
            NdArray::from(ndarray::stack(Axis(axis), &views)?)
        });
        Ok(Self::wrap(out))
    }

    fn meshgrid(&self, others: &[Self], indexing: &str) -> Result<Vec<Self>> {
        let xy = indexing.parse::<Indexing>()? == Indexing::Xy;
        let inputs: Vec<&Self> = std::iter::once(self).chain(others).collect();
        let lens: Vec<usize> = inputs.iter().map(|t| t.size()).collect();
        let grids = inputs
            .iter()
            .enumerate()
            .map(|(i, t)| same!(&t.native, a => array::meshgrid_one(a, i, &lens, xy)));
        Ok(Self::wrap_all(grids))
    }

    fn index(&self, index: &Index<Self>) -> Result<Self> {
        let out = match self.select("index", index)? {
            Selection::Basic(sel) => same!(&self.native, a => array::take_basic(a, &sel)),
            Selection::Points(coords) => {
                trace!(points = coords[0].len(), "gathering points");
                same!(&self.native, a => array::take_points(a, &coords)?)
            }
        };
        Ok(Self::wrap(out))
    }

    fn index_update<'a>(&self, index: &Index<Self>, values: impl Into<Operand<'a, Self>>) -> Result<Self>
    where
        Self: 'a,
    {
        let values = match values.into() {
            Operand::Tensor(t) => t.native.clone(),
            Operand::Scalar(v) => filled(self.dtype(), &[], v),
        };
        let selection = self.select("index_update", index)?;
        let mut out = self.native.clone();
        visit!(&mut out, a => match &selection {
            Selection::Basic(sel) => array::put_basic(a, sel, &values.cast())?,
            Selection::Points(coords) => array::put_points(a, coords, &values.cast())?,
        });
        Ok(Self::wrap(out))
    }

    fn softmax(&self, axis: isize) -> Result<Self> {
        self.softmax_with("softmax", axis, false)
    }

    fn log_softmax(&self, axis: isize) -> Result<Self> {
        self.softmax_with("log_softmax", axis, true)
    }

    fn crossentropy(&self, labels: &Self) -> Result<Self> {
        check_crossentropy(self, labels)?;
        let labels = int_values("crossentropy", labels)?;
        let labels: Vec<i64> = labels.iter().copied().collect();
        Ok(Self::wrap(float!(self.native.floating(), a => array::crossentropy(&a, &labels)?)))
    }

    fn value_and_grad<F>(&self, _f: F) -> Result<(Self, Self)>
    where
        F: FnOnce(&Self) -> Result<Self>,
    {
        Err(TensorError::not_implemented(
            "value_and_grad",
            Self::BACKEND,
            "ndarray arrays do not record gradients",
        ))
    }

    fn value_aux_and_grad<A, F>(&self, _f: F) -> Result<(Self, A, Self)>
    where
        F: FnOnce(&Self) -> Result<(Self, A)>,
    {
        Err(TensorError::not_implemented(
            "value_aux_and_grad",
            Self::BACKEND,
            "ndarray arrays do not record gradients",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Slice;
    use crate::testing::assert_close;
    use ndarray::{arr0, arr1, arr2};

    fn t1(v: &[f64]) -> NdArrayTensor {
        NdArrayTensor::from(arr1(v).into_dyn())
    }

    fn i1(v: &[i64]) -> NdArrayTensor {
        NdArrayTensor::from(arr1(v).into_dyn())
    }

    fn b1(v: &[bool]) -> NdArrayTensor {
        NdArrayTensor::from(arr1(v).into_dyn())
    }

    fn values(t: &NdArrayTensor) -> Vec<f64> {
        t.numpy().unwrap().iter().copied().collect()
    }

    #[test]
    fn test_dtype_promotion_in_arithmetic() {
        let ints = NdArrayTensor::from(arr1(&[1i32, 2, 3]).into_dyn());
        assert_eq!(ints.add(1.0).unwrap().dtype(), NdDType::I32);
        assert_eq!(ints.add(0.5).unwrap().dtype(), NdDType::F64);
        assert_eq!(ints.div(2.0).unwrap().dtype(), NdDType::F64);
        assert_eq!(values(&ints.div(2.0).unwrap()), vec![0.5, 1.0, 1.5]);

        let floats = NdArrayTensor::from(arr1(&[1.0f32, 2.0]).into_dyn());
        assert_eq!(floats.mul(3.0).unwrap().dtype(), NdDType::F32);
        let bools = b1(&[true, false]);
        assert_eq!(bools.add(&bools).unwrap().dtype(), NdDType::I64);
    }

    #[test]
    fn test_comparisons_broadcast() {
        let a = NdArrayTensor::from(arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn());
        let b = t1(&[2.0, 3.0]);
        let lt = a.lt(&b).unwrap();
        assert_eq!(lt.dtype(), NdDType::Bool);
        assert_eq!(values(&lt), vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(values(&a.eq(4.0).unwrap()), vec![0.0, 0.0, 0.0, 1.0]);
        assert!(a.add(&t1(&[1.0, 2.0, 3.0])).unwrap_err().is_validation());
    }

    #[test]
    fn test_reductions() {
        let a = NdArrayTensor::from(arr2(&[[1i32, 2, 3], [4, 5, 6]]).into_dyn());
        let s = a.sum(Axes::All, false).unwrap();
        assert_eq!(s.dtype(), NdDType::I64);
        assert_eq!(s.item().unwrap(), 21.0);
        assert_eq!(a.sum(0, false).unwrap().shape(), vec![3]);
        assert_eq!(a.sum(1, true).unwrap().shape(), vec![2, 1]);
        assert_eq!(values(&a.mean(1, false).unwrap()), vec![2.0, 5.0]);
        assert_eq!(values(&a.max([0, 1], false).unwrap()), vec![6.0]);
        assert_eq!(values(&a.min(-1, false).unwrap()), vec![1.0, 4.0]);

        let empty = NdArrayTensor::from(ArrayD::<f64>::zeros(IxDyn(&[0, 3])));
        assert!(empty.max(0, false).unwrap_err().is_validation());
        assert_eq!(empty.sum(0, false).unwrap().shape(), vec![3]);
    }

    #[test]
    fn test_arg_reductions() {
        let a = t1(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        assert_eq!(a.argmin(None).unwrap().item().unwrap(), 1.0);
        assert_eq!(a.argmax(Some(0)).unwrap().item().unwrap(), 4.0);
        assert_eq!(values(&a.argsort(-1).unwrap()), vec![1.0, 3.0, 0.0, 2.0, 4.0]);
        assert_eq!(a.argsort(0).unwrap().dtype(), NdDType::I64);

        let m = NdArrayTensor::from(arr2(&[[1i32, 9], [7, 2]]).into_dyn());
        assert_eq!(values(&m.argmax(Some(1)).unwrap()), vec![1.0, 0.0]);
        assert_eq!(values(&m.argmax(None).unwrap()), vec![1.0]);
        assert!(t1(&[]).argmax(None).unwrap_err().is_validation());
    }

    #[test]
    fn test_cumsum() {
        let a = NdArrayTensor::from(arr2(&[[1i32, 2], [3, 4]]).into_dyn());
        assert_eq!(values(&a.cumsum(None).unwrap()), vec![1.0, 3.0, 6.0, 10.0]);
        let rows = a.cumsum(Some(1)).unwrap();
        assert_eq!(rows.shape(), vec![2, 2]);
        assert_eq!(values(&rows), vec![1.0, 3.0, 3.0, 7.0]);
        assert_eq!(b1(&[true, true]).cumsum(None).unwrap().dtype(), NdDType::I64);
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let max = i1(&[i64::MAX]);
        assert_eq!(max.add(1.0).unwrap().native(), &NdArray::from(arr1(&[i64::MIN]).into_dyn()));
        assert_eq!(max.mul(2.0).unwrap().native(), &NdArray::from(arr1(&[-2i64]).into_dyn()));
        assert_eq!(i1(&[i64::MIN]).sub(1.0).unwrap().native(), &NdArray::from(arr1(&[i64::MAX]).into_dyn()));
        assert_eq!(i1(&[2]).pow(64.0).unwrap().native(), &NdArray::from(arr1(&[0i64]).into_dyn()));
        assert_eq!(i1(&[-2]).pow(3.0).unwrap().native(), &NdArray::from(arr1(&[-8i64]).into_dyn()));

        let s = i1(&[i64::MAX, 1]).sum(Axes::All, false).unwrap();
        assert_eq!(s.native(), &NdArray::from(arr0(i64::MIN).into_dyn()));
        let c = i1(&[i64::MAX, 1]).cumsum(None).unwrap();
        assert_eq!(c.native(), &NdArray::from(arr1(&[i64::MAX, i64::MIN]).into_dyn()));
    }

    #[test]
    fn test_logical_ops_accept_scalars() {
        let b = b1(&[true, false]);
        assert_eq!(values(&b.logical_and(1.0).unwrap()), vec![1.0, 0.0]);
        assert_eq!(values(&b.logical_and(0.0).unwrap()), vec![0.0, 0.0]);
        assert_eq!(values(&b.logical_or(2.0).unwrap()), vec![1.0, 1.0]);
        assert_eq!(b.logical_or(0.0).unwrap().dtype(), NdDType::Bool);
    }

    #[test]
    fn test_boolean_ops_require_bool() {
        let f = t1(&[1.0, 0.0]);
        let err = f.all(Axes::All, false).unwrap_err();
        assert!(matches!(err, TensorError::NotBool { op: "all", .. }));
        assert!(f.logical_not().unwrap_err().is_validation());

        let b = b1(&[true, false]);
        assert!(b.logical_and(&f).unwrap_err().is_validation());
        assert_eq!(b.all(Axes::All, false).unwrap().item().unwrap(), 0.0);
        assert_eq!(b.any(Axes::All, false).unwrap().item().unwrap(), 1.0);
        assert_eq!(values(&b.logical_or(&b1(&[false, false])).unwrap()), vec![1.0, 0.0]);
        assert_eq!(values(&b.logical_not().unwrap()), vec![0.0, 1.0]);
        assert_eq!(b.bool().unwrap().dtype(), NdDType::Bool);
    }

    #[test]
    fn test_unary_math() {
        let a = t1(&[0.0, 0.5]);
        assert_close(&values(&a.arctanh().unwrap()), &[0.0, 0.5f64.atanh()], 1e-12);
        assert_close(&values(&a.log1p().unwrap()), &[0.0, 1.5f64.ln()], 1e-12);
        assert_close(&values(&t1(&[8.0]).log2().unwrap()), &[3.0], 1e-12);
        assert_close(&values(&t1(&[100.0]).log10().unwrap()), &[2.0], 1e-12);
        assert_eq!(values(&t1(&[-2.0, 5.0, 0.5]).clip(-1.0, 1.0).unwrap()), vec![-1.0, 1.0, 0.5]);
        assert_eq!(values(&t1(&[-3.0]).square().unwrap()), vec![9.0]);
        assert_eq!(values(&t1(&[-3.0]).abs().unwrap()), vec![3.0]);
        assert_eq!(values(&t1(&[f64::NAN, 1.0]).isnan().unwrap()), vec![1.0, 0.0]);
        assert_eq!(values(&t1(&[f64::INFINITY, 1.0]).isinf().unwrap()), vec![1.0, 0.0]);
        assert_eq!(i1(&[1, 2]).exp().unwrap().dtype(), NdDType::F64);
        assert!(b1(&[true]).neg().unwrap_err().is_validation());
    }

    #[test]
    fn test_minimum_maximum_propagate_nan() {
        let a = t1(&[1.0, f64::NAN, 3.0]);
        let b = t1(&[2.0, 0.0, f64::NAN]);
        let lo = values(&a.minimum(&b).unwrap());
        assert_eq!(lo[0], 1.0);
        assert!(lo[1].is_nan() && lo[2].is_nan());
        assert_eq!(values(&a.maximum(2.5).unwrap())[2], 3.0);
    }

    #[test]
    fn test_construction() {
        let x = NdArrayTensor::from(arr1(&[1i32, 2]).into_dyn());
        let ones = x.ones(&[2, 3]).unwrap();
        assert_eq!(ones.dtype(), NdDType::I32);
        assert_eq!(ones.shape(), vec![2, 3]);
        assert_eq!(values(&x.full_like(7.0).unwrap()), vec![7.0, 7.0]);
        assert_eq!(x.zeros_like().unwrap().shape(), vec![2]);

        let r = x.arange(0.0, 5.0, 2.0).unwrap();
        assert_eq!(r.dtype(), NdDType::I64);
        assert_eq!(values(&r), vec![0.0, 2.0, 4.0]);
        let r = x.arange(0.0, 1.0, 0.25).unwrap();
        assert_eq!(r.dtype(), NdDType::F64);
        assert_eq!(r.len(), 4);
        assert!(x.arange(0.0, 1.0, 0.0).unwrap_err().is_validation());
        assert_eq!(x.arange(5.0, 0.0, 1.0).unwrap().len(), 0);
    }

    #[test]
    fn test_random() {
        let x = t1(&[0.0]);
        let u = x.uniform(&[100], -1.0, 1.0).unwrap();
        assert_eq!(u.shape(), vec![100]);
        assert!(values(&u).iter().all(|v| (-1.0..1.0).contains(v)));
        assert!(x.uniform(&[2], 1.0, 1.0).unwrap_err().is_validation());
        let n = x.normal(&[4, 5], 2.0, 0.5).unwrap();
        assert_eq!(n.shape(), vec![4, 5]);
        assert!(x.normal(&[1], 0.0, -1.0).unwrap_err().is_validation());
    }

    #[test]
    fn test_onehot_like() {
        let logits = NdArrayTensor::from(ArrayD::<f32>::zeros(IxDyn(&[3, 4])));
        let out = logits.onehot_like(&i1(&[0, 3, 1]), 2.0).unwrap();
        assert_eq!(out.dtype(), NdDType::F32);
        assert_eq!(values(&out.sum(1, false).unwrap()), vec![2.0, 2.0, 2.0]);
        assert_eq!(values(&out.index(&Index::Int(1)).unwrap()), vec![0.0, 0.0, 0.0, 2.0]);
        assert!(logits.onehot_like(&i1(&[0, 1]), 1.0).unwrap_err().is_validation());
        assert!(logits.onehot_like(&i1(&[0, 1, 4]), 1.0).unwrap_err().is_validation());
        assert!(t1(&[0.0]).onehot_like(&i1(&[0]), 1.0).unwrap_err().is_validation());
    }

    #[test]
    fn test_structural() {
        let a = NdArrayTensor::from(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn());
        assert_eq!(a.transpose(None).unwrap().shape(), vec![3, 2]);
        assert_eq!(values(&a.transpose(Some(&[1, 0][..])).unwrap()), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(a.transpose(Some(&[0, 0][..])).unwrap_err().is_validation());

        let e = a.expand_dims(0).unwrap();
        assert_eq!(e.shape(), vec![1, 2, 3]);
        assert_eq!(a.expand_dims(-1).unwrap().shape(), vec![2, 3, 1]);
        assert_eq!(e.squeeze(Axes::All).unwrap().shape(), vec![2, 3]);
        assert!(e.squeeze(1).unwrap_err().is_validation());

        assert_eq!(a.reshape(&[3, -1]).unwrap().shape(), vec![3, 2]);
        assert_eq!(a.tile(&[2, 1]).unwrap().shape(), vec![4, 3]);
        assert!(a.tile(&[2]).unwrap_err().is_validation());
        assert_eq!(values(&a.flip(1).unwrap())[..3], [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_concatenate_and_stack() {
        let a = t1(&[1.0, 2.0]);
        let b = NdArrayTensor::from(arr1(&[3i32]).into_dyn());
        let c = NdArrayTensor::concatenate(&[a.clone(), b], 0).unwrap();
        assert_eq!(c.dtype(), NdDType::F64);
        assert_eq!(values(&c), vec![1.0, 2.0, 3.0]);

        let s = NdArrayTensor::stack(&[a.clone(), a.clone()], 1).unwrap();
        assert_eq!(s.shape(), vec![2, 2]);
        assert!(NdArrayTensor::concatenate(&[], 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_pad() {
        let a = NdArrayTensor::from(ArrayD::from_shape_vec(IxDyn(&[1, 1, 3]), vec![1.0, 2.0, 3.0]).unwrap());
        let p = a.pad(&[(0, 0), (0, 0), (1, 1)], "constant", 9.0).unwrap();
        assert_eq!(values(&p), vec![9.0, 1.0, 2.0, 3.0, 9.0]);
        let r = a.pad(&[(0, 0), (0, 0), (2, 1)], "reflect", 0.0).unwrap();
        assert_eq!(values(&r), vec![3.0, 2.0, 1.0, 2.0, 3.0, 2.0]);
        assert!(a.pad(&[(1, 1)], "constant", 0.0).unwrap_err().is_validation());
        assert!(a.pad(&[(0, 0), (0, 0), (1, 1)], "edge", 0.0).unwrap_err().is_validation());
        assert!(t1(&[1.0, 2.0]).pad(&[(1, 1)], "reflect", 0.0).unwrap_err().is_not_implemented());
    }

    #[test]
    fn test_meshgrid() {
        let x = t1(&[1.0, 2.0, 3.0]);
        let y = t1(&[4.0, 5.0]);
        let xy = x.meshgrid(&[y.clone()], "xy").unwrap();
        assert_eq!(xy[0].shape(), vec![2, 3]);
        assert_eq!(values(&xy[1]), vec![4.0, 4.0, 4.0, 5.0, 5.0, 5.0]);
        let ij = x.meshgrid(&[y.clone()], "ij").unwrap();
        assert_eq!(ij[0].shape(), vec![3, 2]);
        assert!(x.meshgrid(&[y], "yx").unwrap_err().is_validation());
    }

    #[test]
    fn test_basic_indexing() {
        let a = NdArrayTensor::from(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn());
        assert_eq!(values(&a.index(&Index::Int(-1)).unwrap()), vec![4.0, 5.0, 6.0]);
        let col = a.index(&Index::Tuple(vec![IndexItem::Slice(Slice::full()), IndexItem::Int(1)])).unwrap();
        assert_eq!(values(&col), vec![2.0, 5.0]);
        let rev = a.index(&Index::Tuple(vec![IndexItem::Int(0), IndexItem::Slice(Slice::new(None, None, Some(-1)))]));
        assert_eq!(values(&rev.unwrap()), vec![3.0, 2.0, 1.0]);
        assert!(a.index(&Index::Int(2)).unwrap_err().is_validation());
        assert!(a
            .index(&Index::Tuple(vec![IndexItem::Int(0), IndexItem::Int(0), IndexItem::Int(0)]))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_advanced_indexing() {
        let a = NdArrayTensor::from(arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).into_dyn());
        let rows = a.index(&Index::Tensor(i1(&[2, 0]))).unwrap();
        assert_eq!(rows.shape(), vec![2, 2]);
        assert_eq!(values(&rows), vec![5.0, 6.0, 1.0, 2.0]);

        let points = a.index(&Index::Tuple(vec![IndexItem::Tensor(i1(&[0, 1, 2])), IndexItem::Tensor(i1(&[1, 0, 1]))]));
        assert_eq!(values(&points.unwrap()), vec![2.0, 3.0, 6.0]);

        let mask = a.gt(3.5).unwrap();
        assert_eq!(values(&a.index(&Index::Tensor(mask)).unwrap()), vec![4.0, 5.0, 6.0]);

        let mixed = a.index(&Index::Tuple(vec![IndexItem::Tensor(i1(&[0])), IndexItem::Slice(Slice::full())]));
        assert!(mixed.unwrap_err().is_not_implemented());
    }

    #[test]
    fn test_index_update_copies() {
        let a = NdArrayTensor::from(arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn());
        let b = a.index_update(&Index::Int(0), 0.0).unwrap();
        assert_eq!(values(&b), vec![0.0, 0.0, 3.0, 4.0]);
        assert_eq!(values(&a), vec![1.0, 2.0, 3.0, 4.0]);

        let col = Index::Tuple(vec![IndexItem::Slice(Slice::full()), IndexItem::Int(1)]);
        let c = a.index_update(&col, &t1(&[7.0, 8.0])).unwrap();
        assert_eq!(values(&c), vec![1.0, 7.0, 3.0, 8.0]);

        let pts = Index::Tuple(vec![IndexItem::Tensor(i1(&[0, 1])), IndexItem::Tensor(i1(&[1, 0]))]);
        let d = a.index_update(&pts, -1.0).unwrap();
        assert_eq!(values(&d), vec![1.0, -1.0, -1.0, 4.0]);

        let ints = NdArrayTensor::from(arr1(&[1i32, 2, 3]).into_dyn());
        let e = ints.index_update(&Index::Tensor(b1(&[true, false, true])), 9.0).unwrap();
        assert_eq!(e.dtype(), NdDType::I32);
        assert_eq!(values(&e), vec![9.0, 2.0, 9.0]);
    }

    #[test]
    fn test_softmax_and_crossentropy() {
        let logits = NdArrayTensor::from(arr2(&[[1000.0, 1000.0], [0.0, 1.0]]).into_dyn());
        let sm = values(&logits.softmax(-1).unwrap());
        assert_close(&sm[..2], &[0.5, 0.5], 1e-12);
        let lsm = values(&logits.log_softmax(1).unwrap());
        assert_close(&lsm[..2], &[-(2f64.ln()), -(2f64.ln())], 1e-9);

        let ce = logits.crossentropy(&i1(&[0, 1])).unwrap();
        assert_eq!(ce.shape(), vec![2]);
        let expected = (1.0 + 1f64.exp()).ln() - 1.0;
        assert_close(&values(&ce), &[2f64.ln(), expected], 1e-9);

        assert!(logits.crossentropy(&i1(&[0])).unwrap_err().is_validation());
        assert!(t1(&[1.0]).crossentropy(&i1(&[0])).unwrap_err().is_validation());
    }

    #[test]
    fn test_gradients_not_implemented() {
        let x = t1(&[1.0]);
        let err = x.value_and_grad(|x| x.square()?.sum(Axes::All, false)).unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn test_item() {
        assert_eq!(NdArrayTensor::from(arr0(2.5f64).into_dyn()).item().unwrap(), 2.5);
        assert!(t1(&[1.0, 2.0]).item().unwrap_err().is_validation());
    }
}
