//! candle backend, the graph-framework adapter.
//!
//! candle has no boolean dtype; comparison kernels produce `U8` masks, so
//! `U8` doubles as the boolean dtype here. Creation ops run on the device of
//! `self`. Gradients come from candle's autograd through [`candle_core::Var`].

mod dtype;
mod index;

use candle_core::{DType, Device, Tensor as Native, Var};
use ndarray::{ArrayD, Axis, IxDyn};
use tracing::{debug, trace};

use crate::error::{Result, TensorError};
use crate::index::Index;
use crate::pad::{check_pad, reflect_indices, PadMode};
use crate::shape::{check_permutation, infer_reshape, normalize_axis, Axes, Indexing};
use super::core_trait::{
    assert_bool, assert_bool_operand, check_crossentropy, check_nonempty, check_onehot, check_tile,
};
use super::{Operand, Tensor, Wrap};
use dtype::{float_for, is_int};

pub use dtype::promote;

/// A tensor backed by a `candle_core::Tensor`
#[derive(Clone, Debug)]
pub struct CandleTensor {
    native: Native,
}

impl Wrap for CandleTensor {
    type Native = Native;

    fn wrap(native: Native) -> Self {
        Self { native }
    }

    fn native(&self) -> &Native {
        &self.native
    }

    fn into_native(self) -> Native {
        self.native
    }
}

impl From<Native> for CandleTensor {
    fn from(native: Native) -> Self {
        Self::wrap(native)
    }
}

impl std::fmt::Display for CandleTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CandleTensor({})", self.native)
    }
}

#[derive(Clone, Copy)]
enum Compare {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CandleTensor {
    fn device(&self) -> &Device {
        self.native.device()
    }

    /// A 0-d tensor holding `value` in `dtype`, on this tensor's device
    fn scalar(&self, value: f64, dtype: DType) -> Result<Native> {
        Ok(Native::new(value, self.device())?.to_dtype(dtype)?)
    }

    fn operand(&self, other: Operand<'_, Self>) -> Result<Native> {
        match other {
            Operand::Tensor(t) => Ok(t.native.clone()),
            Operand::Scalar(v) => self.scalar(v, self.native.dtype()),
        }
    }

    /// Apply `f` to this tensor and `other`; scalars take this tensor's dtype
    fn binary<F>(&self, other: Operand<'_, Self>, f: F) -> Result<Self>
    where
        F: FnOnce(&Native, &Native) -> candle_core::Result<Native>,
    {
        match other {
            Operand::Tensor(t) => self.delegate_with(t, f),
            Operand::Scalar(v) => self.delegate_with(&Self::wrap(self.scalar(v, self.native.dtype())?), f),
        }
    }

    /// Float version of this tensor; integers become `F32`
    fn floating(&self) -> Result<Native> {
        let dtype = float_for(self.native.dtype());
        Ok(self.native.to_dtype(dtype)?)
    }

    fn compare(&self, other: Operand<'_, Self>, cmp: Compare) -> Result<Self> {
        let rhs = self.operand(other)?;
        let (l, r) = (self.native.dtype(), rhs.dtype());
        let common = promote(l, r);
        if l != r {
            debug!(lhs = ?l, rhs = ?r, common = ?common, "promoting comparison operands");
        }
        let (a, b) = (self.native.to_dtype(common)?, rhs.to_dtype(common)?);
        let out = match cmp {
            Compare::Lt => a.broadcast_lt(&b)?,
            Compare::Le => a.broadcast_le(&b)?,
            Compare::Eq => a.broadcast_eq(&b)?,
            Compare::Ne => a.broadcast_ne(&b)?,
            Compare::Gt => a.broadcast_gt(&b)?,
            Compare::Ge => a.broadcast_ge(&b)?,
        };
        Ok(Self::wrap(out))
    }

    fn flat_or_axis(&self, op: &'static str, axis: Option<isize>) -> Result<(Native, usize)> {
        match axis {
            None => Ok((self.native.flatten_all()?, 0)),
            Some(axis) => Ok((self.native.clone(), normalize_axis(op, axis, self.ndim())?)),
        }
    }

    /// Min or max over several axes, one axis at a time
    fn reduce_extreme(&self, op: &'static str, axis: Axes, keepdims: bool, smaller: bool) -> Result<Self> {
        let axes = axis.resolve(op, self.ndim())?;
        let dims = self.shape();
        if axes.iter().any(|&d| dims[d] == 0) {
            return Err(TensorError::invalid(op, "zero-size array to reduction operation which has no identity"));
        }
        let mut out = self.native.clone();
        for &d in &axes {
            out = if smaller { out.min_keepdim(d)? } else { out.max_keepdim(d)? };
        }
        if !keepdims {
            for &d in axes.iter().rev() {
                out = out.squeeze(d)?;
            }
        }
        Ok(Self::wrap(out))
    }

    fn arg_extreme(&self, op: &'static str, axis: Option<isize>, smaller: bool) -> Result<Self> {
        let (x, axis) = self.flat_or_axis(op, axis)?;
        if x.dims()[axis] == 0 {
            return Err(TensorError::invalid(op, format!("attempt to get {op} of an empty sequence")));
        }
        let out = if smaller { x.argmin(axis)? } else { x.argmax(axis)? };
        Ok(Self::wrap(out.to_dtype(DType::I64)?))
    }

    fn reduced_sum(x: &Native, axes: Vec<usize>, keepdims: bool) -> Result<Native> {
        if axes.is_empty() {
            return Ok(x.clone());
        }
        Ok(if keepdims { x.sum_keepdim(axes)? } else { x.sum(axes)? })
    }

    /// Count of set entries compared against `threshold` over `axes`
    fn count_set(&self, op: &'static str, axis: Axes, keepdims: bool) -> Result<(Native, usize)> {
        assert_bool(op, self)?;
        let axes = axis.resolve(op, self.ndim())?;
        let dims = self.shape();
        let reduced: usize = axes.iter().map(|&d| dims[d]).product();
        let ones = self.native.ne(0u8)?.to_dtype(DType::I64)?;
        Ok((Self::reduced_sum(&ones, axes, keepdims)?, reduced))
    }

    fn fill(&self, shape: &[usize], value: f64, dtype: DType) -> Result<Native> {
        trace!(device = ?self.device(), ?shape, "filling on device");
        Ok(Native::full(value, shape, self.device())?.to_dtype(dtype)?.contiguous()?)
    }

    fn logical(&self, op: &'static str, other: Operand<'_, Self>, and: bool) -> Result<Self> {
        assert_bool(op, self)?;
        assert_bool_operand(op, other)?;
        let rhs = match other {
            Operand::Tensor(t) => t.native.clone(),
            Operand::Scalar(v) => self.scalar(if v != 0.0 { 1.0 } else { 0.0 }, DType::U8)?,
        };
        let out = if and { self.native.broadcast_minimum(&rhs)? } else { self.native.broadcast_maximum(&rhs)? };
        Ok(Self::wrap(out))
    }

    /// Apply a float-only function, casting integer tensors first
    fn float_map(&self, f: impl FnOnce(&Native) -> candle_core::Result<Native>) -> Result<Self> {
        Ok(Self::wrap(f(&self.floating()?)?))
    }

    fn cat_along(parts: &[Native], axis: usize) -> Result<Native> {
        Ok(Native::cat(parts, axis)?)
    }
}

impl Tensor for CandleTensor {
    type DType = DType;

    const BOOL: DType = DType::U8;

    const BACKEND: &'static str = "candle";

    fn shape(&self) -> Vec<usize> {
        self.native.dims().to_vec()
    }

    fn dtype(&self) -> DType {
        self.native.dtype()
    }

    fn numpy(&self) -> Result<ArrayD<f64>> {
        let values = self.native.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
        Ok(ArrayD::from_shape_vec(IxDyn(self.native.dims()), values)?)
    }

    fn item(&self) -> Result<f64> {
        if self.size() != 1 {
            return Err(TensorError::invalid("item", "can only convert a tensor of size 1 to a scalar"));
        }
        let values = self.native.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
        values
            .first()
            .copied()
            .ok_or_else(|| TensorError::invalid("item", "tensor holds no value"))
    }

    fn from_numpy(&self, array: &ArrayD<f64>) -> Result<Self> {
        trace!(device = ?self.device(), shape = ?array.shape(), "uploading array");
        let values: Vec<f64> = array.iter().copied().collect();
        Ok(Self::wrap(Native::from_vec(values, array.shape(), self.device())?))
    }

    fn reshape(&self, shape: &[isize]) -> Result<Self> {
        let dims = infer_reshape(self.size(), shape)?;
        self.delegate(|x| x.reshape(dims))
    }

    fn astype(&self, dtype: DType) -> Result<Self> {
        // U8 is the boolean dtype, so any nonzero value becomes 1
        if dtype == Self::BOOL {
            return self.delegate(|x| x.ne(0f64));
        }
        self.delegate(|x| x.to_dtype(dtype))
    }

    fn clip(&self, min: f64, max: f64) -> Result<Self> {
        let dtype = self.native.dtype();
        let (lo, hi) = (self.scalar(min, dtype)?, self.scalar(max, dtype)?);
        self.delegate(|x| x.broadcast_maximum(&lo)?.broadcast_minimum(&hi))
    }

    fn square(&self) -> Result<Self> {
        self.delegate(|x| x.mul(x))
    }

    fn arctanh(&self) -> Result<Self> {
        // 0.5 * ln((1 + x) / (1 - x))
        self.float_map(|x| x.affine(1.0, 1.0)?.div(&x.affine(-1.0, 1.0)?)?.log()?.affine(0.5, 0.0))
    }

    fn exp(&self) -> Result<Self> {
        self.float_map(|x| x.exp())
    }

    fn log(&self) -> Result<Self> {
        self.float_map(|x| x.log())
    }

    fn log2(&self) -> Result<Self> {
        self.float_map(|x| x.log()?.affine(std::f64::consts::LOG2_E, 0.0))
    }

    fn log10(&self) -> Result<Self> {
        self.float_map(|x| x.log()?.affine(std::f64::consts::LOG10_E, 0.0))
    }

    fn log1p(&self) -> Result<Self> {
        self.float_map(|x| x.affine(1.0, 1.0)?.log())
    }

    fn sqrt(&self) -> Result<Self> {
        self.float_map(|x| x.sqrt())
    }

    fn tanh(&self) -> Result<Self> {
        self.float_map(|x| x.tanh())
    }

    fn abs(&self) -> Result<Self> {
        match self.native.dtype() {
            DType::U8 | DType::U32 => Ok(self.clone()),
            _ => self.delegate(|x| x.abs()),
        }
    }

    fn neg(&self) -> Result<Self> {
        let dtype = self.native.dtype();
        if matches!(dtype, DType::U8 | DType::U32) {
            return Err(TensorError::invalid("neg", format!("unsigned dtype {dtype:?} cannot be negated")));
        }
        self.delegate(|x| x.zeros_like()?.sub(x))
    }

    fn isnan(&self) -> Result<Self> {
        if is_int(self.native.dtype()) {
            return self.delegate(|x| x.zeros_like()?.to_dtype(DType::U8));
        }
        self.delegate(|x| x.ne(x))
    }

    fn isinf(&self) -> Result<Self> {
        if is_int(self.native.dtype()) {
            return self.delegate(|x| x.zeros_like()?.to_dtype(DType::U8));
        }
        let inf = self.scalar(f64::INFINITY, self.native.dtype())?;
        self.delegate(|x| x.abs()?.broadcast_eq(&inf))
    }

    fn add<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_add(y))
    }

    fn sub<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_sub(y))
    }

    fn mul<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_mul(y))
    }

    fn div<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_div(y))
    }

    fn pow<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        let dtype = self.native.dtype();
        let base = self.native.to_dtype(DType::F64)?;
        let out = match other.into() {
            // elementwise powf keeps negative bases with integral exponents
            Operand::Scalar(e) => base.powf(e)?,
            Operand::Tensor(t) => base.broadcast_pow(&t.native.to_dtype(DType::F64)?)?,
        };
        Ok(Self::wrap(out.to_dtype(dtype)?))
    }

    fn minimum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_minimum(y))
    }

    fn maximum<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.binary(other.into(), |x, y| x.broadcast_maximum(y))
    }

    fn lt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Lt)
    }

    fn le<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Le)
    }

    fn eq<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Eq)
    }

    fn ne<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Ne)
    }

    fn gt<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Gt)
    }

    fn ge<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.compare(other.into(), Compare::Ge)
    }

    fn all(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let (count, reduced) = self.count_set("all", axis.into(), keepdims)?;
        Ok(Self::wrap(count.ge(reduced as i64)?))
    }

    fn any(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let (count, _) = self.count_set("any", axis.into(), keepdims)?;
        Ok(Self::wrap(count.gt(0i64)?))
    }

    fn logical_and<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.logical("logical_and", other.into(), true)
    }

    fn logical_or<'a>(&self, other: impl Into<Operand<'a, Self>>) -> Result<Self> where Self: 'a {
        self.logical("logical_or", other.into(), false)
    }

    fn logical_not(&self) -> Result<Self> {
        assert_bool("logical_not", self)?;
        self.delegate(|x| x.eq(0u8))
    }

    fn sum(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let axes = axis.into().resolve("sum", self.ndim())?;
        let x = if self.native.dtype() == DType::U8 {
            debug!("casting boolean tensor to i64 before sum");
            self.native.to_dtype(DType::I64)?
        } else {
            self.native.clone()
        };
        Ok(Self::wrap(Self::reduced_sum(&x, axes, keepdims)?))
    }

    fn mean(&self, axis: impl Into<Axes>, keepdims: bool) -> Result<Self> {
        let axes = axis.into().resolve("mean", self.ndim())?;
        let x = self.floating()?;
        if axes.is_empty() {
            return Ok(Self::wrap(x));
        }
        Ok(Self::wrap(if keepdims { x.mean_keepdim(axes)? } else { x.mean(axes)? }))
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
        let last = self.ndim() - 1;
        let x = self.native.transpose(axis, last)?.contiguous()?;
        let order = x.arg_sort_last_dim(true)?.transpose(axis, last)?.contiguous()?;
        Ok(Self::wrap(order.to_dtype(DType::I64)?))
    }

    fn cumsum(&self, axis: Option<isize>) -> Result<Self> {
        let (x, axis) = self.flat_or_axis("cumsum", axis)?;
        let dtype = x.dtype();
        if dtype.is_float() {
            return Ok(Self::wrap(x.cumsum(axis)?));
        }
        // integer sums accumulate on the host in i64, wrapping on overflow
        let mut acc = index::host_i64(&x)?;
        acc.accumulate_axis_inplace(Axis(axis), |&prev, cur| *cur = cur.wrapping_add(prev));
        let out_dtype = if dtype == DType::U8 { DType::I64 } else { dtype };
        let sums = Native::from_vec(acc.iter().copied().collect::<Vec<i64>>(), x.dims(), x.device())?;
        Ok(Self::wrap(sums.to_dtype(out_dtype)?))
    }

    fn ones(&self, shape: &[usize]) -> Result<Self> {
        trace!(device = ?self.device(), ?shape, "ones on device");
        Ok(Self::wrap(Native::ones(shape, self.native.dtype(), self.device())?))
    }

    fn zeros(&self, shape: &[usize]) -> Result<Self> {
        trace!(device = ?self.device(), ?shape, "zeros on device");
        Ok(Self::wrap(Native::zeros(shape, self.native.dtype(), self.device())?))
    }

    fn full(&self, shape: &[usize], value: f64) -> Result<Self> {
        Ok(Self::wrap(self.fill(shape, value, self.native.dtype())?))
    }

    fn ones_like(&self) -> Result<Self> {
        self.delegate(|x| x.ones_like())
    }

    fn zeros_like(&self) -> Result<Self> {
        self.delegate(|x| x.zeros_like())
    }

    fn full_like(&self, value: f64) -> Result<Self> {
        self.full(self.native.dims(), value)
    }

    fn arange(&self, start: f64, stop: f64, step: f64) -> Result<Self> {
        if step == 0.0 || !step.is_finite() {
            return Err(TensorError::invalid("arange", "step must be a finite, non-zero number"));
        }
        let n = ((stop - start) / step).ceil().max(0.0) as usize;
        let integral = [start, stop, step].iter().all(|v| v.fract() == 0.0);
        trace!(device = ?self.device(), n, "arange on device");
        let out = if integral {
            let values: Vec<i64> = (0..n).map(|i| (start + i as f64 * step) as i64).collect();
            Native::from_vec(values, n, self.device())?
        } else {
            let values: Vec<f32> = (0..n).map(|i| (start + i as f64 * step) as f32).collect();
            Native::from_vec(values, n, self.device())?
        };
        Ok(Self::wrap(out))
    }

    fn uniform(&self, shape: &[usize], low: f64, high: f64) -> Result<Self> {
        if !(low < high) || !(high - low).is_finite() {
            return Err(TensorError::invalid("uniform", format!("invalid range [{low}, {high})")));
        }
        trace!(device = ?self.device(), ?shape, "uniform on device");
        let dtype = float_for(self.native.dtype());
        Ok(Self::wrap(Native::rand(low, high, shape, self.device())?.to_dtype(dtype)?))
    }

    fn normal(&self, shape: &[usize], mean: f64, stddev: f64) -> Result<Self> {
        if !(stddev >= 0.0) || !stddev.is_finite() {
            return Err(TensorError::invalid("normal", format!("invalid standard deviation {stddev}")));
        }
        trace!(device = ?self.device(), ?shape, "normal on device");
        let dtype = float_for(self.native.dtype());
        Ok(Self::wrap(Native::randn(mean, stddev, shape, self.device())?.to_dtype(dtype)?))
    }

    fn onehot_like(&self, indices: &Self, value: f64) -> Result<Self> {
        check_onehot(self, indices)?;
        if !is_int(indices.native.dtype()) {
            return Err(TensorError::invalid("onehot_like", "indices must have an integer dtype"));
        }
        let columns = self.shape()[1];
        let host = index::host_i64(&indices.native)?;
        if let Some(&bad) = host.iter().find(|&&i| i < 0 || i as usize >= columns) {
            return Err(TensorError::invalid(
                "onehot_like",
                format!("index {bad} is out of bounds for {columns} columns"),
            ));
        }
        trace!(device = ?self.device(), "onehot on device");
        let idx = indices.native.to_dtype(DType::I64)?.to_device(self.device())?;
        let out = candle_nn::encoding::one_hot(idx, columns, value, 0.0)?;
        Ok(Self::wrap(out.to_dtype(self.native.dtype())?))
    }

    fn transpose(&self, axes: Option<&[usize]>) -> Result<Self> {
        let perm: Vec<usize> = match axes {
            Some(axes) => axes.to_vec(),
            None => (0..self.ndim()).rev().collect(),
        };
        check_permutation("transpose", &perm, self.ndim())?;
        self.delegate(|x| x.permute(perm))
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
        self.delegate(|x| x.reshape(dims))
    }

    fn expand_dims(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis("expand_dims", axis, self.ndim() + 1)?;
        self.delegate(|x| x.unsqueeze(axis))
    }

    fn tile(&self, multiples: &[usize]) -> Result<Self> {
        check_tile(self, multiples)?;
        if multiples.contains(&0) {
            let shape: Vec<usize> = self.shape().iter().zip(multiples).map(|(n, m)| n * m).collect();
            return self.zeros(&shape);
        }
        self.delegate(|x| x.repeat(multiples))
    }

    fn flip(&self, axis: impl Into<Axes>) -> Result<Self> {
        let axes = axis.into().resolve("flip", self.ndim())?;
        let mut out = self.native.clone();
        for d in axes {
            let n = out.dims()[d];
            let reversed: Vec<usize> = (0..n).rev().collect();
            out = index::select(&out, d, &reversed)?;
        }
        Ok(Self::wrap(out))
    }

    fn pad(&self, paddings: &[(usize, usize)], mode: &str, value: f64) -> Result<Self> {
        let mode = check_pad(Self::BACKEND, &self.shape(), paddings, mode)?;
        let mut out = self.native.clone();
        for (d, &(before, after)) in paddings.iter().enumerate() {
            if before == 0 && after == 0 {
                continue;
            }
            out = match mode {
                PadMode::Reflect => index::select(&out, d, &reflect_indices(out.dims()[d], before, after))?,
                PadMode::Constant => {
                    let mut edge = out.dims().to_vec();
                    let mut parts = Vec::with_capacity(3);
                    if before > 0 {
                        edge[d] = before;
                        parts.push(self.fill(&edge, value, out.dtype())?);
                    }
                    parts.push(out.clone());
                    if after > 0 {
                        edge[d] = after;
                        parts.push(self.fill(&edge, value, out.dtype())?);
                    }
                    Self::cat_along(&parts, d)?
                }
            };
        }
        Ok(Self::wrap(out))
    }

    fn concatenate(tensors: &[Self], axis: isize) -> Result<Self> {
        check_nonempty("concatenate", tensors)?;
        let axis = normalize_axis("concatenate", axis, tensors[0].ndim())?;
        Ok(Self::wrap(Native::cat(&Self::unwrap_all(tensors), axis)?))
    }

    fn stack(tensors: &[Self], axis: isize) -> Result<Self> {
        check_nonempty("stack", tensors)?;
        let axis = normalize_axis("stack", axis, tensors[0].ndim() + 1)?;
        Ok(Self::wrap(Native::stack(&Self::unwrap_all(tensors), axis)?))
    }

    fn meshgrid(&self, others: &[Self], indexing: &str) -> Result<Vec<Self>> {
        let xy = indexing.parse::<Indexing>()? == Indexing::Xy;
        let inputs: Vec<&Self> = std::iter::once(self).chain(others).collect();
        let k = inputs.len();
        let axis_of = |i: usize| if xy && k >= 2 && i < 2 { 1 - i } else { i };
        let lens: Vec<usize> = inputs.iter().map(|t| t.size()).collect();
        let shape: Vec<usize> = (0..k).map(|axis| lens[axis_of(axis)]).collect();

        let mut grids = Vec::with_capacity(k);
        for (i, t) in inputs.iter().enumerate() {
            let mut view = vec![1; k];
            view[axis_of(i)] = lens[i];
            grids.push(t.native.reshape(view)?.broadcast_as(shape.as_slice())?.contiguous()?);
        }
        Ok(Self::wrap_all(grids))
    }

    fn index(&self, index: &Index<Self>) -> Result<Self> {
        Ok(Self::wrap(index::read(self, index)?))
    }

    fn index_update<'a>(&self, index: &Index<Self>, values: impl Into<Operand<'a, Self>>) -> Result<Self>
    where
        Self: 'a,
    {
        let values = self.operand(values.into())?;
        Ok(Self::wrap(index::write(self, index, &values)?))
    }

    fn softmax(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis("softmax", axis, self.ndim())?;
        self.float_map(|x| candle_nn::ops::softmax(x, axis))
    }

    fn log_softmax(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis("log_softmax", axis, self.ndim())?;
        self.float_map(|x| candle_nn::ops::log_softmax(x, axis))
    }

    fn crossentropy(&self, labels: &Self) -> Result<Self> {
        check_crossentropy(self, labels)?;
        if !is_int(labels.native.dtype()) {
            return Err(TensorError::invalid("crossentropy", "labels must have an integer dtype"));
        }
        let classes = self.shape()[1];
        let host = index::host_i64(&labels.native)?;
        if let Some(&bad) = host.iter().find(|&&l| l < 0 || l as usize >= classes) {
            return Err(TensorError::invalid(
                "crossentropy",
                format!("label {bad} is out of range for {classes} classes"),
            ));
        }
        let labels = labels.native.to_dtype(DType::I64)?.unsqueeze(1)?.contiguous()?;
        self.float_map(|x| candle_nn::ops::log_softmax(x, 1)?.gather(&labels, 1)?.squeeze(1)?.neg())
    }

    fn value_and_grad<F>(&self, f: F) -> Result<(Self, Self)>
    where
        F: FnOnce(&Self) -> Result<Self>,
    {
        let (loss, (), grad) = self.value_aux_and_grad(|x| Ok((f(x)?, ())))?;
        Ok((loss, grad))
    }

    fn value_aux_and_grad<A, F>(&self, f: F) -> Result<(Self, A, Self)>
    where
        F: FnOnce(&Self) -> Result<(Self, A)>,
    {
        if !self.native.dtype().is_float() {
            return Err(TensorError::invalid("value_and_grad", "gradients require a floating point tensor"));
        }
        let var = Var::from_tensor(&self.native.copy()?)?;
        let x = Self::wrap(var.as_tensor().clone());
        let (loss, aux) = f(&x)?;
        debug!(loss_shape = ?loss.shape(), "running backward pass");
        let grads = loss.native.backward()?;
        let grad = match grads.get(var.as_tensor()) {
            Some(g) => g.clone(),
            // `f` never used its input
            None => self.native.zeros_like()?,
        };
        if grad.dims() != self.native.dims() {
            return Err(TensorError::invalid(
                "value_and_grad",
                format!("gradient shape {:?} does not match input shape {:?}", grad.dims(), self.native.dims()),
            ));
        }
        Ok((loss, aux, Self::wrap(grad)))
    }
}
