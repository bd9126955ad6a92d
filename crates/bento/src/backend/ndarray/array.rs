//! Dtype-generic array routines behind the ndarray adapter.
//!
//! Everything here works on a single `ArrayD<T>`; dtype dispatch and
//! promotion happen in the adapter before these are called.

use ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD, Axis, Dimension, Ix2, IxDyn, Zip};
use crate::error::{Result, TensorError};
use crate::pad::{reflect_indices, PadMode};
use crate::shape::broadcast_shapes;
use super::native::{Element, FloatElement, Numeric};

pub(crate) fn filled<T: Element>(shape: &[usize], value: T) -> ArrayD<T> {
    ArrayD::from_elem(IxDyn(shape), value)
}

pub(crate) fn standard<T: Element>(a: ArrayViewD<'_, T>) -> ArrayD<T> {
    a.as_standard_layout().into_owned()
}

pub(crate) fn reshape<T: Element>(a: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>> {
    Ok(ArrayD::from_shape_vec(IxDyn(shape), a.iter().copied().collect())?)
}

pub(crate) fn permute<T: Element>(a: &ArrayD<T>, perm: &[usize]) -> ArrayD<T> {
    standard(a.view().permuted_axes(IxDyn(perm)))
}

/// Elementwise `f` over two arrays broadcast against each other
pub(crate) fn zip_with<A, B, C>(
    op: &'static str,
    lhs: &ArrayD<A>,
    rhs: &ArrayD<B>,
    f: impl Fn(A, B) -> C,
) -> Result<ArrayD<C>>
where
    A: Element,
    B: Element,
    C: Element,
{
    let shape = broadcast_shapes(op, lhs.shape(), rhs.shape())?;
    let l = lhs.broadcast(IxDyn(&shape)).ok_or_else(|| {
        TensorError::invalid(op, format!("cannot broadcast {:?} to {shape:?}", lhs.shape()))
    })?;
    let r = rhs.broadcast(IxDyn(&shape)).ok_or_else(|| {
        TensorError::invalid(op, format!("cannot broadcast {:?} to {shape:?}", rhs.shape()))
    })?;
    Ok(Zip::from(&l).and(&r).map_collect(|&x, &y| f(x, y)))
}

/// Reduce the given `axes` (sorted, unique) by mapping each lane of reduced
/// elements through `f`
pub(crate) fn reduce<T: Element, B: Element>(
    a: &ArrayD<T>,
    axes: &[usize],
    keepdims: bool,
    f: impl Fn(ArrayView1<'_, T>) -> B,
) -> Result<ArrayD<B>> {
    let shape = a.shape();
    let kept: Vec<usize> = (0..a.ndim()).filter(|d| !axes.contains(d)).collect();
    let perm: Vec<usize> = kept.iter().chain(axes).copied().collect();
    let mut lanes_shape: Vec<usize> = kept.iter().map(|&d| shape[d]).collect();
    lanes_shape.push(axes.iter().map(|&d| shape[d]).product());

    let lanes = reshape(&permute(a, &perm), &lanes_shape)?;
    let out = lanes.map_axis(Axis(lanes_shape.len() - 1), f);

    let out_shape: Vec<usize> = if keepdims {
        (0..a.ndim()).map(|d| if axes.contains(&d) { 1 } else { shape[d] }).collect()
    } else {
        kept.iter().map(|&d| shape[d]).collect()
    };
    reshape(&out, &out_shape)
}

/// Replace every lane along `axis` with `f(lane)`, which must keep its length
pub(crate) fn map_lanes<T: Element, B: Element>(
    a: &ArrayD<T>,
    axis: usize,
    f: impl Fn(ArrayView1<'_, T>) -> Vec<B>,
) -> Result<ArrayD<B>> {
    let ndim = a.ndim();
    let mut perm: Vec<usize> = (0..ndim).filter(|&d| d != axis).collect();
    perm.push(axis);
    let moved = permute(a, &perm);

    let mut data = Vec::with_capacity(a.len());
    for lane in moved.lanes(Axis(ndim - 1)) {
        data.extend(f(lane));
    }
    let out = ArrayD::from_shape_vec(IxDyn(moved.shape()), data)?;

    let mut inverse = vec![0; ndim];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    Ok(permute(&out, &inverse))
}

pub(crate) fn first_extreme<T: Element>(lane: ArrayView1<'_, T>, better: impl Fn(T, T) -> bool) -> i64 {
    let mut best = 0usize;
    if lane.is_empty() {
        return 0;
    }
    for (i, &v) in lane.iter().enumerate() {
        let current = lane[best];
        // NaN wins and stays
        if current != current {
            break;
        }
        if v != v || better(v, current) {
            best = i;
        }
    }
    best as i64
}

pub(crate) fn argsort_lane<T: Element>(lane: ArrayView1<'_, T>) -> Vec<i64> {
    let mut idx: Vec<usize> = (0..lane.len()).collect();
    // NaNs sort last
    idx.sort_by(|&i, &j| {
        let (a, b) = (lane[i], lane[j]);
        match (a != a, b != b) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            _ => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        }
    });
    idx.into_iter().map(|i| i as i64).collect()
}

pub(crate) fn cumsum_lane<T: Numeric>(lane: ArrayView1<'_, T>) -> Vec<T> {
    let mut acc = T::zero();
    lane.iter()
        .map(|&v| {
            acc = acc.add_wrapping(v);
            acc
        })
        .collect()
}

pub(crate) fn sum_lane<T: Numeric>(lane: ArrayView1<'_, T>) -> T {
    lane.fold(T::zero(), |s, &v| s.add_wrapping(v))
}

pub(crate) fn softmax_lane<T: FloatElement>(lane: ArrayView1<'_, T>) -> Vec<T> {
    // shift by the max logit so exp cannot overflow
    let m = lane.fold(T::neg_infinity(), |m, &v| m.max(v));
    let e: Vec<T> = lane.iter().map(|&v| (v - m).exp()).collect();
    let s = e.iter().fold(T::zero(), |s, &v| s + v);
    e.into_iter().map(|v| v / s).collect()
}

pub(crate) fn log_softmax_lane<T: FloatElement>(lane: ArrayView1<'_, T>) -> Vec<T> {
    let m = lane.fold(T::neg_infinity(), |m, &v| m.max(v));
    let log_sum_exp = lane.iter().fold(T::zero(), |s, &v| s + (v - m).exp()).ln();
    lane.iter().map(|&v| v - m - log_sum_exp).collect()
}

/// `ln(sum(exp(shifted))) - shifted[label]` for each row
pub(crate) fn crossentropy<T: FloatElement>(logits: &ArrayD<T>, labels: &[i64]) -> Result<ArrayD<T>> {
    let logits = logits.view().into_dimensionality::<Ix2>()?;
    let classes = logits.ncols();
    let mut out = Vec::with_capacity(labels.len());
    for (row, &label) in logits.outer_iter().zip(labels) {
        if label < 0 || label as usize >= classes {
            return Err(TensorError::invalid(
                "crossentropy",
                format!("label {label} is out of range for {classes} classes"),
            ));
        }
        let m = row.fold(T::neg_infinity(), |m, &v| m.max(v));
        let s = row.iter().fold(T::zero(), |s, &v| s + (v - m).exp());
        out.push(s.ln() - (row[label as usize] - m));
    }
    Ok(ArrayD::from_shape_vec(IxDyn(&[labels.len()]), out)?)
}

/// Repeat the tensor `multiples[d]` times along each axis `d`
pub(crate) fn tile<T: Element>(a: &ArrayD<T>, multiples: &[usize]) -> ArrayD<T> {
    let mut out = a.clone();
    for (axis, &m) in multiples.iter().enumerate() {
        let n = out.shape()[axis];
        let idx: Vec<usize> = (0..n * m).map(|i| i % n).collect();
        out = out.select(Axis(axis), &idx);
    }
    out
}

pub(crate) fn flip<T: Element>(a: &ArrayD<T>, axes: &[usize]) -> ArrayD<T> {
    let mut view = a.view();
    for &axis in axes {
        view.invert_axis(Axis(axis));
    }
    standard(view)
}

pub(crate) fn pad<T: Element>(
    a: &ArrayD<T>,
    paddings: &[(usize, usize)],
    mode: PadMode,
    value: T,
) -> ArrayD<T> {
    match mode {
        PadMode::Constant => {
            let shape: Vec<usize> = a
                .shape()
                .iter()
                .zip(paddings)
                .map(|(&n, &(before, after))| before + n + after)
                .collect();
            let mut out = filled(&shape, value);
            out.slice_each_axis_mut(|ad| {
                let (before, _) = paddings[ad.axis.index()];
                ndarray::Slice::from(before..before + a.shape()[ad.axis.index()])
            })
            .assign(a);
            out
        }
        PadMode::Reflect => {
            let mut out = a.clone();
            for (axis, &(before, after)) in paddings.iter().enumerate() {
                if before == 0 && after == 0 {
                    continue;
                }
                let idx = reflect_indices(out.shape()[axis], before, after);
                out = out.select(Axis(axis), &idx);
            }
            out
        }
    }
}

/// Per-axis selection for basic (int and slice) indexing
#[derive(Clone, Debug)]
pub(crate) enum AxisSelect {
    /// A single position; the axis is dropped
    At(usize),
    /// Positions kept in order; the axis stays
    Take(Vec<usize>),
}

/// Shape of `a[selection]`
pub(crate) fn selected_shape(shape: &[usize], selection: &[AxisSelect]) -> Vec<usize> {
    let mut out: Vec<usize> = selection
        .iter()
        .filter_map(|s| match s {
            AxisSelect::At(_) => None,
            AxisSelect::Take(idx) => Some(idx.len()),
        })
        .collect();
    out.extend_from_slice(&shape[selection.len()..]);
    out
}

pub(crate) fn take_basic<T: Element>(a: &ArrayD<T>, selection: &[AxisSelect]) -> ArrayD<T> {
    let mut out = a.clone();
    let mut axis = 0;
    for s in selection {
        match s {
            AxisSelect::At(i) => out = out.index_axis_move(Axis(axis), *i),
            AxisSelect::Take(idx) => {
                out = out.select(Axis(axis), idx);
                axis += 1;
            }
        }
    }
    out
}

/// Source coordinate of position `coords` in `a[selection]`
fn source_coords(selection: &[AxisSelect], coords: &[usize]) -> Vec<usize> {
    let mut src = Vec::with_capacity(coords.len() + selection.len());
    let mut k = 0;
    for s in selection {
        match s {
            AxisSelect::At(i) => src.push(*i),
            AxisSelect::Take(idx) => {
                src.push(idx[coords[k]]);
                k += 1;
            }
        }
    }
    src.extend_from_slice(&coords[k..]);
    src
}

/// Write `values` (broadcast to the selected region) into `a[selection]`
pub(crate) fn put_basic<T: Element>(
    a: &mut ArrayD<T>,
    selection: &[AxisSelect],
    values: &ArrayD<T>,
) -> Result<()> {
    let region = selected_shape(a.shape(), selection);
    let values = values.broadcast(IxDyn(&region)).ok_or_else(|| {
        TensorError::invalid(
            "index_update",
            format!("could not broadcast values of shape {:?} into {region:?}", values.shape()),
        )
    })?;
    for (coords, &v) in values.indexed_iter() {
        let src = source_coords(selection, coords.slice());
        a[src.as_slice()] = v;
    }
    Ok(())
}

/// Gather `a[c0, c1, ..]` for coordinate arrays of a common shape
pub(crate) fn take_points<T: Element>(a: &ArrayD<T>, coords: &[ArrayD<usize>]) -> Result<ArrayD<T>> {
    let point_shape = coords[0].shape().to_vec();
    let mut shape = point_shape.clone();
    shape.extend_from_slice(&a.shape()[coords.len()..]);

    let mut data = Vec::with_capacity(shape.iter().product());
    for (p, _) in coords[0].indexed_iter() {
        let mut view = a.view();
        for c in coords {
            view = view.index_axis_move(Axis(0), c[&p]);
        }
        data.extend(view.iter().copied());
    }
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// Scatter `values` into `a[c0, c1, ..]`; later points overwrite earlier ones
pub(crate) fn put_points<T: Element>(
    a: &mut ArrayD<T>,
    coords: &[ArrayD<usize>],
    values: &ArrayD<T>,
) -> Result<()> {
    let mut region = coords[0].shape().to_vec();
    region.extend_from_slice(&a.shape()[coords.len()..]);
    let values = values.broadcast(IxDyn(&region)).ok_or_else(|| {
        TensorError::invalid(
            "index_update",
            format!("could not broadcast values of shape {:?} into {region:?}", values.shape()),
        )
    })?;
    for (p, _) in coords[0].indexed_iter() {
        let mut dst = a.view_mut();
        for c in coords {
            dst = dst.index_axis_move(Axis(0), c[&p]);
        }
        let mut block = values.view();
        for &i in p.slice() {
            block = block.index_axis_move(Axis(0), i);
        }
        dst.assign(&block);
    }
    Ok(())
}

/// Coordinates of the `true` entries of `mask`, one array per mask axis
pub(crate) fn mask_coords(mask: &ArrayD<bool>) -> Vec<ArrayD<usize>> {
    let mut coords = vec![Vec::new(); mask.ndim()];
    for (p, &on) in mask.indexed_iter() {
        if on {
            for (axis, &i) in p.slice().iter().enumerate() {
                coords[axis].push(i);
            }
        }
    }
    coords
        .into_iter()
        .map(|c| Array1::from(c).into_dyn())
        .collect()
}

/// Output `i` of an `ij` (or `xy`, with the first two axes swapped) meshgrid
pub(crate) fn meshgrid_one<T: Element>(values: &ArrayD<T>, i: usize, lens: &[usize], xy: bool) -> ArrayD<T> {
    let k = lens.len();
    let axis_of = |j: usize| if xy && k >= 2 && j < 2 { 1 - j } else { j };
    let shape: Vec<usize> = (0..k).map(|axis| lens[axis_of(axis)]).collect();
    let flat: Vec<T> = values.iter().copied().collect();
    let axis = axis_of(i);
    ArrayD::from_shape_fn(IxDyn(&shape), |c| flat[c[axis]])
}

/// Elementwise minimum/maximum that propagates NaN
pub(crate) fn pick<T: Element>(x: T, y: T, take_x: impl Fn(T, T) -> bool) -> T {
    if x != x {
        x
    } else if y != y {
        y
    } else if take_x(x, y) {
        x
    } else {
        y
    }
}

/// The first extreme element of a lane, NaN if the lane holds one
pub(crate) fn lane_extreme<T: Element>(lane: ArrayView1<'_, T>, better: impl Fn(T, T) -> bool) -> T {
    lane[first_extreme(lane, better) as usize]
}

pub(crate) fn mean_lane<T: FloatElement>(lane: ArrayView1<'_, T>) -> T {
    let n = T::from_f64(lane.len() as f64);
    lane.fold(T::zero(), |s, &v| s + v) / n
}

pub(crate) fn clip<T: Element>(a: &ArrayD<T>, min: f64, max: f64) -> ArrayD<T> {
    let (lo, hi) = (T::from_f64(min), T::from_f64(max));
    a.mapv(|v| if v < lo { lo } else if v > hi { hi } else { v })
}
