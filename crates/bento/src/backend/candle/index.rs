//! Subscript reads and writes for candle tensors.
//!
//! candle only slices along one axis at a time and has no fancy indexing.
//! Reads with tensor indices and scatter writes go through a flattened
//! `[rows, rest]` view: the addressed coordinates become linear row numbers
//! and the rows are moved with `index_select` and `where_cond`.

use candle_core::{DType, Device, Tensor};
use ndarray::{ArrayD, IxDyn};
use tracing::trace;

use crate::error::{Result, TensorError};
use crate::index::{normalize_index, Index, IndexItem};
use crate::shape::broadcast_shapes;
use super::dtype::is_int;
use super::CandleTensor;

const BACKEND: &str = "candle";

/// Copy an index tensor to the host as `i64`
pub(crate) fn host_i64(t: &Tensor) -> Result<ArrayD<i64>> {
    let values = t.to_dtype(DType::I64)?.flatten_all()?.to_vec1::<i64>()?;
    Ok(ArrayD::from_shape_vec(IxDyn(t.dims()), values)?)
}

fn u32_tensor(values: &[usize], device: &Device) -> Result<Tensor> {
    let values: Vec<u32> = values.iter().map(|&v| v as u32).collect();
    let n = values.len();
    Ok(Tensor::from_vec(values, n, device)?)
}

/// Pick `indices` along `dim`
pub(crate) fn select(t: &Tensor, dim: usize, indices: &[usize]) -> Result<Tensor> {
    Ok(t.index_select(&u32_tensor(indices, t.device())?, dim)?)
}

/// View `t` as `[product(dims[..k]), dims[k..]...]`
fn flatten_leading(t: &Tensor, k: usize) -> Result<Tensor> {
    let dims = t.dims();
    let mut shape = vec![dims[..k].iter().product::<usize>()];
    shape.extend_from_slice(&dims[k..]);
    Ok(t.reshape(shape)?)
}

/// Linear row numbers addressed by `coords` over the leading axes of `shape`
fn linear_rows(op: &'static str, shape: &[usize], coords: &[ArrayD<i64>]) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut common: Vec<usize> = Vec::new();
    for c in coords {
        common = broadcast_shapes(op, &common, c.shape())?;
    }
    let n: usize = common.iter().product();
    let mut rows = vec![0usize; n];
    for (axis, c) in coords.iter().enumerate() {
        let c = c.broadcast(IxDyn(&common)).ok_or_else(|| {
            TensorError::invalid(op, "index tensors could not be broadcast together")
        })?;
        let stride: usize = shape[axis + 1..coords.len()].iter().product();
        for (row, &v) in rows.iter_mut().zip(c.iter()) {
            *row += normalize_index(op, v as isize, shape[axis])? * stride;
        }
    }
    Ok((rows, common))
}

/// Gather `x[c0, c1, ..]` for integer coordinate tensors
fn gather_points(x: &Tensor, op: &'static str, coords: &[ArrayD<i64>]) -> Result<Tensor> {
    let shape = x.dims().to_vec();
    let (rows, common) = linear_rows(op, &shape, coords)?;
    trace!(points = rows.len(), "gathering by coordinate");
    let gathered = select(&flatten_leading(x, coords.len())?, 0, &rows)?;
    let mut out_shape = common;
    out_shape.extend_from_slice(&shape[coords.len()..]);
    Ok(gathered.reshape(out_shape)?)
}

/// Rows of `x` where the boolean `mask` is set
fn gather_mask(x: &Tensor, op: &'static str, mask: &Tensor) -> Result<Tensor> {
    let shape = x.dims();
    let m = mask.rank();
    if m == 0 || m > shape.len() || mask.dims() != &shape[..m] {
        return Err(TensorError::invalid(
            op,
            format!("boolean index of shape {:?} does not match tensor of shape {shape:?}", mask.dims()),
        ));
    }
    let flags = mask.flatten_all()?.to_vec1::<u8>()?;
    let rows: Vec<usize> = flags.iter().enumerate().filter(|&(_, &f)| f != 0).map(|(i, _)| i).collect();
    let gathered = select(&flatten_leading(x, m)?, 0, &rows)?;
    let mut out_shape = vec![rows.len()];
    out_shape.extend_from_slice(&shape[m..]);
    Ok(gathered.reshape(out_shape)?)
}

/// `x[index]`
pub(crate) fn read(x: &CandleTensor, index: &Index<CandleTensor>) -> Result<Tensor> {
    const OP: &str = "index";
    let native = &x.native;
    let Some(items) = index.items() else {
        let Index::Tensor(t) = index else {
            return Err(TensorError::invalid(OP, "unsupported index"));
        };
        return match t.native.dtype() {
            DType::U8 => gather_mask(native, OP, &t.native),
            d if is_int(d) => gather_points(native, OP, &[host_i64(&t.native)?]),
            d => Err(TensorError::invalid(OP, format!("index tensors must be integer or bool, got {d:?}"))),
        };
    };
    if items.len() > native.rank() {
        return Err(TensorError::invalid(
            OP,
            format!("too many indices: tensor is {}-dimensional, but {} were indexed", native.rank(), items.len()),
        ));
    }

    if items.iter().any(IndexItem::is_tensor) {
        let mut coords = Vec::with_capacity(items.len());
        for item in &items {
            coords.push(match item {
                IndexItem::Int(i) => ArrayD::from_elem(IxDyn(&[]), *i as i64),
                IndexItem::Tensor(t) if is_int(t.native.dtype()) => host_i64(&t.native)?,
                IndexItem::Tensor(_) => {
                    return Err(TensorError::invalid(OP, "tensors inside a tuple index must have an integer dtype"));
                }
                IndexItem::Slice(_) => {
                    return Err(TensorError::not_implemented(OP, BACKEND, "mixing slices with tensor indices"));
                }
            });
        }
        return gather_points(native, OP, &coords);
    }

    let mut out = native.clone();
    let mut dim = 0;
    for item in &items {
        let len = out.dims()[dim];
        match item {
            IndexItem::Int(i) => {
                let i = normalize_index(OP, *i, len)?;
                out = out.narrow(dim, i, 1)?.squeeze(dim)?;
            }
            IndexItem::Slice(s) => {
                out = match s.as_range(OP, len)? {
                    Some((start, n)) => out.narrow(dim, start, n)?,
                    None => select(&out, dim, &s.indices(OP, len)?)?,
                };
                dim += 1;
            }
            IndexItem::Tensor(_) => return Err(TensorError::invalid(OP, "unexpected tensor index")),
        }
    }
    Ok(out)
}

/// Replace row `i` of `x` with `values`
fn write_row(x: &Tensor, i: usize, values: &Tensor) -> Result<Tensor> {
    let dims = x.dims();
    let row = values.broadcast_as(&dims[1..])?.unsqueeze(0)?;
    let mut ranges = vec![i..i + 1];
    ranges.extend(dims[1..].iter().map(|&n| 0..n));
    Ok(x.slice_assign(ranges.as_slice(), &row)?)
}

/// Scatter `values` into the points of `x` addressed by `coords`; the last
/// write to a point wins
fn scatter_points(x: &Tensor, coords: &[ArrayD<i64>], values: &Tensor) -> Result<Tensor> {
    const OP: &str = "index_update";
    let shape = x.dims().to_vec();
    let (rows, common) = linear_rows(OP, &shape, coords)?;
    if rows.is_empty() {
        return Ok(x.clone());
    }
    let lead: usize = shape[..coords.len()].iter().product();
    let rest: usize = shape[coords.len()..].iter().product();

    let mut source = vec![None; lead];
    for (p, &row) in rows.iter().enumerate() {
        source[row] = Some(p);
    }
    let picks: Vec<usize> = source.iter().map(|s| s.unwrap_or(0)).collect();
    let flags: Vec<u8> = source.iter().map(|s| u8::from(s.is_some())).collect();
    trace!(points = rows.len(), rows = lead, "scattering by coordinate");

    let mut region = common;
    region.extend_from_slice(&shape[coords.len()..]);
    let updates = values.broadcast_as(region)?.reshape((rows.len(), rest))?;
    let updates = select(&updates, 0, &picks)?;
    let mask = Tensor::from_vec(flags, (lead, 1), x.device())?.broadcast_as((lead, rest))?;
    let flat = x.reshape((lead, rest))?;
    Ok(mask.where_cond(&updates, &flat)?.reshape(shape)?)
}

/// A copy of `x` with `values` written at `index`
pub(crate) fn write(x: &CandleTensor, index: &Index<CandleTensor>, values: &Tensor) -> Result<Tensor> {
    const OP: &str = "index_update";
    let native = &x.native;
    let values = values.to_dtype(native.dtype())?;
    match index {
        Index::Int(i) => {
            let Some(&len) = native.dims().first() else {
                return Err(TensorError::invalid(OP, "cannot index a 0-d tensor"));
            };
            trace!(row = i, "index_update on a row");
            write_row(native, normalize_index(OP, *i, len)?, &values)
        }
        Index::Tuple(items) if items.iter().any(IndexItem::is_slice) => match items.as_slice() {
            [IndexItem::Slice(s), IndexItem::Int(j)] if s.is_full() && native.rank() == 2 => {
                trace!(column = j, "index_update on a column");
                let j = normalize_index(OP, *j, native.dims()[1])?;
                let column_major = native.t()?.contiguous()?;
                Ok(write_row(&column_major, j, &values)?.t()?.contiguous()?)
            }
            _ => Err(TensorError::not_implemented(
                OP,
                BACKEND,
                "slices are only supported as x[:, i] on rank 2 tensors",
            )),
        },
        Index::Tuple(items) if !items.is_empty() && items.iter().all(IndexItem::is_tensor) => {
            if items.len() > native.rank() {
                return Err(TensorError::invalid(OP, "more index tensors than dimensions"));
            }
            let mut coords = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    IndexItem::Tensor(t) if is_int(t.native.dtype()) => coords.push(host_i64(&t.native)?),
                    _ => return Err(TensorError::invalid(OP, "index tensors must have an integer dtype")),
                }
            }
            scatter_points(native, &coords, &values)
        }
        _ => Err(TensorError::not_implemented(
            OP,
            BACKEND,
            "supported indices are x[i], x[:, i] and a tuple of integer tensors",
        )),
    }
}
