//! Index expressions for `Tensor::index` and `Tensor::index_update`.
//!
//! These mirror Python subscripts: `Index::Int(1)` is `x[1]`,
//! `Index::Tuple(vec![Slice::full().into(), 0.into()])` is `x[:, 0]`.

use crate::error::{Result, TensorError};

/// A Python-style slice, `start:stop:step`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// `:`
    pub fn full() -> Self {
        Self::default()
    }

    /// `start:stop`
    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && matches!(self.step, None | Some(1))
    }

    /// Positions selected along an axis of length `len`, in selection order
    pub fn indices(&self, op: &'static str, len: usize) -> Result<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(TensorError::invalid(op, "slice step cannot be zero"));
        }
        let n = len as isize;
        let clamp = |v: isize, lo: isize, hi: isize| {
            let v = if v < 0 { v + n } else { v };
            v.clamp(lo, hi)
        };
        let (mut i, stop) = if step > 0 {
            (
                self.start.map_or(0, |s| clamp(s, 0, n)),
                self.stop.map_or(n, |s| clamp(s, 0, n)),
            )
        } else {
            (
                self.start.map_or(n - 1, |s| clamp(s, -1, n - 1)),
                self.stop.map_or(-1, |s| clamp(s, -1, n - 1)),
            )
        };
        let mut out = Vec::new();
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(i as usize);
            i += step;
        }
        Ok(out)
    }

    /// `Some((start, len))` when the slice is a contiguous forward run
    pub(crate) fn as_range(&self, op: &'static str, len: usize) -> Result<Option<(usize, usize)>> {
        if self.step.unwrap_or(1) != 1 {
            return Ok(None);
        }
        let idx = self.indices(op, len)?;
        Ok(Some((idx.first().copied().unwrap_or(0), idx.len())))
    }
}

/// One component of a tuple index
#[derive(Clone, Debug)]
pub enum IndexItem<T> {
    Int(isize),
    Slice(Slice),
    Tensor(T),
}

impl<T> IndexItem<T> {
    pub(crate) fn is_slice(&self) -> bool {
        matches!(self, IndexItem::Slice(_))
    }

    pub(crate) fn is_tensor(&self) -> bool {
        matches!(self, IndexItem::Tensor(_))
    }
}

impl<T> From<isize> for IndexItem<T> {
    fn from(i: isize) -> Self {
        IndexItem::Int(i)
    }
}

impl<T> From<Slice> for IndexItem<T> {
    fn from(s: Slice) -> Self {
        IndexItem::Slice(s)
    }
}

/// A subscript applied to a tensor
#[derive(Clone, Debug)]
pub enum Index<T> {
    /// `x[i]`
    Int(isize),
    /// `x[a:b:c]`
    Slice(Slice),
    /// `x[t]` with an integer or boolean tensor
    Tensor(T),
    /// `x[a, b, ...]`
    Tuple(Vec<IndexItem<T>>),
}

impl<T> Index<T> {
    /// The index as a list of per-axis items. `Tensor` stays a special case.
    pub(crate) fn items(&self) -> Option<Vec<IndexItem<&T>>> {
        match self {
            Index::Int(i) => Some(vec![IndexItem::Int(*i)]),
            Index::Slice(s) => Some(vec![IndexItem::Slice(*s)]),
            Index::Tensor(_) => None,
            Index::Tuple(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        IndexItem::Int(i) => IndexItem::Int(*i),
                        IndexItem::Slice(s) => IndexItem::Slice(*s),
                        IndexItem::Tensor(t) => IndexItem::Tensor(t),
                    })
                    .collect(),
            ),
        }
    }
}

impl<T> From<isize> for Index<T> {
    fn from(i: isize) -> Self {
        Index::Int(i)
    }
}

impl<T> From<Slice> for Index<T> {
    fn from(s: Slice) -> Self {
        Index::Slice(s)
    }
}

impl<T> From<Vec<IndexItem<T>>> for Index<T> {
    fn from(items: Vec<IndexItem<T>>) -> Self {
        Index::Tuple(items)
    }
}

/// Map a possibly negative position into `0..len`
pub(crate) fn normalize_index(op: &'static str, index: isize, len: usize) -> Result<usize> {
    let n = len as isize;
    let resolved = if index < 0 { index + n } else { index };
    if resolved < 0 || resolved >= n {
        return Err(TensorError::invalid(
            op,
            format!("index {index} is out of bounds for axis with size {len}"),
        ));
    }
    Ok(resolved as usize)
}
