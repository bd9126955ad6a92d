//! Axis and shape arithmetic shared by the adapters.
//!
//! Axes are `isize` so callers can count from the end (`-1` is the last axis),
//! the way every wrapped framework accepts them.

use std::str::FromStr;
use crate::error::{Result, TensorError};

/// Axes selected by a reduction or structural operation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Axes {
    /// Every axis of the tensor
    #[default]
    All,
    /// The listed axes; negative entries count from the end
    Some(Vec<isize>),
}

impl Axes {
    /// Resolve against a tensor of rank `ndim`, returning sorted, unique axes
    pub fn resolve(&self, op: &'static str, ndim: usize) -> Result<Vec<usize>> {
        match self {
            Axes::All => Ok((0..ndim).collect()),
            Axes::Some(axes) => {
                let mut out = axes
                    .iter()
                    .map(|&a| normalize_axis(op, a, ndim))
                    .collect::<Result<Vec<_>>>()?;
                out.sort_unstable();
                let before = out.len();
                out.dedup();
                if out.len() != before {
                    return Err(TensorError::invalid(op, "repeated axis"));
                }
                Ok(out)
            }
        }
    }
}

impl From<isize> for Axes {
    fn from(axis: isize) -> Self {
        Axes::Some(vec![axis])
    }
}

impl From<Option<isize>> for Axes {
    fn from(axis: Option<isize>) -> Self {
        axis.map_or(Axes::All, Axes::from)
    }
}

impl From<Vec<isize>> for Axes {
    fn from(axes: Vec<isize>) -> Self {
        Axes::Some(axes)
    }
}

impl From<&[isize]> for Axes {
    fn from(axes: &[isize]) -> Self {
        Axes::Some(axes.to_vec())
    }
}

impl<const N: usize> From<[isize; N]> for Axes {
    fn from(axes: [isize; N]) -> Self {
        Axes::Some(axes.to_vec())
    }
}

/// Coordinate convention for `meshgrid`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indexing {
    /// Cartesian: the first two output axes are swapped
    Xy,
    /// Matrix: output axis `i` runs along input `i`
    Ij,
}

impl FromStr for Indexing {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "xy" => Ok(Indexing::Xy),
            "ij" => Ok(Indexing::Ij),
            other => Err(TensorError::invalid(
                "meshgrid",
                format!("indexing must be 'xy' or 'ij', got '{other}'"),
            )),
        }
    }
}

/// Map a possibly negative `axis` into `0..ndim`
pub fn normalize_axis(op: &'static str, axis: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    let resolved = if axis < 0 { axis + n } else { axis };
    if resolved < 0 || resolved >= n {
        return Err(TensorError::invalid(
            op,
            format!("axis {axis} is out of bounds for tensor of rank {ndim}"),
        ));
    }
    Ok(resolved as usize)
}

/// Resolve a reshape target with at most one `-1` entry
pub fn infer_reshape(numel: usize, shape: &[isize]) -> Result<Vec<usize>> {
    let mut hole = None;
    let mut known = 1usize;
    for (i, &d) in shape.iter().enumerate() {
        match d {
            -1 if hole.is_none() => hole = Some(i),
            -1 => return Err(TensorError::invalid("reshape", "can only specify one unknown dimension")),
            d if d < 0 => return Err(TensorError::invalid("reshape", format!("invalid dimension {d}"))),
            d => known *= d as usize,
        }
    }
    let mut out: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    if let Some(i) = hole {
        if known == 0 || numel % known != 0 {
            return Err(TensorError::invalid(
                "reshape",
                format!("cannot reshape {numel} elements into {shape:?}"),
            ));
        }
        out[i] = numel / known;
    } else if known != numel {
        return Err(TensorError::invalid(
            "reshape",
            format!("cannot reshape {numel} elements into {shape:?}"),
        ));
    }
    Ok(out)
}

/// NumPy broadcasting of two shapes
pub fn broadcast_shapes(op: &'static str, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0; rank];
    for i in 0..rank {
        let l = if i < rank - lhs.len() { 1 } else { lhs[i - (rank - lhs.len())] };
        let r = if i < rank - rhs.len() { 1 } else { rhs[i - (rank - rhs.len())] };
        out[i] = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => {
                return Err(TensorError::invalid(
                    op,
                    format!("shapes {lhs:?} and {rhs:?} cannot be broadcast together"),
                ))
            }
        };
    }
    Ok(out)
}

/// Check that `perm` is a permutation of `0..ndim`
pub(crate) fn check_permutation(op: &'static str, perm: &[usize], ndim: usize) -> Result<()> {
    let mut seen = vec![false; ndim];
    if perm.len() != ndim {
        return Err(TensorError::invalid(op, format!("axes {perm:?} don't match tensor of rank {ndim}")));
    }
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(TensorError::invalid(op, format!("axes {perm:?} are not a permutation")));
        }
        seen[p] = true;
    }
    Ok(())
}
