//! Padding modes and the argument checks shared by every adapter's `pad`.

use std::str::FromStr;
use crate::error::{Result, TensorError};

/// Supported `pad` modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadMode {
    /// Fill with a constant value
    Constant,
    /// Mirror the tensor without repeating the edge element
    Reflect,
}

impl FromStr for PadMode {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(PadMode::Constant),
            "reflect" => Ok(PadMode::Reflect),
            other => Err(TensorError::invalid(
                "pad",
                format!("pad requires mode 'constant' or 'reflect', got '{other}'"),
            )),
        }
    }
}

/// Validate `pad` arguments against a tensor of `shape`.
///
/// Reflect padding is limited to rank 3 and 4 tensors padded only along their
/// last two axes, the subset every backend can express.
pub(crate) fn check_pad(
    backend: &'static str,
    shape: &[usize],
    paddings: &[(usize, usize)],
    mode: &str,
) -> Result<PadMode> {
    if paddings.len() != shape.len() {
        return Err(TensorError::invalid("pad", "pad requires a tuple for each dimension"));
    }
    let mode = mode.parse::<PadMode>()?;
    if mode == PadMode::Reflect {
        let ndim = shape.len();
        if ndim != 3 && ndim != 4 {
            return Err(TensorError::not_implemented(
                "pad",
                backend,
                format!("reflect padding requires a rank 3 or 4 tensor, got rank {ndim}"),
            ));
        }
        if paddings[..ndim - 2].iter().any(|&p| p != (0, 0)) {
            return Err(TensorError::not_implemented(
                "pad",
                backend,
                "reflect padding is only supported along the last two dimensions",
            ));
        }
        for (&n, &(before, after)) in shape.iter().zip(paddings).skip(ndim - 2) {
            if before >= n.max(1) || after >= n.max(1) {
                return Err(TensorError::invalid(
                    "pad",
                    format!("reflect padding ({before}, {after}) must be smaller than the dimension {n}"),
                ));
            }
        }
    }
    Ok(mode)
}

/// Source positions for reflect padding an axis of length `n`
pub(crate) fn reflect_indices(n: usize, before: usize, after: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(before + n + after);
    out.extend((1..=before).rev());
    out.extend(0..n);
    out.extend((1..=after).map(|k| n - 1 - k));
    out
}
