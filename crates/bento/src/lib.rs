//! # Bento
//!
//! One tensor API, many array frameworks. Bento wraps the native arrays of
//! existing numerical libraries behind a single trait, so numeric code is
//! written once and runs unchanged on each of them.
//!
//! ## Overview
//!
//! Bento does not compute anything itself. Each backend maps the canonical
//! operations onto its framework's own array API and adds what the
//! frameworks disagree on:
//!
//! - Shape and dtype validation with one error taxonomy
//! - Numerically stable `softmax`, `log_softmax` and `crossentropy`
//! - Python style subscripts ([`Index`]) for reads and copy-on-write updates
//! - Gradients, where the framework records them
//!
//! ## Architecture
//!
//! ### Backend Traits
//!
//! [`backend::Tensor`] defines the canonical surface. [`backend::Wrap`]
//! is the unwrap, call, wrap round trip every operation goes through. A
//! tensor value owns exactly one native array and operations never mutate
//! it.
//!
//! ### Backends
//!
//! - [`backend::ndarray::NdArrayTensor`]: eager arrays with NumPy dtype rules
//! - `backend::candle::CandleTensor`: candle tensors with device pinned
//!   construction and autograd
//!
//! ## Features
//!
//! - **candle** - Enables candle backend (default)
//! - **cuda** - candle with CUDA devices
//! - **metal** - candle with Metal devices
//!
//! ## Example
//!
//! ```
//! use bento::backend::ndarray::NdArrayTensor;
//! use bento::backend::Tensor;
//! use bento::norms;
//! use ndarray::arr1;
//!
//! let x = NdArrayTensor::from(arr1(&[3.0, -4.0]).into_dyn());
//! let l2 = norms::l2(&x, bento::Axes::All, false)?;
//! assert_eq!(l2.item()?, 5.0);
//! # Ok::<(), bento::TensorError>(())
//! ```

pub mod backend;
pub mod error;
pub mod index;
pub mod norms;
pub mod pad;
pub mod shape;

pub use error::{Result, TensorError};
pub use index::{Index, IndexItem, Slice};
pub use pad::PadMode;
pub use shape::{Axes, Indexing};

#[cfg(test)]
pub(crate) mod testing {
    /// Elementwise `|a - e| < tol`
    pub(crate) fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len(), "length mismatch: {actual:?} vs {expected:?}");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            let diff = (a - e).abs();
            assert!(diff < tol, "[{i}]: actual={a}, expected={e}, diff={diff}");
        }
    }
}
