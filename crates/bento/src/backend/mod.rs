//! # Tensor Backends
//!
//! This module provides one canonical tensor API over different array
//! frameworks, so numeric code can be written once and run on any of them.
//!
//! ## Feature Flags
//!
//! The module uses feature flags to conditionally compile support for different backends:
//!
//! - `candle`: Enables support for the Candle tensor library (default)
//! - `cuda`, `metal`: Forward to the matching candle device support
//!
//! The `ndarray` backend is always available.
//!
//! ## Usage
//!
//! 1. Import the [`Tensor`] trait
//! 2. Write code generic over `T: Tensor`
//! 3. Wrap a native array with [`Wrap::wrap`] (or `From`) and pass it in
//!
//! Every operation unwraps its tensor arguments, calls the framework, and
//! wraps the result again, so switching frameworks never changes application
//! code.

mod core_trait;
mod wrap;

/// NumPy-style eager backend over `ndarray`.
///
/// Always available. Gradients are not supported.
pub mod ndarray;

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle tensor backend implementation.
///
/// This module is only available when the `candle` feature flag is enabled.
/// It implements [`Tensor`] for a wrapper around candle's `Tensor`, with
/// autograd backed gradients and device pinned construction.
pub mod candle;

// Re-export the core traits for convenient imports
pub use core_trait::*;
pub use wrap::Wrap;
