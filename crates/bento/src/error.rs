//! Error types shared by every adapter.

use thiserror::Error;

/// Result type for bento operations
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised by adapter operations.
///
/// The first two variants are validation failures, raised before any call into
/// the wrapped framework. `NotImplemented` marks a canonical operation that the
/// backend cannot express for the given input. The remaining variants carry an
/// error raised by the framework itself, untranslated.
#[derive(Error, Debug)]
pub enum TensorError {
    /// Malformed shapes, ranks, lengths or option strings
    #[error("{op}: {reason}")]
    Invalid {
        /// Operation that rejected its arguments
        op: &'static str,
        /// What was wrong
        reason: String,
    },

    /// A boolean-only operation received a non-boolean tensor
    #[error("{op} only supports dtype bool, got {dtype}; consider t.bool().{op}()")]
    NotBool {
        /// Operation that requires a boolean operand
        op: &'static str,
        /// Dtype that was supplied
        dtype: String,
    },

    /// The operation exists but this backend cannot express it for these inputs
    #[error("{op} is not implemented for the {backend} backend: {reason}")]
    NotImplemented {
        /// Operation name
        op: &'static str,
        /// Backend name
        backend: &'static str,
        /// Which input pattern is unsupported
        reason: String,
    },

    /// Shape error raised by ndarray
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// Error raised by candle
    #[cfg(feature = "candle")]
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

impl TensorError {
    pub(crate) fn invalid(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { op, reason: reason.into() }
    }

    pub(crate) fn not_implemented(
        op: &'static str,
        backend: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotImplemented { op, backend, reason: reason.into() }
    }

    /// `true` for errors raised by argument validation
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::NotBool { .. })
    }

    /// `true` when the backend cannot express the requested operation
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    /// `true` for errors propagated unchanged from the wrapped framework
    pub fn is_backend(&self) -> bool {
        !self.is_validation() && !self.is_not_implemented()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        let e = TensorError::invalid("pad", "bad mode");
        assert!(e.is_validation());
        assert!(!e.is_backend());
        assert_eq!(e.to_string(), "pad: bad mode");

        let e = TensorError::NotBool { op: "all", dtype: "F32".into() };
        assert!(e.is_validation());
        assert!(e.to_string().contains("t.bool().all()"));

        let e = TensorError::not_implemented("index_update", "candle", "slice");
        assert!(e.is_not_implemented());
        assert!(!e.is_validation());
    }
}
