use crate::error::{Result, TensorError};

/// Conversion between a wrapper and the native array it owns.
///
/// Every adapter operation follows the same shape: take the native array out of
/// each wrapper argument, call the framework, wrap the framework's result.
/// `delegate` and `delegate_with` are that round trip for one and two tensor
/// arguments; list arguments and results go through `unwrap_all` / `wrap_all`.
pub trait Wrap: Sized {
    /// The framework's own array type
    type Native;

    /// Take ownership of a native array
    fn wrap(native: Self::Native) -> Self;

    /// Borrow the native array
    fn native(&self) -> &Self::Native;

    /// Give up the wrapper, returning the native array
    fn into_native(self) -> Self::Native;

    /// Call `f` on the native array and wrap its result
    fn delegate<F, E>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(&Self::Native) -> std::result::Result<Self::Native, E>,
        TensorError: From<E>,
    {
        Ok(Self::wrap(f(self.native())?))
    }

    /// Call `f` on two native arrays and wrap its result
    fn delegate_with<F, E>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: FnOnce(&Self::Native, &Self::Native) -> std::result::Result<Self::Native, E>,
        TensorError: From<E>,
    {
        Ok(Self::wrap(f(self.native(), other.native())?))
    }

    fn wrap_all<I>(natives: I) -> Vec<Self>
    where
        I: IntoIterator<Item = Self::Native>,
    {
        natives.into_iter().map(Self::wrap).collect()
    }

    fn unwrap_all(tensors: &[Self]) -> Vec<&Self::Native> {
        tensors.iter().map(Self::native).collect()
    }
}
