// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store operations.

use thiserror::Error;

/// A boxed error from an underlying driver or codec.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a store operation.
///
/// Backends normalize their native signaling into these kinds. Driver errors that
/// have no canonical counterpart are forwarded unchanged as [`Error::Backend`]; use
/// [`std::error::Error::source()`] or downcasting to inspect them.
///
/// # Example
///
/// ```
/// use stowage_store::Error;
///
/// let error = Error::KeyNotFound;
/// assert!(error.is_not_found());
/// assert_eq!(error.to_string(), "key not found");
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No live (unexpired) entry exists for the key.
    #[error("key not found")]
    KeyNotFound,

    /// The stored payload could not be decoded into the requested type.
    #[error("unmarshal error")]
    Unmarshal(#[source] BoxError),

    /// The value could not be encoded for storage.
    #[error("marshal error")]
    Marshal(#[source] BoxError),

    /// The admission-controlled store refused the write.
    #[error("write rejected: cost {cost} exceeds the maximum cost of {max_cost}")]
    Rejected {
        /// The cost of the refused entry.
        cost: u64,
        /// The total cost budget of the store.
        max_cost: u64,
    },

    /// An error reported by the backend's client library, forwarded unchanged.
    #[error(transparent)]
    Backend(BoxError),
}

impl Error {
    /// Wraps a client library error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_store::Error;
    ///
    /// let io = std::io::Error::other("connection reset");
    /// let error = Error::backend(io);
    /// assert!(error.to_string().contains("connection reset"));
    /// ```
    pub fn backend(cause: impl Into<BoxError>) -> Self {
        Self::Backend(cause.into())
    }

    /// Returns `true` if this is [`Error::KeyNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }
}

/// A specialized [`Result`] type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn backend_error_is_transparent() {
        let error = Error::backend(std::io::Error::other("socket closed"));
        assert_eq!(error.to_string(), "socket closed");
        assert!(!error.is_not_found());
    }

    #[test]
    fn backend_error_can_be_downcast() {
        let error = Error::backend(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        let Error::Backend(inner) = error else {
            panic!("expected a backend error");
        };
        let io = inner.downcast::<std::io::Error>().expect("should be an io error");
        assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn unmarshal_exposes_source() {
        let error = Error::Unmarshal("bad payload".into());
        assert_eq!(error.to_string(), "unmarshal error");
        assert_eq!(error.source().map(ToString::to_string).as_deref(), Some("bad payload"));
    }

    #[test]
    fn rejected_reports_costs() {
        let error = Error::Rejected { cost: 10, max_cost: 4 };
        assert_eq!(error.to_string(), "write rejected: cost 10 exceeds the maximum cost of 4");
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::KeyNotFound)
        }

        let err = returns_err().expect_err("should return an error");
        assert!(err.is_not_found());
    }
}
