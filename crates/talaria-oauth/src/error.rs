//! OAuth-side error types.
//!
//! Nothing here escapes the flow as an `Err`: every failure is converted
//! into a `302` redirect by one of the callback handlers. The types exist so
//! the exception handler can log what actually went wrong.

use thiserror::Error;

use talaria_core::ApiError;

/// A persistence failure from an installation or state store.
#[derive(Error, Debug)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    /// Creates a store error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failures the OAuth callback can hit after state validation.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// The code exchange transport failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persisting the installation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
