//! Error types for the framework core.
//!
//! The taxonomy follows the request lifecycle: [`ParseError`] for request
//! classification failures, [`SignatureError`] for request authentication
//! failures, [`ApiError`] for outgoing Slack Web API calls, and [`AppError`]
//! for everything that propagates out of `App::run`.
//!
//! Parse and signature failures are terminal HTTP responses (`400` / `401`),
//! not propagated errors; only handler failures and API transport failures
//! surface as `Err` from the dispatcher.

use thiserror::Error;

/// Result type alias using [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

/// Request classification failures produced by the parser.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The request matched none of the known request kinds.
    #[error("unrecognized request")]
    UnrecognizedRequest,

    /// The body claimed to be JSON but could not be decoded.
    #[error("malformed JSON body")]
    MalformedJson(#[from] serde_json::Error),

    /// The body claimed to be form-encoded but could not be decoded.
    #[error("malformed form body")]
    MalformedForm(#[from] serde_urlencoded::de::Error),
}

/// Request authentication failures from signature verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// `X-Slack-Signature` or `X-Slack-Request-Timestamp` is absent.
    #[error("missing signature headers")]
    MissingSignatureHeaders,

    /// The request timestamp is outside the replay window.
    #[error("request timestamp expired")]
    RequestExpired,

    /// The signature does not match the request body.
    #[error("invalid request signature")]
    InvalidSignature,
}

/// Failures from outgoing Slack Web API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The HTTP transport failed.
    #[error("transport error calling Slack API")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected shape.
    #[error("malformed Slack API response")]
    MalformedResponse(#[from] serde_json::Error),

    /// The request was cancelled before completion.
    #[error("Slack API call cancelled")]
    Cancelled,
}

/// Errors that propagate out of `App::run` to the HTTP adapter.
///
/// The core never converts these into responses itself; the adapter is
/// expected to produce a `500`.
#[derive(Error, Debug)]
pub enum AppError {
    /// A Slack Web API call made on behalf of the request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A user handler failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// Any other error raised by user code.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    /// Creates a handler error from a message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}
