//! # Talaria Core
//!
//! Foundational types for the Talaria Slack app framework:
//!
//! - [`SlackRequest`] / [`RequestKind`] - the classified request record
//! - [`RequestParser`] - classification of raw HTTP into request kinds
//! - [`RequestContext`] - per-request mutable bag
//! - [`Response`] - the HTTP response record handed back to the adapter
//! - [`SignatureVerifier`] - Slack request signing (HMAC-SHA256, replay window)
//! - [`ApiClient`] - thin Slack Web API handle carried by the context
//! - [`AppConfig`] - explicit app configuration, no global state
//! - [`SlackHandler`] - the handler trait dispatched requests land on
//!
//! The framework accepts already-parsed HTTP requests and produces
//! responses; it owns no listener, no thread pool, and no storage.

#![doc(html_root_url = "https://docs.rs/talaria-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod context;
mod error;
mod handler;
mod parser;
mod request;
mod response;
mod signature;

pub use client::{ApiClient, AuthTestResponse};
pub use config::{
    AppConfig, ConfigError, DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL_BASE,
    DEFAULT_OAUTH_CALLBACK_PATH, DEFAULT_OAUTH_START_PATH, DEFAULT_STATE_EXPIRATION_SECONDS,
};
pub use context::RequestContext;
pub use error::{ApiError, AppError, AppResult, ParseError, SignatureError};
pub use handler::{BoxFuture, HandlerFuture, SlackHandler};
pub use parser::{RawRequest, RequestParser};
pub use request::{EventKey, RequestKind, SlackRequest};
pub use response::{Response, APPLICATION_JSON, TEXT_PLAIN};
pub use signature::{SignatureGenerator, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
