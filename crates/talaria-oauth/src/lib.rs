//! # Talaria OAuth
//!
//! The OAuth install flow for distributed Slack apps:
//!
//! - [`Installation`] / [`InstallationStore`] - per-workspace token persistence
//! - [`OAuthStateStore`] - one-time install-state tokens (anti-CSRF)
//! - [`OAuthApi`] - the `oauth.access` / `oauth.v2.access` exchange, mockable
//! - [`OAuthFlow`] - the install-start and callback state machine
//!
//! In-memory stores are bundled as defaults; durable backends plug in
//! through the store traits.

#![doc(html_root_url = "https://docs.rs/talaria-oauth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod error;
mod flow;
mod installation;
mod state;

pub use api::{
    AccessBot, AccessParams, AccessResponse, AccessV2Response, AuthedUser, HttpOAuthApi,
    IdAndName, OAuthApi,
};
pub use error::{OAuthError, StoreError};
pub use flow::{
    AccessErrorHandler, ErrorHandler, ExceptionHandler, OAuthFlow, StateErrorHandler,
    SuccessHandler,
};
pub use installation::{Installation, InstallationStore, MemoryInstallationStore};
pub use state::{MemoryOAuthStateStore, OAuthStateStore, STATE_COOKIE_NAME};
