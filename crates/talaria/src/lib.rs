//! # Talaria
//!
//! **A server-agnostic Slack app framework.**
//!
//! Talaria accepts already-parsed HTTP requests originating from Slack —
//! Events API deliveries, interactive components, slash commands, outgoing
//! webhooks, OAuth installs — and produces HTTP responses. It owns no
//! listener and no storage: the hosting server feeds it [`RawRequest`]s,
//! and persistence plugs in through store traits.
//!
//! ## Quick start
//!
//! ```rust
//! use talaria::prelude::*;
//!
//! # async fn demo() -> AppResult<()> {
//! let app = App::new(AppConfig::new("signing-secret"));
//! app.command("/hello", |req: &SlackRequest| -> HandlerFuture {
//!     let user = req.user_id().unwrap_or("there").to_string();
//!     Box::pin(async move { Ok(Response::plain(200, format!("hi {user}"))) })
//! });
//!
//! let raw = RawRequest::new(http::Method::POST, "/slack/events");
//! let _response = app.handle(raw).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! raw HTTP → RequestParser → SlackRequest → middleware chain → dispatch
//!                                                                  ↓
//! Response ←──────────────── chain unwinds ←───────────────── handler
//! ```
//!
//! The default middleware chain is `SslCheck → RequestVerification →
//! authorization → IgnoringSelfEvents`; user middleware appends after it.

#![doc(html_root_url = "https://docs.rs/talaria/0.1.0")]
#![forbid(unsafe_code)]

mod app;
mod events;
mod registry;

pub use app::{App, AppStatus};
pub use events::{EventListener, EventsDispatcher};

pub use talaria_core as core;
pub use talaria_middleware as middleware;
pub use talaria_oauth as oauth;

/// Prelude module for convenient imports.
///
/// ```rust
/// use talaria::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, AppStatus};
    pub use talaria_core::{
        ApiClient, AppConfig, AppError, AppResult, EventKey, HandlerFuture, RawRequest,
        RequestContext, RequestKind, Response, SlackHandler, SlackRequest,
    };
    pub use talaria_middleware::{Middleware, Next};
    pub use talaria_oauth::{Installation, InstallationStore, OAuthStateStore};
}
