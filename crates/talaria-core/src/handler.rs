//! Handler trait for dispatched requests.

use std::future::Future;
use std::pin::Pin;

use crate::error::AppResult;
use crate::request::SlackRequest;
use crate::response::Response;

/// A boxed future, the unit of async work across crate boundaries.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The future returned by a handler.
///
/// Handlers copy whatever they need out of the request before entering the
/// async block, so the future owns its captures and outlives the borrow.
pub type HandlerFuture = BoxFuture<'static, AppResult<Response>>;

/// A registered request handler.
///
/// Implemented for free by any closure of the right shape:
///
/// ```
/// use talaria_core::{HandlerFuture, Response, SlackHandler, SlackRequest};
///
/// let handler = |req: &SlackRequest| -> HandlerFuture {
///     let who = req.user_id().unwrap_or("someone").to_string();
///     Box::pin(async move { Ok(Response::plain(200, format!("hi {who}"))) })
/// };
/// fn assert_handler(_: impl SlackHandler) {}
/// assert_handler(handler);
/// ```
pub trait SlackHandler: Send + Sync + 'static {
    /// Handles a dispatched request.
    ///
    /// Errors propagate out of `App::run` untouched; the core does not
    /// convert handler failures into responses.
    fn handle(&self, request: &SlackRequest) -> HandlerFuture;
}

impl<F> SlackHandler for F
where
    F: Fn(&SlackRequest) -> HandlerFuture + Send + Sync + 'static,
{
    fn handle(&self, request: &SlackRequest) -> HandlerFuture {
        self(request)
    }
}
