//! Chain executor.
//!
//! Builds the [`Next`] continuation back-to-front over the middleware list
//! and seeds it with the draft `Response::ok()`, so middlewares execute in
//! insertion order on the way in and unwind in reverse on the way out.

use std::sync::Arc;

use talaria_core::{AppResult, BoxFuture, Response, SlackRequest};

use crate::middleware::{Middleware, Next};

/// Runs a request through `middlewares`, ending at `terminal`.
///
/// `terminal` is the dispatcher step; it only runs if every middleware
/// delegated.
///
/// # Errors
///
/// Propagates whatever the terminal (i.e. a user handler) fails with.
/// Middleware failures are expressed as short-circuit responses, not errors.
pub async fn run_chain<'a, F>(
    middlewares: &'a [Arc<dyn Middleware>],
    request: SlackRequest,
    terminal: F,
) -> AppResult<Response>
where
    F: FnOnce(SlackRequest) -> BoxFuture<'a, AppResult<Response>> + Send + 'a,
{
    let mut next = Next::terminal(Box::new(terminal));
    for middleware in middlewares.iter().rev() {
        next = Next::new(middleware.as_ref(), next);
    }
    next.run(request, Response::ok()).await
}
