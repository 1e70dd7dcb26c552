//! Drops events generated by the bot itself.
//!
//! A bot that posts a message receives that message back through the Events
//! API. Dispatching it would make the bot answer itself, forever. This stage
//! acknowledges such events with `200 OK` without invoking any handler.

use tracing::debug;

use talaria_core::{AppResult, BoxFuture, RequestKind, Response, SlackRequest};

use crate::middleware::{Middleware, Next};

/// Short-circuits events whose author is the authorized bot.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoringSelfEvents;

impl IgnoringSelfEvents {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_self_event(request: &SlackRequest) -> bool {
        let ctx = &request.context;
        let by_user = match (request.event_user(), ctx.bot_user_id()) {
            (Some(user), Some(bot_user_id)) => user == bot_user_id,
            _ => false,
        };
        let by_bot_id = match (request.event_bot_id(), ctx.bot_id()) {
            (Some(bot_id), Some(own_bot_id)) => bot_id == own_bot_id,
            _ => false,
        };
        by_user || by_bot_id
    }
}

impl Middleware for IgnoringSelfEvents {
    fn name(&self) -> &'static str {
        "ignoring_self_events"
    }

    fn apply<'a>(
        &'a self,
        request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if request.kind == RequestKind::Event && Self::is_self_event(&request) {
                debug!(
                    event_key = request.event_key().as_deref().unwrap_or("-"),
                    "ignoring an event generated by this bot"
                );
                return Ok(Response::ok());
            }
            next.run(request, draft).await
        })
    }
}
