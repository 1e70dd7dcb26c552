//! Single-workspace authorization stage.
//!
//! The non-distributed path: one static bot token serves every request.
//! The bot's own user id, needed by [`IgnoringSelfEvents`], is taken from
//! configuration when provided, otherwise resolved once through `auth.test`
//! and cached for the life of the app.
//!
//! [`IgnoringSelfEvents`]: crate::stages::IgnoringSelfEvents

use parking_lot::RwLock;
use tracing::error;

use talaria_core::{AppResult, BoxFuture, Response, SlackRequest};

use crate::middleware::{Middleware, Next};

#[derive(Debug, Clone)]
struct ResolvedBot {
    bot_user_id: Option<String>,
    bot_id: Option<String>,
}

/// Seeds the context with a statically configured bot token.
pub struct SingleTeamAuthorization {
    bot_token: String,
    resolved: RwLock<Option<ResolvedBot>>,
}

impl SingleTeamAuthorization {
    /// Creates the stage with the configured token; `bot_user_id` skips the
    /// `auth.test` lookup when already known.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, bot_user_id: Option<String>) -> Self {
        let resolved = bot_user_id.map(|bot_user_id| ResolvedBot {
            bot_user_id: Some(bot_user_id),
            bot_id: None,
        });
        Self {
            bot_token: bot_token.into(),
            resolved: RwLock::new(resolved),
        }
    }

    /// Returns the bot identity, or the `401` to answer with when the
    /// configured token cannot be validated.
    async fn resolve(&self, request: &SlackRequest) -> Result<ResolvedBot, Response> {
        if let Some(resolved) = self.resolved.read().clone() {
            return Ok(resolved);
        }
        let Some(client) = request.context.client() else {
            return Ok(ResolvedBot {
                bot_user_id: None,
                bot_id: None,
            });
        };
        match client
            .auth_test(&self.bot_token, request.context.cancellation())
            .await
        {
            Ok(response) if response.ok => {
                let resolved = ResolvedBot {
                    bot_user_id: response.user_id,
                    bot_id: response.bot_id,
                };
                *self.resolved.write() = Some(resolved.clone());
                Ok(resolved)
            }
            Ok(response) => {
                error!(error = ?response.error, "auth.test rejected the configured bot token");
                Err(Response::json(401, r#"{"error":"invalid_request"}"#))
            }
            Err(err) => {
                error!(error = %err, "auth.test call failed");
                Err(Response::json(401, r#"{"error":"invalid_request"}"#))
            }
        }
    }
}

impl Middleware for SingleTeamAuthorization {
    fn name(&self) -> &'static str {
        "single_team_authorization"
    }

    fn apply<'a>(
        &'a self,
        mut request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if request.kind.is_oauth() {
                return next.run(request, draft).await;
            }
            let resolved = match self.resolve(&request).await {
                Ok(resolved) => resolved,
                Err(response) => return Ok(response),
            };

            let team_id = request.team_id().map(str::to_string);
            let user_id = request.user_id().map(str::to_string);
            let ctx = &mut request.context;
            ctx.set_bot_token(self.bot_token.clone());
            if let Some(bot_user_id) = resolved.bot_user_id {
                ctx.set_bot_user_id(bot_user_id);
            }
            if let Some(bot_id) = resolved.bot_id {
                ctx.set_bot_id(bot_id);
            }
            if let Some(team_id) = team_id {
                ctx.set_team_id(team_id);
            }
            if let Some(user_id) = user_id {
                ctx.set_user_id(user_id);
            }
            next.run(request, draft).await
        })
    }
}
