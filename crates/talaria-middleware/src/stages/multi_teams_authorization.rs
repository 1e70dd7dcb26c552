//! Multi-workspace authorization stage.
//!
//! For distributed apps: resolves which installation serves the requesting
//! workspace and seeds the context with its bot credentials. A workspace
//! with no installation is answered with `401` before any handler runs.

use std::sync::Arc;
use tracing::{error, warn};

use talaria_core::{AppResult, BoxFuture, RequestKind, Response, SlackRequest};
use talaria_oauth::InstallationStore;

use crate::middleware::{Middleware, Next};

/// Resolves per-workspace bot tokens from the installation store.
pub struct MultiTeamsAuthorization {
    store: Arc<dyn InstallationStore>,
}

impl MultiTeamsAuthorization {
    /// Creates the stage over an installation store.
    #[must_use]
    pub fn new(store: Arc<dyn InstallationStore>) -> Self {
        Self { store }
    }
}

fn unauthorized() -> Response {
    Response::json(401, r#"{"error":"invalid_request"}"#)
}

impl Middleware for MultiTeamsAuthorization {
    fn name(&self) -> &'static str {
        "multi_teams_authorization"
    }

    fn apply<'a>(
        &'a self,
        mut request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            // OAuth endpoints run before any installation exists, and the
            // url_verification probe carries no workspace at all.
            if request.kind.is_oauth() || request.kind == RequestKind::UrlVerification {
                return next.run(request, draft).await;
            }

            let team_id = request.team_id().map(str::to_string);
            let enterprise_id = request.enterprise_id().map(str::to_string);
            let user_id = request.user_id().map(str::to_string);

            let installation = match self
                .store
                .find_bot(enterprise_id.as_deref(), team_id.as_deref())
                .await
            {
                Ok(found) => found,
                Err(err) => {
                    error!(error = %err, "installation lookup failed");
                    return Ok(unauthorized());
                }
            };
            let Some(installation) = installation else {
                warn!(
                    team_id = team_id.as_deref().unwrap_or("-"),
                    enterprise_id = enterprise_id.as_deref().unwrap_or("-"),
                    "no installation found for this workspace"
                );
                return Ok(unauthorized());
            };

            let ctx = &mut request.context;
            if let Some(team_id) = team_id {
                ctx.set_team_id(team_id);
            }
            if let Some(enterprise_id) = enterprise_id {
                ctx.set_enterprise_id(enterprise_id);
            }
            if let Some(user_id) = user_id {
                ctx.set_user_id(user_id);
            }
            if let Some(token) = installation.bot_token {
                ctx.set_bot_token(token);
            }
            if let Some(bot_user_id) = installation.bot_user_id {
                ctx.set_bot_user_id(bot_user_id);
            }
            if let Some(bot_id) = installation.bot_id {
                ctx.set_bot_id(bot_id);
            }
            next.run(request, draft).await
        })
    }
}
