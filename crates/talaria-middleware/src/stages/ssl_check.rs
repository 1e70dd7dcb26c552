//! Legacy `ssl_check` probe handling.
//!
//! Slack occasionally probes slash command URLs with a form post carrying
//! `ssl_check=1` to confirm the endpoint's TLS setup. The probe is not
//! signed like a regular delivery, so this stage answers it before request
//! verification runs.

use tracing::debug;

use talaria_core::{AppResult, BoxFuture, RequestKind, Response, SlackRequest};

use crate::middleware::{Middleware, Next};

/// Answers `ssl_check` probes on slash command endpoints.
#[derive(Debug, Clone, Default)]
pub struct SslCheck {
    verification_token: Option<String>,
}

impl SslCheck {
    /// Creates the stage. When a legacy verification token is configured,
    /// probes carrying a different `token` are rejected.
    #[must_use]
    pub fn new(verification_token: Option<String>) -> Self {
        Self { verification_token }
    }
}

impl Middleware for SslCheck {
    fn name(&self) -> &'static str {
        "ssl_check"
    }

    fn apply<'a>(
        &'a self,
        request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if request.kind != RequestKind::SlashCommand || !request.is_ssl_check() {
                return next.run(request, draft).await;
            }
            if let Some(expected) = self.verification_token.as_deref() {
                if request.verification_token() != Some(expected) {
                    debug!("ssl_check probe carried an unexpected verification token");
                    return Ok(Response::plain(401, "invalid token"));
                }
            }
            Ok(Response::ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::request;
    use serde_json::json;

    fn probe(token: &str) -> SlackRequest {
        request(
            RequestKind::SlashCommand,
            json!({"ssl_check": "1", "token": token}),
        )
    }

    fn unreachable_next<'a>() -> Next<'a> {
        Next::terminal(Box::new(|_req| {
            Box::pin(async { Ok(Response::plain(500, "must not reach the handler")) })
        }))
    }

    #[tokio::test]
    async fn probe_is_answered_without_downstream() {
        let stage = SslCheck::new(None);
        let response = stage
            .apply(probe("whatever"), Response::ok(), unreachable_next())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn probe_with_wrong_token_is_rejected() {
        let stage = SslCheck::new(Some("legacy-token".to_string()));
        let response = stage
            .apply(probe("other"), Response::ok(), unreachable_next())
            .await
            .unwrap();
        assert_eq!(response.status, 401);

        let response = stage
            .apply(probe("legacy-token"), Response::ok(), unreachable_next())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn ordinary_commands_pass_through() {
        let stage = SslCheck::new(Some("legacy-token".to_string()));
        let command = request(RequestKind::SlashCommand, json!({"command": "/help"}));
        let next = Next::terminal(Box::new(|_req| {
            Box::pin(async { Ok(Response::plain(200, "handled")) })
        }));
        let response = stage.apply(command, Response::ok(), next).await.unwrap();
        assert_eq!(response.body, "handled");
    }
}
