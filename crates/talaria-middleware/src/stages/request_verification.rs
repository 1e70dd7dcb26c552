//! Request signature verification stage.
//!
//! Rejects any delivery whose `X-Slack-Signature` does not match
//! `HMAC-SHA256(signing_secret, "v0:{timestamp}:{body}")`, or whose
//! timestamp falls outside the five-minute replay window. OAuth endpoints
//! are browser redirects and carry no signature, so they pass through.

use tracing::error;

use talaria_core::{
    AppResult, BoxFuture, Response, SignatureError, SignatureVerifier, SlackRequest,
    SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

use crate::middleware::{Middleware, Next};

/// Verifies that requests originated from Slack.
#[derive(Debug, Clone)]
pub struct RequestVerification {
    verifier: SignatureVerifier,
}

impl RequestVerification {
    /// Creates the stage for a signing secret.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            verifier: SignatureVerifier::new(signing_secret),
        }
    }

    fn check(&self, request: &SlackRequest) -> Result<(), SignatureError> {
        let timestamp = request
            .header(TIMESTAMP_HEADER)
            .ok_or(SignatureError::MissingSignatureHeaders)?;
        let signature = request
            .header(SIGNATURE_HEADER)
            .ok_or(SignatureError::MissingSignatureHeaders)?;
        self.verifier.verify(timestamp, request.body_str(), signature)
    }
}

impl Middleware for RequestVerification {
    fn name(&self) -> &'static str {
        "request_verification"
    }

    fn apply<'a>(
        &'a self,
        request: SlackRequest,
        draft: Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if request.kind.is_oauth() {
                return next.run(request, draft).await;
            }
            match self.check(&request) {
                Ok(()) => next.run(request, draft).await,
                Err(err) => {
                    error!(kind = %request.kind, error = %err, "rejected unverifiable request");
                    Ok(Response::json(401, r#"{"error":"invalid_request"}"#))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{HeaderName, HeaderValue};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};
    use talaria_core::{RequestContext, RequestKind, SignatureGenerator};

    const SECRET: &str = "test-signing-secret";

    fn signed_request(secret: &str, age_seconds: i64) -> SlackRequest {
        let body = r#"{"type":"event_callback","event":{"type":"app_mention"}}"#;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let timestamp = (now - age_seconds).to_string();
        let signature = SignatureGenerator::new(secret).generate(&timestamp, body);

        let mut headers = http::HeaderMap::new();
        headers.insert(
            TIMESTAMP_HEADER.parse::<HeaderName>().unwrap(),
            HeaderValue::from_str(&timestamp).unwrap(),
        );
        headers.insert(
            SIGNATURE_HEADER.parse::<HeaderName>().unwrap(),
            HeaderValue::from_str(&signature).unwrap(),
        );
        SlackRequest {
            kind: RequestKind::Event,
            raw_body: Bytes::from_static(body.as_bytes()),
            headers,
            payload: serde_json::from_str(body).unwrap(),
            context: RequestContext::new(),
        }
    }

    fn handled_next<'a>() -> Next<'a> {
        Next::terminal(Box::new(|_req| {
            Box::pin(async { Ok(Response::plain(200, "handled")) })
        }))
    }

    #[tokio::test]
    async fn valid_signature_passes() {
        let stage = RequestVerification::new(SECRET);
        let response = stage
            .apply(signed_request(SECRET, 0), Response::ok(), handled_next())
            .await
            .unwrap();
        assert_eq!(response.body, "handled");
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let stage = RequestVerification::new(SECRET);
        let response = stage
            .apply(
                signed_request("other-secret", 0),
                Response::ok(),
                handled_next(),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.body, r#"{"error":"invalid_request"}"#);
    }

    #[tokio::test]
    async fn expired_timestamp_is_rejected_before_downstream() {
        let stage = RequestVerification::new(SECRET);
        // ten minutes old, outside the five-minute window
        let response = stage
            .apply(signed_request(SECRET, 600), Response::ok(), handled_next())
            .await
            .unwrap();
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn missing_headers_are_rejected() {
        let stage = RequestVerification::new(SECRET);
        let bare = SlackRequest {
            kind: RequestKind::Event,
            raw_body: Bytes::new(),
            headers: http::HeaderMap::new(),
            payload: json!({}),
            context: RequestContext::new(),
        };
        let response = stage
            .apply(bare, Response::ok(), handled_next())
            .await
            .unwrap();
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn oauth_requests_skip_verification() {
        let stage = RequestVerification::new(SECRET);
        let callback = SlackRequest {
            kind: RequestKind::OAuthCallback,
            raw_body: Bytes::new(),
            headers: http::HeaderMap::new(),
            payload: json!({"code": "c"}),
            context: RequestContext::new(),
        };
        let response = stage
            .apply(callback, Response::ok(), handled_next())
            .await
            .unwrap();
        assert_eq!(response.body, "handled");
    }
}
