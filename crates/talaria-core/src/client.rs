//! Minimal Slack Web API client handle.
//!
//! The framework core does not own Slack API semantics; handlers call
//! whatever methods they need through this thin form-encoded client, and the
//! built-in middleware uses it for `auth.test`. Every call observes the
//! request's cancellation token and aborts at the first safe point.

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// A handle to the Slack Web API.
///
/// Cheap to clone; the underlying `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Response shape of `auth.test`, reduced to the fields the framework reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTestResponse {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Error code when `ok` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// The bot's user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// The bot's bot id.
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Workspace the token belongs to.
    #[serde(default)]
    pub team_id: Option<String>,
}

impl ApiClient {
    /// Creates a client against the given API base URL
    /// (normally `https://slack.com/api/`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Returns the configured API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls an API method with a form-encoded body and returns the raw JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Cancelled`] when `cancel` fires before the call
    /// completes, [`ApiError::Transport`] on HTTP failures, and
    /// [`ApiError::MalformedResponse`] when the body is not JSON.
    pub async fn call_form(
        &self,
        method: &str,
        token: Option<&str>,
        form: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, method);
        let mut request = self.http.post(url).form(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = tokio::select! {
            result = request.send() => result?,
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
        };
        let body = tokio::select! {
            result = response.text() => result?,
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
        };
        Ok(serde_json::from_str(&body)?)
    }

    /// Calls `auth.test` with the given token.
    ///
    /// # Errors
    ///
    /// Propagates the same failures as [`ApiClient::call_form`].
    pub async fn auth_test(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<AuthTestResponse, ApiError> {
        let value = self.call_form("auth.test", Some(token), &[], cancel).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_API_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = ApiClient::new("https://slack.example.test/api");
        assert_eq!(client.base_url(), "https://slack.example.test/api/");
    }

    #[test]
    fn auth_test_response_decodes() {
        let json = r#"{"ok":true,"user_id":"U123","bot_id":"B456","team_id":"T789"}"#;
        let response: AuthTestResponse = serde_json::from_str(json).unwrap();
        assert!(response.ok);
        assert_eq!(response.user_id.as_deref(), Some("U123"));
        assert_eq!(response.bot_id.as_deref(), Some("B456"));
    }
}
