//! The OAuth code-exchange API.
//!
//! Slack's `oauth.access` (classic, v1) and `oauth.v2.access` calls, behind
//! an object-safe trait so the callback flow can be exercised against a mock.
//! The production implementation posts form-encoded requests through the
//! core [`ApiClient`].

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use talaria_core::{ApiClient, ApiError, BoxFuture};

/// Parameters of a code exchange.
#[derive(Debug, Clone)]
pub struct AccessParams {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Authorization code from the consent redirect.
    pub code: String,
    /// Redirect URI, when one was configured.
    pub redirect_uri: Option<String>,
}

/// `oauth.access` (v1) response, reduced to the fields the flow persists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessResponse {
    /// Whether the exchange succeeded.
    pub ok: bool,
    /// Error code when `ok` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Installer's user token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Scopes granted to the user token.
    #[serde(default)]
    pub scope: Option<String>,
    /// Workspace id.
    #[serde(default)]
    pub team_id: Option<String>,
    /// Enterprise id, for org installs.
    #[serde(default)]
    pub enterprise_id: Option<String>,
    /// Installer's user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Bot grant, when bot scopes were requested.
    #[serde(default)]
    pub bot: Option<AccessBot>,
}

/// The nested bot grant of a v1 response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessBot {
    /// The bot's user id.
    #[serde(default)]
    pub bot_user_id: Option<String>,
    /// The bot token.
    #[serde(default)]
    pub bot_access_token: Option<String>,
}

/// `oauth.v2.access` response, reduced to the fields the flow persists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessV2Response {
    /// Whether the exchange succeeded.
    pub ok: bool,
    /// Error code when `ok` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Slack app id.
    #[serde(default)]
    pub app_id: Option<String>,
    /// The bot token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Scopes granted to the bot token.
    #[serde(default)]
    pub scope: Option<String>,
    /// The bot's user id.
    #[serde(default)]
    pub bot_user_id: Option<String>,
    /// Workspace the app was installed into.
    #[serde(default)]
    pub team: Option<IdAndName>,
    /// Enterprise, for org installs.
    #[serde(default)]
    pub enterprise: Option<IdAndName>,
    /// The installing user and their grant.
    #[serde(default)]
    pub authed_user: Option<AuthedUser>,
}

/// An `{id, name}` pair as Slack renders teams and enterprises.
#[derive(Debug, Clone, Deserialize)]
pub struct IdAndName {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// The `authed_user` block of a v2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthedUser {
    /// Installer's user id.
    pub id: String,
    /// Installer's user token, when user scopes were granted.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Scopes granted to the user token.
    #[serde(default)]
    pub scope: Option<String>,
}

/// The code-exchange calls, mockable for tests.
pub trait OAuthApi: Send + Sync {
    /// Calls `oauth.access` (classic flow).
    fn access<'a>(
        &'a self,
        params: &'a AccessParams,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AccessResponse, ApiError>>;

    /// Calls `oauth.v2.access`.
    fn access_v2<'a>(
        &'a self,
        params: &'a AccessParams,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AccessV2Response, ApiError>>;
}

/// Production implementation backed by the core [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpOAuthApi {
    client: ApiClient,
}

impl HttpOAuthApi {
    /// Creates an API against the given client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn form_of(params: &AccessParams) -> Vec<(&'static str, &str)> {
        let mut form = vec![
            ("client_id", params.client_id.as_str()),
            ("client_secret", params.client_secret.as_str()),
            ("code", params.code.as_str()),
        ];
        if let Some(redirect_uri) = params.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }
        form
    }
}

impl OAuthApi for HttpOAuthApi {
    fn access<'a>(
        &'a self,
        params: &'a AccessParams,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AccessResponse, ApiError>> {
        Box::pin(async move {
            let form = Self::form_of(params);
            let value = self
                .client
                .call_form("oauth.access", None, &form, cancel)
                .await?;
            Ok(serde_json::from_value(value)?)
        })
    }

    fn access_v2<'a>(
        &'a self,
        params: &'a AccessParams,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AccessV2Response, ApiError>> {
        Box::pin(async move {
            let form = Self::form_of(params);
            let value = self
                .client
                .call_form("oauth.v2.access", None, &form, cancel)
                .await?;
            Ok(serde_json::from_value(value)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_response_decodes() {
        let json = r#"{
            "ok": true,
            "app_id": "A111",
            "access_token": "xoxb-X",
            "scope": "commands,chat:write",
            "bot_user_id": "U0BOT",
            "team": {"id": "T1", "name": "Acme"},
            "authed_user": {"id": "U1", "access_token": "xoxp-Y", "scope": "search:read"}
        }"#;
        let response: AccessV2Response = serde_json::from_str(json).unwrap();
        assert!(response.ok);
        assert_eq!(response.access_token.as_deref(), Some("xoxb-X"));
        assert_eq!(response.team.unwrap().id, "T1");
        assert_eq!(
            response.authed_user.unwrap().access_token.as_deref(),
            Some("xoxp-Y")
        );
    }

    #[test]
    fn v1_error_response_decodes() {
        let json = r#"{"ok": false, "error": "invalid_code"}"#;
        let response: AccessResponse = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("invalid_code"));
        assert!(response.bot.is_none());
    }

    #[test]
    fn redirect_uri_is_optional_in_form() {
        let params = AccessParams {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            code: "code".to_string(),
            redirect_uri: None,
        };
        assert_eq!(HttpOAuthApi::form_of(&params).len(), 3);
    }
}
