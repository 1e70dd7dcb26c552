//! Per-request context.
//!
//! The [`RequestContext`] is the mutable bag carried through the middleware
//! chain. The dispatcher seeds it with the API client before any middleware
//! runs; authorization middleware enriches it with workspace identifiers and
//! tokens; handlers read it but do not extend it.

use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;

/// Mutable per-request state, exclusively owned by one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_timestamp: Option<i64>,
    enterprise_id: Option<String>,
    team_id: Option<String>,
    user_id: Option<String>,
    bot_token: Option<String>,
    bot_user_id: Option<String>,
    bot_id: Option<String>,
    user_token: Option<String>,
    client: Option<ApiClient>,
    oauth_cancellation_url: Option<String>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `X-Slack-Request-Timestamp` value, epoch seconds.
    #[must_use]
    pub fn request_timestamp(&self) -> Option<i64> {
        self.request_timestamp
    }

    /// Sets the request timestamp. Called by the parser.
    pub fn set_request_timestamp(&mut self, timestamp: i64) {
        self.request_timestamp = Some(timestamp);
    }

    /// The enterprise (org) id, when known.
    #[must_use]
    pub fn enterprise_id(&self) -> Option<&str> {
        self.enterprise_id.as_deref()
    }

    /// Sets the enterprise id.
    pub fn set_enterprise_id(&mut self, enterprise_id: impl Into<String>) {
        self.enterprise_id = Some(enterprise_id.into());
    }

    /// The workspace id, when known.
    #[must_use]
    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    /// Sets the workspace id.
    pub fn set_team_id(&mut self, team_id: impl Into<String>) {
        self.team_id = Some(team_id.into());
    }

    /// The requesting user's id, when known.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Sets the requesting user's id.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// The bot token resolved by authorization middleware.
    #[must_use]
    pub fn bot_token(&self) -> Option<&str> {
        self.bot_token.as_deref()
    }

    /// Sets the bot token. Called by authorization middleware.
    pub fn set_bot_token(&mut self, token: impl Into<String>) {
        self.bot_token = Some(token.into());
    }

    /// The bot's user id, used to ignore self-generated events.
    #[must_use]
    pub fn bot_user_id(&self) -> Option<&str> {
        self.bot_user_id.as_deref()
    }

    /// Sets the bot's user id.
    pub fn set_bot_user_id(&mut self, bot_user_id: impl Into<String>) {
        self.bot_user_id = Some(bot_user_id.into());
    }

    /// The bot's bot id.
    #[must_use]
    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id.as_deref()
    }

    /// Sets the bot's bot id.
    pub fn set_bot_id(&mut self, bot_id: impl Into<String>) {
        self.bot_id = Some(bot_id.into());
    }

    /// The installer's user token, when one was granted.
    #[must_use]
    pub fn user_token(&self) -> Option<&str> {
        self.user_token.as_deref()
    }

    /// Sets the installer's user token.
    pub fn set_user_token(&mut self, token: impl Into<String>) {
        self.user_token = Some(token.into());
    }

    /// The Slack API client seeded by the dispatcher.
    #[must_use]
    pub fn client(&self) -> Option<&ApiClient> {
        self.client.as_ref()
    }

    /// Seeds the API client. Called once, before any middleware runs.
    pub fn set_client(&mut self, client: ApiClient) {
        self.client = Some(client);
    }

    /// The configured OAuth cancellation URL.
    #[must_use]
    pub fn oauth_cancellation_url(&self) -> Option<&str> {
        self.oauth_cancellation_url.as_deref()
    }

    /// Sets the OAuth cancellation URL.
    pub fn set_oauth_cancellation_url(&mut self, url: impl Into<String>) {
        self.oauth_cancellation_url = Some(url.into());
    }

    /// The cancellation token propagated with this request.
    ///
    /// Handlers and in-flight API calls must observe it and abort at the
    /// first safe point once it fires.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Replaces the cancellation token, tying the request to an external
    /// deadline or abort signal.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }
}
